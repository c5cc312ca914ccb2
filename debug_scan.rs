// Run with: cargo run -p reclaim-core --example debug_scan -- /path/to/scan

use reclaim_core::{ScanConfig, ScanMessage, Scanner, format_size};
use std::path::PathBuf;
use std::time::{Duration, Instant};

fn main() {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    println!("Scanning: {:?}", path);

    let scanner = Scanner::new(ScanConfig::default());
    let (rx, handle) = scanner.scan(path);

    let start = Instant::now();
    let mut last_print = Instant::now();
    let mut last_percentage = 0.0f64;
    let mut batches = 0u64;
    let mut largest_batch = 0usize;

    for msg in rx {
        let elapsed = start.elapsed().as_secs_f64();
        match msg {
            ScanMessage::Started(root) => {
                println!("[{:>6.1}s] STARTED at {}", elapsed, root.display());
            }
            ScanMessage::Batch(batch) => {
                batches += 1;
                largest_batch = largest_batch.max(batch.len());
                let reclaimable = batch.iter().filter(|f| f.is_reclaimable).count();
                println!(
                    "[{:>6.1}s] batch #{:<5} files={:<5} reclaimable={}",
                    elapsed,
                    batches,
                    batch.len(),
                    reclaimable
                );
            }
            ScanMessage::Progress(p) => {
                // Percentage must never move backwards
                let regressed = p.percentage < last_percentage;
                last_percentage = p.percentage;

                if last_print.elapsed() > Duration::from_secs(1) || regressed || p.percentage >= 100.0 {
                    println!(
                        "[{:>6.1}s] {:>5.1}% files={:<8} est={:<8} dirs={:<8} errors={:<4} regressed={} path={:?}",
                        elapsed,
                        p.percentage,
                        p.files_processed,
                        p.files_estimated_total,
                        p.dirs_scanned,
                        p.errors,
                        regressed,
                        p.current_path
                            .as_ref()
                            .map(|p| p.to_string_lossy().to_string())
                            .unwrap_or_default()
                    );
                    last_print = Instant::now();
                }
            }
            ScanMessage::Completed(_) => {
                println!("[{:>6.1}s] COMPLETED", elapsed);
            }
            ScanMessage::Cancelled => {
                println!("[{:>6.1}s] CANCELLED", elapsed);
            }
            ScanMessage::Error(e) => {
                println!("[{:>6.1}s] ERROR: {}", elapsed, e);
            }
        }
    }

    match handle.join().unwrap() {
        Ok(summary) => println!(
            "\nFinal: {} files ({}), {} reclaimable ({}), {} batches, largest {}",
            summary.files_found,
            format_size(summary.total_bytes),
            summary.reclaimable_files,
            format_size(summary.reclaimable_bytes),
            batches,
            largest_batch
        ),
        Err(e) => println!("\nScan failed: {}", e),
    }
}
