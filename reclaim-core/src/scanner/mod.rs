mod estimate;
mod filter;
mod progress;
mod walker;

pub(crate) use filter::{is_denied, resolve_excludes};
pub use filter::DENIED_NAMES;
pub use progress::{ScanMessage, ScanProgress, ScanSummary};
pub use walker::{ScanConfig, Scanner};
