//! Content digests for duplicate detection.

use std::fmt;
use std::fs::File;
use std::hash::Hasher as _;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use twox_hash::XxHash64;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Hash algorithm options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Blake3,
    Sha256,
    XxHash64,
    Crc32,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 4] = [
        HashAlgorithm::Blake3,
        HashAlgorithm::Sha256,
        HashAlgorithm::XxHash64,
        HashAlgorithm::Crc32,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Blake3 => "blake3",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::XxHash64 => "xxhash64",
            HashAlgorithm::Crc32 => "crc32",
        }
    }

    fn hasher(&self) -> ContentHasher {
        match self {
            HashAlgorithm::Blake3 => ContentHasher::Blake3(Box::new(blake3::Hasher::new())),
            HashAlgorithm::Sha256 => ContentHasher::Sha256(Sha256::new()),
            HashAlgorithm::XxHash64 => ContentHasher::XxHash64(XxHash64::with_seed(0)),
            HashAlgorithm::Crc32 => ContentHasher::Crc32(crc32fast::Hasher::new()),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HashAlgorithm::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown hash algorithm: {s}"))
    }
}

/// How much of a file goes into its digest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashMode {
    /// Every byte
    Full,
    /// Head, middle and tail windows of `sample_size` bytes each. Files no
    /// larger than three windows are hashed in full.
    Sampled { sample_size: u64 },
}

enum ContentHasher {
    Blake3(Box<blake3::Hasher>),
    Sha256(Sha256),
    XxHash64(XxHash64),
    Crc32(crc32fast::Hasher),
}

impl ContentHasher {
    fn update(&mut self, data: &[u8]) {
        match self {
            ContentHasher::Blake3(h) => {
                h.update(data);
            }
            ContentHasher::Sha256(h) => h.update(data),
            ContentHasher::XxHash64(h) => h.write(data),
            ContentHasher::Crc32(h) => h.update(data),
        }
    }

    fn finish_hex(self) -> String {
        match self {
            ContentHasher::Blake3(h) => h.finalize().to_hex().to_string(),
            ContentHasher::Sha256(h) => hex::encode(h.finalize()),
            ContentHasher::XxHash64(h) => format!("{:016x}", h.finish()),
            ContentHasher::Crc32(h) => format!("{:08x}", h.finalize()),
        }
    }
}

/// Hash a file's content, returning a lower-case hex digest
pub fn hash_file(path: &Path, algorithm: HashAlgorithm, mode: HashMode) -> io::Result<String> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    let mut hasher = algorithm.hasher();

    match mode {
        // a file no longer than three windows is hashed whole
        HashMode::Sampled { sample_size }
            if sample_size > 0 && sample_size.checked_mul(3).is_some_and(|windows| len > windows) =>
        {
            let middle = len / 2 - sample_size / 2;
            for offset in [0, middle, len - sample_size] {
                file.seek(SeekFrom::Start(offset))?;
                feed(&mut (&mut file).take(sample_size), &mut hasher)?;
            }
        }
        _ => feed(&mut file, &mut hasher)?,
    }

    Ok(hasher.finish_hex())
}

/// Hash an in-memory buffer
pub fn hash_bytes(data: &[u8], algorithm: HashAlgorithm) -> String {
    let mut hasher = algorithm.hasher();
    hasher.update(data);
    hasher.finish_hex()
}

fn feed<R: Read>(reader: &mut R, hasher: &mut ContentHasher) -> io::Result<()> {
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..n]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_full_hash_matches_bytes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.bin");
        let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &content).unwrap();

        for algorithm in HashAlgorithm::ALL {
            let from_file = hash_file(&path, algorithm, HashMode::Full).unwrap();
            assert_eq!(from_file, hash_bytes(&content, algorithm), "{algorithm}");
        }
    }

    #[test]
    fn test_known_digests() {
        assert_eq!(
            hash_bytes(b"abc", HashAlgorithm::Sha256),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(hash_bytes(b"123456789", HashAlgorithm::Crc32), "cbf43926");
        assert_eq!(hash_bytes(b"", HashAlgorithm::XxHash64).len(), 16);
    }

    #[test]
    fn test_sampled_hash_reads_three_windows() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("big.bin");
        let mut content = vec![7u8; 1000];
        fs::write(&path, &content).unwrap();

        let mode = HashMode::Sampled { sample_size: 10 };
        let sampled = hash_file(&path, HashAlgorithm::Blake3, mode).unwrap();

        let mut windows = Vec::new();
        windows.extend_from_slice(&content[0..10]);
        windows.extend_from_slice(&content[495..505]);
        windows.extend_from_slice(&content[990..1000]);
        assert_eq!(sampled, hash_bytes(&windows, HashAlgorithm::Blake3));

        // A change outside the windows is invisible to the sampled hash
        content[200] = 8;
        fs::write(&path, &content).unwrap();
        assert_eq!(hash_file(&path, HashAlgorithm::Blake3, mode).unwrap(), sampled);
        assert_ne!(
            hash_file(&path, HashAlgorithm::Blake3, HashMode::Full).unwrap(),
            hash_bytes(&[7u8; 1000], HashAlgorithm::Blake3)
        );
    }

    #[test]
    fn test_small_files_hash_in_full_when_sampling() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("small.bin");
        fs::write(&path, b"only thirty bytes of content!!").unwrap();

        let sampled = hash_file(&path, HashAlgorithm::Sha256, HashMode::Sampled { sample_size: 10 });
        let full = hash_file(&path, HashAlgorithm::Sha256, HashMode::Full);
        assert_eq!(sampled.unwrap(), full.unwrap());
    }

    #[test]
    fn test_huge_sample_size_hashes_in_full() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.bin");
        fs::write(&path, vec![3u8; 4096]).unwrap();

        let full = hash_file(&path, HashAlgorithm::XxHash64, HashMode::Full).unwrap();
        for sample_size in [u64::MAX, u64::MAX / 3 + 1, u64::MAX / 2] {
            let sampled = hash_file(&path, HashAlgorithm::XxHash64, HashMode::Sampled { sample_size });
            assert_eq!(sampled.unwrap(), full);
        }
    }

    #[test]
    fn test_parse_algorithm() {
        assert_eq!("BLAKE3".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Blake3));
        assert_eq!("xxhash64".parse::<HashAlgorithm>(), Ok(HashAlgorithm::XxHash64));
        assert!("md5".parse::<HashAlgorithm>().is_err());
    }
}
