//! Duplicate detection: size buckets, then content hashes, then groups.

mod finder;
mod group;
mod resolve;

pub use finder::{
    DuplicateFinder, DuplicateMessage, DuplicateOptions, DuplicateProgress, DuplicateSource,
};
pub use group::{DuplicateGroup, DuplicateReport};
pub use resolve::KeepPolicy;
