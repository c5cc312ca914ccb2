use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::DuplicateGroup;
use crate::record::FileRecord;

/// Which members of a duplicate group survive a cleanup
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum KeepPolicy {
    /// Keep the most recently modified member
    #[default]
    Newest,
    /// Keep the least recently modified member
    Oldest,
    /// Remove every member
    KeepNone,
    /// Remove nothing
    KeepAll,
    /// Keep exactly this member
    Specific(PathBuf),
}

impl FromStr for KeepPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "newest" => Ok(KeepPolicy::Newest),
            "oldest" => Ok(KeepPolicy::Oldest),
            "none" => Ok(KeepPolicy::KeepNone),
            "all" => Ok(KeepPolicy::KeepAll),
            other => Err(format!(
                "unknown keep policy '{other}' (expected newest, oldest, none or all)"
            )),
        }
    }
}

impl fmt::Display for KeepPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeepPolicy::Newest => f.write_str("newest"),
            KeepPolicy::Oldest => f.write_str("oldest"),
            KeepPolicy::KeepNone => f.write_str("none"),
            KeepPolicy::KeepAll => f.write_str("all"),
            KeepPolicy::Specific(path) => write!(f, "{}", path.display()),
        }
    }
}

impl DuplicateGroup {
    /// Members the policy selects for deletion. Ordering is by modification
    /// time; members without one count as oldest and ties keep the first.
    /// A `Specific` path that is not a member selects nothing.
    pub fn files_to_remove(&self, policy: &KeepPolicy) -> Vec<&FileRecord> {
        let keeper = match policy {
            KeepPolicy::KeepAll => return Vec::new(),
            KeepPolicy::KeepNone => return self.members.iter().collect(),
            KeepPolicy::Newest => self
                .members
                .iter()
                .enumerate()
                .max_by(|(ia, a), (ib, b)| a.modified_at.cmp(&b.modified_at).then(ib.cmp(ia)))
                .map(|(i, _)| i),
            KeepPolicy::Oldest => self
                .members
                .iter()
                .enumerate()
                .min_by(|(ia, a), (ib, b)| a.modified_at.cmp(&b.modified_at).then(ia.cmp(ib)))
                .map(|(i, _)| i),
            KeepPolicy::Specific(path) => match self.members.iter().position(|m| &m.path == path) {
                Some(i) => Some(i),
                None => return Vec::new(),
            },
        };

        self.members
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != keeper)
            .map(|(_, m)| m)
            .collect()
    }
}
