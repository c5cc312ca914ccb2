use std::path::PathBuf;

use serde::Serialize;

use super::resolve::KeepPolicy;
use crate::record::FileRecord;

/// Two or more files with the same size and content hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    pub content_hash: String,
    /// Size shared by every member
    pub file_size: u64,
    /// Always at least two members, ordered by path
    pub members: Vec<FileRecord>,
}

impl DuplicateGroup {
    /// Bytes freed by keeping a single member
    pub fn reclaimable_bytes(&self) -> u64 {
        self.file_size * self.duplicate_count()
    }

    /// Bytes occupied by all members together
    pub fn total_bytes(&self) -> u64 {
        self.file_size * self.members.len() as u64
    }

    /// Members beyond the one implicit keeper
    pub fn duplicate_count(&self) -> u64 {
        self.members.len().saturating_sub(1) as u64
    }
}

/// Result of a duplicate search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateReport {
    /// Largest total size first
    pub groups: Vec<DuplicateGroup>,
    /// Sum of `members - 1` over all groups
    pub total_duplicates: u64,
    /// Sum of `size * (members - 1)` over all groups
    pub potential_savings_bytes: u64,
    /// Input files considered, including skipped ones
    pub files_processed: u64,
    /// Files skipped because they could not be read or hashed
    pub errors: u64,
}

impl DuplicateReport {
    pub(crate) fn from_groups(mut groups: Vec<DuplicateGroup>, files_processed: u64, errors: u64) -> Self {
        groups.sort_by(|a, b| {
            b.total_bytes()
                .cmp(&a.total_bytes())
                .then_with(|| a.content_hash.cmp(&b.content_hash))
        });
        let total_duplicates = groups.iter().map(DuplicateGroup::duplicate_count).sum();
        let potential_savings_bytes = groups.iter().map(DuplicateGroup::reclaimable_bytes).sum();

        Self {
            groups,
            total_duplicates,
            potential_savings_bytes,
            files_processed,
            errors,
        }
    }

    /// Paths the policy would delete, across every group
    pub fn paths_to_remove(&self, policy: &KeepPolicy) -> Vec<PathBuf> {
        self.groups
            .iter()
            .flat_map(|g| g.files_to_remove(policy))
            .map(|r| r.path.clone())
            .collect()
    }
}
