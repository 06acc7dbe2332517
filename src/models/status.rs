// file: src/models/status.rs
// description: working tree status partitions and the unified status view
// reference: internal data structures

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Modified,
    Added,
    Deleted,
    Renamed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub file: String,
    pub status: ChangeKind,
}

/// Working tree partitioned the way the editor consumes it.
///
/// `staged` holds every path with index changes and is only used to
/// de-duplicate untracked entries in [`WorkingTreeStatus::entries`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingTreeStatus {
    pub modified: Vec<String>,
    pub staged_added: Vec<String>,
    pub untracked: Vec<String>,
    pub deleted: Vec<String>,
    pub renamed: Vec<String>,
    pub staged: Vec<String>,
}

impl WorkingTreeStatus {
    pub fn entries(&self) -> Vec<StatusEntry> {
        let mut entries = Vec::new();

        let tag = |paths: &[String], status: ChangeKind, out: &mut Vec<StatusEntry>| {
            out.extend(paths.iter().map(|file| StatusEntry {
                file: file.clone(),
                status,
            }));
        };

        tag(&self.modified, ChangeKind::Modified, &mut entries);
        tag(&self.staged_added, ChangeKind::Added, &mut entries);

        let untracked: Vec<String> = self
            .untracked
            .iter()
            .filter(|path| !self.staged.contains(path) && !self.staged_added.contains(path))
            .cloned()
            .collect();
        tag(&untracked, ChangeKind::Added, &mut entries);

        tag(&self.deleted, ChangeKind::Deleted, &mut entries);
        tag(&self.renamed, ChangeKind::Renamed, &mut entries);

        entries
    }

    pub fn is_clean(&self) -> bool {
        self.entries().is_empty()
    }
}
