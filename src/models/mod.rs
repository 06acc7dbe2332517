// file: src/models/mod.rs
// description: data models module exports
// reference: internal module structure

pub mod entry;
pub mod handle;
pub mod status;

pub use entry::{EntryKind, FileEntry};
pub use handle::{CommitRequest, Provider, RepositoryHandle, SyncRequest};
pub use status::{ChangeKind, StatusEntry, WorkingTreeStatus};
