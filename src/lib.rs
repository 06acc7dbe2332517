// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod server;
pub mod utils;
pub mod workflow;

pub use config::{Config, GitConfig, ServerConfig, StorageConfig};
pub use error::{Result, SyncError};
pub use models::{
    ChangeKind, CommitRequest, EntryKind, FileEntry, Provider, RepositoryHandle, StatusEntry,
    SyncRequest, WorkingTreeStatus,
};
pub use repository::{
    AuthenticatedRemoteUrl, IdentityResolver, RebaseOutcome, RepositoryFiles, TreeScanner,
    WorkingCopy,
};
pub use server::AppState;
pub use utils::{HealthCheck, HealthReport, HealthStatus, OperationTimer, Validator};
pub use workflow::{CommitOutcome, RepositoryLocks, SyncOrchestrator};
