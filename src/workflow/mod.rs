// file: src/workflow/mod.rs
// description: workflow module exports and public api
// reference: repository workflow orchestration

mod locks;
mod orchestrator;

pub use locks::RepositoryLocks;
pub use orchestrator::{CommitOutcome, SyncOrchestrator};
