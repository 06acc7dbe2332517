// file: src/repository/mod.rs
// description: Repository operations module exports
// reference: Internal module structure

pub mod identity;
pub mod remote;
pub mod scanner;
pub mod vcs;
pub mod workspace;

#[cfg(test)]
pub(crate) mod test_support;

pub use identity::IdentityResolver;
pub use remote::{AuthenticatedRemoteUrl, repo_name_from_url};
pub use scanner::TreeScanner;
pub use vcs::{CommitAuthor, DEFAULT_REMOTE, RebaseOutcome, WorkingCopy};
pub use workspace::RepositoryFiles;
