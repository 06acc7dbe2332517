// file: src/workflow/orchestrator.rs
// description: coordinates sync, commit-and-push and file operations per working copy
// reference: orchestrates repository workflows for the http layer

use crate::config::{Config, GitConfig};
use crate::error::{Result, SyncError};
use crate::models::{
    CommitRequest, FileEntry, RepositoryHandle, StatusEntry, SyncRequest, entry::image_content_type,
};
use crate::repository::{
    AuthenticatedRemoteUrl, CommitAuthor, DEFAULT_REMOTE, IdentityResolver, RebaseOutcome,
    RepositoryFiles, WorkingCopy, repo_name_from_url,
};
use crate::utils::{HealthCheck, HealthReport, OperationTimer, Validator};
use crate::workflow::locks::RepositoryLocks;
use chrono::Utc;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::sync::OwnedMutexGuard;
use tracing::{info, warn};

const UPLOAD_DIR: &str = ".uploads";
const SLOW_REMOTE_OPERATION: Duration = Duration::from_secs(30);

/// Result of the commit workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum CommitOutcome {
    NoChanges,
    Pushed {
        branch: String,
        commit: String,
        rebase: RebaseOutcome,
    },
}

/// Owns the storage layout `<root>/<identity>/<repo>` and runs every
/// workflow against it.
pub struct SyncOrchestrator {
    storage_root: PathBuf,
    identity: IdentityResolver,
    git: GitConfig,
    locks: RepositoryLocks,
}

impl SyncOrchestrator {
    pub fn new(storage_root: PathBuf, identity: IdentityResolver, git: GitConfig) -> Self {
        Self {
            storage_root,
            identity,
            git,
            locks: RepositoryLocks::new(),
        }
    }

    pub fn from_config(config: &Config, identity: IdentityResolver) -> Result<Self> {
        Ok(Self::new(
            config.storage_root()?,
            identity,
            config.git.clone(),
        ))
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    /// Sanitized identity for the current caller.
    pub fn identity(&self) -> String {
        self.identity.resolve()
    }

    /// Probes storage writability and, when identity comes from git, whether
    /// a global `user.name` is configured.
    pub async fn health(&self) -> Result<HealthReport> {
        let root = self.storage_root.clone();
        let resolver = self.identity.clone();

        run_blocking(move || {
            let identity = resolver.resolve();
            let mut checks = vec![HealthCheck::probe_storage(&root)];
            if let IdentityResolver::GitConfig { .. } = resolver {
                checks.push(HealthCheck::probe_identity(&identity, &resolver.fallback()));
            }
            Ok(HealthReport::new(checks, &root, identity))
        })
        .await
    }

    fn upload_dir(&self) -> PathBuf {
        self.storage_root.join(UPLOAD_DIR)
    }

    fn author(&self, identity: &str) -> CommitAuthor {
        CommitAuthor {
            name: identity.to_string(),
            email: format!("{}@{}", identity, self.git.author_email_domain),
        }
    }

    /// Clones `repo_url` into the caller's namespace, replacing any existing
    /// working copy of the same name.
    pub async fn sync(&self, request: &SyncRequest) -> Result<RepositoryHandle> {
        let token = request.token().ok_or(SyncError::AuthRequired)?;
        let name = repo_name_from_url(&request.repo_url)?;
        let auth = AuthenticatedRemoteUrl::new(&request.repo_url, request.provider, token)?;

        let identity = self.identity();
        let _guard = self.locks.acquire(&identity, &name).await;
        let timer = OperationTimer::new(&format!("sync {}/{}", identity, name));

        let path = self.storage_root.join(&identity).join(&name);
        let dest = path.clone();

        run_blocking(move || {
            if dest.exists() {
                info!("Removing existing working copy at {}", dest.display());
                std::fs::remove_dir_all(&dest).map_err(|e| SyncError::from_io(&dest, e))?;
            }
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent).map_err(|e| SyncError::from_io(parent, e))?;
            }

            match WorkingCopy::clone_into(&auth, &dest) {
                Ok(_) => Ok(()),
                Err(e) => {
                    if dest.exists()
                        && let Err(cleanup) = std::fs::remove_dir_all(&dest)
                    {
                        warn!("Failed to remove partial clone: {}", cleanup);
                    }
                    Err(e)
                }
            }
        })
        .await?;

        timer.finish(SLOW_REMOTE_OPERATION);

        Ok(RepositoryHandle {
            identity,
            name,
            path,
            synced_at: Utc::now(),
        })
    }

    /// Stages everything, commits, rebases onto the remote branch and pushes.
    /// A clean working tree is reported without touching the repository.
    pub async fn commit_and_push(
        &self,
        repo: &str,
        request: &CommitRequest,
    ) -> Result<CommitOutcome> {
        let (_guard, identity, path) = self.locked_repo(repo).await?;
        let auth = AuthenticatedRemoteUrl::new(&request.repo_url, request.provider, &request.token)?;
        let message = request
            .message_or(&self.git.default_commit_message)
            .to_string();
        let author = self.author(&identity);

        let timer = OperationTimer::new(&format!("commit {}/{}", identity, repo));

        run_blocking(move || {
            let wc = WorkingCopy::open(&path)?;

            timer.stage("checking status");
            if wc.status()?.is_clean() {
                info!("No changes to commit in {}", path.display());
                return Ok(CommitOutcome::NoChanges);
            }

            if let Err(e) = wc.set_remote(DEFAULT_REMOTE, auth.plain()) {
                warn!("Could not update remote {}: {}", DEFAULT_REMOTE, e);
            }

            let branch = wc.current_branch()?;
            timer.stage("committing");
            wc.add_all()?;
            wc.commit(&message, &author)?;

            timer.stage("rebasing");
            let rebase = match wc.pull_rebase(DEFAULT_REMOTE, &branch, &auth, &author) {
                Ok(outcome) => outcome,
                Err(e @ SyncError::RebaseConflict { .. }) => return Err(e),
                Err(e) => {
                    warn!("Pull before push failed, pushing anyway: {}", e);
                    RebaseOutcome::Skipped {
                        reason: e.to_string(),
                    }
                }
            };

            timer.stage("pushing");
            wc.push(DEFAULT_REMOTE, &branch, &auth)?;
            let commit = wc.head_commit()?;
            timer.finish(SLOW_REMOTE_OPERATION);

            Ok(CommitOutcome::Pushed {
                branch,
                commit,
                rebase,
            })
        })
        .await
    }

    pub async fn branches(&self, repo: &str) -> Result<Vec<String>> {
        let path = self.existing_repo(repo).await?;
        run_blocking(move || WorkingCopy::open(&path)?.remote_branches()).await
    }

    pub async fn status(&self, repo: &str) -> Result<Vec<StatusEntry>> {
        let path = self.existing_repo(repo).await?;
        run_blocking(move || Ok(WorkingCopy::open(&path)?.status()?.entries())).await
    }

    pub async fn switch_branch(&self, repo: &str, branch: &str) -> Result<()> {
        let branch = branch.trim();
        if branch.is_empty() {
            return Err(SyncError::InvalidArgument("Branch name is required".to_string()));
        }

        let (_guard, _, path) = self.locked_repo(repo).await?;

        let branch = branch.to_string();
        run_blocking(move || WorkingCopy::open(&path)?.checkout(&branch)).await
    }

    pub async fn list_files(&self, repo: &str) -> Result<Vec<FileEntry>> {
        let files = self.files(repo).await?;
        files.list_tree().await
    }

    pub async fn read_file(&self, repo: &str, rel_path: &str) -> Result<String> {
        let files = self.files(repo).await?;
        files.read_file(rel_path).await
    }

    /// Image bytes plus the content type derived from the extension.
    pub async fn read_image(&self, repo: &str, rel_path: &str) -> Result<(Vec<u8>, &'static str)> {
        let files = self.files(repo).await?;
        let bytes = files.read_bytes(rel_path).await?;
        Ok((bytes, image_content_type(Path::new(rel_path))))
    }

    pub async fn write_file(&self, repo: &str, rel_path: &str, content: &str) -> Result<()> {
        let (_guard, files) = self.locked_files(repo).await?;
        files.write_file(rel_path, content).await
    }

    pub async fn create_file(&self, repo: &str, rel_path: &str, content: &str) -> Result<()> {
        let (_guard, files) = self.locked_files(repo).await?;
        files.create_file(rel_path, content).await
    }

    pub async fn delete_file(&self, repo: &str, rel_path: &str) -> Result<()> {
        let (_guard, files) = self.locked_files(repo).await?;
        files.delete_file(rel_path).await
    }

    pub async fn create_folder(&self, repo: &str, rel_path: &str) -> Result<()> {
        let (_guard, files) = self.locked_files(repo).await?;
        files.create_folder(rel_path).await
    }

    pub async fn delete_folder(&self, repo: &str, rel_path: &str) -> Result<()> {
        let (_guard, files) = self.locked_files(repo).await?;
        files.delete_folder(rel_path).await
    }

    /// Writes `bytes` to a scratch file under the storage root, then moves it
    /// to `rel_dir/original_name`. Returns the stored file name.
    pub async fn store_upload(
        &self,
        repo: &str,
        rel_dir: &str,
        original_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String> {
        let upload_dir = self.upload_dir();

        let upload = run_blocking(move || {
            std::fs::create_dir_all(&upload_dir).map_err(|e| SyncError::from_io(&upload_dir, e))?;
            let mut upload =
                NamedTempFile::new_in(&upload_dir).map_err(|e| SyncError::from_io(&upload_dir, e))?;
            let scratch = upload.path().to_path_buf();
            upload
                .write_all(&bytes)
                .and_then(|_| upload.flush())
                .map_err(|e| SyncError::from_io(&scratch, e))?;
            Ok(upload)
        })
        .await?;

        let (_guard, files) = self.locked_files(repo).await?;
        files.store_upload(rel_dir, upload, original_name).await
    }

    async fn files(&self, repo: &str) -> Result<RepositoryFiles> {
        let path = self.existing_repo(repo).await?;
        Ok(RepositoryFiles::new(path))
    }

    async fn locked_files(&self, repo: &str) -> Result<(OwnedMutexGuard<()>, RepositoryFiles)> {
        let (guard, _, path) = self.locked_repo(repo).await?;
        Ok((guard, RepositoryFiles::new(path)))
    }

    /// Path of a previously synced working copy.
    async fn existing_repo(&self, repo: &str) -> Result<PathBuf> {
        let (_, path) = self.repo_path(repo)?;
        ensure_synced(repo, &path).await?;
        Ok(path)
    }

    /// Holds the repository lock before checking that the copy exists.
    async fn locked_repo(&self, repo: &str) -> Result<(OwnedMutexGuard<()>, String, PathBuf)> {
        let (identity, path) = self.repo_path(repo)?;
        let guard = self.locks.acquire(&identity, repo).await;
        ensure_synced(repo, &path).await?;
        Ok((guard, identity, path))
    }

    fn repo_path(&self, repo: &str) -> Result<(String, PathBuf)> {
        Validator::validate_repo_name(repo)?;
        let identity = self.identity();
        let path = self.storage_root.join(&identity).join(repo);
        Ok((identity, path))
    }
}

async fn ensure_synced(repo: &str, path: &Path) -> Result<()> {
    match tokio::fs::metadata(path.join(".git")).await {
        Ok(_) => Ok(()),
        Err(_) => Err(SyncError::NotFound(format!(
            "Repository {} has not been synced",
            repo
        ))),
    }
}

async fn run_blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task).await?
}
