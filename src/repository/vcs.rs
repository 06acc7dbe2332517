// file: src/repository/vcs.rs
// description: single working copy operations using git2
// reference: https://docs.rs/git2

use crate::error::{Result, SyncError};
use crate::models::WorkingTreeStatus;
use crate::repository::remote::AuthenticatedRemoteUrl;
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    BranchType, Cred, CredentialType, ErrorCode, FetchOptions, IndexAddOption, PushOptions,
    RebaseOptions, ReferenceType, RemoteCallbacks, Repository, Signature, Status, StatusOptions,
};
use serde::Serialize;
use std::cell::RefCell;
use std::path::Path;
use tracing::{debug, info, warn};

pub const DEFAULT_REMOTE: &str = "origin";

/// Author used when git has no configured identity for the working copy.
#[derive(Debug, Clone)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

/// What a rebase-pull did to the local branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum RebaseOutcome {
    UpToDate,
    FastForwarded,
    Rebased { commits: usize },
    /// The remote has no such branch yet (first push).
    NoUpstream,
    /// The pull failed for a reason other than a conflict; the push is
    /// still attempted.
    Skipped { reason: String },
}

pub struct WorkingCopy {
    repo: Repository,
}

impl WorkingCopy {
    pub fn open(path: &Path) -> Result<Self> {
        Repository::open(path)
            .map(|repo| Self { repo })
            .map_err(|e| match e.code() {
                ErrorCode::NotFound => {
                    SyncError::NotFound(format!("No working copy at {}", path.display()))
                }
                _ => e.into(),
            })
    }

    /// Clones into `dest`, which must not exist or be empty. Only the plain
    /// URL ends up in the clone's configuration.
    pub fn clone_into(auth: &AuthenticatedRemoteUrl, dest: &Path) -> Result<Self> {
        info!("Cloning repository from {}", auth);

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(remote_callbacks(auth));

        let mut builder = RepoBuilder::new();
        builder.fetch_options(fetch_options);

        let repo = builder
            .clone(auth.plain(), dest)
            .map_err(|e| SyncError::Vcs(auth.redact(&format!("Clone failed: {}", e.message()))))?;

        info!("Repository cloned successfully");
        Ok(Self { repo })
    }

    #[cfg(test)]
    pub(crate) fn path(&self) -> std::path::PathBuf {
        self.repo
            .workdir()
            .unwrap_or_else(|| self.repo.path())
            .to_path_buf()
    }

    /// Remote-tracking branch names without the remote prefix, excluding
    /// the symbolic `HEAD`.
    pub fn remote_branches(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();

        for branch in self.repo.branches(Some(BranchType::Remote))? {
            let (branch, _) = branch?;
            if branch.get().kind() == Some(ReferenceType::Symbolic) {
                continue;
            }

            let Some(name) = branch.name()? else {
                continue;
            };
            let short = name.split_once('/').map(|(_, rest)| rest).unwrap_or(name);
            if short == "HEAD" {
                continue;
            }

            names.push(short.to_string());
        }

        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Checks out `branch`, creating a tracking branch from the remote when
    /// there is no local one yet.
    pub fn checkout(&self, branch: &str) -> Result<()> {
        let local = match self.repo.find_branch(branch, BranchType::Local) {
            Ok(local) => local,
            Err(e) if e.code() == ErrorCode::NotFound => {
                let remote_name = format!("{}/{}", DEFAULT_REMOTE, branch);
                let remote = self
                    .repo
                    .find_branch(&remote_name, BranchType::Remote)
                    .map_err(|_| SyncError::NotFound(format!("Branch {} not found", branch)))?;
                let commit = remote.get().peel_to_commit()?;
                let mut local = self.repo.branch(branch, &commit, false)?;
                local.set_upstream(Some(&remote_name))?;
                debug!("Created local branch {} tracking {}", branch, remote_name);
                local
            }
            Err(e) => return Err(e.into()),
        };

        let refname = local
            .get()
            .name()
            .ok_or_else(|| SyncError::Vcs(format!("Branch {} has a non-UTF-8 name", branch)))?
            .to_string();
        let target = local.get().peel_to_commit()?;

        let mut checkout = CheckoutBuilder::new();
        checkout.safe();
        self.repo
            .checkout_tree(target.as_object(), Some(&mut checkout))?;
        self.repo.set_head(&refname)?;

        info!("Switched to branch: {}", branch);
        Ok(())
    }

    pub fn status(&self) -> Result<WorkingTreeStatus> {
        let mut options = StatusOptions::new();
        options
            .include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false)
            .renames_head_to_index(true);

        let statuses = self.repo.statuses(Some(&mut options))?;
        let mut status = WorkingTreeStatus::default();

        let staged_mask = Status::INDEX_NEW
            | Status::INDEX_MODIFIED
            | Status::INDEX_DELETED
            | Status::INDEX_RENAMED
            | Status::INDEX_TYPECHANGE;

        for entry in statuses.iter() {
            let flags = entry.status();

            let renamed_to = entry
                .head_to_index()
                .and_then(|delta| delta.new_file().path())
                .map(|p| p.to_string_lossy().replace('\\', "/"));
            let Some(path) = entry.path().map(str::to_string).or(renamed_to.clone()) else {
                continue;
            };

            if flags.intersects(staged_mask) {
                status.staged.push(path.clone());
            }

            if flags.intersects(Status::INDEX_RENAMED | Status::WT_RENAMED) {
                status.renamed.push(renamed_to.unwrap_or(path));
            } else if flags.contains(Status::INDEX_NEW) {
                status.staged_added.push(path);
            } else if flags.contains(Status::WT_NEW) {
                status.untracked.push(path);
            } else if flags.intersects(Status::INDEX_DELETED | Status::WT_DELETED) {
                status.deleted.push(path);
            } else if flags.intersects(
                Status::INDEX_MODIFIED
                    | Status::WT_MODIFIED
                    | Status::INDEX_TYPECHANGE
                    | Status::WT_TYPECHANGE
                    | Status::CONFLICTED,
            ) {
                status.modified.push(path);
            }
        }

        Ok(status)
    }

    /// Stages additions, modifications and deletions.
    pub fn add_all(&self) -> Result<()> {
        let mut index = self.repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;
        Ok(())
    }

    /// Commits the index onto `HEAD` and returns the new commit id.
    pub fn commit(&self, message: &str, author: &CommitAuthor) -> Result<String> {
        let mut index = self.repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;

        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => None,
            Err(e) => return Err(e.into()),
        };
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        let sig = self.signature(author)?;
        let commit_id = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;

        let id = commit_id.to_string();
        info!("Created commit: {} - {}", &id[..7], message);
        Ok(id)
    }

    /// Replaces the named remote with one pointing at `url`.
    pub fn set_remote(&self, name: &str, url: &str) -> Result<()> {
        match self.repo.remote_delete(name) {
            Ok(()) => {}
            Err(e) if e.code() == ErrorCode::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        self.repo.remote(name, url)?;
        debug!("Set remote {} to {}", name, url);
        Ok(())
    }

    /// Fetches `branch` from `remote` and replays local commits on top of it.
    ///
    /// A conflicting rebase is aborted, leaving the local branch where it
    /// was, and reported as [`SyncError::RebaseConflict`].
    pub fn pull_rebase(
        &self,
        remote: &str,
        branch: &str,
        auth: &AuthenticatedRemoteUrl,
        author: &CommitAuthor,
    ) -> Result<RebaseOutcome> {
        let mut remote_handle = self.repo.find_remote(remote)?;

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(remote_callbacks(auth));

        let refspec = format!("+refs/heads/{0}:refs/remotes/{1}/{0}", branch, remote);
        info!("Fetching {} from {}", branch, remote);
        remote_handle
            .fetch(&[refspec.as_str()], Some(&mut fetch_options), None)
            .map_err(|e| SyncError::Vcs(auth.redact(&format!("Fetch failed: {}", e.message()))))?;

        let tracking = format!("refs/remotes/{}/{}", remote, branch);
        let upstream_ref = match self.repo.find_reference(&tracking) {
            Ok(reference) => reference,
            Err(e) if e.code() == ErrorCode::NotFound => {
                info!("Remote has no branch {} yet", branch);
                return Ok(RebaseOutcome::NoUpstream);
            }
            Err(e) => return Err(e.into()),
        };
        let upstream = self.repo.reference_to_annotated_commit(&upstream_ref)?;

        let (analysis, _) = self.repo.merge_analysis(&[&upstream])?;

        if analysis.is_up_to_date() {
            info!("Repository is up to date");
            return Ok(RebaseOutcome::UpToDate);
        }

        if analysis.is_fast_forward() || analysis.is_unborn() {
            info!("Fast-forward to {}/{}", remote, branch);
            let refname = format!("refs/heads/{}", branch);
            match self.repo.find_reference(&refname) {
                Ok(mut reference) => {
                    reference.set_target(upstream.id(), "pull: fast-forward")?;
                }
                Err(e) if e.code() == ErrorCode::NotFound => {
                    self.repo
                        .reference(&refname, upstream.id(), true, "pull: fast-forward")?;
                }
                Err(e) => return Err(e.into()),
            }
            self.repo.set_head(&refname)?;
            self.repo
                .checkout_head(Some(CheckoutBuilder::default().force()))?;
            return Ok(RebaseOutcome::FastForwarded);
        }

        let sig = self.signature(author)?;
        let mut options = RebaseOptions::new();
        let mut rebase = self
            .repo
            .rebase(None, Some(&upstream), None, Some(&mut options))?;

        let mut applied = 0;
        while let Some(operation) = rebase.next() {
            if let Err(e) = operation {
                abort_rebase(&mut rebase);
                return Err(match e.code() {
                    ErrorCode::Conflict | ErrorCode::MergeConflict | ErrorCode::Unmerged => {
                        SyncError::RebaseConflict {
                            branch: branch.to_string(),
                        }
                    }
                    _ => e.into(),
                });
            }

            if self.repo.index()?.has_conflicts() {
                warn!("Rebase onto {}/{} produced conflicts, aborting", remote, branch);
                rebase.abort()?;
                return Err(SyncError::RebaseConflict {
                    branch: branch.to_string(),
                });
            }

            match rebase.commit(None, &sig, None) {
                Ok(_) => applied += 1,
                Err(e) if e.code() == ErrorCode::Applied => {
                    debug!("Patch already present upstream, skipping");
                }
                Err(e) => {
                    abort_rebase(&mut rebase);
                    return Err(e.into());
                }
            }
        }

        rebase.finish(Some(&sig))?;
        info!("Rebased {} local commit(s) onto {}/{}", applied, remote, branch);
        Ok(RebaseOutcome::Rebased { commits: applied })
    }

    /// Pushes `branch` to the same name on `remote`. Refs rejected by the
    /// server are errors even though the transport succeeded.
    pub fn push(&self, remote: &str, branch: &str, auth: &AuthenticatedRemoteUrl) -> Result<()> {
        let mut remote_handle = self.repo.find_remote(remote)?;
        let rejected: RefCell<Option<String>> = RefCell::new(None);

        let mut callbacks = remote_callbacks(auth);
        callbacks.push_update_reference(|refname, status| {
            if let Some(message) = status {
                *rejected.borrow_mut() = Some(format!("{} rejected: {}", refname, message));
            }
            Ok(())
        });

        let mut push_options = PushOptions::new();
        push_options.remote_callbacks(callbacks);

        let refspec = format!("refs/heads/{0}:refs/heads/{0}", branch);
        remote_handle
            .push(&[refspec.as_str()], Some(&mut push_options))
            .map_err(|e| SyncError::Vcs(auth.redact(&format!("Push failed: {}", e.message()))))?;
        drop(push_options);

        if let Some(message) = rejected.into_inner() {
            return Err(SyncError::Vcs(auth.redact(&format!("Push failed: {}", message))));
        }

        info!("Pushed {} to {}", branch, remote);
        Ok(())
    }

    /// Current branch name, also for a fresh clone of an empty repository.
    pub fn current_branch(&self) -> Result<String> {
        match self.repo.head() {
            Ok(head) if head.is_branch() => head
                .shorthand()
                .map(str::to_string)
                .ok_or_else(|| SyncError::Vcs("Branch name is not valid UTF-8".to_string())),
            Ok(_) => Err(SyncError::InvalidArgument(
                "HEAD is detached; switch to a branch first".to_string(),
            )),
            Err(e) if e.code() == ErrorCode::UnbornBranch => {
                let head = self.repo.find_reference("HEAD")?;
                let target = head
                    .symbolic_target()
                    .ok_or_else(|| SyncError::Vcs("HEAD is not symbolic".to_string()))?;
                Ok(target.strip_prefix("refs/heads/").unwrap_or(target).to_string())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn head_commit(&self) -> Result<String> {
        let commit = self.repo.head()?.peel_to_commit()?;
        Ok(commit.id().to_string())
    }

    fn signature(&self, author: &CommitAuthor) -> Result<Signature<'static>> {
        if let Ok(sig) = self.repo.signature() {
            return Ok(sig);
        }
        Ok(Signature::now(&author.name, &author.email)?)
    }
}

/// Best-effort abort on an error path that is already being reported.
fn abort_rebase(rebase: &mut git2::Rebase<'_>) {
    if let Err(e) = rebase.abort() {
        warn!("Failed to abort rebase, working copy may be mid-rebase: {}", e.message());
    }
}

/// Offers the token once per operation; a second request means the remote
/// rejected it, and failing here stops libgit2 from asking forever.
fn remote_callbacks(auth: &AuthenticatedRemoteUrl) -> RemoteCallbacks<'_> {
    let mut callbacks = RemoteCallbacks::new();
    let mut attempts = 0;

    callbacks.credentials(move |_url, _username_from_url, allowed_types| {
        attempts += 1;
        match auth.credentials() {
            Some((username, password))
                if attempts == 1 && allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) =>
            {
                Cred::userpass_plaintext(username, password)
            }
            Some(_) => Err(git2::Error::from_str("authentication failed: access token rejected")),
            None => Err(git2::Error::from_str("remote requires authentication")),
        }
    });

    callbacks.transfer_progress(|stats| {
        if stats.received_objects() == stats.total_objects() {
            debug!(
                "Resolving deltas {}/{}",
                stats.indexed_deltas(),
                stats.total_deltas()
            );
        } else if stats.total_objects() > 0 {
            debug!(
                "Received {}/{} objects",
                stats.received_objects(),
                stats.total_objects()
            );
        }
        true
    });

    callbacks
}
