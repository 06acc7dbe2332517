// file: src/repository/test_support.rs
// description: local bare remotes and seed clones for git-backed tests
// reference: https://docs.rs/git2

use git2::{IndexAddOption, Repository, RepositoryInitOptions, Signature};
use std::fs;
use std::path::{Path, PathBuf};

/// A bare `origin.git` with one commit on `main`, plus the seed clone used
/// to push "upstream" changes into it.
pub struct LocalRemote {
    pub bare: PathBuf,
    pub seed: PathBuf,
}

impl LocalRemote {
    pub fn create(dir: &Path) -> Self {
        let bare = dir.join("origin.git");
        let mut bare_opts = RepositoryInitOptions::new();
        bare_opts.bare(true).initial_head("main");
        Repository::init_opts(&bare, &bare_opts).unwrap();

        let seed = dir.join("seed");
        let mut seed_opts = RepositoryInitOptions::new();
        seed_opts.initial_head("main");
        let repo = Repository::init_opts(&seed, &seed_opts).unwrap();
        repo.remote("origin", bare.to_str().unwrap()).unwrap();

        let remote = Self { bare, seed };
        remote.push_upstream("README.md", "# Seed\n", "initial commit");
        remote
    }

    pub fn url(&self) -> String {
        self.bare.to_string_lossy().to_string()
    }

    /// Commits `content` at `path` in the seed and pushes it to `main`.
    pub fn push_upstream(&self, path: &str, content: &str, message: &str) {
        let repo = Repository::open(&self.seed).unwrap();
        let full = self.seed.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
        commit_all(&repo, message);

        let mut remote = repo.find_remote("origin").unwrap();
        remote
            .push(&["refs/heads/main:refs/heads/main"], None)
            .unwrap();
    }

    /// Creates `branch` on the remote pointing at the seed's `main`.
    pub fn push_branch(&self, branch: &str) {
        let repo = Repository::open(&self.seed).unwrap();
        let head = repo.head().unwrap().peel_to_commit().unwrap();
        repo.branch(branch, &head, true).unwrap();
        let refspec = format!("refs/heads/{0}:refs/heads/{0}", branch);
        repo.find_remote("origin")
            .unwrap()
            .push(&[refspec.as_str()], None)
            .unwrap();
    }

    pub fn remote_head_message(&self) -> String {
        let repo = Repository::open_bare(&self.bare).unwrap();
        let commit = repo
            .find_reference("refs/heads/main")
            .unwrap()
            .peel_to_commit()
            .unwrap();
        commit.message().unwrap_or_default().trim().to_string()
    }

    pub fn remote_file(&self, path: &str) -> Option<String> {
        let repo = Repository::open_bare(&self.bare).unwrap();
        let tree = repo
            .find_reference("refs/heads/main")
            .unwrap()
            .peel_to_tree()
            .unwrap();
        let entry = tree.get_path(Path::new(path)).ok()?;
        let blob = repo.find_blob(entry.id()).unwrap();
        Some(String::from_utf8_lossy(blob.content()).to_string())
    }
}

pub fn commit_all(repo: &Repository, message: &str) {
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now("Seed Author", "seed@example.com").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap();
}
