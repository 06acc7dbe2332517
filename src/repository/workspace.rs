// file: src/repository/workspace.rs
// description: markdown and image file operations scoped to one working copy
// reference: https://docs.rs/tokio/latest/tokio/fs

use crate::error::{Result, SyncError};
use crate::models::FileEntry;
use crate::repository::scanner::TreeScanner;
use crate::utils::Validator;
use std::io::ErrorKind;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Filesystem access beneath a repository root. Every request path goes
/// through [`Validator`] and a containment check before touching disk.
#[derive(Debug, Clone)]
pub struct RepositoryFiles {
    root: PathBuf,
}

impl RepositoryFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn list_tree(&self) -> Result<Vec<FileEntry>> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || TreeScanner::list_tree(&root)).await?
    }

    pub async fn read_file(&self, rel_path: &str) -> Result<String> {
        let path = self.resolve(rel_path).await?;
        fs::read_to_string(&path)
            .await
            .map_err(|e| SyncError::from_io(rel_path, e))
    }

    pub async fn read_bytes(&self, rel_path: &str) -> Result<Vec<u8>> {
        let path = self.resolve(rel_path).await?;
        fs::read(&path)
            .await
            .map_err(|e| SyncError::from_io(rel_path, e))
    }

    /// Overwrites unconditionally. Missing parent folders are an error.
    pub async fn write_file(&self, rel_path: &str, content: &str) -> Result<()> {
        let path = self.resolve(rel_path).await?;
        fs::write(&path, content)
            .await
            .map_err(|e| SyncError::from_io(rel_path, e))?;
        debug!("Wrote {} bytes to {}", content.len(), rel_path);
        Ok(())
    }

    /// Creates a new file, making parent folders as needed. Never overwrites.
    pub async fn create_file(&self, rel_path: &str, content: &str) -> Result<()> {
        let path = self.resolve(rel_path).await?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::from_io(rel_path, e))?;
        }

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => SyncError::AlreadyExists(rel_path.to_string()),
                _ => SyncError::from_io(rel_path, e),
            })?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| SyncError::from_io(rel_path, e))?;
        file.flush()
            .await
            .map_err(|e| SyncError::from_io(rel_path, e))?;

        info!("Created file {}", rel_path);
        Ok(())
    }

    pub async fn delete_file(&self, rel_path: &str) -> Result<()> {
        let path = self.resolve(rel_path).await?;
        let metadata = fs::symlink_metadata(&path)
            .await
            .map_err(|e| SyncError::from_io(rel_path, e))?;

        if metadata.is_dir() {
            return Err(SyncError::InvalidArgument(format!(
                "{} is a folder",
                rel_path
            )));
        }

        fs::remove_file(&path)
            .await
            .map_err(|e| SyncError::from_io(rel_path, e))?;
        info!("Deleted file {}", rel_path);
        Ok(())
    }

    pub async fn create_folder(&self, rel_path: &str) -> Result<()> {
        let path = self.resolve(rel_path).await?;

        if fs::symlink_metadata(&path).await.is_ok() {
            return Err(SyncError::AlreadyExists(rel_path.to_string()));
        }

        fs::create_dir_all(&path)
            .await
            .map_err(|e| SyncError::from_io(rel_path, e))?;
        info!("Created folder {}", rel_path);
        Ok(())
    }

    /// Removes a folder and everything below it.
    pub async fn delete_folder(&self, rel_path: &str) -> Result<()> {
        let path = self.resolve(rel_path).await?;
        let metadata = fs::symlink_metadata(&path)
            .await
            .map_err(|e| SyncError::from_io(rel_path, e))?;

        if !metadata.is_dir() {
            return Err(SyncError::InvalidArgument(format!(
                "{} is not a folder",
                rel_path
            )));
        }

        fs::remove_dir_all(&path)
            .await
            .map_err(|e| SyncError::from_io(rel_path, e))?;
        info!("Deleted folder {}", rel_path);
        Ok(())
    }

    /// Moves a received upload to `rel_dir/original_name` without replacing
    /// an existing file. The temp file is removed on every failure path.
    pub async fn store_upload(
        &self,
        rel_dir: &str,
        upload: NamedTempFile,
        original_name: &str,
    ) -> Result<String> {
        let file_name = Validator::upload_file_name(original_name)?;
        let dir = Validator::normalize_relative_path(rel_dir)?;
        let rel_path = if dir.is_empty() {
            file_name.clone()
        } else {
            format!("{}/{}", dir, file_name)
        };

        let target = self.resolve(&rel_path).await?;
        let display = rel_path.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| SyncError::from_io(&display, e))?;
            }

            upload.persist_noclobber(&target).map_err(|e| match e.error.kind() {
                ErrorKind::AlreadyExists => SyncError::AlreadyExists(display.clone()),
                _ => SyncError::from_io(&display, e.error),
            })?;
            Ok(())
        })
        .await??;

        info!("Stored upload {}", rel_path);
        Ok(file_name)
    }

    /// Validates `rel_path` and checks the nearest existing ancestor stays
    /// inside the root once symlinks are resolved.
    async fn resolve(&self, rel_path: &str) -> Result<PathBuf> {
        let normalized = Validator::validate_target_path(rel_path)?;
        let path = self.root.join(&normalized);

        let root = fs::canonicalize(&self.root)
            .await
            .map_err(|e| SyncError::from_io(&self.root, e))?;

        let mut probe = path.clone();
        loop {
            let canonical = fs::canonicalize(&probe).await;
            match canonical {
                Ok(real) if real.starts_with(&root) => return Ok(path),
                Ok(_) => {
                    return Err(SyncError::InvalidArgument(format!(
                        "{} resolves outside the repository",
                        rel_path
                    )));
                }
                Err(e) => {
                    if !probe.pop() {
                        return Err(SyncError::from_io(rel_path, e));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;

    fn files(temp: &TempDir) -> RepositoryFiles {
        RepositoryFiles::new(temp.path())
    }

    fn upload_with(temp_dir: &Path, bytes: &[u8]) -> NamedTempFile {
        let mut upload = NamedTempFile::new_in(temp_dir).unwrap();
        upload.write_all(bytes).unwrap();
        upload
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let files = files(&temp);

        files.write_file("note.md", "# Hi").await.unwrap();
        assert_eq!(files.read_file("note.md").await.unwrap(), "# Hi");

        files.write_file("note.md", "# Bye").await.unwrap();
        assert_eq!(files.read_file("note.md").await.unwrap(), "# Bye");
    }

    #[tokio::test]
    async fn test_write_does_not_create_parents() {
        let temp = TempDir::new().unwrap();
        let result = files(&temp).write_file("missing/dir/a.md", "x").await;
        assert!(result.is_err());
        assert!(!temp.path().join("missing").exists());
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            files(&temp).read_file("nope.md").await,
            Err(SyncError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_file_never_overwrites() {
        let temp = TempDir::new().unwrap();
        let files = files(&temp);

        files.create_file("docs/new.md", "first").await.unwrap();
        assert_eq!(files.read_file("docs/new.md").await.unwrap(), "first");

        let err = files.create_file("docs/new.md", "second").await.unwrap_err();
        assert!(matches!(err, SyncError::AlreadyExists(_)));
        assert_eq!(files.read_file("docs/new.md").await.unwrap(), "first");
    }

    #[tokio::test]
    async fn test_delete_file_cases() {
        let temp = TempDir::new().unwrap();
        let files = files(&temp);
        std::fs::create_dir(temp.path().join("folder")).unwrap();
        std::fs::write(temp.path().join("a.md"), "x").unwrap();

        assert!(matches!(
            files.delete_file("missing.md").await,
            Err(SyncError::NotFound(_))
        ));
        assert!(matches!(
            files.delete_file("folder").await,
            Err(SyncError::InvalidArgument(_))
        ));
        files.delete_file("a.md").await.unwrap();
        assert!(!temp.path().join("a.md").exists());
    }

    #[tokio::test]
    async fn test_folder_lifecycle() {
        let temp = TempDir::new().unwrap();
        let files = files(&temp);

        files.create_folder("assets/icons").await.unwrap();
        assert!(temp.path().join("assets/icons").is_dir());
        assert!(matches!(
            files.create_folder("assets").await,
            Err(SyncError::AlreadyExists(_))
        ));

        std::fs::write(temp.path().join("assets/icons/a.svg"), "<svg/>").unwrap();
        files.delete_folder("assets").await.unwrap();
        assert!(!temp.path().join("assets").exists());

        assert!(matches!(
            files.delete_folder("assets").await,
            Err(SyncError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_folder_on_file_is_rejected() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("keep.md"), "x").unwrap();

        assert!(matches!(
            files(&temp).delete_folder("keep.md").await,
            Err(SyncError::InvalidArgument(_))
        ));
        assert!(temp.path().join("keep.md").exists());
    }

    #[tokio::test]
    async fn test_traversal_is_rejected() {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("repo");
        std::fs::create_dir(&repo).unwrap();
        std::fs::write(temp.path().join("secret.md"), "top secret").unwrap();
        let files = RepositoryFiles::new(&repo);

        assert!(matches!(
            files.read_file("../secret.md").await,
            Err(SyncError::InvalidArgument(_))
        ));
        assert!(matches!(
            files.write_file(".git/config", "x").await,
            Err(SyncError::InvalidArgument(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escape_is_rejected() {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("repo");
        let outside = temp.path().join("outside");
        std::fs::create_dir_all(&repo).unwrap();
        std::fs::create_dir_all(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, repo.join("link")).unwrap();

        let files = RepositoryFiles::new(&repo);
        assert!(matches!(
            files.create_file("link/evil.md", "x").await,
            Err(SyncError::InvalidArgument(_))
        ));
        assert!(!outside.join("evil.md").exists());
    }

    #[tokio::test]
    async fn test_store_upload_moves_and_refuses_overwrite() {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("repo");
        let scratch = temp.path().join("scratch");
        std::fs::create_dir_all(&repo).unwrap();
        std::fs::create_dir_all(&scratch).unwrap();
        let files = RepositoryFiles::new(&repo);

        let upload = upload_with(&scratch, b"\x89PNG");
        let name = files
            .store_upload("assets", upload, "diagram.png")
            .await
            .unwrap();
        assert_eq!(name, "diagram.png");
        assert_eq!(files.read_bytes("assets/diagram.png").await.unwrap(), b"\x89PNG");

        let second = upload_with(&scratch, b"other");
        let err = files
            .store_upload("assets", second, "diagram.png")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::AlreadyExists(_)));
        assert_eq!(files.read_bytes("assets/diagram.png").await.unwrap(), b"\x89PNG");
        assert_eq!(std::fs::read_dir(&scratch).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_store_upload_at_root() {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("repo");
        std::fs::create_dir_all(&repo).unwrap();
        let files = RepositoryFiles::new(&repo);

        let upload = upload_with(temp.path(), b"gif");
        let name = files.store_upload("", upload, "../../x.gif").await.unwrap();
        assert_eq!(name, "x.gif");
        assert!(repo.join("x.gif").exists());
    }
}
