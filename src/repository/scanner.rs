// file: src/repository/scanner.rs
// description: Directory walking and file tree listing with filtering
// reference: https://docs.rs/walkdir

use crate::error::{Result, SyncError};
use crate::models::FileEntry;
use crate::models::entry::is_listed_file;
use std::path::Path;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

pub struct TreeScanner;

impl TreeScanner {
    /// Depth-first listing of every non-hidden folder and every markdown or
    /// image file under `root`. Order follows the directory listing.
    pub fn list_tree(root: &Path) -> Result<Vec<FileEntry>> {
        info!("Scanning directory: {}", root.display());
        let mut entries = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| !is_hidden(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.depth() == 0 => {
                    return Err(SyncError::from_io(root, std::io::Error::from(err)));
                }
                Err(err) => {
                    debug!("Skipping unreadable entry: {}", err);
                    continue;
                }
            };

            let path = entry.path();
            let relative_path = relative_slash_path(root, path);

            if entry.file_type().is_dir() {
                entries.push(FileEntry::folder(relative_path));
            } else if entry.file_type().is_file() && is_listed_file(path) {
                entries.push(FileEntry::file(relative_path));
            } else {
                debug!("Skipping file: {}", path.display());
            }
        }

        info!("Found {} tree entries", entries.len());
        Ok(entries)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn relative_slash_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
