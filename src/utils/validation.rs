// file: src/utils/validation.rs
// description: request path, repository name and identity validation helpers
// reference: input validation patterns

use crate::error::{Result, SyncError};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref IDENTITY_UNSAFE: Regex =
        Regex::new(r"[^A-Za-z0-9_-]").expect("IDENTITY_UNSAFE regex is valid");
}

pub struct Validator;

impl Validator {
    /// Normalizes a repository-relative path taken from a request.
    ///
    /// Backslashes become `/`, empty and `.` segments are dropped. Parent
    /// segments, absolute paths, drive prefixes and anything under `.git`
    /// are rejected. The result may be empty (the repository root).
    pub fn normalize_relative_path(raw: &str) -> Result<String> {
        let unified = raw.replace('\\', "/");

        if unified.starts_with('/') {
            return Err(SyncError::InvalidArgument(format!(
                "Absolute paths are not allowed: {}",
                raw
            )));
        }

        let mut segments = Vec::new();
        for segment in unified.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    return Err(SyncError::InvalidArgument(format!(
                        "Path escapes repository root: {}",
                        raw
                    )));
                }
                ".git" => {
                    return Err(SyncError::InvalidArgument(format!(
                        "Path addresses git metadata: {}",
                        raw
                    )));
                }
                s if segments.is_empty() && s.len() >= 2 && s.ends_with(':') => {
                    return Err(SyncError::InvalidArgument(format!(
                        "Drive prefixes are not allowed: {}",
                        raw
                    )));
                }
                s => segments.push(s),
            }
        }

        Ok(segments.join("/"))
    }

    /// Like [`Validator::normalize_relative_path`] but the path must name
    /// something below the root.
    pub fn validate_target_path(raw: &str) -> Result<String> {
        let normalized = Self::normalize_relative_path(raw)?;
        if normalized.is_empty() {
            return Err(SyncError::InvalidArgument(
                "Path must not be empty".to_string(),
            ));
        }
        Ok(normalized)
    }

    pub fn validate_repo_name(name: &str) -> Result<()> {
        if name.is_empty()
            || name.starts_with('.')
            || name.contains('/')
            || name.contains('\\')
            || name.contains(':')
        {
            return Err(SyncError::InvalidArgument(format!(
                "Invalid repository name: {:?}",
                name
            )));
        }
        Ok(())
    }

    /// Reduces an uploaded file name to its final component.
    pub fn upload_file_name(original: &str) -> Result<String> {
        let name = original
            .replace('\\', "/")
            .rsplit('/')
            .next()
            .unwrap_or("")
            .trim()
            .to_string();

        if name.is_empty() || name == "." || name == ".." {
            return Err(SyncError::InvalidArgument(format!(
                "Invalid upload file name: {:?}",
                original
            )));
        }

        Ok(name)
    }

    /// Replaces every character outside `[A-Za-z0-9_-]` with `_`.
    pub fn sanitize_identity(raw: &str) -> String {
        IDENTITY_UNSAFE.replace_all(raw, "_").into_owned()
    }

    pub fn is_http_url(url: &str) -> bool {
        url.starts_with("http://") || url.starts_with("https://")
    }
}
