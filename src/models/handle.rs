// file: src/models/handle.rs
// description: synchronized repository handle, provider tag and commit request
// reference: internal data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Hosting provider; decides how the token is injected into remote URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Github,
    Gitlab,
}

/// One synchronized working copy, keyed by `(identity, name)`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryHandle {
    pub identity: String,
    pub name: String,
    pub path: PathBuf,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    #[serde(default)]
    pub repo_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub provider: Provider,
}

impl SyncRequest {
    /// The token, if one was supplied and is not blank.
    pub fn token(&self) -> Option<&str> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub token: String,
    pub repo_url: String,
    #[serde(default)]
    pub provider: Provider,
}

impl CommitRequest {
    /// Blank or missing messages fall back to `default`.
    pub fn message_or<'a>(&'a self, default: &'a str) -> &'a str {
        match self.message.as_deref().map(str::trim) {
            Some(m) if !m.is_empty() => m,
            _ => default,
        }
    }
}
