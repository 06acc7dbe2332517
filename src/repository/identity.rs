// file: src/repository/identity.rs
// description: per-caller storage namespace derived from the global git identity
// reference: https://docs.rs/git2

use crate::utils::Validator;
use tracing::debug;

/// Resolves the directory namespace that scopes a caller's working copies.
///
/// The value only separates storage; it is never used for authentication.
#[derive(Debug, Clone)]
pub enum IdentityResolver {
    /// Global git `user.name`, or `fallback` when unset or unreadable.
    GitConfig { fallback: String },
    Fixed(String),
}

impl IdentityResolver {
    pub fn git_config(fallback: impl Into<String>) -> Self {
        Self::GitConfig {
            fallback: fallback.into(),
        }
    }

    pub fn fixed(identity: impl Into<String>) -> Self {
        Self::Fixed(identity.into())
    }

    pub fn resolve(&self) -> String {
        let raw = match self {
            Self::GitConfig { fallback } => match global_user_name() {
                Some(name) => name,
                None => {
                    debug!("No global git user.name, using fallback identity");
                    fallback.clone()
                }
            },
            Self::Fixed(identity) => identity.clone(),
        };

        Validator::sanitize_identity(&raw)
    }

    /// The sanitized fallback, used by health reporting.
    pub fn fallback(&self) -> String {
        match self {
            Self::GitConfig { fallback } => Validator::sanitize_identity(fallback),
            Self::Fixed(identity) => Validator::sanitize_identity(identity),
        }
    }
}

fn global_user_name() -> Option<String> {
    let config = git2::Config::find_global()
        .and_then(|path| git2::Config::open(&path))
        .or_else(|_| git2::Config::open_default())
        .ok()?;

    config
        .get_string("user.name")
        .ok()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}
