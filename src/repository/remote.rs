// file: src/repository/remote.rs
// description: repository naming and token-bearing remote urls
// reference: https://docs.rs/url

use crate::error::{Result, SyncError};
use crate::models::Provider;
use crate::utils::Validator;
use std::fmt;
use url::Url;

/// Derives the repository name from the final path segment of a remote URL,
/// stripping one `.git` suffix.
pub fn repo_name_from_url(remote_url: &str) -> Result<String> {
    let trimmed = remote_url.trim().trim_end_matches('/');
    let last = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or_default();
    let name = last.strip_suffix(".git").unwrap_or(last);

    Validator::validate_repo_name(name).map_err(|_| {
        SyncError::InvalidArgument(format!(
            "Cannot derive repository name from {:?}",
            remote_url
        ))
    })?;

    Ok(name.to_string())
}

/// A remote URL with the access token injected into its authority.
///
/// Built per operation and dropped afterwards. Formatting never prints the
/// token, and only the plain URL is ever written to `.git/config`; libgit2
/// receives the injected userinfo through [`AuthenticatedRemoteUrl::credentials`].
#[derive(Clone)]
pub struct AuthenticatedRemoteUrl {
    plain: String,
    authenticated: String,
    credentials: Option<(String, String)>,
}

impl AuthenticatedRemoteUrl {
    pub fn new(plain_url: &str, provider: Provider, token: &str) -> Result<Self> {
        let plain = plain_url.trim().to_string();

        // Local paths and file:// remotes carry no credentials.
        if !Validator::is_http_url(&plain) || token.is_empty() {
            return Ok(Self {
                authenticated: plain.clone(),
                plain,
                credentials: None,
            });
        }

        let mut url = Url::parse(&plain)
            .map_err(|e| SyncError::InvalidArgument(format!("Invalid remote URL: {}", e)))?;

        let (username, password) = match provider {
            Provider::Github => (token.to_string(), String::new()),
            Provider::Gitlab => ("oauth2".to_string(), token.to_string()),
        };

        url.set_username(&username)
            .map_err(|_| SyncError::InvalidArgument("Remote URL cannot carry credentials".into()))?;
        if !password.is_empty() {
            url.set_password(Some(&password)).map_err(|_| {
                SyncError::InvalidArgument("Remote URL cannot carry credentials".into())
            })?;
        }

        Ok(Self {
            plain,
            authenticated: url.to_string(),
            credentials: Some((username, password)),
        })
    }

    /// The URL safe to store in `.git/config` and to log.
    pub fn plain(&self) -> &str {
        &self.plain
    }

    pub fn credentials(&self) -> Option<(&str, &str)> {
        self.credentials
            .as_ref()
            .map(|(user, pass)| (user.as_str(), pass.as_str()))
    }

    #[cfg(test)]
    pub(crate) fn url(&self) -> &str {
        &self.authenticated
    }

    /// Scrubs the token out of messages that may echo the remote URL.
    pub fn redact(&self, message: &str) -> String {
        match &self.credentials {
            Some((user, pass)) => {
                let mut out = message.replace(&self.authenticated, &self.plain);
                for secret in [user, pass] {
                    if secret.len() >= 4 && secret != "oauth2" {
                        out = out.replace(secret.as_str(), "***");
                    }
                }
                out
            }
            None => message.to_string(),
        }
    }
}

impl fmt::Debug for AuthenticatedRemoteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedRemoteUrl")
            .field("url", &self.plain)
            .field("credentials", &self.credentials.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl fmt::Display for AuthenticatedRemoteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.plain)
    }
}
