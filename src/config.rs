// file: src/config.rs
// description: application configuration management with toml support
// reference: https://docs.rs/config

use crate::error::{Result, SyncError};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub git: GitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origin allowed by CORS; `*` allows any.
    pub allowed_origin: String,
    pub max_upload_mb: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root under which `<identity>/<repo>` working copies live.
    /// Relative paths are anchored at the executable's directory.
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitConfig {
    pub default_commit_message: String,
    pub fallback_identity: String,
    pub author_email_domain: String,
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let defaults = config::Config::try_from(&Self::default_config())
            .map_err(|e| SyncError::Config(e.to_string()))?;

        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder
                .add_source(config::File::from(Path::new("config/default.toml")).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("GIT_MDSYNC")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| SyncError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| SyncError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3001,
                allowed_origin: "http://localhost:5173".to_string(),
                max_upload_mb: 20,
            },
            storage: StorageConfig {
                base_dir: PathBuf::from("repos"),
            },
            git: GitConfig {
                default_commit_message: "Update from markdown editor".to_string(),
                fallback_identity: "anonymous".to_string(),
                author_email_domain: "users.noreply.local".to_string(),
            },
        }
    }

    /// Absolute storage root. Relative `base_dir` values resolve against the
    /// directory holding the running executable.
    pub fn storage_root(&self) -> Result<PathBuf> {
        if self.storage.base_dir.is_absolute() {
            return Ok(self.storage.base_dir.clone());
        }

        let exe = std::env::current_exe()
            .map_err(|e| SyncError::Config(format!("Cannot locate executable: {}", e)))?;
        let anchor = exe.parent().ok_or_else(|| {
            SyncError::Config(format!("Executable has no parent: {}", exe.display()))
        })?;

        Ok(anchor.join(&self.storage.base_dir))
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.server.max_upload_mb * 1024 * 1024
    }

    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(SyncError::Config("port must be greater than 0".to_string()));
        }

        if self.server.max_upload_mb == 0 {
            return Err(SyncError::Config(
                "max_upload_mb must be greater than 0".to_string(),
            ));
        }

        if self.git.default_commit_message.trim().is_empty() {
            return Err(SyncError::Config(
                "default_commit_message must not be blank".to_string(),
            ));
        }

        if self.git.fallback_identity.trim().is_empty() {
            return Err(SyncError::Config(
                "fallback_identity must not be blank".to_string(),
            ));
        }

        Ok(())
    }
}
