//! Configuration types for the backup system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main backup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// DNS source configuration
    pub provider: ProviderConfig,

    /// Directory that receives the JSON snapshot
    pub target_dir: PathBuf,

    /// Pagination limits
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Snapshot directory handling
    #[serde(default)]
    pub snapshot: SnapshotConfig,

    /// Git autocommit settings
    #[serde(default)]
    pub vcs: VcsConfig,
}

impl BackupConfig {
    /// Create a new configuration with defaults for everything but the
    /// provider and target directory
    pub fn new(provider: ProviderConfig, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            target_dir: target_dir.into(),
            fetch: FetchConfig::default(),
            snapshot: SnapshotConfig::default(),
            vcs: VcsConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.target_dir.as_os_str().is_empty() {
            return Err(crate::Error::config("Target directory cannot be empty"));
        }

        self.provider.validate()?;
        self.fetch.validate()?;
        self.vcs.validate()?;

        Ok(())
    }
}

/// DNS source configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare source
    Cloudflare {
        /// Account email; when empty the token is sent as a bearer token
        email: String,
        /// Cloudflare API key or token
        api_token: String,
        /// API base URL override
        #[serde(default)]
        base_url: Option<String>,
    },

    /// Custom source
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

// Keeps the credential out of logs
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Cloudflare {
                email, base_url, ..
            } => f
                .debug_struct("Cloudflare")
                .field("email", email)
                .field("api_token", &"<REDACTED>")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::Custom { factory, .. } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .field("config", &"<REDACTED>")
                .finish(),
        }
    }
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare {
                api_token,
                base_url,
                ..
            } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                if let Some(url) = base_url
                    && !url.starts_with("https://")
                    && !url.starts_with("http://")
                {
                    return Err(crate::Error::config(format!(
                        "Cloudflare API base URL must use HTTP or HTTPS scheme. Got: {}",
                        url
                    )));
                }
                Ok(())
            }
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom source factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom source config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Pagination limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Maximum number of page requests for a single listing
    ///
    /// A provider that keeps reporting more pages past this point is treated
    /// as misbehaving and the run fails.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

impl FetchConfig {
    /// Validate the fetch configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.max_pages == 0 {
            return Err(crate::Error::config("max_pages must be > 0"));
        }
        Ok(())
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
        }
    }
}

/// Snapshot directory handling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Remove directories left empty after stale files are pruned
    #[serde(default = "default_true")]
    pub prune_empty_dirs: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            prune_empty_dirs: true,
        }
    }
}

/// Git autocommit settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VcsConfig {
    /// Commit when the target directory already holds a git repository
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Private key used by ssh when pushing
    #[serde(default = "default_ssh_key")]
    pub ssh_key: PathBuf,

    /// ssh client the wrapper script execs
    #[serde(default = "default_ssh_program")]
    pub ssh_program: String,

    /// git executable
    #[serde(default = "default_git_program")]
    pub git_program: String,

    /// Push after committing
    #[serde(default = "default_true")]
    pub push: bool,

    /// Directory for the ssh wrapper script (system temp dir when unset)
    #[serde(default)]
    pub wrapper_dir: Option<PathBuf>,
}

impl VcsConfig {
    /// Validate the VCS configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !self.enabled {
            return Ok(());
        }
        if self.git_program.is_empty() {
            return Err(crate::Error::config("git program cannot be empty"));
        }
        if self.push && self.ssh_program.is_empty() {
            return Err(crate::Error::config("ssh program cannot be empty"));
        }
        if self.push && self.ssh_key.as_os_str().is_empty() {
            return Err(crate::Error::config("ssh key path cannot be empty"));
        }
        Ok(())
    }
}

impl Default for VcsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ssh_key: default_ssh_key(),
            ssh_program: default_ssh_program(),
            git_program: default_git_program(),
            push: true,
            wrapper_dir: None,
        }
    }
}

fn default_max_pages() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

/// `id_rsa` next to the running executable
pub fn default_ssh_key() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("id_rsa")))
        .unwrap_or_else(|| PathBuf::from("id_rsa"))
}

fn default_ssh_program() -> String {
    "ssh".to_string()
}

fn default_git_program() -> String {
    "git".to_string()
}
