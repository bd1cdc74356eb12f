//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! The facade works without any configuration. Two optional TOML scopes can
//! adjust its behavior:
//! - **Global**: user-level settings (default author, discovery)
//! - **Repo**: repository-level overrides (initial branch, diff options)
//!
//! Configuration is never read implicitly: callers load a [`Config`], turn
//! it into [`Settings`], and pass those to
//! [`RepositoryHandle::open_with`](crate::git::RepositoryHandle::open_with).
//!
//! # Precedence
//!
//! Values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Repo config file
//!
//! # Example
//!
//! ```no_run
//! use stablegit::core::config::Config;
//! use stablegit::git::RepositoryHandle;
//! use std::path::Path;
//!
//! let path = Path::new("/path/to/repo");
//! let settings = Config::load(Some(path)).unwrap().settings();
//! let repo = RepositoryHandle::open_with(path, settings).unwrap();
//! ```

pub mod schema;

pub use schema::{AuthorConfig, DiffConfig, GlobalConfig, OpenConfig, RepoConfig};

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::core::types::BranchName;

/// Environment variable naming an explicit global config file.
pub const CONFIG_ENV: &str = "STABLEGIT_CONFIG";

/// Default similarity percentage for rename detection.
pub const DEFAULT_RENAME_THRESHOLD: u16 = 50;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Merged configuration from all sources.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Repository configuration (if one was found)
    pub repo: Option<RepoConfig>,
    global_path: Option<PathBuf>,
    repo_path: Option<PathBuf>,
}

/// Resolved facade behavior, with precedence already applied.
///
/// This is a plain value; handles keep their own copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Search parent directories when opening
    pub discover: bool,
    /// Branch `HEAD` points at after `init`; `None` keeps the library default
    pub initial_branch: Option<BranchName>,
    /// Pair deletions with additions as renames in diffs
    pub detect_renames: bool,
    /// Similarity percentage for rename detection
    pub rename_threshold: u16,
    /// Configured author name, if any
    pub author_name: Option<String>,
    /// Configured author email, if any
    pub author_email: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            discover: false,
            initial_branch: None,
            detect_renames: true,
            rename_threshold: DEFAULT_RENAME_THRESHOLD,
            author_name: None,
            author_email: None,
        }
    }
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `repo_path` is provided, also loads repo-specific config from
    /// `<repo_path>/.git/stablegit/config.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be read, parsed or
    /// validated. Missing config files are not an error.
    pub fn load(repo_path: Option<&Path>) -> Result<Config, ConfigError> {
        let global_path = Self::find_global();
        let repo_path = repo_path
            .map(Self::repo_config_path)
            .filter(|p| p.exists());
        Self::load_from(global_path, repo_path)
    }

    /// Load configuration from explicit file paths.
    ///
    /// `None` means "no file for this scope".
    pub fn load_from(
        global_path: Option<PathBuf>,
        repo_path: Option<PathBuf>,
    ) -> Result<Config, ConfigError> {
        let global: GlobalConfig = match &global_path {
            Some(path) => Self::read_config(path)?,
            None => GlobalConfig::default(),
        };
        let repo: Option<RepoConfig> = match &repo_path {
            Some(path) => Some(Self::read_config(path)?),
            None => None,
        };

        global.validate()?;
        if let Some(ref r) = repo {
            r.validate()?;
        }

        Ok(Config {
            global,
            repo,
            global_path,
            repo_path,
        })
    }

    /// Find the global config file, if any exists.
    fn find_global() -> Option<PathBuf> {
        // 1. $STABLEGIT_CONFIG
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. $XDG_CONFIG_HOME/stablegit/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("stablegit/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 3. ~/.stablegit/config.toml
        dirs::home_dir()
            .map(|home| home.join(".stablegit/config.toml"))
            .filter(|p| p.exists())
    }

    fn read_config<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get the canonical path for repo config.
    pub fn repo_config_path(repo_path: &Path) -> PathBuf {
        repo_path.join(".git/stablegit/config.toml")
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Whether opening searches parent directories. Defaults to `false`.
    pub fn discover(&self) -> bool {
        self.global
            .open
            .as_ref()
            .and_then(|o| o.discover)
            .unwrap_or(false)
    }

    /// Initial branch for `init`, if configured.
    pub fn initial_branch(&self) -> Option<&str> {
        self.repo.as_ref().and_then(|r| r.initial_branch.as_deref())
    }

    /// Whether diffs detect renames. Defaults to `true`.
    pub fn detect_renames(&self) -> bool {
        self.repo_diff()
            .and_then(|d| d.detect_renames)
            .unwrap_or(true)
    }

    /// Rename similarity threshold. Defaults to 50.
    pub fn rename_threshold(&self) -> u16 {
        self.repo_diff()
            .and_then(|d| d.rename_threshold)
            .unwrap_or(DEFAULT_RENAME_THRESHOLD)
    }

    /// Author name; repo config overrides global.
    pub fn author_name(&self) -> Option<&str> {
        self.author_field(|a| a.name.as_deref())
    }

    /// Author email; repo config overrides global.
    pub fn author_email(&self) -> Option<&str> {
        self.author_field(|a| a.email.as_deref())
    }

    fn repo_diff(&self) -> Option<&DiffConfig> {
        self.repo.as_ref().and_then(|r| r.diff.as_ref())
    }

    fn author_field<'a>(
        &'a self,
        field: impl Fn(&'a AuthorConfig) -> Option<&'a str>,
    ) -> Option<&'a str> {
        self.repo
            .as_ref()
            .and_then(|r| r.author.as_ref())
            .and_then(&field)
            .or_else(|| self.global.author.as_ref().and_then(&field))
    }

    /// Resolve all values into [`Settings`].
    pub fn settings(&self) -> Settings {
        Settings {
            discover: self.discover(),
            // validated at load time; an unvalidated value is dropped
            initial_branch: self.initial_branch().and_then(|b| BranchName::new(b).ok()),
            detect_renames: self.detect_renames(),
            rename_threshold: self.rename_threshold(),
            author_name: self.author_name().map(String::from),
            author_email: self.author_email().map(String::from),
        }
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded repo config file.
    pub fn repo_config_loaded_from(&self) -> Option<&Path> {
        self.repo_path.as_deref()
    }
}
