//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$STABLEGIT_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/stablegit/config.toml`
//! 3. `~/.stablegit/config.toml`
//!
//! # Repo Config
//!
//! Located at `.git/stablegit/config.toml`.
//!
//! # Validation
//!
//! Config values are validated after parsing (e.g., `initial_branch` must
//! be a valid branch name, the rename threshold is a percentage).

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::BranchName;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// [author]
/// name = "Alice Author"
/// email = "alice@authors.tld"
///
/// [open]
/// discover = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Identity used when the caller asks for the default author
    pub author: Option<AuthorConfig>,

    /// Repository opening behavior
    pub open: Option<OpenConfig>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(author) = &self.author {
            author.validate()?;
        }
        Ok(())
    }
}

/// Repository configuration.
///
/// # Example
///
/// ```toml
/// initial_branch = "main"
///
/// [diff]
/// detect_renames = true
/// rename_threshold = 50
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// Branch `HEAD` points at in newly initialized repositories
    pub initial_branch: Option<String>,

    /// Repository-local identity override
    pub author: Option<AuthorConfig>,

    /// Tree diff behavior
    pub diff: Option<DiffConfig>,
}

impl RepoConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(branch) = &self.initial_branch {
            BranchName::new(branch).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid initial branch name: {}", e))
            })?;
        }

        if let Some(author) = &self.author {
            author.validate()?;
        }

        if let Some(diff) = &self.diff {
            diff.validate()?;
        }

        Ok(())
    }
}

/// Author identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AuthorConfig {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl AuthorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ConfigError::InvalidValue(
                "author name cannot be empty".to_string(),
            ));
        }
        if self.email.as_deref().is_some_and(|e| e.trim().is_empty()) {
            return Err(ConfigError::InvalidValue(
                "author email cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Repository opening behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OpenConfig {
    /// Search parent directories for a repository (default: false)
    pub discover: Option<bool>,
}

/// Tree diff behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DiffConfig {
    /// Pair deletions with additions as renames (default: true)
    pub detect_renames: Option<bool>,

    /// Similarity percentage needed to call a pair a rename (default: 50)
    pub rename_threshold: Option<u16>,
}

impl DiffConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(threshold) = self.rename_threshold {
            if threshold > 100 {
                return Err(ConfigError::InvalidValue(format!(
                    "rename_threshold must be between 0 and 100, got {}",
                    threshold
                )));
            }
        }
        Ok(())
    }
}
