//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! docshelf has two configuration scopes:
//! - **Global**: User-level defaults
//! - **Repo**: Settings checked into (or kept beside) the source repository
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Repo config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$DOCSHELF_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/docshelf/config.toml`
//! 3. `~/.docshelf/config.toml`
//!
//! # Repo Config Locations
//!
//! Searched in order:
//! 1. `<work_dir>/docshelf.toml`
//! 2. `<git_dir>/docshelf/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use docshelf::core::config::Config;
//! use std::path::Path;
//!
//! let result = Config::load(Some(Path::new("/path/to/repo")), None).unwrap();
//! let config = result.config;
//!
//! println!("Deploying to {}/{}", config.remote(), config.branch());
//! println!("Aliases as: {}", config.alias_type());
//! ```

pub mod schema;

pub use schema::Settings;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::paths;
use crate::core::types::AliasStrategy;

/// Name of the repo config file in the working tree.
pub const REPO_CONFIG_FILE: &str = "docshelf.toml";

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

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Merged configuration from all sources.
///
/// Accessors apply precedence rules and defaults. Repo settings override
/// global settings.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global settings
    pub global: Settings,
    /// Repository settings (if a repo config file was found)
    pub repo: Option<Settings>,
    global_path: Option<PathBuf>,
    repo_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// `work_dir` is the source repository's working tree and `git_dir` its
    /// git directory; either may be absent.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed or hold
    /// invalid values. Missing config files are not an error.
    pub fn load(
        work_dir: Option<&Path>,
        git_dir: Option<&Path>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        Self::load_with_global(Self::find_global(), work_dir, git_dir)
    }

    /// Load configuration with an explicit global config file.
    pub fn load_with_global(
        global_path: Option<PathBuf>,
        work_dir: Option<&Path>,
        git_dir: Option<&Path>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let global = match &global_path {
            Some(path) => Self::read_settings(path)?,
            None => Settings::default(),
        };

        let repo_candidates: Vec<PathBuf> = work_dir
            .map(|dir| dir.join(REPO_CONFIG_FILE))
            .into_iter()
            .chain(git_dir.map(|dir| dir.join("docshelf").join("config.toml")))
            .filter(|path| path.exists())
            .collect();

        let repo_path = repo_candidates.first().cloned();
        for ignored in repo_candidates.iter().skip(1) {
            warnings.push(ConfigWarning {
                message: format!(
                    "Ignoring config file; '{}' takes precedence",
                    repo_path
                        .as_deref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default()
                ),
                path: ignored.clone(),
            });
        }

        let repo = repo_path
            .as_deref()
            .map(Self::read_settings)
            .transpose()?;

        global.validate()?;
        if let Some(ref r) = repo {
            r.validate()?;
        }

        tracing::debug!(
            global = ?global_path,
            repo = ?repo_path,
            "loaded configuration"
        );

        Ok(ConfigLoadResult {
            config: Config {
                global,
                repo,
                global_path,
                repo_path,
            },
            warnings,
        })
    }

    /// Locate the global config file, if any.
    fn find_global() -> Option<PathBuf> {
        // 1. Check $DOCSHELF_CONFIG
        if let Ok(path) = std::env::var("DOCSHELF_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check $XDG_CONFIG_HOME/docshelf/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("docshelf/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 3. Check ~/.docshelf/config.toml
        dirs::home_dir()
            .map(|home| home.join(".docshelf/config.toml"))
            .filter(|path| path.exists())
    }

    /// Read and parse one settings file.
    fn read_settings(path: &Path) -> Result<Settings, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Path of the global config file that was loaded.
    pub fn global_path(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Path of the repo config file that was loaded.
    pub fn repo_path(&self) -> Option<&Path> {
        self.repo_path.as_deref()
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    fn effective(&self) -> Settings {
        match &self.repo {
            Some(repo) => self.global.merged(repo),
            None => self.global.clone(),
        }
    }

    /// Get the remote name.
    ///
    /// Defaults to "origin" if not configured.
    pub fn remote(&self) -> String {
        self.effective()
            .remote
            .unwrap_or_else(|| "origin".to_string())
    }

    /// Get the deploy branch name.
    ///
    /// Defaults to "gh-pages" if not configured.
    pub fn branch(&self) -> String {
        self.effective()
            .branch
            .unwrap_or_else(|| "gh-pages".to_string())
    }

    /// Get the normalized deploy prefix.
    ///
    /// Defaults to the branch root (empty string).
    pub fn deploy_prefix(&self) -> String {
        self.effective()
            .deploy_prefix
            .and_then(|prefix| paths::sanitize(&prefix).ok())
            .unwrap_or_default()
    }

    /// Get the alias strategy.
    ///
    /// Defaults to symlinks.
    pub fn alias_type(&self) -> AliasStrategy {
        self.effective().alias_type.unwrap_or_default()
    }

    /// Get the custom redirect template, if configured.
    pub fn redirect_template(&self) -> Option<PathBuf> {
        self.effective().redirect_template
    }

    /// Whether redirects target directories rather than `index.html`.
    ///
    /// Defaults to `true`.
    pub fn use_directory_urls(&self) -> bool {
        self.effective().use_directory_urls.unwrap_or(true)
    }

    /// Get the built site directory.
    ///
    /// Defaults to "site".
    pub fn site_dir(&self) -> PathBuf {
        self.effective()
            .site_dir
            .unwrap_or_else(|| PathBuf::from("site"))
    }
}
