//! core::config::schema
//!
//! Configuration schema types.
//!
//! Both scopes share one schema: every key may appear in the global file
//! and be overridden per repository.
//!
//! # Validation
//!
//! Values are validated after parsing: the branch must be a valid branch
//! name, the deploy prefix must stay inside the branch tree, and the remote
//! must be non-empty.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::paths;
use crate::core::types::{AliasStrategy, BranchName};

/// Settings for one configuration scope.
///
/// # Example
///
/// ```toml
/// remote = "upstream"
/// branch = "gh-pages"
/// deploy_prefix = "docs"
/// alias_type = "redirect"
/// redirect_template = "templates/redirect.html"
/// use_directory_urls = false
/// site_dir = "build/html"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Remote to sync with and push to
    pub remote: Option<String>,

    /// Deploy branch
    pub branch: Option<String>,

    /// Subdirectory of the deploy branch holding the versions
    pub deploy_prefix: Option<String>,

    /// How aliases are materialized
    pub alias_type: Option<AliasStrategy>,

    /// Custom redirect page template
    pub redirect_template: Option<PathBuf>,

    /// Whether redirects point at directories instead of `index.html`
    pub use_directory_urls: Option<bool>,

    /// Built site directory to deploy
    pub site_dir: Option<PathBuf>,
}

impl Settings {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(branch) = &self.branch {
            BranchName::new(branch.as_str()).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid deploy branch name: {}", e))
            })?;
        }

        if let Some(remote) = &self.remote {
            if remote.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "remote cannot be empty".to_string(),
                ));
            }
        }

        if let Some(prefix) = &self.deploy_prefix {
            paths::sanitize(prefix)
                .map_err(|e| ConfigError::InvalidValue(format!("invalid deploy_prefix: {}", e)))?;
        }

        Ok(())
    }

    /// Overlay `other` on top of `self`, field by field.
    pub fn merged(&self, other: &Settings) -> Settings {
        Settings {
            remote: other.remote.clone().or_else(|| self.remote.clone()),
            branch: other.branch.clone().or_else(|| self.branch.clone()),
            deploy_prefix: other
                .deploy_prefix
                .clone()
                .or_else(|| self.deploy_prefix.clone()),
            alias_type: other.alias_type.or(self.alias_type),
            redirect_template: other
                .redirect_template
                .clone()
                .or_else(|| self.redirect_template.clone()),
            use_directory_urls: other.use_directory_urls.or(self.use_directory_urls),
            site_dir: other.site_dir.clone().or_else(|| self.site_dir.clone()),
        }
    }
}
