//! engine
//!
//! Operations on the deploy branch.
//!
//! # Architecture
//!
//! Every mutating operation follows the same shape:
//!
//! ```text
//! Load registry -> Mutate in memory -> Collect inputs -> Stream one commit
//! ```
//!
//! All validation (registry checks, site collection, template loading)
//! happens before the commit session opens. Everything written to the
//! branch goes through a single [`with_commit`](crate::git::with_commit)
//! call, so a failure at any step leaves the branch exactly as it was.
//!
//! # Modules
//!
//! - [`deploy`] - Deploying a built site and adding aliases
//! - [`manage`] - Deleting, retitling and choosing the default version
//! - [`redirect`] - Redirect page rendering
//! - [`site`] - Reading a built site from disk

pub mod deploy;
pub mod manage;
pub mod redirect;
pub mod site;

pub use deploy::{alias, deploy, AliasRequest, DeployRequest, DeployResult};
pub use manage::{delete, retitle, set_default, DeleteResult, DeleteTarget};
pub use redirect::{RedirectRenderer, RedirectTemplate};
pub use site::{SiteDir, SiteSource, SourceFile};

use std::path::PathBuf;

use thiserror::Error;

use crate::core::paths::{self, PathError};
use crate::core::types::{AliasStrategy, BranchName, FileMode};
use crate::core::versions::{RegistryError, VersionRegistry, VERSIONS_FILE};
use crate::git::{CommitOptions, CommitSession, Git, GitError, IdentityOverrides, TreeFile};

/// Marker that disables Jekyll processing on GitHub Pages.
pub const NOJEKYLL_FILE: &str = ".nojekyll";

/// Version reported in default commit messages.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Errors from engine operations.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Where versions live: a branch and a directory inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub branch: BranchName,
    deploy_prefix: String,
}

impl Target {
    /// Create a target; the prefix is normalized and must stay in the tree.
    pub fn new(branch: BranchName, deploy_prefix: &str) -> Result<Self, PathError> {
        Ok(Self {
            branch,
            deploy_prefix: paths::sanitize(deploy_prefix)?,
        })
    }

    pub fn deploy_prefix(&self) -> &str {
        &self.deploy_prefix
    }

    /// Path of `relative` inside the deploy prefix.
    pub fn path(&self, relative: &str) -> String {
        paths::join(&[&self.deploy_prefix, relative])
    }

    pub fn versions_path(&self) -> String {
        self.path(VERSIONS_FILE)
    }

    /// ` in <prefix>` for commit messages, or nothing at the branch root.
    fn message_suffix(&self) -> String {
        if self.deploy_prefix.is_empty() {
            String::new()
        } else {
            format!(" in {}", self.deploy_prefix)
        }
    }
}

/// Commit-level settings shared by every mutating operation.
#[derive(Debug, Clone, Default)]
pub struct CommitSettings {
    /// Overrides the operation's default message.
    pub message: Option<String>,
    pub allow_empty: bool,
    pub identity: IdentityOverrides,
}

impl CommitSettings {
    fn options(&self) -> CommitOptions {
        CommitOptions {
            allow_empty: self.allow_empty,
            identity: self.identity.clone(),
        }
    }

    fn message_or(&self, default: impl FnOnce() -> String) -> String {
        self.message.clone().unwrap_or_else(default)
    }
}

/// How aliases of a version are written.
#[derive(Clone, Copy)]
pub struct AliasStyle<'a> {
    pub strategy: AliasStrategy,
    pub renderer: &'a dyn RedirectRenderer,
    /// Point redirects at directories rather than their `index.html`.
    pub use_directory_urls: bool,
}

impl std::fmt::Debug for AliasStyle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AliasStyle")
            .field("strategy", &self.strategy)
            .field("use_directory_urls", &self.use_directory_urls)
            .finish()
    }
}

impl AliasStyle<'_> {
    /// Write `alias_dirs` as aliases of `canonical_dir`, whose contents are
    /// `files` (paths relative to `canonical_dir`).
    fn write(
        &self,
        session: &mut CommitSession<'_>,
        canonical_dir: &str,
        files: &[TreeFile],
        alias_dirs: &[String],
    ) -> Result<(), OperationError> {
        match self.strategy {
            AliasStrategy::Symlink => {
                for dir in alias_dirs {
                    let target = paths::relative(canonical_dir, paths::parent(dir));
                    session.write_file(dir, target.as_bytes(), FileMode::Symlink)?;
                }
            }
            AliasStrategy::Copy => {
                for dir in alias_dirs {
                    for file in files {
                        session.add_file(dir, file)?;
                    }
                }
            }
            AliasStrategy::Redirect => {
                for dir in alias_dirs {
                    for file in files {
                        if paths::extension(&file.path) != Some("html") {
                            continue;
                        }
                        let alias_file = paths::join(&[dir, &file.path]);
                        let canonical_file = paths::join(&[canonical_dir, &file.path]);
                        let href = redirect_href(
                            &canonical_file,
                            paths::parent(&alias_file),
                            self.use_directory_urls,
                        );
                        let page = self.renderer.render(&href);
                        session.write_file(&alias_file, page.as_bytes(), FileMode::Regular)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Relative href from the directory `from_dir` to the page `target`.
///
/// With directory URLs, a link to an `index.html` page points at its
/// directory instead.
pub fn redirect_href(target: &str, from_dir: &str, use_directory_urls: bool) -> String {
    let href = paths::relative(target, from_dir);
    if use_directory_urls && paths::file_name(&href) == "index.html" {
        format!("{}/", paths::parent(&href))
    } else {
        href
    }
}

/// Read the registry from the deploy branch.
///
/// A missing branch or file yields an empty registry, and so does a file
/// that cannot be parsed (with a warning).
pub fn list_versions(git: &Git, target: &Target) -> Result<VersionRegistry, OperationError> {
    let path = target.versions_path();
    let Some(bytes) = git.read_file(&target.branch, &path)? else {
        return Ok(VersionRegistry::new());
    };

    let parsed = String::from_utf8(bytes)
        .map_err(|e| RegistryError::Parse(e.to_string()))
        .and_then(|text| VersionRegistry::loads(&text));
    match parsed {
        Ok(registry) => Ok(registry),
        Err(e) => {
            tracing::warn!(
                branch = %target.branch,
                path = %path,
                error = %e,
                "ignoring unreadable registry"
            );
            Ok(VersionRegistry::new())
        }
    }
}

fn write_registry(
    session: &mut CommitSession<'_>,
    target: &Target,
    registry: &VersionRegistry,
) -> Result<(), GitError> {
    session.write_file(
        &target.versions_path(),
        registry.dumps().as_bytes(),
        FileMode::Regular,
    )
}
