//! workspace - Shared setup for commands that touch the deploy branch
//!
//! Every command opens the repository, loads configuration, and resolves
//! the deploy target the same way; the writing commands also share the
//! remote-status check, empty-commit handling, and the optional push.
//!
//! # Key Functions
//!
//! - [`Workspace::open`] - Repository, configuration and target in one step
//! - [`Workspace::check_remote`] - Sync with the remote-tracking branch
//! - [`Workspace::settle`] - Report the commit, downgrade empty commits, push

use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};

use crate::cli::args::{AliasArgs, CommitArgs, TargetArgs};
use crate::cli::Context;
use crate::core::config::Config;
use crate::core::types::{AliasStrategy, BranchName};
use crate::engine::{CommitSettings, OperationError, RedirectTemplate, Target};
use crate::git::sync::{self, SyncOutcome};
use crate::git::{Git, GitError, IdentityOverrides};
use crate::ui::output::{self, Verbosity};

/// The repository, its configuration, and the resolved deploy target.
pub struct Workspace {
    pub git: Git,
    pub config: Config,
    pub remote: String,
    pub target: Target,
    /// Directory the command was started from
    cwd: PathBuf,
    verbosity: Verbosity,
}

impl Workspace {
    /// Open the repository around the working directory and resolve the
    /// target. Flags take precedence over configuration.
    pub fn open(ctx: &Context, args: &TargetArgs) -> Result<Self> {
        let cwd = ctx.working_dir()?;
        let verbosity = ctx.verbosity();
        let git = Git::open(&cwd).context("Failed to open repository")?;

        let loaded = Config::load(git.work_dir(), Some(git.git_dir()))
            .context("Failed to load configuration")?;
        for warning in &loaded.warnings {
            output::warn(
                format!("{} ({})", warning.message, warning.path.display()),
                verbosity,
            );
        }
        let config = loaded.config;

        let remote = args.remote.clone().unwrap_or_else(|| config.remote());
        if remote.is_empty() {
            bail!("Remote name cannot be empty");
        }
        let branch = BranchName::new(args.branch.clone().unwrap_or_else(|| config.branch()))
            .context("Invalid deploy branch")?;
        let prefix = args
            .deploy_prefix
            .clone()
            .unwrap_or_else(|| config.deploy_prefix());
        let target = Target::new(branch, &prefix).context("Invalid deploy prefix")?;

        tracing::debug!(
            git_dir = %git.git_dir().display(),
            remote = %remote,
            branch = %target.branch,
            prefix = %target.deploy_prefix(),
            "resolved target"
        );

        Ok(Self {
            git,
            config,
            remote,
            target,
            cwd,
            verbosity,
        })
    }

    /// Bring the local branch up to date with `<remote>/<branch>`.
    ///
    /// Divergence is fatal when `strict`, a warning otherwise.
    pub fn check_remote(&self, args: &TargetArgs, strict: bool) -> Result<()> {
        if args.ignore_remote_status {
            tracing::debug!("skipping remote status check");
            return Ok(());
        }

        match sync::update_from_upstream(&self.git, &self.remote, &self.target.branch) {
            Ok(SyncOutcome::Created(tip)) => {
                output::debug(
                    format!(
                        "created {} from {}/{} at {}",
                        self.target.branch,
                        self.remote,
                        self.target.branch,
                        tip.short(7)
                    ),
                    self.verbosity,
                );
                Ok(())
            }
            Ok(SyncOutcome::FastForwarded { from, to }) => {
                output::debug(
                    format!(
                        "fast-forwarded {} from {} to {}",
                        self.target.branch,
                        from.short(7),
                        to.short(7)
                    ),
                    self.verbosity,
                );
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(e @ GitError::Diverged { .. }) => {
                if strict {
                    bail!("{e}\n  If you're sure this is intended, retry with --ignore-remote-status");
                }
                output::warn(e, self.verbosity);
                Ok(())
            }
            Err(e) => Err(e).context("Failed to check remote status"),
        }
    }

    /// Commit settings from the flags, with identity overrides from the
    /// environment.
    pub fn commit_settings(&self, args: &CommitArgs) -> CommitSettings {
        CommitSettings {
            message: args.message.clone(),
            allow_empty: args.allow_empty,
            identity: IdentityOverrides::from_env(),
        }
    }

    /// The alias strategy from the flag or configuration.
    pub fn alias_type(&self, args: &AliasArgs) -> AliasStrategy {
        args.alias_type.unwrap_or_else(|| self.config.alias_type())
    }

    pub fn use_directory_urls(&self, args: &AliasArgs) -> bool {
        !args.no_directory_urls && self.config.use_directory_urls()
    }

    /// The redirect template from the flag, the configuration, or the
    /// built-in one.
    pub fn redirect_template(&self, flag: Option<&Path>) -> Result<RedirectTemplate> {
        let path = match flag {
            Some(path) => Some(self.cwd.join(path)),
            None => self
                .config
                .redirect_template()
                .map(|path| self.config_relative(&path)),
        };
        RedirectTemplate::load(path.as_deref()).context("Failed to load redirect template")
    }

    /// The built site directory from the flag or configuration.
    pub fn site_dir(&self, flag: Option<&Path>) -> PathBuf {
        match flag {
            Some(path) => self.cwd.join(path),
            None => self.config_relative(&self.config.site_dir()),
        }
    }

    /// Configured paths are relative to the repository's working tree.
    fn config_relative(&self, path: &Path) -> PathBuf {
        self.git.work_dir().unwrap_or(&self.cwd).join(path)
    }

    /// Finish a writing command.
    ///
    /// On success, pushes when asked and returns the value. An empty
    /// commit becomes a warning (and `None`) when `empty_is_warning`.
    pub fn settle<T>(
        &self,
        args: &CommitArgs,
        result: Result<T, OperationError>,
        empty_is_warning: bool,
    ) -> Result<Option<T>> {
        let value = match result {
            Ok(value) => value,
            Err(OperationError::Git(e @ GitError::EmptyCommit { .. })) if empty_is_warning => {
                output::warn(e, self.verbosity);
                output::hint("To create a commit anyway, retry with --allow-empty", self.verbosity);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if args.push {
            sync::push_branch(&self.git, &self.remote, &self.target.branch).with_context(|| {
                format!("Failed to push to {}/{}", self.remote, self.target.branch)
            })?;
            output::print(
                format!("Pushed {} to {}", self.target.branch, self.remote),
                self.verbosity,
            );
        }
        Ok(Some(value))
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }
}
