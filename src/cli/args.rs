//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::core::types::AliasStrategy;

/// docshelf - Deploy versioned documentation to a git branch
#[derive(Parser, Debug)]
#[command(name = "docshelf")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if docshelf was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Where to find the deploy branch. Shared by every command that reads it.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Remote to sync with and push to (default: origin)
    #[arg(short, long)]
    pub remote: Option<String>,

    /// Branch to commit to (default: gh-pages)
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Subdirectory of the branch that holds the versions
    #[arg(long, value_name = "PATH")]
    pub deploy_prefix: Option<String>,

    /// Don't check the local branch against its remote-tracking branch
    #[arg(long)]
    pub ignore_remote_status: bool,
}

/// Commit behavior. Shared by every command that writes to the branch.
#[derive(Args, Debug, Clone, Default)]
pub struct CommitArgs {
    /// Commit message
    #[arg(short, long)]
    pub message: Option<String>,

    /// Push to <remote>/<branch> after committing
    #[arg(short, long)]
    pub push: bool,

    /// Allow commits with no changes
    #[arg(long)]
    pub allow_empty: bool,
}

/// How aliases are written. Shared by `deploy` and `alias`.
#[derive(Args, Debug, Clone, Default)]
pub struct AliasArgs {
    /// Move aliases that currently belong to another version
    #[arg(short, long)]
    pub update_aliases: bool,

    /// How to write aliases (default: symlink)
    #[arg(long, value_enum, value_name = "TYPE")]
    pub alias_type: Option<AliasStrategy>,

    /// Redirect page template for the redirect alias type
    #[arg(short = 'T', long, value_name = "FILE")]
    pub template: Option<PathBuf>,

    /// Point redirects at `page.html` rather than `page/`
    #[arg(long)]
    pub no_directory_urls: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Deploy a built site as a version
    #[command(
        name = "deploy",
        long_about = "Deploy a built site as a version.\n\n\
            Copies the site directory into <version>/ on the deploy branch, writes \
            each alias, and records the version in versions.json, all in a single \
            commit. An existing version of the same name is replaced.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Deploy the site in ./site as 1.0 and point 'latest' at it
    docshelf deploy 1.0 latest

    # Take 'latest' away from whichever version holds it
    docshelf deploy --update-aliases 1.1 latest

    # Give the version a display title and publish
    docshelf deploy --title 'Version 1.1' --push 1.1

    # Deploy from another build directory, with redirect aliases
    docshelf deploy --site-dir build/html --alias-type redirect 2.0 latest"
    )]
    Deploy {
        /// Version to deploy
        version: String,

        /// Aliases for the version
        aliases: Vec<String>,

        /// Display title (default: the version)
        #[arg(short, long)]
        title: Option<String>,

        /// Directory holding the built site (default: site)
        #[arg(long, value_name = "DIR")]
        site_dir: Option<PathBuf>,

        #[command(flatten)]
        alias: AliasArgs,

        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        commit: CommitArgs,
    },

    /// Delete versions or aliases
    #[command(
        name = "delete",
        long_about = "Delete versions or aliases from the deploy branch.\n\n\
            Deleting a version removes its directory and every alias directory. \
            Deleting an alias removes only the alias.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Remove an old version and its aliases
    docshelf delete 0.9

    # Remove everything under the deploy prefix
    docshelf delete --all"
    )]
    Delete {
        /// Versions or aliases to delete
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        identifiers: Vec<String>,

        /// Delete everything
        #[arg(long)]
        all: bool,

        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        commit: CommitArgs,
    },

    /// Add aliases to an existing version
    #[command(
        name = "alias",
        after_help = "\
WORKFLOW EXAMPLES:
    # Point 'stable' at whatever 'latest' is
    docshelf alias latest stable

    # Move 'latest' to 2.0
    docshelf alias --update-aliases 2.0 latest"
    )]
    Alias {
        /// Version or alias to add aliases to
        identifier: String,

        /// Aliases to add
        #[arg(required = true)]
        aliases: Vec<String>,

        #[command(flatten)]
        alias: AliasArgs,

        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        commit: CommitArgs,
    },

    /// Change the title of a version
    #[command(name = "retitle")]
    Retitle {
        /// Version or alias to retitle
        identifier: String,

        /// New title
        title: String,

        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        commit: CommitArgs,
    },

    /// List deployed versions
    #[command(
        name = "list",
        after_help = "\
READING THE OUTPUT:
    \"Version 2.0\" (2.0) [latest]   <- title differs from the version
    1.0                            <- no title, no aliases"
    )]
    List {
        /// Show only this version or alias
        identifier: Option<String>,

        /// Print JSON
        #[arg(short, long)]
        json: bool,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Redirect the branch root to a version
    #[command(
        name = "set-default",
        long_about = "Redirect the branch root to a version.\n\n\
            Writes index.html at the deploy prefix with a redirect to the given \
            version or alias."
    )]
    SetDefault {
        /// Version or alias to redirect to
        identifier: String,

        /// Redirect page template
        #[arg(short = 'T', long, value_name = "FILE")]
        template: Option<PathBuf>,

        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        commit: CommitArgs,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
EXAMPLES:
    docshelf completion bash > /etc/bash_completion.d/docshelf
    docshelf completion zsh > \"${fpath[1]}/_docshelf\""
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Shells supported by `completion`.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
