//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Resolves flags against configuration via [`workspace::Workspace`]
//! 2. Checks the deploy branch against its remote-tracking branch
//! 3. Calls the engine to execute the command
//! 4. Formats and displays output
//!
//! Handlers do NOT write to the repository directly.

mod alias;
mod completion;
mod delete;
mod deploy;
mod list;
mod retitle;
mod set_default;
mod workspace;

// Re-export command functions for testing and direct invocation
pub use alias::alias;
pub use completion::completion;
pub use delete::delete;
pub use deploy::{deploy, DeployArgs};
pub use list::{format_entry, list};
pub use retitle::retitle;
pub use set_default::set_default;

use super::args::Command;
use super::Context;
use anyhow::Result;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    tracing::debug!(?command, "dispatching");
    match command {
        Command::Deploy {
            version,
            aliases,
            title,
            site_dir,
            alias,
            target,
            commit,
        } => deploy::deploy(
            ctx,
            &DeployArgs {
                version: &version,
                aliases: &aliases,
                title: title.as_deref(),
                site_dir: site_dir.as_deref(),
                alias: &alias,
                target: &target,
                commit: &commit,
            },
        ),
        Command::Delete {
            identifiers,
            all,
            target,
            commit,
        } => delete::delete(ctx, &identifiers, all, &target, &commit),
        Command::Alias {
            identifier,
            aliases,
            alias,
            target,
            commit,
        } => alias::alias(ctx, &identifier, &aliases, &alias, &target, &commit),
        Command::Retitle {
            identifier,
            title,
            target,
            commit,
        } => retitle::retitle(ctx, &identifier, &title, &target, &commit),
        Command::List {
            identifier,
            json,
            target,
        } => list::list(ctx, identifier.as_deref(), json, &target),
        Command::SetDefault {
            identifier,
            template,
            target,
            commit,
        } => set_default::set_default(ctx, &identifier, template.as_deref(), &target, &commit),
        Command::Completion { shell } => completion::completion(shell),
    }
}
