//! set-default command - Redirect the branch root to a version

use std::path::Path;

use anyhow::{Context as _, Result};

use super::workspace::Workspace;
use crate::cli::args::{CommitArgs, TargetArgs};
use crate::cli::Context;
use crate::engine;
use crate::ui::output;

/// Write a root `index.html` that redirects to `identifier`.
///
/// Unlike the other writing commands, an empty commit here is an error.
pub fn set_default(
    ctx: &Context,
    identifier: &str,
    template: Option<&Path>,
    target: &TargetArgs,
    commit: &CommitArgs,
) -> Result<()> {
    let ws = Workspace::open(ctx, target)?;
    ws.check_remote(target, true)?;

    let template = ws.redirect_template(template)?;
    let result = engine::set_default(
        &ws.git,
        &ws.target,
        &ws.commit_settings(commit),
        identifier,
        &template,
    );
    if let Some(oid) = ws
        .settle(commit, result, false)
        .with_context(|| format!("Failed to set default version to {identifier}"))?
    {
        output::success(
            format!("Default version is now {} ({})", identifier, oid.short(7)),
            ws.verbosity(),
        );
    }
    Ok(())
}
