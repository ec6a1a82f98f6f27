//! retitle command - Change the title of a version

use anyhow::{Context as _, Result};

use super::workspace::Workspace;
use crate::cli::args::{CommitArgs, TargetArgs};
use crate::cli::Context;
use crate::engine;
use crate::ui::output;

/// Change the display title of the version `identifier` names.
pub fn retitle(
    ctx: &Context,
    identifier: &str,
    title: &str,
    target: &TargetArgs,
    commit: &CommitArgs,
) -> Result<()> {
    let ws = Workspace::open(ctx, target)?;
    ws.check_remote(target, true)?;

    let result = engine::retitle(
        &ws.git,
        &ws.target,
        &ws.commit_settings(commit),
        identifier,
        title,
    );
    if let Some(oid) = ws
        .settle(commit, result, true)
        .with_context(|| format!("Failed to retitle {identifier}"))?
    {
        output::success(
            format!("Retitled {} to \"{}\" ({})", identifier, title, oid.short(7)),
            ws.verbosity(),
        );
    }
    Ok(())
}
