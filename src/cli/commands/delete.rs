//! delete command - Delete versions or aliases

use anyhow::{Context as _, Result};

use super::workspace::Workspace;
use crate::cli::args::{CommitArgs, TargetArgs};
use crate::cli::Context;
use crate::core::versions::Removed;
use crate::engine::{self, DeleteTarget};
use crate::ui::output;

/// Delete `identifiers`, or everything when `all` is set.
pub fn delete(
    ctx: &Context,
    identifiers: &[String],
    all: bool,
    target: &TargetArgs,
    commit: &CommitArgs,
) -> Result<()> {
    let ws = Workspace::open(ctx, target)?;
    ws.check_remote(target, true)?;

    let what = if all {
        DeleteTarget::All
    } else {
        DeleteTarget::Identifiers(identifiers)
    };
    let result = engine::delete(&ws.git, &ws.target, &ws.commit_settings(commit), what);
    let Some(deleted) = ws
        .settle(commit, result, false)
        .context("Failed to delete")?
    else {
        return Ok(());
    };

    if all {
        output::success(
            format!("Deleted all versions ({})", deleted.commit.short(7)),
            ws.verbosity(),
        );
        return Ok(());
    }

    let names: Vec<String> = deleted.removed.iter().map(describe).collect();
    output::success(
        format!("Deleted ({}):", deleted.commit.short(7)),
        ws.verbosity(),
    );
    output::print(output::format_list(&names, "  "), ws.verbosity());
    Ok(())
}

fn describe(removed: &Removed) -> String {
    match removed {
        Removed::Version(entry) if entry.aliases.is_empty() => entry.version.clone(),
        Removed::Version(entry) => {
            format!("{} {}", entry.version, output::format_aliases(&entry.aliases))
        }
        Removed::Alias { version, alias } => format!("{alias} (alias of {version})"),
    }
}
