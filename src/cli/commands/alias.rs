//! alias command - Add aliases to an existing version

use anyhow::{Context as _, Result};

use super::workspace::Workspace;
use crate::cli::args::{AliasArgs, CommitArgs, TargetArgs};
use crate::cli::Context;
use crate::engine::{self, AliasRequest, AliasStyle};
use crate::ui::output;

/// Attach `aliases` to the version `identifier` names.
pub fn alias(
    ctx: &Context,
    identifier: &str,
    aliases: &[String],
    alias_args: &AliasArgs,
    target: &TargetArgs,
    commit: &CommitArgs,
) -> Result<()> {
    let ws = Workspace::open(ctx, target)?;
    ws.check_remote(target, true)?;

    let template = ws.redirect_template(alias_args.template.as_deref())?;
    let style = AliasStyle {
        strategy: ws.alias_type(alias_args),
        renderer: &template,
        use_directory_urls: ws.use_directory_urls(alias_args),
    };
    let request = AliasRequest {
        identifier,
        aliases,
        update_aliases: alias_args.update_aliases,
    };

    let result = engine::alias(
        &ws.git,
        &ws.target,
        &ws.commit_settings(commit),
        &request,
        style,
    );
    let Some(aliased) = ws
        .settle(commit, result, true)
        .with_context(|| format!("Failed to alias {identifier}"))?
    else {
        return Ok(());
    };

    if aliased.written_aliases.is_empty() {
        output::print(
            format!("{} already has every requested alias", aliased.entry.version),
            ws.verbosity(),
        );
    } else {
        output::success(
            format!(
                "Aliased {} as {} ({})",
                aliased.entry.version,
                output::format_aliases(&aliased.written_aliases),
                aliased.commit.short(7)
            ),
            ws.verbosity(),
        );
    }
    Ok(())
}
