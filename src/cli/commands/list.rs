//! list command - List deployed versions

use anyhow::{bail, Context as _, Result};

use super::workspace::Workspace;
use crate::cli::args::TargetArgs;
use crate::cli::Context;
use crate::core::versions::VersionEntry;
use crate::engine;
use crate::ui::output;

/// List versions, or show the one `identifier` names.
///
/// Output is data the user asked for, so `--quiet` does not hide it.
pub fn list(
    ctx: &Context,
    identifier: Option<&str>,
    json: bool,
    target: &TargetArgs,
) -> Result<()> {
    let ws = Workspace::open(ctx, target)?;
    ws.check_remote(target, false)?;

    let registry =
        engine::list_versions(&ws.git, &ws.target).context("Failed to read versions")?;

    match identifier {
        Some(identifier) => {
            let Some(key) = registry.find(identifier) else {
                bail!("identifier {identifier} does not exist");
            };
            let Some(entry) = registry.get(key.version()) else {
                bail!("identifier {identifier} does not exist");
            };
            if json {
                output::data(serde_json::to_string_pretty(entry)?);
            } else {
                output::data(format_entry(entry));
            }
        }
        None if json => output::data(registry.dumps().trim_end()),
        None => {
            for entry in registry.iter() {
                output::data(format_entry(entry));
            }
        }
    }
    Ok(())
}

/// `"title" (version) [aliases]`, or `version [aliases]` when the title is
/// the version itself.
pub fn format_entry(entry: &VersionEntry) -> String {
    let aliases = if entry.aliases.is_empty() {
        String::new()
    } else {
        format!(" {}", output::format_aliases(&entry.aliases))
    };
    if entry.title == entry.version {
        format!("{}{}", entry.version, aliases)
    } else {
        format!("\"{}\" ({}){}", entry.title, entry.version, aliases)
    }
}
