//! deploy command - Deploy a built site as a version

use std::path::Path;

use anyhow::{bail, Context as _, Result};

use super::workspace::Workspace;
use crate::cli::args::{AliasArgs, CommitArgs, TargetArgs};
use crate::cli::Context;
use crate::engine::{self, AliasStyle, DeployRequest, SiteDir};
use crate::ui::output;

/// Arguments for [`deploy`].
pub struct DeployArgs<'a> {
    pub version: &'a str,
    pub aliases: &'a [String],
    pub title: Option<&'a str>,
    pub site_dir: Option<&'a Path>,
    pub alias: &'a AliasArgs,
    pub target: &'a TargetArgs,
    pub commit: &'a CommitArgs,
}

/// Deploy the built site as a version.
pub fn deploy(ctx: &Context, args: &DeployArgs<'_>) -> Result<()> {
    let ws = Workspace::open(ctx, args.target)?;
    ws.check_remote(args.target, true)?;

    let site = SiteDir::new(ws.site_dir(args.site_dir));
    if !site.root().is_dir() {
        bail!(
            "Site directory '{}' does not exist; build the site first or pass --site-dir",
            site.root().display()
        );
    }

    let template = ws.redirect_template(args.alias.template.as_deref())?;
    let style = AliasStyle {
        strategy: ws.alias_type(args.alias),
        renderer: &template,
        use_directory_urls: ws.use_directory_urls(args.alias),
    };
    let request = DeployRequest {
        version: args.version,
        title: args.title,
        aliases: args.aliases,
        update_aliases: args.alias.update_aliases,
    };
    output::debug(
        format!("deploying {} from {}", args.version, site.root().display()),
        ws.verbosity(),
    );

    let result = engine::deploy(
        &ws.git,
        &ws.target,
        &ws.commit_settings(args.commit),
        &request,
        &site,
        style,
    );
    let Some(deployed) = ws
        .settle(args.commit, result, true)
        .with_context(|| format!("Failed to deploy {}", args.version))?
    else {
        return Ok(());
    };

    let aliases = if deployed.written_aliases.is_empty() {
        String::new()
    } else {
        format!(" {}", output::format_aliases(&deployed.written_aliases))
    };
    output::success(
        format!(
            "Deployed {}{} to {} ({})",
            deployed.entry.version,
            aliases,
            ws.target.branch,
            deployed.commit.short(7)
        ),
        ws.verbosity(),
    );
    Ok(())
}
