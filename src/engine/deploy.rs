//! engine::deploy
//!
//! Deploying a built site as a version, and attaching aliases to an
//! existing version.

use super::{
    list_versions, write_registry, AliasStyle, CommitSettings, OperationError, SiteSource,
    Target, NOJEKYLL_FILE, TOOL_VERSION,
};
use crate::core::types::{FileMode, Oid};
use crate::core::versions::{RegistryError, VersionEntry};
use crate::git::{with_commit, Git, TreeFile};

/// What to deploy.
#[derive(Debug, Clone)]
pub struct DeployRequest<'a> {
    pub version: &'a str,
    pub title: Option<&'a str>,
    pub aliases: &'a [String],
    /// Move aliases that currently belong to another version.
    pub update_aliases: bool,
}

/// Outcome of [`deploy`] and [`alias`].
#[derive(Debug, Clone)]
pub struct DeployResult {
    pub commit: Oid,
    /// The version's registry entry after the operation.
    pub entry: VersionEntry,
    /// Aliases written by this operation.
    pub written_aliases: Vec<String>,
}

/// Deploy `site` as `request.version`.
///
/// The version directory and every alias directory are replaced wholesale.
pub fn deploy(
    git: &Git,
    target: &Target,
    settings: &CommitSettings,
    request: &DeployRequest<'_>,
    site: &dyn SiteSource,
    style: AliasStyle<'_>,
) -> Result<DeployResult, OperationError> {
    let mut registry = list_versions(git, target)?;
    let entry = registry
        .add(
            request.version,
            request.title,
            request.aliases,
            request.update_aliases,
        )?
        .clone();

    let files: Vec<TreeFile> = site
        .files()?
        .into_iter()
        .map(|f| f.into_tree_file())
        .collect();

    let message = settings.message_or(|| {
        let revision = match git.head_oid() {
            Ok(Some(head)) => format!("{} ", head.short(7)),
            _ => String::new(),
        };
        format!(
            "Deployed {}to {}{} with docshelf {}",
            revision,
            entry.version,
            target.message_suffix(),
            TOOL_VERSION
        )
    });

    let version_dir = target.path(&entry.version);
    let alias_dirs: Vec<String> = entry.aliases.iter().map(|a| target.path(a)).collect();

    tracing::debug!(
        version = %entry.version,
        aliases = entry.aliases.len(),
        files = files.len(),
        strategy = %style.strategy,
        "deploying"
    );

    let commit = with_commit(git, &target.branch, &message, &settings.options(), |session| {
        let mut replaced = vec![version_dir.clone()];
        replaced.extend(alias_dirs.iter().cloned());
        session.delete_paths(&replaced)?;

        for file in &files {
            session.add_file(&version_dir, file)?;
        }
        style.write(session, &version_dir, &files, &alias_dirs)?;

        write_registry(session, target, &registry)?;
        session.write_file(NOJEKYLL_FILE, b"", FileMode::Regular)?;
        Ok::<(), OperationError>(())
    })?;

    Ok(DeployResult {
        commit,
        written_aliases: entry.aliases.iter().cloned().collect(),
        entry,
    })
}

/// What to alias.
#[derive(Debug, Clone)]
pub struct AliasRequest<'a> {
    /// A version or an alias of it.
    pub identifier: &'a str,
    pub aliases: &'a [String],
    pub update_aliases: bool,
}

/// Attach aliases to an existing version.
///
/// Only aliases the version did not already have are written; their
/// contents come from the version directory on the deploy branch.
pub fn alias(
    git: &Git,
    target: &Target,
    settings: &CommitSettings,
    request: &AliasRequest<'_>,
    style: AliasStyle<'_>,
) -> Result<DeployResult, OperationError> {
    let mut registry = list_versions(git, target)?;
    let version = registry
        .find_strict(request.identifier)?
        .version()
        .to_string();

    let message = settings.message_or(|| {
        format!(
            "Copied {} to {}{} with docshelf {}",
            version,
            request.aliases.join(", "),
            target.message_suffix(),
            TOOL_VERSION
        )
    });

    let added = registry.update(&version, None, request.aliases, request.update_aliases)?;
    let entry = registry
        .get(&version)
        .cloned()
        .ok_or_else(|| RegistryError::NotFound(version.clone()))?;

    let canonical_dir = target.path(&version);
    let alias_dirs: Vec<String> = added.iter().map(|a| target.path(a)).collect();
    let files = if alias_dirs.is_empty() {
        Vec::new()
    } else {
        git.list_files(&target.branch, &canonical_dir)?
    };

    tracing::debug!(
        version = %version,
        added = alias_dirs.len(),
        files = files.len(),
        strategy = %style.strategy,
        "adding aliases"
    );

    let commit = with_commit(git, &target.branch, &message, &settings.options(), |session| {
        session.delete_paths(&alias_dirs)?;
        style.write(session, &canonical_dir, &files, &alias_dirs)?;
        write_registry(session, target, &registry)?;
        Ok::<(), OperationError>(())
    })?;

    Ok(DeployResult {
        commit,
        entry,
        written_aliases: added.into_iter().collect(),
    })
}
