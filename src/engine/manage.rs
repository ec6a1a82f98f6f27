//! engine::manage
//!
//! Registry maintenance: deleting versions and aliases, retitling, and
//! pointing the branch root at a default version.

use super::{
    list_versions, write_registry, CommitSettings, OperationError, RedirectRenderer, Target,
    TOOL_VERSION,
};
use crate::core::types::{FileMode, Oid};
use crate::core::versions::{RegistryError, Removed};
use crate::git::with_commit;
use crate::git::Git;

/// What [`delete`] removes.
#[derive(Debug, Clone, Copy)]
pub enum DeleteTarget<'a> {
    /// Everything under the deploy prefix (or the whole branch).
    All,
    /// Specific versions and/or aliases.
    Identifiers(&'a [String]),
}

/// Outcome of [`delete`].
#[derive(Debug, Clone)]
pub struct DeleteResult {
    pub commit: Oid,
    /// Registry entries removed; empty for [`DeleteTarget::All`].
    pub removed: Vec<Removed>,
}

/// Delete versions or aliases.
///
/// A removed version takes its directory and every alias directory with
/// it; a removed alias takes only its own directory.
pub fn delete(
    git: &Git,
    target: &Target,
    settings: &CommitSettings,
    what: DeleteTarget<'_>,
) -> Result<DeleteResult, OperationError> {
    let message = settings.message_or(|| {
        let subject = match what {
            DeleteTarget::All => "everything".to_string(),
            DeleteTarget::Identifiers(ids) => ids.join(", "),
        };
        format!(
            "Removed {}{} with docshelf {}",
            subject,
            target.message_suffix(),
            TOOL_VERSION
        )
    });
    let options = settings.options();

    match what {
        DeleteTarget::All => {
            tracing::debug!(prefix = %target.deploy_prefix(), "deleting everything");
            let commit = with_commit(git, &target.branch, &message, &options, |session| {
                if target.deploy_prefix().is_empty() {
                    session.delete_all()
                } else {
                    session.delete_paths(&[target.deploy_prefix()])
                }
            })
            .map_err(OperationError::from)?;
            Ok(DeleteResult {
                commit,
                removed: Vec::new(),
            })
        }
        DeleteTarget::Identifiers(ids) => {
            let mut registry = list_versions(git, target)?;
            let removed = registry.remove_many(ids)?;

            let doomed: Vec<String> = removed
                .iter()
                .flat_map(|r| match r {
                    Removed::Version(entry) => {
                        entry.identifiers().map(|i| target.path(i)).collect::<Vec<_>>()
                    }
                    Removed::Alias { alias, .. } => vec![target.path(alias)],
                })
                .collect();
            tracing::debug!(removed = removed.len(), paths = doomed.len(), "deleting");

            let commit = with_commit(git, &target.branch, &message, &options, |session| {
                session.delete_paths(&doomed)?;
                write_registry(session, target, &registry)?;
                Ok::<(), OperationError>(())
            })?;
            Ok(DeleteResult { commit, removed })
        }
    }
}

/// Change the title of a version.
pub fn retitle(
    git: &Git,
    target: &Target,
    settings: &CommitSettings,
    identifier: &str,
    title: &str,
) -> Result<Oid, OperationError> {
    let mut registry = list_versions(git, target)?;
    registry.update(identifier, Some(title), &[], false)?;

    let message = settings.message_or(|| {
        format!(
            "Set title of {} to {}{} with docshelf {}",
            identifier,
            title,
            target.message_suffix(),
            TOOL_VERSION
        )
    });

    with_commit(git, &target.branch, &message, &settings.options(), |session| {
        write_registry(session, target, &registry)?;
        Ok::<(), OperationError>(())
    })
}

/// Write `<prefix>/index.html` redirecting to `identifier`.
pub fn set_default(
    git: &Git,
    target: &Target,
    settings: &CommitSettings,
    identifier: &str,
    renderer: &dyn RedirectRenderer,
) -> Result<Oid, OperationError> {
    let registry = list_versions(git, target)?;
    if registry.find(identifier).is_none() {
        return Err(RegistryError::NotFound(identifier.to_string()).into());
    }

    let message = settings.message_or(|| {
        format!(
            "Set default version to {}{} with docshelf {}",
            identifier,
            target.message_suffix(),
            TOOL_VERSION
        )
    });
    let page = renderer.render(&format!("{identifier}/"));

    with_commit(git, &target.branch, &message, &settings.options(), |session| {
        session.write_file(&target.path("index.html"), page.as_bytes(), FileMode::Regular)?;
        Ok::<(), OperationError>(())
    })
}
