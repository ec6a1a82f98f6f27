//! git::sync
//!
//! Keeping the local deploy branch in step with its remote-tracking branch.
//!
//! Nothing here fetches; the remote-tracking ref is taken as it is. Only
//! fast-forwards are applied locally, and the push goes through the git
//! CLI so the user's credential helpers and remote configuration apply.

use std::fmt;
use std::process::Command;

use super::interface::{Git, GitError};
use crate::core::types::{BranchName, Oid, RefName};

/// Relationship between a local branch and its remote counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchStatus {
    Even,
    Ahead,
    Behind,
    Diverged,
}

impl fmt::Display for BranchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BranchStatus::Even => "even",
            BranchStatus::Ahead => "ahead",
            BranchStatus::Behind => "behind",
            BranchStatus::Diverged => "diverged",
        };
        f.write_str(text)
    }
}

/// What [`update_from_upstream`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No remote-tracking branch exists.
    NoUpstream,
    /// The local branch was missing and now points at the remote tip.
    Created(Oid),
    /// The local branch was behind and was fast-forwarded.
    FastForwarded { from: Oid, to: Oid },
    /// Even or ahead; the local branch was left alone.
    UpToDate(BranchStatus),
}

/// Compare two commits by their merge base.
///
/// Commits without a common ancestor are reported as diverged.
pub fn compare_commits(git: &Git, local: &Oid, remote: &Oid) -> Result<BranchStatus, GitError> {
    let Some(base) = git.merge_base(local, remote)? else {
        return Ok(BranchStatus::Diverged);
    };

    let status = match (&base == local, &base == remote) {
        (true, true) => BranchStatus::Even,
        (true, false) => BranchStatus::Behind,
        (false, true) => BranchStatus::Ahead,
        (false, false) => BranchStatus::Diverged,
    };
    Ok(status)
}

/// Bring the local `branch` up to date with `<remote>/<branch>`.
///
/// # Errors
///
/// - [`GitError::Diverged`] if both sides have commits the other lacks, or
///   the histories are unrelated
pub fn update_from_upstream(
    git: &Git,
    remote: &str,
    branch: &BranchName,
) -> Result<SyncOutcome, GitError> {
    let remote_ref = RefName::for_remote_branch(remote, branch)?;
    let Some(remote_tip) = git.try_resolve_ref(remote_ref.as_str())? else {
        tracing::debug!(remote_ref = %remote_ref, "no upstream branch");
        return Ok(SyncOutcome::NoUpstream);
    };

    let local_ref = RefName::for_branch(branch);
    let Some(local_tip) = git.try_resolve_ref(local_ref.as_str())? else {
        git.update_ref_cas(
            local_ref.as_str(),
            &remote_tip,
            None,
            &format!("docshelf: create from {remote_ref}"),
        )?;
        tracing::debug!(branch = %branch, tip = %remote_tip.short(7), "created from upstream");
        return Ok(SyncOutcome::Created(remote_tip));
    };

    let status = compare_commits(git, &local_tip, &remote_tip)?;
    tracing::debug!(branch = %branch, status = %status, "compared with upstream");

    match status {
        BranchStatus::Behind => {
            git.update_ref_cas(
                local_ref.as_str(),
                &remote_tip,
                Some(&local_tip),
                &format!("docshelf: fast-forward to {remote_ref}"),
            )?;
            Ok(SyncOutcome::FastForwarded {
                from: local_tip,
                to: remote_tip,
            })
        }
        BranchStatus::Diverged => Err(GitError::Diverged {
            branch: branch.to_string(),
            remote: remote.to_string(),
            unrelated: git.merge_base(&local_tip, &remote_tip)?.is_none(),
        }),
        other => Ok(SyncOutcome::UpToDate(other)),
    }
}

/// Push `branch` to `remote` with `git push -- <remote> <branch>`.
pub fn push_branch(git: &Git, remote: &str, branch: &BranchName) -> Result<(), GitError> {
    let command = format!("git push -- {remote} {branch}");
    tracing::debug!(command = %command, "pushing");

    let output = Command::new("git")
        .env("GIT_DIR", git.git_dir())
        .args(["push", "--", remote, branch.as_str()])
        .output()
        .map_err(|e| GitError::Command {
            command: command.clone(),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(GitError::Command {
            command,
            message: format!(
                "{}\n{}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display() {
        assert_eq!(BranchStatus::Even.to_string(), "even");
        assert_eq!(BranchStatus::Diverged.to_string(), "diverged");
    }
}
