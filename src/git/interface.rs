//! git::interface
//!
//! Repository reads and ref mutations using git2.
//!
//! # Architecture
//!
//! The `Git` struct is the read side of the git layer: ref resolution,
//! compare-and-swap ref updates, ancestry, configuration and tree reads on
//! the deploy branch. Commits are not written here; they are streamed to
//! `git fast-import` by [`crate::git::import`], which uses this handle to
//! inspect and roll back what it wrote.
//!
//! No module outside `git` imports `git2`.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: Not inside a Git repository
//! - [`GitError::RefNotFound`]: Requested ref does not exist
//! - [`GitError::CasFailed`]: Compare-and-swap precondition failed
//! - [`GitError::Diverged`]: Local and remote deploy branches have diverged
//! - [`GitError::CommitWrite`]: The importer failed; carries its diagnostics
//! - [`GitError::EmptyCommit`]: A commit changed nothing and was rolled back
//!
//! # Example
//!
//! ```ignore
//! use docshelf::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! let branch = BranchName::new("gh-pages")?;
//! if let Some(bytes) = git.read_file(&branch, "versions.json")? {
//!     println!("{}", String::from_utf8_lossy(&bytes));
//! }
//! ```

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use chrono::Offset;
use thiserror::Error;

use crate::core::paths::{self, PathError};
use crate::core::types::{BranchName, FileMode, Oid, RefName, TypeError};

/// Symlink hops followed before a lookup is declared a loop.
const MAX_SYMLINK_HOPS: usize = 40;

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found
        refname: String,
    },

    /// Compare-and-swap precondition failed.
    #[error("CAS failed for {refname}: expected {expected}, found {actual}")]
    CasFailed {
        /// The ref being updated
        refname: String,
        /// The expected old value
        expected: String,
        /// The actual current value
        actual: String,
    },

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The OID that was not found
        oid: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// Invalid ref or branch name.
    #[error("invalid ref name: {message}")]
    InvalidRefName {
        /// Description of the problem
        message: String,
    },

    /// A tree path could not be encoded or escapes the tree.
    #[error("invalid tree path: {0}")]
    InvalidPath(#[from] PathError),

    /// Symlinks inside the deploy branch form a cycle.
    #[error("too many levels of symbolic links: {path}")]
    SymlinkLoop {
        /// The path being resolved
        path: String,
    },

    /// Local and remote deploy branches have diverged.
    #[error("{branch} has diverged from {remote}/{branch}")]
    Diverged {
        /// The deploy branch
        branch: String,
        /// The remote it was compared with
        remote: String,
        /// True when the two histories share no commit at all
        unrelated: bool,
    },

    /// The importer exited unsuccessfully or its pipe broke.
    #[error("failed to write commit:\n{diagnostics}")]
    CommitWrite {
        /// Everything the importer wrote to stderr
        diagnostics: String,
    },

    /// The commit changed nothing and empty commits were not allowed.
    #[error("nothing changed on {branch}; commit discarded")]
    EmptyCommit {
        /// The branch that was left untouched
        branch: String,
    },

    /// A commit session was used after it aborted.
    #[error("commit session is already closed")]
    SessionClosed,

    /// A committer date override could not be parsed.
    #[error("invalid date '{value}'")]
    InvalidDate {
        /// The rejected value
        value: String,
    },

    /// Committer identity is not configured.
    #[error("{key} is not set; configure it with `git config {key} ...`")]
    MissingIdentity {
        /// The missing configuration key
        key: String,
    },

    /// A git subprocess could not be run or failed.
    #[error("`{command}` failed: {message}")]
    Command {
        /// The command line
        command: String,
        /// Exit status or spawn error, plus stderr
        message: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => {
                if context.starts_with("refs/") || context.contains("ref") {
                    GitError::RefNotFound {
                        refname: context.to_string(),
                    }
                } else {
                    GitError::ObjectNotFound {
                        oid: context.to_string(),
                    }
                }
            }
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => GitError::InvalidOid { oid: msg },
            TypeError::InvalidRefName(msg) | TypeError::InvalidBranchName(msg) => {
                GitError::InvalidRefName { message: msg }
            }
            other => GitError::Internal {
                message: other.to_string(),
            },
        }
    }
}

/// Information about a commit.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    /// The commit OID
    pub oid: Oid,
    /// First line of the message
    pub summary: String,
    /// Full commit message
    pub message: String,
    /// Committer name
    pub committer_name: String,
    /// Committer email
    pub committer_email: String,
    /// Committer timestamp with its original offset
    pub committer_time: chrono::DateTime<chrono::FixedOffset>,
}

/// A file stored on a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeFile {
    /// Path relative to the listed directory
    pub path: String,
    /// Blob contents (the link target for symlinks)
    pub data: Vec<u8>,
    /// Tree entry mode
    pub mode: FileMode,
}

/// A resolved tree entry.
struct Entry {
    id: git2::Oid,
    mode: i32,
    kind: Option<git2::ObjectType>,
}

fn to_git2_oid(oid: &Oid) -> Result<git2::Oid, GitError> {
    git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))
}

fn from_git2_oid(oid: git2::Oid) -> Result<Oid, GitError> {
    Oid::new(oid.to_string()).map_err(GitError::from)
}

/// Handle to a repository.
pub struct Git {
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Opening and Info
    // =========================================================================

    /// Open the repository containing `path`.
    ///
    /// Bare repositories are accepted; the deploy branch never needs a
    /// working tree.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;
        Ok(Self { repo })
    }

    /// The `.git` directory (or the repository itself when bare).
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    /// The working tree, if the repository has one.
    pub fn work_dir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    /// Read a string from the repository's configuration (including global
    /// and system scopes).
    pub fn config_string(&self, key: &str) -> Result<Option<String>, GitError> {
        let config = self
            .repo
            .config()
            .map_err(|e| GitError::from_git2(e, "config"))?;
        match config.get_string(key) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, key)),
        }
    }

    // =========================================================================
    // Ref Resolution
    // =========================================================================

    /// Resolve a ref to its target commit.
    ///
    /// # Errors
    ///
    /// - [`GitError::RefNotFound`] if the ref doesn't exist
    pub fn resolve_ref(&self, refname: &str) -> Result<Oid, GitError> {
        let reference = self
            .repo
            .find_reference(refname)
            .map_err(|e| GitError::from_git2(e, refname))?;

        let oid = reference
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, refname))?
            .id();

        from_git2_oid(oid)
    }

    /// Resolve a ref, returning None if it doesn't exist.
    pub fn try_resolve_ref(&self, refname: &str) -> Result<Option<Oid>, GitError> {
        match self.resolve_ref(refname) {
            Ok(oid) => Ok(Some(oid)),
            Err(GitError::RefNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Tip of a local branch, if it exists.
    pub fn branch_tip(&self, branch: &BranchName) -> Result<Option<Oid>, GitError> {
        self.try_resolve_ref(RefName::for_branch(branch).as_str())
    }

    /// HEAD commit of the repository, or `None` when HEAD is unborn.
    pub fn head_oid(&self) -> Result<Option<Oid>, GitError> {
        match self.repo.head() {
            Ok(head) => {
                let oid = head
                    .peel_to_commit()
                    .map_err(|e| GitError::from_git2(e, "HEAD"))?
                    .id();
                from_git2_oid(oid).map(Some)
            }
            Err(e)
                if e.code() == git2::ErrorCode::UnbornBranch
                    || e.code() == git2::ErrorCode::NotFound =>
            {
                Ok(None)
            }
            Err(e) => Err(GitError::from_git2(e, "HEAD")),
        }
    }

    // =========================================================================
    // CAS Ref Operations
    // =========================================================================

    /// Update a ref with compare-and-swap semantics.
    ///
    /// The update only succeeds if the ref's current value matches
    /// `expected_old`. If `expected_old` is `None`, the ref must not exist.
    ///
    /// # Errors
    ///
    /// - [`GitError::CasFailed`] if the current value doesn't match expected
    pub fn update_ref_cas(
        &self,
        refname: &str,
        new_oid: &Oid,
        expected_old: Option<&Oid>,
        message: &str,
    ) -> Result<(), GitError> {
        let current = self.try_resolve_ref_raw(refname)?;

        match (expected_old, current.as_ref()) {
            (Some(expected), Some(actual)) if expected.as_str() != actual => {
                return Err(GitError::CasFailed {
                    refname: refname.to_string(),
                    expected: expected.to_string(),
                    actual: actual.clone(),
                });
            }
            (Some(expected), None) => {
                return Err(GitError::CasFailed {
                    refname: refname.to_string(),
                    expected: expected.to_string(),
                    actual: "<none>".to_string(),
                });
            }
            (None, Some(actual)) => {
                return Err(GitError::CasFailed {
                    refname: refname.to_string(),
                    expected: "<none>".to_string(),
                    actual: actual.clone(),
                });
            }
            _ => {}
        }

        self.repo
            .reference(refname, to_git2_oid(new_oid)?, true, message)
            .map_err(|e| GitError::from_git2(e, refname))?;

        Ok(())
    }

    /// Delete a ref with compare-and-swap semantics.
    ///
    /// # Errors
    ///
    /// - [`GitError::CasFailed`] if the current value doesn't match expected
    /// - [`GitError::RefNotFound`] if the ref doesn't exist
    pub fn delete_ref_cas(&self, refname: &str, expected_old: &Oid) -> Result<(), GitError> {
        match self.try_resolve_ref_raw(refname)? {
            None => {
                return Err(GitError::RefNotFound {
                    refname: refname.to_string(),
                });
            }
            Some(actual) if actual != expected_old.as_str() => {
                return Err(GitError::CasFailed {
                    refname: refname.to_string(),
                    expected: expected_old.to_string(),
                    actual,
                });
            }
            _ => {}
        }

        let mut reference = self
            .repo
            .find_reference(refname)
            .map_err(|e| GitError::from_git2(e, refname))?;

        reference
            .delete()
            .map_err(|e| GitError::from_git2(e, refname))?;

        Ok(())
    }

    /// Resolve a ref to its raw target OID string.
    fn try_resolve_ref_raw(&self, refname: &str) -> Result<Option<String>, GitError> {
        match self.repo.find_reference(refname) {
            Ok(reference) => {
                let resolved = reference.resolve().unwrap_or(reference);
                let oid = resolved.target().ok_or_else(|| GitError::Internal {
                    message: format!("ref {} has no target", refname),
                })?;
                Ok(Some(oid.to_string()))
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, refname)),
        }
    }

    // =========================================================================
    // Ancestry Queries
    // =========================================================================

    /// Find the merge base (common ancestor) of two commits.
    ///
    /// Returns `None` if there is no common ancestor.
    pub fn merge_base(&self, oid1: &Oid, oid2: &Oid) -> Result<Option<Oid>, GitError> {
        match self.repo.merge_base(to_git2_oid(oid1)?, to_git2_oid(oid2)?) {
            Ok(oid) => Ok(Some(from_git2_oid(oid)?)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::Internal {
                message: e.message().to_string(),
            }),
        }
    }

    // =========================================================================
    // Commit Information
    // =========================================================================

    fn find_commit(&self, oid: &Oid) -> Result<git2::Commit<'_>, GitError> {
        self.repo
            .find_commit(to_git2_oid(oid)?)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))
    }

    /// Get information about a commit.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if the commit doesn't exist
    pub fn commit_info(&self, oid: &Oid) -> Result<CommitInfo, GitError> {
        let commit = self.find_commit(oid)?;
        let committer = commit.committer();
        let when = committer.when();

        let offset = chrono::FixedOffset::east_opt(when.offset_minutes() * 60)
            .unwrap_or_else(|| chrono::Utc.fix());
        let committer_time = chrono::DateTime::from_timestamp(when.seconds(), 0)
            .unwrap_or(chrono::DateTime::UNIX_EPOCH)
            .with_timezone(&offset);

        Ok(CommitInfo {
            oid: oid.clone(),
            summary: commit.summary().unwrap_or("").to_string(),
            message: commit.message().unwrap_or("").to_string(),
            committer_name: committer.name().unwrap_or("").to_string(),
            committer_email: committer.email().unwrap_or("").to_string(),
            committer_time,
        })
    }

    /// Get the parent OIDs of a commit.
    ///
    /// Returns empty vec for root commits.
    pub fn commit_parents(&self, oid: &Oid) -> Result<Vec<Oid>, GitError> {
        self.find_commit(oid)?
            .parent_ids()
            .map(from_git2_oid)
            .collect()
    }

    /// Tree of a commit.
    pub fn commit_tree(&self, oid: &Oid) -> Result<Oid, GitError> {
        from_git2_oid(self.find_commit(oid)?.tree_id())
    }

    /// Whether a tree has no entries.
    pub fn tree_is_empty(&self, tree: &Oid) -> Result<bool, GitError> {
        let tree = self
            .repo
            .find_tree(to_git2_oid(tree)?)
            .map_err(|e| GitError::from_git2(e, tree.as_str()))?;
        Ok(tree.is_empty())
    }

    // =========================================================================
    // Tree Reads
    // =========================================================================

    fn branch_tree(&self, branch: &BranchName) -> Result<Option<git2::Tree<'_>>, GitError> {
        let Some(tip) = self.branch_tip(branch)? else {
            return Ok(None);
        };
        let tree = self
            .find_commit(&tip)?
            .tree()
            .map_err(|e| GitError::from_git2(e, tip.as_str()))?;
        Ok(Some(tree))
    }

    fn entry_at(root: &git2::Tree<'_>, path: &str) -> Result<Option<Entry>, GitError> {
        if path.is_empty() {
            return Ok(Some(Entry {
                id: root.id(),
                mode: 0o040000,
                kind: Some(git2::ObjectType::Tree),
            }));
        }
        match root.get_path(Path::new(path)) {
            Ok(entry) => Ok(Some(Entry {
                id: entry.id(),
                mode: entry.filemode(),
                kind: entry.kind(),
            })),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, path)),
        }
    }

    /// Resolve `path` inside `root`, following symlinks in every component.
    ///
    /// Links are interpreted relative to the directory containing them.
    /// Absolute targets and targets that climb above the tree root resolve
    /// to nothing.
    fn resolve_path(&self, root: &git2::Tree<'_>, path: &str) -> Result<Option<Entry>, GitError> {
        let mut remaining: VecDeque<String> = paths::normalize(path)
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        let mut resolved: Vec<String> = Vec::new();
        let mut hops = 0;

        while let Some(component) = remaining.pop_front() {
            match component.as_str() {
                "" | "." => continue,
                ".." => {
                    if resolved.pop().is_none() {
                        return Ok(None);
                    }
                    continue;
                }
                _ => {}
            }

            let candidate = paths::join(&[&resolved.join("/"), &component]);
            let Some(entry) = Self::entry_at(root, &candidate)? else {
                return Ok(None);
            };

            if entry.mode == FileMode::Symlink.bits() as i32 {
                hops += 1;
                if hops > MAX_SYMLINK_HOPS {
                    return Err(GitError::SymlinkLoop {
                        path: path.to_string(),
                    });
                }
                let blob = self
                    .repo
                    .find_blob(entry.id)
                    .map_err(|e| GitError::from_git2(e, &candidate))?;
                let target = String::from_utf8_lossy(blob.content()).into_owned();
                if target.starts_with('/') {
                    return Ok(None);
                }
                for part in target.split('/').rev() {
                    remaining.push_front(part.to_string());
                }
            } else {
                resolved.push(component);
            }
        }

        Self::entry_at(root, &resolved.join("/"))
    }

    /// Read a file from the tip of `branch`.
    ///
    /// Symlinks inside the branch tree are followed. Returns `None` if the
    /// branch, the path, or a link target does not exist, or if the path
    /// names a directory.
    pub fn read_file(&self, branch: &BranchName, path: &str) -> Result<Option<Vec<u8>>, GitError> {
        let Some(root) = self.branch_tree(branch)? else {
            return Ok(None);
        };
        match self.resolve_path(&root, path)? {
            Some(entry) if entry.kind == Some(git2::ObjectType::Blob) => {
                let blob = self
                    .repo
                    .find_blob(entry.id)
                    .map_err(|e| GitError::from_git2(e, path))?;
                Ok(Some(blob.content().to_vec()))
            }
            _ => Ok(None),
        }
    }

    /// List every file below `prefix` on the tip of `branch`.
    ///
    /// Paths are relative to `prefix` and sorted. Symlinks are returned as
    /// links; submodule entries are skipped. A missing branch or directory
    /// yields an empty list.
    pub fn list_files(&self, branch: &BranchName, prefix: &str) -> Result<Vec<TreeFile>, GitError> {
        let Some(root) = self.branch_tree(branch)? else {
            return Ok(Vec::new());
        };
        let dir = match self.resolve_path(&root, prefix)? {
            Some(entry) if entry.kind == Some(git2::ObjectType::Tree) => self
                .repo
                .find_tree(entry.id)
                .map_err(|e| GitError::from_git2(e, prefix))?,
            _ => return Ok(Vec::new()),
        };

        let mut found = Vec::new();
        dir.walk(git2::TreeWalkMode::PreOrder, |parent, entry| {
            if entry.kind() == Some(git2::ObjectType::Blob) {
                if let Some(name) = entry.name() {
                    found.push((format!("{parent}{name}"), entry.id(), entry.filemode()));
                }
            }
            git2::TreeWalkResult::Ok
        })
        .map_err(|e| GitError::from_git2(e, prefix))?;

        let mut files = found
            .into_iter()
            .map(|(path, id, mode)| {
                let blob = self
                    .repo
                    .find_blob(id)
                    .map_err(|e| GitError::from_git2(e, &path))?;
                Ok(TreeFile {
                    path,
                    data: blob.content().to_vec(),
                    mode: FileMode::from_bits(mode as u32)?,
                })
            })
            .collect::<Result<Vec<_>, GitError>>()?;
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod errors {
        use super::*;

        #[test]
        fn display_formatting() {
            let err = GitError::Diverged {
                branch: "gh-pages".into(),
                remote: "origin".into(),
                unrelated: false,
            };
            assert_eq!(err.to_string(), "gh-pages has diverged from origin/gh-pages");

            let err = GitError::EmptyCommit {
                branch: "gh-pages".into(),
            };
            assert!(err.to_string().contains("gh-pages"));

            let err = GitError::MissingIdentity {
                key: "user.email".into(),
            };
            assert!(err.to_string().contains("git config user.email"));
        }

        #[test]
        fn type_errors_convert() {
            let err: GitError = TypeError::InvalidBranchName("x".into()).into();
            assert!(matches!(err, GitError::InvalidRefName { .. }));
            let err: GitError = TypeError::InvalidOid("zz".into()).into();
            assert!(matches!(err, GitError::InvalidOid { .. }));
        }

        #[test]
        fn path_errors_convert() {
            let err: GitError = PathError::EscapesRoot("../x".into()).into();
            assert!(matches!(err, GitError::InvalidPath(_)));
        }
    }
}
