//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **only doorway** to Git. Reads and ref mutations use
//! `git2`; commits are streamed to `git fast-import`; pushing shells out to
//! `git push`. No other module imports `git2` or spawns git.
//!
//! # Responsibilities
//!
//! - Repository discovery and opening ([`Git`])
//! - Ref operations with CAS semantics
//! - Tree reads on the deploy branch, following in-tree symlinks
//! - Commit sessions ([`CommitSession`], [`with_commit`])
//! - Upstream comparison, fast-forward and push ([`sync`])
//!
//! # Invariants
//!
//! - All ref updates use CAS (compare-and-swap) semantics
//! - A commit session either creates exactly one commit or leaves the
//!   branch untouched
//! - All operations return strong types (Oid, BranchName, RefName)

pub mod import;
mod interface;
pub mod sync;

pub use import::{with_commit, CommitOptions, CommitSession, CommitTime, IdentityOverrides};
pub use interface::{CommitInfo, Git, GitError, TreeFile};
pub use sync::{BranchStatus, SyncOutcome};
