//! docshelf - Deploy versioned documentation to a git branch
//!
//! docshelf keeps several versions of a static documentation site side by
//! side on one branch (typically `gh-pages`), each in its own directory,
//! with aliases such as `latest` and a `versions.json` registry that a
//! version selector can read.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Deploy, alias, delete, retitle and set-default operations
//! - [`core`] - Domain types, paths, the version registry, configuration
//! - [`git`] - Repository reads, the commit session, branch sync
//! - [`ui`] - User-facing output
//!
//! # Correctness Invariants
//!
//! 1. Every operation produces at most one commit on the deploy branch
//! 2. The working tree and index of the source repository are never touched
//! 3. A failed or empty operation leaves the branch tip where it was
//! 4. `versions.json` always describes the directories on the branch

pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
pub mod ui;
