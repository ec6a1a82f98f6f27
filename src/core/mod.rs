//! core
//!
//! Core domain types, schemas, and pure operations for docshelf.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid, RefName, FileMode, AliasStrategy
//! - [`paths`] - Tree path normalization and quoting
//! - [`versions`] - The version/alias registry stored on the deploy branch
//! - [`config`] - Configuration schema and loading
//!
//! Nothing in this module touches a repository.

pub mod config;
pub mod paths;
pub mod types;
pub mod versions;
