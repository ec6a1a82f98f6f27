//! core::types
//!
//! Strong types shared by the registry, the git layer and the engine.
//!
//! # Types
//!
//! - [`BranchName`] - Validated name of the branch docs are deployed to
//! - [`Oid`] - Git object identifier (SHA)
//! - [`RefName`] - Fully qualified Git reference name
//! - [`FileMode`] - Tree entry mode accepted by the importer
//! - [`AliasStrategy`] - How alias directories are materialized
//!
//! # Examples
//!
//! ```
//! use docshelf::core::types::{BranchName, FileMode, Oid, RefName};
//!
//! let branch = BranchName::new("gh-pages").unwrap();
//! assert_eq!(RefName::for_branch(&branch).as_str(), "refs/heads/gh-pages");
//! assert_eq!(FileMode::Symlink.to_string(), "120000");
//!
//! assert!(BranchName::new("bad..name").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid ref name: {0}")]
    InvalidRefName(String),

    #[error("unsupported file mode: {0:o}")]
    InvalidFileMode(u32),

    #[error("unknown alias type '{0}', must be one of: symlink, copy, redirect")]
    InvalidAliasStrategy(String),
}

/// Characters git refuses anywhere in a ref name.
const FORBIDDEN_REF_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];

/// Shared `git check-ref-format` rules for branch and ref names.
///
/// Returns a description of the first violated rule.
fn check_ref_format(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("cannot be empty".into());
    }
    if name == "@" {
        return Err("cannot be '@' (reserved)".into());
    }
    if name.starts_with('/') || name.ends_with('/') {
        return Err("cannot start or end with '/'".into());
    }
    if name.ends_with('.') {
        return Err("cannot end with '.'".into());
    }
    for pattern in ["..", "@{", "//"] {
        if name.contains(pattern) {
            return Err(format!("cannot contain '{pattern}'"));
        }
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_REF_CHARS.contains(c)) {
        return Err(format!("cannot contain '{c}'"));
    }
    if name.chars().any(|c| c.is_ascii_control()) {
        return Err("cannot contain control characters".into());
    }
    for component in name.split('/') {
        if component.starts_with('.') {
            return Err("path component cannot start with '.'".into());
        }
        if component.ends_with(".lock") {
            return Err("path component cannot end with '.lock'".into());
        }
    }
    Ok(())
}

/// A validated Git branch name (short form, e.g. `gh-pages`).
///
/// ```
/// use docshelf::core::types::BranchName;
///
/// assert_eq!(BranchName::new("docs/site").unwrap().as_str(), "docs/site");
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("-flag").is_err());
/// assert!(BranchName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.starts_with('-') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot start with '-'".into(),
            ));
        }
        check_ref_format(&name)
            .map_err(|rule| TypeError::InvalidBranchName(format!("branch name {rule}")))?;
        Ok(Self(name))
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A Git object identifier (SHA-1 or SHA-256), normalized to lowercase.
///
/// ```
/// use docshelf::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(Self(oid))
    }

    /// Get an abbreviated form of the OID.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated, fully qualified Git reference name.
///
/// ```
/// use docshelf::core::types::{BranchName, RefName};
///
/// let branch = BranchName::new("gh-pages").unwrap();
/// assert_eq!(
///     RefName::for_remote_branch("origin", &branch).unwrap().as_str(),
///     "refs/remotes/origin/gh-pages"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RefName(String);

impl RefName {
    /// Create a new validated ref name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        check_ref_format(&name)
            .map_err(|rule| TypeError::InvalidRefName(format!("ref name {rule}")))?;
        Ok(Self(name))
    }

    /// The local branch ref (`refs/heads/<branch>`).
    pub fn for_branch(branch: &BranchName) -> Self {
        Self(format!("refs/heads/{}", branch.as_str()))
    }

    /// The remote-tracking ref (`refs/remotes/<remote>/<branch>`).
    pub fn for_remote_branch(remote: &str, branch: &BranchName) -> Result<Self, TypeError> {
        Self::new(format!("refs/remotes/{}/{}", remote, branch.as_str()))
    }

    /// Get the ref name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RefName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RefName> for String {
    fn from(name: RefName) -> Self {
        name.0
    }
}

impl AsRef<str> for RefName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RefName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mode of a tree entry written through the importer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FileMode {
    /// Plain file (`100644`).
    #[default]
    Regular,
    /// Executable file (`100755`).
    Executable,
    /// Symbolic link (`120000`); the content is the link target.
    Symlink,
}

impl FileMode {
    /// Octal mode as git stores it.
    pub fn bits(self) -> u32 {
        match self {
            FileMode::Regular => 0o100644,
            FileMode::Executable => 0o100755,
            FileMode::Symlink => 0o120000,
        }
    }

    /// Map raw tree-entry bits back to a mode.
    ///
    /// Git also records the legacy group-writable `100664`; it is read as a
    /// regular file.
    pub fn from_bits(bits: u32) -> Result<Self, TypeError> {
        match bits {
            0o100644 | 0o100664 => Ok(FileMode::Regular),
            0o100755 => Ok(FileMode::Executable),
            0o120000 => Ok(FileMode::Symlink),
            other => Err(TypeError::InvalidFileMode(other)),
        }
    }

    /// Mode for a file depending on its executable bit.
    pub fn for_file(executable: bool) -> Self {
        if executable {
            FileMode::Executable
        } else {
            FileMode::Regular
        }
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06o}", self.bits())
    }
}

/// How alias directories point at the canonical version directory.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum AliasStrategy {
    /// One symbolic link per alias, pointing at the version directory.
    #[default]
    Symlink,
    /// A full copy of every file under the alias directory.
    Copy,
    /// An HTML page per `.html` file redirecting to the canonical page.
    Redirect,
}

impl AliasStrategy {
    /// Name used in configuration files and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            AliasStrategy::Symlink => "symlink",
            AliasStrategy::Copy => "copy",
            AliasStrategy::Redirect => "redirect",
        }
    }
}

impl FromStr for AliasStrategy {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "symlink" => Ok(AliasStrategy::Symlink),
            "copy" => Ok(AliasStrategy::Copy),
            "redirect" => Ok(AliasStrategy::Redirect),
            other => Err(TypeError::InvalidAliasStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for AliasStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod branch_name {
        use super::*;

        #[test]
        fn valid_branch_names() {
            assert!(BranchName::new("gh-pages").is_ok());
            assert!(BranchName::new("docs/site").is_ok());
            assert!(BranchName::new("user@pages").is_ok());
            assert!(BranchName::new("with.dot").is_ok());
        }

        #[test]
        fn git_rules_rejected() {
            assert!(BranchName::new("").is_err());
            assert!(BranchName::new("@").is_err());
            assert!(BranchName::new(".hidden").is_err());
            assert!(BranchName::new("docs/.hidden").is_err());
            assert!(BranchName::new("-flag").is_err());
            assert!(BranchName::new("pages.lock").is_err());
            assert!(BranchName::new("pages/").is_err());
            assert!(BranchName::new("bad..path").is_err());
            assert!(BranchName::new("foo@{bar").is_err());
            assert!(BranchName::new("foo//bar").is_err());
        }

        #[test]
        fn special_chars_rejected() {
            for name in ["has space", "a~b", "a^b", "a:b", "a\\b", "a?b", "a*b", "a[b"] {
                assert!(BranchName::new(name).is_err(), "{name} accepted");
            }
            assert!(BranchName::new("has\ttab").is_err());
        }

        #[test]
        fn serde_roundtrip() {
            let name = BranchName::new("gh-pages").unwrap();
            let json = serde_json::to_string(&name).unwrap();
            assert_eq!(serde_json::from_str::<BranchName>(&json).unwrap(), name);
            assert!(serde_json::from_str::<BranchName>("\"bad..name\"").is_err());
        }
    }

    mod oid {
        use super::*;

        #[test]
        fn valid_lengths() {
            assert!(Oid::new("abc123def4567890abc123def4567890abc12345").is_ok());
            assert!(Oid::new("a".repeat(64)).is_ok());
            assert!(Oid::new("abc123").is_err());
        }

        #[test]
        fn non_hex_rejected() {
            assert!(Oid::new("xyz123def4567890abc123def4567890abc12345").is_err());
        }

        #[test]
        fn short_form_clamps() {
            let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
            assert_eq!(oid.short(7), "abc123d");
            assert_eq!(oid.short(100), oid.as_str());
        }
    }

    mod ref_name {
        use super::*;

        #[test]
        fn branch_refs() {
            let branch = BranchName::new("gh-pages").unwrap();
            let local = RefName::for_branch(&branch);
            assert_eq!(local.as_str(), "refs/heads/gh-pages");

            let remote = RefName::for_remote_branch("origin", &branch).unwrap();
            assert_eq!(remote.as_str(), "refs/remotes/origin/gh-pages");
        }

        #[test]
        fn invalid_remote_rejected() {
            let branch = BranchName::new("gh-pages").unwrap();
            assert!(RefName::for_remote_branch("bad remote", &branch).is_err());
        }

        #[test]
        fn invalid_refs_rejected() {
            assert!(RefName::new("").is_err());
            assert!(RefName::new("/refs/heads/main").is_err());
            assert!(RefName::new("refs/heads/main.lock").is_err());
            assert!(RefName::new("refs//heads").is_err());
        }
    }

    mod file_mode {
        use super::*;

        #[test]
        fn octal_display() {
            assert_eq!(FileMode::Regular.to_string(), "100644");
            assert_eq!(FileMode::Executable.to_string(), "100755");
            assert_eq!(FileMode::Symlink.to_string(), "120000");
        }

        #[test]
        fn from_bits() {
            assert_eq!(FileMode::from_bits(0o100644).unwrap(), FileMode::Regular);
            assert_eq!(FileMode::from_bits(0o100664).unwrap(), FileMode::Regular);
            assert_eq!(FileMode::from_bits(0o120000).unwrap(), FileMode::Symlink);
            assert_eq!(
                FileMode::from_bits(0o040000),
                Err(TypeError::InvalidFileMode(0o040000))
            );
        }

        #[test]
        fn executable_bit() {
            assert_eq!(FileMode::for_file(true), FileMode::Executable);
            assert_eq!(FileMode::for_file(false), FileMode::Regular);
        }
    }

    mod alias_strategy {
        use super::*;

        #[test]
        fn parse_and_display() {
            for strategy in [
                AliasStrategy::Symlink,
                AliasStrategy::Copy,
                AliasStrategy::Redirect,
            ] {
                assert_eq!(strategy.as_str().parse::<AliasStrategy>().unwrap(), strategy);
            }
            assert!("hardlink".parse::<AliasStrategy>().is_err());
        }

        #[test]
        fn default_is_symlink() {
            assert_eq!(AliasStrategy::default(), AliasStrategy::Symlink);
        }

        #[test]
        fn serde_lowercase() {
            let json = serde_json::to_string(&AliasStrategy::Redirect).unwrap();
            assert_eq!(json, "\"redirect\"");
        }
    }
}
