//! core::versions
//!
//! The version/alias registry stored as `versions.json` on the deploy branch.
//!
//! # Model
//!
//! A [`VersionRegistry`] maps version strings to [`VersionEntry`] values.
//! Each entry carries a display title and a set of aliases. Version strings
//! and alias strings share one namespace: no string is both a version and an
//! alias, and no alias belongs to two versions.
//!
//! # Failure semantics
//!
//! Every mutating operation validates its whole input before touching the
//! registry. On error the registry is exactly as it was.
//!
//! # Ordering
//!
//! Iteration is newest first. Strings that do not start with a digit (or
//! `v` and a digit) are development versions and sort before all releases;
//! within each group versions compare by [`loose_key`].
//!
//! # Example
//!
//! ```
//! use docshelf::core::versions::{VersionKey, VersionRegistry};
//!
//! let mut registry = VersionRegistry::new();
//! registry.add("1.0", None, &["latest".to_string()], false).unwrap();
//!
//! assert_eq!(
//!     registry.find("latest"),
//!     Some(VersionKey::Alias { version: "1.0".into(), alias: "latest".into() })
//! );
//!
//! let text = registry.dumps();
//! assert_eq!(VersionRegistry::loads(&text).unwrap(), registry);
//! ```

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the registry file inside the deploy prefix.
pub const VERSIONS_FILE: &str = "versions.json";

/// Which kind of identifier failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Version,
    Alias,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierKind::Version => f.write_str("version"),
            IdentifierKind::Alias => f.write_str("alias"),
        }
    }
}

/// Why an alias could not be attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictReason {
    /// The alias is already the name of a version.
    AliasIsVersion,
    /// The alias belongs to another version and migration was not allowed.
    AliasTaken { owner: String },
    /// A new version's name is already an alias of another version.
    VersionIsAlias { owner: String },
    /// The alias repeats the version it would be attached to.
    SameAsVersion,
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictReason::AliasIsVersion => f.write_str("already specified as a version"),
            ConflictReason::AliasTaken { owner } => {
                write!(f, "already exists for version '{owner}'")
            }
            ConflictReason::VersionIsAlias { owner } => {
                write!(f, "already exists as an alias of version '{owner}'")
            }
            ConflictReason::SameAsVersion => f.write_str("duplicates the version name"),
        }
    }
}

/// Errors from registry operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Malformed version or alias string.
    #[error("'{value}' is not a valid {kind}")]
    Invalid { value: String, kind: IdentifierKind },

    /// The identifier is neither a version nor an alias.
    #[error("identifier '{0}' does not exist")]
    NotFound(String),

    /// A version/alias name collision.
    #[error("'{alias}' {reason}")]
    AliasConflict { alias: String, reason: ConflictReason },

    /// The registry file could not be parsed.
    #[error("failed to parse {VERSIONS_FILE}: {0}")]
    Parse(String),
}

/// Result of resolving an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionKey {
    /// The identifier is a version string.
    Version(String),
    /// The identifier is an alias of `version`.
    Alias { version: String, alias: String },
}

impl VersionKey {
    /// The version that owns this identifier.
    pub fn version(&self) -> &str {
        match self {
            VersionKey::Version(version) => version,
            VersionKey::Alias { version, .. } => version,
        }
    }
}

/// What a removal took out of the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removed {
    /// A whole version, with every alias it had.
    Version(VersionEntry),
    /// A single alias detached from `version`.
    Alias { version: String, alias: String },
}

/// One deployed version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub version: String,
    pub title: String,
    pub aliases: BTreeSet<String>,
}

impl VersionEntry {
    /// Every identifier that maps to this entry's files, version first.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.version.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// On-disk shape of one entry; `title` may be missing in hand-written files.
#[derive(Deserialize)]
struct RawEntry {
    version: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    aliases: Vec<String>,
}

/// Check a version or alias string.
///
/// Identifiers become directory names, so they must be a single non-special
/// path component.
pub fn validate_identifier(value: &str, kind: IdentifierKind) -> Result<(), RegistryError> {
    if value.is_empty() || value == "." || value == ".." || value.contains(['/', '\\']) {
        return Err(RegistryError::Invalid {
            value: value.to_string(),
            kind,
        });
    }
    Ok(())
}

/// Whether a version string sorts with the releases.
fn is_release(version: &str) -> bool {
    let rest = version.strip_prefix('v').unwrap_or(version);
    rest.starts_with(|c: char| c.is_ascii_digit())
}

/// Split a lower-cased version into digit runs, letter runs, `.`, `-`, and
/// runs of anything else.
fn split_parts(version: &str) -> Vec<String> {
    #[derive(PartialEq, Clone, Copy)]
    enum Class {
        Digit,
        Alpha,
        Other,
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut class = None;

    for c in version.chars() {
        let next = if c.is_ascii_digit() {
            Class::Digit
        } else if c.is_ascii_lowercase() {
            Class::Alpha
        } else if c == '.' || c == '-' {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
            parts.push(c.to_string());
            class = None;
            continue;
        } else {
            Class::Other
        };

        if class != Some(next) && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        current.push(c);
        class = Some(next);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Comparison key for loosely formatted versions.
///
/// Numbers compare numerically (zero padded to eight digits), `dev` sorts
/// before pre-releases (`pre`, `preview`, `rc` → `c`), which sort before the
/// release itself, and trailing zero components are ignored so `1.0` equals
/// `1`.
pub fn loose_key(version: &str) -> Vec<String> {
    const FINAL: &str = "*final";
    const ZERO: &str = "00000000";

    let mut tokens: Vec<String> = split_parts(&version.to_lowercase())
        .into_iter()
        .filter(|part| part != ".")
        .map(|part| {
            let part = match part.as_str() {
                "pre" | "preview" | "rc" => "c".to_string(),
                "-" => "final-".to_string(),
                "dev" => "@".to_string(),
                _ => part,
            };
            if part.starts_with(|c: char| c.is_ascii_digit()) {
                format!("{part:0>8}")
            } else {
                format!("*{part}")
            }
        })
        .collect();
    tokens.push(FINAL.to_string());

    let mut key: Vec<String> = Vec::with_capacity(tokens.len());
    for token in tokens {
        if token.starts_with('*') {
            if token.as_str() < FINAL {
                while key.last().is_some_and(|last| last == "*final-") {
                    key.pop();
                }
            }
            while key.last().is_some_and(|last| last == ZERO) {
                key.pop();
            }
        }
        key.push(token);
    }
    key
}

/// Newest-first ordering used for iteration and serialization.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    (!is_release(b), loose_key(b), b).cmp(&(!is_release(a), loose_key(a), a))
}

/// In-memory registry of deployed versions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionRegistry {
    entries: BTreeMap<String, VersionEntry>,
}

impl VersionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the `versions.json` format.
    pub fn loads(text: &str) -> Result<Self, RegistryError> {
        let raw: Vec<RawEntry> =
            serde_json::from_str(text).map_err(|e| RegistryError::Parse(e.to_string()))?;

        let mut registry = Self::new();
        for entry in raw {
            registry.add(&entry.version, entry.title.as_deref(), &entry.aliases, false)?;
        }
        Ok(registry)
    }

    /// Serialize to the `versions.json` format: newest first, two-space
    /// indentation, trailing newline.
    pub fn dumps(&self) -> String {
        let entries: Vec<&VersionEntry> = self.iter().collect();
        // Serializing strings and string sets cannot fail.
        let mut text = serde_json::to_string_pretty(&entries).unwrap_or_else(|_| "[]".into());
        text.push('\n');
        text
    }

    /// Entries in newest-first order.
    pub fn iter(&self) -> impl Iterator<Item = &VersionEntry> {
        let mut entries: Vec<&VersionEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| compare_versions(&a.version, &b.version));
        entries.into_iter()
    }

    /// Number of versions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no versions are deployed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by its exact version string.
    pub fn get(&self, version: &str) -> Option<&VersionEntry> {
        self.entries.get(version)
    }

    /// Resolve a version or alias.
    pub fn find(&self, identifier: &str) -> Option<VersionKey> {
        if self.entries.contains_key(identifier) {
            return Some(VersionKey::Version(identifier.to_string()));
        }
        self.entries
            .values()
            .find(|entry| entry.aliases.contains(identifier))
            .map(|entry| VersionKey::Alias {
                version: entry.version.clone(),
                alias: identifier.to_string(),
            })
    }

    /// Resolve a version or alias, failing if it is unknown.
    pub fn find_strict(&self, identifier: &str) -> Result<VersionKey, RegistryError> {
        self.find(identifier)
            .ok_or_else(|| RegistryError::NotFound(identifier.to_string()))
    }

    /// Validate `aliases` for attachment to `version` and collect the ones
    /// that must move away from another version.
    fn check_aliases(
        &self,
        version: &str,
        aliases: &[String],
        allow_migration: bool,
    ) -> Result<Vec<(String, String)>, RegistryError> {
        let mut migrations = Vec::new();
        for alias in aliases {
            validate_identifier(alias, IdentifierKind::Alias)?;
            if alias == version {
                return Err(RegistryError::AliasConflict {
                    alias: alias.clone(),
                    reason: ConflictReason::SameAsVersion,
                });
            }
            match self.find(alias) {
                Some(VersionKey::Version(_)) => {
                    return Err(RegistryError::AliasConflict {
                        alias: alias.clone(),
                        reason: ConflictReason::AliasIsVersion,
                    });
                }
                Some(VersionKey::Alias { version: owner, .. }) if owner != version => {
                    if !allow_migration {
                        return Err(RegistryError::AliasConflict {
                            alias: alias.clone(),
                            reason: ConflictReason::AliasTaken { owner },
                        });
                    }
                    migrations.push((owner, alias.clone()));
                }
                _ => {}
            }
        }
        Ok(migrations)
    }

    /// Detach migrated aliases from their previous owners.
    fn apply_migrations(&mut self, migrations: Vec<(String, String)>) {
        for (owner, alias) in migrations {
            if let Some(entry) = self.entries.get_mut(&owner) {
                entry.aliases.remove(&alias);
            }
        }
    }

    /// Add a version, or merge title and aliases into an existing one.
    ///
    /// Aliases owned by another version move here only when
    /// `allow_migration` is set.
    pub fn add(
        &mut self,
        version: &str,
        title: Option<&str>,
        aliases: &[String],
        allow_migration: bool,
    ) -> Result<&VersionEntry, RegistryError> {
        validate_identifier(version, IdentifierKind::Version)?;
        let migrations = self.check_aliases(version, aliases, allow_migration)?;

        if !self.entries.contains_key(version) {
            if let Some(VersionKey::Alias { version: owner, .. }) = self.find(version) {
                return Err(RegistryError::AliasConflict {
                    alias: version.to_string(),
                    reason: ConflictReason::VersionIsAlias { owner },
                });
            }
        }

        self.apply_migrations(migrations);
        let entry = self
            .entries
            .entry(version.to_string())
            .or_insert_with(|| VersionEntry {
                version: version.to_string(),
                title: version.to_string(),
                aliases: BTreeSet::new(),
            });
        if let Some(title) = title {
            entry.title = title.to_string();
        }
        entry.aliases.extend(aliases.iter().cloned());
        Ok(entry)
    }

    /// Change the title and/or add aliases to an existing version or alias.
    ///
    /// Returns the aliases that were not attached to the entry before.
    pub fn update(
        &mut self,
        identifier: &str,
        title: Option<&str>,
        aliases: &[String],
        allow_migration: bool,
    ) -> Result<BTreeSet<String>, RegistryError> {
        let version = self.find_strict(identifier)?.version().to_string();
        let migrations = self.check_aliases(&version, aliases, allow_migration)?;
        self.apply_migrations(migrations);

        let Some(entry) = self.entries.get_mut(&version) else {
            return Err(RegistryError::NotFound(identifier.to_string()));
        };
        if let Some(title) = title {
            entry.title = title.to_string();
        }
        let added: BTreeSet<String> = aliases
            .iter()
            .filter(|alias| !entry.aliases.contains(*alias))
            .cloned()
            .collect();
        entry.aliases.extend(added.iter().cloned());
        Ok(added)
    }

    /// Remove a version (with its aliases) or a single alias.
    pub fn remove(&mut self, identifier: &str) -> Result<Removed, RegistryError> {
        let key = self.find_strict(identifier)?;
        self.remove_key(key)
            .ok_or_else(|| RegistryError::NotFound(identifier.to_string()))
    }

    /// Remove several identifiers at once.
    ///
    /// All identifiers are resolved before anything is removed, so an unknown
    /// identifier leaves the registry untouched. An alias whose version is
    /// removed by the same call is not reported separately.
    pub fn remove_many<S: AsRef<str>>(
        &mut self,
        identifiers: &[S],
    ) -> Result<Vec<Removed>, RegistryError> {
        let keys = identifiers
            .iter()
            .map(|id| self.find_strict(id.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys
            .into_iter()
            .filter_map(|key| self.remove_key(key))
            .collect())
    }

    fn remove_key(&mut self, key: VersionKey) -> Option<Removed> {
        match key {
            VersionKey::Version(version) => self.entries.remove(&version).map(Removed::Version),
            VersionKey::Alias { version, alias } => {
                let entry = self.entries.get_mut(&version)?;
                entry
                    .aliases
                    .remove(&alias)
                    .then_some(Removed::Alias { version, alias })
            }
        }
    }
}
