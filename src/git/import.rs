//! git::import
//!
//! Streaming commits to `git fast-import`.
//!
//! # Architecture
//!
//! A [`CommitSession`] owns one importer process. Opening the session writes
//! the commit header; the caller then streams path operations, which the
//! importer applies in order on top of the parent tree. The session ends in
//! exactly one of two ways:
//!
//! - [`CommitSession::finish`] terminates the stream, waits for the
//!   importer, and checks whether the commit changed anything. A commit
//!   with an unchanged tree is rolled back (compare-and-swap against the tip
//!   it just wrote) unless empty commits are allowed.
//! - [`CommitSession::abort`] kills the importer without terminating the
//!   stream, so the branch ref is never updated.
//!
//! Both consume the session. Dropping an open session aborts it, and a
//! write error aborts it immediately, so an importer never outlives its
//! session.
//!
//! The importer's stderr is drained by a dedicated thread for the lifetime
//! of the process; its contents become the diagnostics of
//! [`GitError::CommitWrite`].
//!
//! # Example
//!
//! ```ignore
//! use docshelf::git::{with_commit, CommitOptions, Git};
//!
//! let git = Git::open(Path::new("."))?;
//! let branch = BranchName::new("gh-pages")?;
//! let tip = with_commit(&git, &branch, "Add page", &CommitOptions::default(), |session| {
//!     session.write_file("index.html", b"<p>hi</p>", FileMode::Regular)
//! })?;
//! ```

use std::io::{self, BufWriter, Read, Write};
use std::process::{Child, ChildStderr, ChildStdin, Command, Stdio};
use std::thread::{self, JoinHandle};

use super::interface::{Git, GitError, TreeFile};
use crate::core::paths::{self, PathError};
use crate::core::types::{BranchName, FileMode, Oid, RefName};

/// Committer identity and date overrides.
///
/// Empty by default; the repository configuration and the wall clock fill
/// in whatever is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityOverrides {
    pub name: Option<String>,
    pub email: Option<String>,
    /// Raw `<secs> <+zzzz>`, `@<secs> <+zzzz>`, RFC 2822 or RFC 3339.
    pub date: Option<String>,
}

impl IdentityOverrides {
    /// Read `GIT_COMMITTER_NAME`, `GIT_COMMITTER_EMAIL` and
    /// `GIT_COMMITTER_DATE` from the environment.
    pub fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        Self {
            name: var("GIT_COMMITTER_NAME"),
            email: var("GIT_COMMITTER_EMAIL"),
            date: var("GIT_COMMITTER_DATE"),
        }
    }
}

/// Options for one commit.
#[derive(Debug, Clone, Default)]
pub struct CommitOptions {
    /// Keep a commit whose tree equals its parent's.
    pub allow_empty: bool,
    pub identity: IdentityOverrides,
}

/// A commit timestamp in the importer's raw date format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitTime {
    pub seconds: i64,
    /// Offset from UTC in seconds (east positive).
    pub offset: i32,
}

impl CommitTime {
    /// The current time with the local UTC offset.
    pub fn now() -> Self {
        let now = chrono::Local::now();
        Self {
            seconds: now.timestamp(),
            offset: now.offset().local_minus_utc(),
        }
    }

    /// Parse a date override.
    pub fn parse(value: &str) -> Result<Self, GitError> {
        let invalid = || GitError::InvalidDate {
            value: value.to_string(),
        };
        let trimmed = value.trim();

        if let Some((secs, tz)) = trimmed.split_once(' ') {
            let secs = secs.strip_prefix('@').unwrap_or(secs);
            if let (Ok(seconds), Some(offset)) = (secs.parse::<i64>(), parse_tz(tz.trim())) {
                return Ok(Self { seconds, offset });
            }
        }

        let parsed = chrono::DateTime::parse_from_rfc2822(trimmed)
            .or_else(|_| chrono::DateTime::parse_from_rfc3339(trimmed))
            .map_err(|_| invalid())?;
        Ok(Self {
            seconds: parsed.timestamp(),
            offset: parsed.offset().local_minus_utc(),
        })
    }

    /// `<secs> <+zzzz>`
    pub fn to_raw(&self) -> String {
        let sign = if self.offset < 0 { '-' } else { '+' };
        let minutes = self.offset.abs() / 60;
        format!("{} {}{:02}{:02}", self.seconds, sign, minutes / 60, minutes % 60)
    }
}

/// Parse `+zzzz` / `-zzzz` into seconds east of UTC.
fn parse_tz(tz: &str) -> Option<i32> {
    let (sign, digits) = if let Some(rest) = tz.strip_prefix('+') {
        (1, rest)
    } else {
        (-1, tz.strip_prefix('-')?)
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    Some(sign * (hours * 3600 + minutes * 60))
}

/// Strip characters that would corrupt the committer line.
fn clean_identity(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '\n'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Resolved committer for the header line.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Committer {
    name: String,
    email: String,
    time: CommitTime,
}

impl Committer {
    fn resolve(git: &Git, overrides: &IdentityOverrides) -> Result<Self, GitError> {
        let lookup = |value: &Option<String>, key: &str| -> Result<String, GitError> {
            match value {
                Some(v) => Ok(v.clone()),
                None => git
                    .config_string(key)?
                    .ok_or_else(|| GitError::MissingIdentity {
                        key: key.to_string(),
                    }),
            }
        };
        let time = match &overrides.date {
            Some(date) => CommitTime::parse(date)?,
            None => CommitTime::now(),
        };
        Ok(Self {
            name: clean_identity(&lookup(&overrides.name, "user.name")?),
            email: clean_identity(&lookup(&overrides.email, "user.email")?),
            time,
        })
    }
}

fn render_header(
    refname: &RefName,
    committer: &Committer,
    message: &str,
    parent: Option<&Oid>,
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(format!("commit {}\n", refname).as_bytes());
    out.extend_from_slice(
        format!(
            "committer {} <{}> {}\n",
            committer.name,
            committer.email,
            committer.time.to_raw()
        )
        .as_bytes(),
    );
    out.extend_from_slice(format!("data {}\n", message.len()).as_bytes());
    out.extend_from_slice(message.as_bytes());
    out.push(b'\n');
    if let Some(parent) = parent {
        out.extend_from_slice(format!("from {}\n", parent).as_bytes());
    }
    out
}

fn render_modify(path: &str, data: &[u8], mode: FileMode) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + path.len() + 32);
    out.extend_from_slice(format!("M {} inline {}\n", mode, paths::encode(path)).as_bytes());
    out.extend_from_slice(format!("data {}\n", data.len()).as_bytes());
    out.extend_from_slice(data);
    out.push(b'\n');
    out
}

/// Normalize a path that must name something below the tree root.
fn file_path(path: &str) -> Result<String, GitError> {
    let normalized = paths::normalize(path);
    if normalized.is_empty() || normalized == ".." || normalized.starts_with("../") {
        return Err(PathError::EscapesRoot(path.to_string()).into());
    }
    Ok(normalized)
}

fn spawn_drain(mut stream: ChildStderr) -> io::Result<JoinHandle<Vec<u8>>> {
    thread::Builder::new()
        .name("fast-import-stderr".into())
        .spawn(move || {
            let mut buffer = Vec::new();
            // The pipe closing is the only way this ends; read errors just
            // truncate the diagnostics.
            let _ = stream.read_to_end(&mut buffer);
            buffer
        })
}

/// One commit being streamed to `git fast-import`.
pub struct CommitSession<'repo> {
    git: &'repo Git,
    branch: BranchName,
    refname: RefName,
    parent: Option<Oid>,
    allow_empty: bool,
    child: Child,
    stdin: Option<BufWriter<ChildStdin>>,
    drain: Option<JoinHandle<Vec<u8>>>,
    closed: bool,
}

impl std::fmt::Debug for CommitSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitSession")
            .field("refname", &self.refname)
            .field("parent", &self.parent)
            .field("closed", &self.closed)
            .finish()
    }
}

impl<'repo> CommitSession<'repo> {
    /// Start a commit on `branch` with `message`.
    ///
    /// The parent is the current branch tip; a missing branch produces a
    /// root commit.
    pub fn start(
        git: &'repo Git,
        branch: &BranchName,
        message: &str,
        options: &CommitOptions,
    ) -> Result<Self, GitError> {
        let refname = RefName::for_branch(branch);
        let parent = git.try_resolve_ref(refname.as_str())?;
        let committer = Committer::resolve(git, &options.identity)?;

        let mut child = Command::new("git")
            .args(["fast-import", "--date-format=raw", "--quiet", "--done"])
            .env("GIT_DIR", git.git_dir())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| GitError::Command {
                command: "git fast-import".into(),
                message: e.to_string(),
            })?;

        let drain = match child.stderr.take().map(spawn_drain).transpose() {
            Ok(drain) => drain,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(GitError::Command {
                    command: "git fast-import".into(),
                    message: format!("cannot drain stderr: {e}"),
                });
            }
        };
        let stdin = child.stdin.take().map(BufWriter::new);

        tracing::debug!(
            refname = %refname,
            parent = parent.as_ref().map(|p| p.short(7)),
            "started commit session"
        );

        let mut session = Self {
            git,
            branch: branch.clone(),
            refname,
            parent,
            allow_empty: options.allow_empty,
            child,
            stdin,
            drain,
            closed: false,
        };
        let header = render_header(
            &session.refname,
            &committer,
            message,
            session.parent.as_ref(),
        );
        session.write_raw(&header)?;
        Ok(session)
    }

    /// The branch tip this commit builds on.
    pub fn parent(&self) -> Option<&Oid> {
        self.parent.as_ref()
    }

    /// Remove every file from the tree.
    pub fn delete_all(&mut self) -> Result<(), GitError> {
        tracing::trace!("deleteall");
        self.write_raw(b"deleteall\n")
    }

    /// Remove files or whole directories. Missing paths are ignored by the
    /// importer. Deleting the root is the same as [`Self::delete_all`];
    /// paths above the root are rejected.
    pub fn delete_paths<S: AsRef<str>>(&mut self, paths: &[S]) -> Result<(), GitError> {
        for path in paths {
            if paths::normalize(path.as_ref()).is_empty() {
                self.delete_all()?;
                continue;
            }
            let path = file_path(path.as_ref())?;
            tracing::trace!(path = %path, "delete");
            self.write_raw(format!("D {}\n", paths::encode(&path)).as_bytes())?;
        }
        Ok(())
    }

    /// Write a file. Symlinks carry their target as `data`.
    pub fn write_file(&mut self, path: &str, data: &[u8], mode: FileMode) -> Result<(), GitError> {
        let path = file_path(path)?;
        tracing::trace!(path = %path, mode = %mode, len = data.len(), "modify");
        self.write_raw(&render_modify(&path, data, mode))
    }

    /// Write `file` below `dir`, keeping its mode. An empty `dir` is the
    /// tree root.
    pub fn add_file(&mut self, dir: &str, file: &TreeFile) -> Result<(), GitError> {
        self.write_file(&paths::join(&[dir, &file.path]), &file.data, file.mode)
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), GitError> {
        if self.closed {
            return Err(GitError::SessionClosed);
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(GitError::SessionClosed);
        };
        if let Err(err) = stdin.write_all(bytes) {
            let diagnostics = self.shutdown();
            return Err(write_failure(&err, &diagnostics));
        }
        Ok(())
    }

    /// Kill the importer and collect its diagnostics.
    fn shutdown(&mut self) -> String {
        if let Some(stdin) = self.stdin.take() {
            // Unflushed bytes are discarded; the pipe may already be broken.
            let (inner, _) = stdin.into_parts();
            drop(inner);
        }
        let _ = self.child.kill();
        let diagnostics = self.join_drain();
        let _ = self.child.wait();
        self.closed = true;
        diagnostics
    }

    fn join_drain(&mut self) -> String {
        let bytes = self
            .drain
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        String::from_utf8_lossy(&bytes).trim().to_string()
    }

    /// End the stream and create the commit.
    ///
    /// # Errors
    ///
    /// - [`GitError::CommitWrite`] if the importer failed
    /// - [`GitError::EmptyCommit`] if nothing changed and empty commits are
    ///   not allowed; the branch is restored first
    pub fn finish(mut self) -> Result<Oid, GitError> {
        self.write_raw(b"done\n")?;

        let closed = match self.stdin.take() {
            Some(stdin) => stdin.into_inner().map(drop).map_err(|e| e.into_error()),
            None => Ok(()),
        };
        if let Err(err) = closed {
            let diagnostics = self.shutdown();
            return Err(write_failure(&err, &diagnostics));
        }

        let diagnostics = self.join_drain();
        let status = self.child.wait();
        self.closed = true;
        match status {
            Ok(status) if status.success() => {}
            Ok(status) => {
                return Err(GitError::CommitWrite {
                    diagnostics: if diagnostics.is_empty() {
                        format!("git fast-import exited with {status}")
                    } else {
                        diagnostics
                    },
                });
            }
            Err(e) => {
                return Err(GitError::CommitWrite {
                    diagnostics: e.to_string(),
                });
            }
        }

        let tip = self.git.resolve_ref(self.refname.as_str())?;
        let tree = self.git.commit_tree(&tip)?;
        let unchanged = match &self.parent {
            Some(parent) => self.git.commit_tree(parent)? == tree,
            None => self.git.tree_is_empty(&tree)?,
        };

        if unchanged && !self.allow_empty {
            tracing::debug!(refname = %self.refname, "discarding empty commit");
            match &self.parent {
                Some(parent) => self.git.update_ref_cas(
                    self.refname.as_str(),
                    parent,
                    Some(&tip),
                    "docshelf: discard empty commit",
                )?,
                None => self.git.delete_ref_cas(self.refname.as_str(), &tip)?,
            }
            return Err(GitError::EmptyCommit {
                branch: self.branch.to_string(),
            });
        }

        tracing::debug!(refname = %self.refname, tip = %tip.short(7), "commit finished");
        Ok(tip)
    }

    /// Discard the commit. The branch is left untouched.
    pub fn abort(mut self) {
        if !self.closed {
            tracing::debug!(refname = %self.refname, "aborting commit session");
            self.shutdown();
        }
    }
}

impl Drop for CommitSession<'_> {
    fn drop(&mut self) {
        if !self.closed {
            self.shutdown();
        }
    }
}

fn write_failure(err: &io::Error, diagnostics: &str) -> GitError {
    let diagnostics = if diagnostics.is_empty() {
        err.to_string()
    } else {
        format!("{err}\n{diagnostics}")
    };
    GitError::CommitWrite { diagnostics }
}

/// Run `f` inside a commit session on `branch`.
///
/// The session is finished when `f` succeeds and aborted when it fails, in
/// which case the caller's error is returned unchanged.
pub fn with_commit<E, F>(
    git: &Git,
    branch: &BranchName,
    message: &str,
    options: &CommitOptions,
    f: F,
) -> Result<Oid, E>
where
    E: From<GitError>,
    F: FnOnce(&mut CommitSession<'_>) -> Result<(), E>,
{
    let mut session = CommitSession::start(git, branch, message, options)?;
    match f(&mut session) {
        Ok(()) => Ok(session.finish()?),
        Err(e) => {
            session.abort();
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod dates {
        use super::*;

        #[test]
        fn raw_format() {
            let time = CommitTime::parse("1700000000 +0130").unwrap();
            assert_eq!(time.seconds, 1_700_000_000);
            assert_eq!(time.offset, 5400);
            assert_eq!(time.to_raw(), "1700000000 +0130");
        }

        #[test]
        fn at_prefixed_raw_format() {
            let time = CommitTime::parse("@1700000000 -0500").unwrap();
            assert_eq!(time.offset, -5 * 3600);
            assert_eq!(time.to_raw(), "1700000000 -0500");
        }

        #[test]
        fn rfc2822() {
            let time = CommitTime::parse("Tue, 14 Nov 2023 22:13:20 +0000").unwrap();
            assert_eq!(time.to_raw(), "1700000000 +0000");
        }

        #[test]
        fn rfc3339() {
            let time = CommitTime::parse("2023-11-15T00:13:20+02:00").unwrap();
            assert_eq!(time.to_raw(), "1700000000 +0200");
        }

        #[test]
        fn rejects_garbage() {
            assert!(matches!(
                CommitTime::parse("yesterday"),
                Err(GitError::InvalidDate { .. })
            ));
            assert!(CommitTime::parse("1700000000 0000").is_err());
        }

        #[test]
        fn negative_half_hour_offset() {
            let time = CommitTime {
                seconds: 0,
                offset: -(3 * 3600 + 30 * 60),
            };
            assert_eq!(time.to_raw(), "0 -0330");
        }
    }

    mod rendering {
        use super::*;

        fn committer() -> Committer {
            Committer {
                name: "Doc Bot".into(),
                email: "bot@example.com".into(),
                time: CommitTime {
                    seconds: 1_700_000_000,
                    offset: 0,
                },
            }
        }

        #[test]
        fn header_without_parent() {
            let refname = RefName::new("refs/heads/gh-pages").unwrap();
            let header = render_header(&refname, &committer(), "Deploy", None);
            assert_eq!(
                String::from_utf8(header).unwrap(),
                "commit refs/heads/gh-pages\n\
                 committer Doc Bot <bot@example.com> 1700000000 +0000\n\
                 data 6\nDeploy\n"
            );
        }

        #[test]
        fn header_with_parent() {
            let refname = RefName::new("refs/heads/gh-pages").unwrap();
            let parent = Oid::new("a".repeat(40)).unwrap();
            let header = String::from_utf8(render_header(
                &refname,
                &committer(),
                "msg",
                Some(&parent),
            ))
            .unwrap();
            assert!(header.ends_with(&format!("from {}\n", "a".repeat(40))));
        }

        #[test]
        fn message_length_is_bytes() {
            let refname = RefName::new("refs/heads/gh-pages").unwrap();
            let header = String::from_utf8(render_header(&refname, &committer(), "é", None))
                .unwrap();
            assert!(header.contains("data 2\n"));
        }

        #[test]
        fn modify_command() {
            let out = render_modify("1.0/index.html", b"<p>", FileMode::Regular);
            assert_eq!(out, b"M 100644 inline 1.0/index.html\ndata 3\n<p>\n");
        }

        #[test]
        fn modify_quotes_paths() {
            let out = render_modify("a\"b", b"", FileMode::Symlink);
            assert_eq!(out, b"M 120000 inline \"a\\\"b\"\ndata 0\n\n");
        }

        #[test]
        fn identity_is_cleaned() {
            assert_eq!(clean_identity("Evil <x>\nName"), "Evil xName");
        }

        #[test]
        fn file_paths_stay_in_tree() {
            assert_eq!(file_path("./a//b").unwrap(), "a/b");
            assert!(file_path("").is_err());
            assert!(file_path("a/../..").is_err());
        }
    }

    mod env {
        use super::*;

        #[test]
        fn default_overrides_are_empty() {
            let overrides = IdentityOverrides::default();
            assert!(overrides.name.is_none());
            assert!(overrides.email.is_none());
            assert!(overrides.date.is_none());
        }
    }
}
