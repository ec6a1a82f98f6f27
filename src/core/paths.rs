//! core::paths
//!
//! Path codec for tree paths on the deploy branch.
//!
//! # Architecture
//!
//! Every path that reaches the importer or a tree lookup goes through this
//! module. It is the only place that knows about platform separators: the
//! rest of the crate works with slash-separated, normalized, relative
//! strings where the empty string is the root of the tree.
//!
//! # Wire quoting
//!
//! The importer reads a path as the remainder of the line, so a path only
//! needs quoting when it contains a newline or starts the C-quoted form.
//! [`quote`] wraps such paths in double quotes and escapes `\`, `"` and
//! newline; [`unquote`] reverses it exactly.
//!
//! # Example
//!
//! ```
//! use docshelf::core::paths;
//!
//! assert_eq!(paths::normalize("a/./b//c/../d"), "a/b/d");
//! assert_eq!(paths::join(&["", "1.0", "index.html"]), "1.0/index.html");
//! assert_eq!(paths::relative("1.0/index.html", "latest"), "../1.0/index.html");
//! assert_eq!(paths::quote("plain name.txt"), "plain name.txt");
//! assert_eq!(paths::quote("say \"hi\""), "\"say \\\"hi\\\"\"");
//! ```

use std::borrow::Cow;
use std::path::{Component, Path};

use thiserror::Error;

/// Errors from decoding quoted paths or converting filesystem paths.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("quoted path is not terminated: {0}")]
    Unterminated(String),

    #[error("invalid escape sequence '\\{escape}' in quoted path")]
    InvalidEscape { escape: char },

    #[error("path is not valid UTF-8: {0}")]
    NotUtf8(String),

    #[error("path escapes the tree root: {0}")]
    EscapesRoot(String),
}

/// Normalize a slash-separated path.
///
/// `.` components and empty components are dropped and `..` cancels the
/// preceding component. Leading `..` components that cannot be cancelled
/// are kept. The tree root normalizes to the empty string.
pub fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Convert a filesystem path into a normalized tree path.
///
/// Platform separators are translated here and nowhere else. Root and
/// prefix components are rejected because tree paths are always relative.
pub fn from_fs(path: &Path) -> Result<String, PathError> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| PathError::NotUtf8(path.display().to_string()))?;
                parts.push(part);
            }
            Component::ParentDir => parts.push(".."),
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => {
                return Err(PathError::EscapesRoot(path.display().to_string()));
            }
        }
    }
    Ok(normalize(&parts.join("/")))
}

/// Normalize a user-supplied tree path and make sure it stays inside the tree.
///
/// Backslashes are accepted as separators so a Windows-style deploy prefix
/// means the same thing everywhere.
pub fn sanitize(path: &str) -> Result<String, PathError> {
    let normalized = normalize(&path.replace('\\', "/"));
    if normalized == ".." || normalized.starts_with("../") {
        return Err(PathError::EscapesRoot(path.to_string()));
    }
    Ok(normalized)
}

/// Join path segments, skipping empty ones, and normalize the result.
pub fn join(segments: &[&str]) -> String {
    let joined = segments
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");
    normalize(&joined)
}

/// The directory containing `path` (empty for top-level entries).
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// The final component of `path`.
pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Extension of the final component, without the dot.
///
/// Dotfiles such as `.nojekyll` have no extension.
pub fn extension(path: &str) -> Option<&str> {
    let name = file_name(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(idx) => Some(&name[idx + 1..]),
    }
}

/// Relative path from the directory `base_dir` to `target`.
///
/// Both arguments are tree paths; the result uses `..` to climb out of
/// `base_dir`. Identical locations yield `.`.
pub fn relative(target: &str, base_dir: &str) -> String {
    let target = normalize(target);
    let base = normalize(base_dir);
    let target_parts: Vec<&str> = target.split('/').filter(|s| !s.is_empty()).collect();
    let base_parts: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();

    let common = target_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = vec![".."; base_parts.len() - common];
    parts.extend_from_slice(&target_parts[common..]);
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Quote a tree path for the import stream when it needs it.
pub fn quote(path: &str) -> Cow<'_, str> {
    if !path.contains(['\n', '"']) {
        return Cow::Borrowed(path);
    }

    let mut quoted = String::with_capacity(path.len() + 2);
    quoted.push('"');
    for c in path.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    Cow::Owned(quoted)
}

/// Decode a path produced by [`quote`].
///
/// Unquoted input is returned as-is.
pub fn unquote(encoded: &str) -> Result<String, PathError> {
    let Some(body) = encoded.strip_prefix('"') else {
        return Ok(encoded.to_string());
    };
    let body = body
        .strip_suffix('"')
        .ok_or_else(|| PathError::Unterminated(encoded.to_string()))?;

    let mut decoded = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            decoded.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => decoded.push('\\'),
            Some('"') => decoded.push('"'),
            Some('n') => decoded.push('\n'),
            Some(other) => return Err(PathError::InvalidEscape { escape: other }),
            None => return Err(PathError::Unterminated(encoded.to_string())),
        }
    }
    Ok(decoded)
}

/// Normalize and quote a path in one step, as the importer expects it.
pub fn encode(path: &str) -> String {
    quote(&normalize(path)).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    mod normalize {
        use super::*;

        #[test]
        fn collapses_dots_and_separators() {
            assert_eq!(normalize("a/./b"), "a/b");
            assert_eq!(normalize("a//b/"), "a/b");
            assert_eq!(normalize("a/b/../c"), "a/c");
            assert_eq!(normalize("./a"), "a");
        }

        #[test]
        fn root_is_empty() {
            assert_eq!(normalize(""), "");
            assert_eq!(normalize("."), "");
            assert_eq!(normalize("a/.."), "");
        }

        #[test]
        fn keeps_unresolvable_parents() {
            assert_eq!(normalize("../a"), "../a");
            assert_eq!(normalize("../../a/../b"), "../../b");
        }
    }

    mod sanitize {
        use super::*;

        #[test]
        fn accepts_backslashes() {
            assert_eq!(sanitize("docs\\v1").unwrap(), "docs/v1");
        }

        #[test]
        fn rejects_escape() {
            assert!(matches!(sanitize("../x"), Err(PathError::EscapesRoot(_))));
            assert!(matches!(sanitize("a/../.."), Err(PathError::EscapesRoot(_))));
        }
    }

    mod from_fs {
        use super::*;
        use std::path::PathBuf;

        #[test]
        fn relative_path() {
            let path: PathBuf = ["a", "b", "c.html"].iter().collect();
            assert_eq!(from_fs(&path).unwrap(), "a/b/c.html");
        }

        #[test]
        fn absolute_rejected() {
            assert!(from_fs(Path::new("/etc/passwd")).is_err());
        }
    }

    mod components {
        use super::*;

        #[test]
        fn join_skips_empty() {
            assert_eq!(join(&["", "1.0"]), "1.0");
            assert_eq!(join(&["prefix", "1.0", "a/b.html"]), "prefix/1.0/a/b.html");
            assert_eq!(join(&[]), "");
        }

        #[test]
        fn parent_and_name() {
            assert_eq!(parent("a/b/c.html"), "a/b");
            assert_eq!(parent("c.html"), "");
            assert_eq!(file_name("a/b/c.html"), "c.html");
            assert_eq!(file_name("c.html"), "c.html");
        }

        #[test]
        fn extensions() {
            assert_eq!(extension("a/index.html"), Some("html"));
            assert_eq!(extension("archive.tar.gz"), Some("gz"));
            assert_eq!(extension(".nojekyll"), None);
            assert_eq!(extension("README"), None);
        }
    }

    mod relative {
        use super::*;

        #[test]
        fn sibling_directories() {
            assert_eq!(relative("1.0/index.html", "latest"), "../1.0/index.html");
            assert_eq!(
                relative("1.0/guide/page.html", "latest/guide"),
                "../../1.0/guide/page.html"
            );
        }

        #[test]
        fn from_root() {
            assert_eq!(relative("1.0", ""), "1.0");
        }

        #[test]
        fn shared_prefix() {
            assert_eq!(relative("p/1.0", "p"), "1.0");
            assert_eq!(relative("p/1.0", "p/1.0"), ".");
        }
    }

    mod quoting {
        use super::*;

        #[test]
        fn plain_paths_untouched() {
            assert!(matches!(quote("a/b c.html"), Cow::Borrowed(_)));
            assert_eq!(quote("back\\slash"), "back\\slash");
        }

        #[test]
        fn escapes_when_needed() {
            assert_eq!(quote("a\nb"), "\"a\\nb\"");
            assert_eq!(quote("a\"b\\c"), "\"a\\\"b\\\\c\"");
        }

        #[test]
        fn unquote_reverses_quote() {
            for path in ["a\nb", "q\"uote", "mix\\\"\n", "plain"] {
                assert_eq!(unquote(&quote(path)).unwrap(), path);
            }
        }

        #[test]
        fn unquote_rejects_malformed() {
            assert!(matches!(unquote("\"open"), Err(PathError::Unterminated(_))));
            assert_eq!(
                unquote("\"bad\\x\""),
                Err(PathError::InvalidEscape { escape: 'x' })
            );
        }

        #[test]
        fn encode_normalizes_first() {
            assert_eq!(encode("./a//b"), "a/b");
            assert_eq!(encode("dir/\"x\""), "\"dir/\\\"x\\\"\"");
        }
    }
}
