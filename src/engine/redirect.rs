//! engine::redirect
//!
//! HTML pages that forward the browser to another URL.

use std::fs;
use std::path::Path;

use super::OperationError;

const BUILTIN_TEMPLATE: &str = include_str!("templates/redirect.html");

/// Renders a redirect page for a relative href.
pub trait RedirectRenderer {
    fn render(&self, href: &str) -> String;
}

/// A redirect template with `{{href}}` placeholders.
///
/// `{{ href }}` is accepted as well. The href is HTML-escaped on
/// substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTemplate {
    source: String,
}

impl Default for RedirectTemplate {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RedirectTemplate {
    /// The template shipped with docshelf.
    pub fn builtin() -> Self {
        Self::from_source(BUILTIN_TEMPLATE)
    }

    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Read a user template from disk.
    pub fn from_file(path: &Path) -> Result<Self, OperationError> {
        let source = fs::read_to_string(path).map_err(|e| OperationError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self::from_source(source))
    }

    /// The user template at `path`, or the built-in one.
    pub fn load(path: Option<&Path>) -> Result<Self, OperationError> {
        path.map_or_else(|| Ok(Self::builtin()), Self::from_file)
    }
}

impl RedirectRenderer for RedirectTemplate {
    fn render(&self, href: &str) -> String {
        let escaped = escape_html(href);
        self.source
            .replace("{{ href }}", &escaped)
            .replace("{{href}}", &escaped)
    }
}

/// Escape text for use in HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
