//! ui::output
//!
//! User-facing output.
//!
//! # Design
//!
//! Results go to stdout, warnings and errors to stderr. Everything except
//! errors and requested data (such as `list` output) respects `--quiet`.
//! Diagnostics for developers go through `tracing` instead.

use std::fmt::Display;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Errors and requested data only
    Quiet,
    Normal,
    /// Normal output plus `[debug]` lines
    Debug,
}

impl Verbosity {
    /// `--quiet` wins over `--debug`.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a line to stdout unless quiet.
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print data the user asked for; never suppressed.
pub fn data(message: impl Display) {
    println!("{}", message);
}

/// Print a debug message (only in debug mode).
pub fn debug(message: impl Display, verbosity: Verbosity) {
    if verbosity == Verbosity::Debug {
        eprintln!("[debug] {}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message unless quiet.
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Print a follow-up hint for a preceding warning or error.
pub fn hint(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("  {}", message);
    }
}

/// Print a success message unless quiet.
pub fn success(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Format a list of items, one per line.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a set of aliases as `[a, b]`.
pub fn format_aliases<'a>(aliases: impl IntoIterator<Item = &'a String>) -> String {
    let joined: Vec<&str> = aliases.into_iter().map(String::as_str).collect();
    format!("[{}]", joined.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_wins() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn list_formatting() {
        assert_eq!(format_list(&["a", "b"], "  - "), "  - a\n  - b");
        assert_eq!(format_list::<&str>(&[], "- "), "");
    }

    #[test]
    fn alias_formatting() {
        let aliases = vec!["latest".to_string(), "stable".to_string()];
        assert_eq!(format_aliases(&aliases), "[latest, stable]");
        assert_eq!(format_aliases(&Vec::<String>::new()), "[]");
    }
}
