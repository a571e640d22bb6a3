//! Identifier validation.
//!
//! SQLite cannot bind table or column names as parameters, so any name that
//! ends up in SQL text must first pass [`validate_identifier`]. The only way
//! to build an [`Ident`] is through that check, which lets the statement
//! builder accept `&Ident` and nothing else.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("identifier pattern is valid"));

/// Check that `identifier` is safe to splice into SQL text.
///
/// Accepts exactly `^[A-Za-z0-9_]+$`.
pub fn validate_identifier(identifier: &str) -> Result<&str> {
    if IDENTIFIER_RE.is_match(identifier) {
        Ok(identifier)
    } else {
        Err(Error::invalid(format!(
            "Invalid identifier '{}': expected letters, digits and underscores only",
            identifier
        )))
    }
}

/// A table or column name that passed [`validate_identifier`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ident(String);

impl Ident {
    /// Validate and wrap an identifier.
    pub fn parse(identifier: &str) -> Result<Self> {
        validate_identifier(identifier).map(|s| Ident(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Backtick-quoted form for SQL text.
    ///
    /// Quoting lets names that are keywords (`order`, `group`) still parse.
    /// Double quotes are not used: SQLite reads a double-quoted name that
    /// matches no column as a string literal, so a misspelled column would
    /// compare against its own name instead of failing.
    pub fn quoted(&self) -> String {
        format!("`{}`", self.0)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Ident {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
