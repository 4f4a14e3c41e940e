// location.rs — Call-site location keys
//
// Turns the position of an invocation expression into the string key that
// identifies the call site and seeds every literal generated for it.
//
// The key is `{file}:{line}:{column}`. Line and column are rendered as plain
// decimal and never contain `:`, so splitting on the last two separators
// recovers the original triple even when the file path contains `:`
// (e.g. `C:\src\Page.cs`). Distinct triples therefore never share a key.
//
// Preconditions: `file` is non-empty (callers drop candidates without a
//                real position instead of deriving a key).
// Postconditions: identical inputs give identical keys.
// Failure modes: none.
// Side effects: none.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Source position of an invocation expression. Line and column are 1-based,
/// matching the host's interception attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// Derive the location key for this position.
    pub fn key(&self) -> LocationKey {
        derive_location_key(&self.file, self.line, self.column)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Stable identity of one call site within a compilation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LocationKey(String);

impl LocationKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split the key back into `(file, line, column)`.
    pub fn components(&self) -> Option<(&str, u32, u32)> {
        let mut parts = self.0.rsplitn(3, ':');
        let column = parts.next()?.parse().ok()?;
        let line = parts.next()?.parse().ok()?;
        let file = parts.next()?;
        Some((file, line, column))
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn derive_location_key(file: &str, line: u32, column: u32) -> LocationKey {
    LocationKey(format!("{}:{}:{}", file, line, column))
}
