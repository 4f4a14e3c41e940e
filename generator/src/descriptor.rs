// descriptor.rs — Invocation manifest (semantic facility boundary)
//
// The host's semantic analysis resolves every candidate invocation and writes
// one JSON manifest per generation pass. This module decodes it once into
// typed structs; nothing downstream looks at raw JSON.
//
// Preconditions: manifest text is UTF-8 JSON.
// Postconditions: `InvocationManifest` mirrors the document; marker arguments
//                 are kept raw so the collector can report bad ones per site.
// Failure modes: I/O errors and malformed JSON (`ManifestError`).
// Side effects: `read_manifest_text` and `InvocationManifest::load` read one file.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::location::SourceLocation;

/// Errors raised while reading a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid invocation manifest: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Every candidate invocation of one compilation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvocationManifest {
    #[serde(default)]
    pub invocations: Vec<RawInvocation>,
}

impl InvocationManifest {
    pub fn from_json(text: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        Self::from_json(&read_manifest_text(path)?)
    }
}

/// Raw manifest text, for callers that also hash it.
pub fn read_manifest_text(path: &Path) -> Result<String, ManifestError> {
    std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// One candidate invocation, already bound to its target method.
#[derive(Debug, Clone, Deserialize)]
pub struct RawInvocation {
    /// Absent for synthetic syntax with no real position.
    #[serde(default)]
    pub location: Option<SourceLocation>,
    pub method: RawMethod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMethod {
    pub containing_type: String,
    pub name: String,
    pub return_type: String,
    #[serde(default = "default_true")]
    pub is_static: bool,
    #[serde(default)]
    pub parameters: Vec<RawParameter>,
}

impl RawMethod {
    pub fn display_name(&self) -> String {
        format!("{}.{}", self.containing_type, self.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub default: Option<String>,
    /// Present iff the parameter carries the unique-id marker.
    #[serde(default)]
    pub unique_id: Option<RawMarker>,
}

/// Constructor-style arguments of the marker, as the facility read them.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMarker {
    #[serde(default)]
    pub format: Option<RawFormat>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default = "default_true")]
    pub deterministic: bool,
}

/// The marker's format argument: an enum ordinal or a variant name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawFormat {
    Ordinal(i64),
    Name(String),
}

impl fmt::Display for RawFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawFormat::Ordinal(n) => write!(f, "{}", n),
            RawFormat::Name(s) => write!(f, "\"{}\"", s),
        }
    }
}

fn default_true() -> bool {
    true
}
