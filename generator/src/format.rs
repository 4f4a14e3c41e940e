// format.rs — Deterministic literal derivation
//
// Derives the identifier literal injected for one marked parameter. The
// literal is a pure function of (location key, ordinal, format, prefix):
//
//   digest  = SHA-256("{key}:{ordinal}:{salt}")   salt is per-format
//   literal = prefix ++ render(format, digest)
//
// Salting by format means one call site can request two formats without the
// literals sharing a hash input. Nothing here reads clocks, randomness, or
// shared state.
//
// Preconditions: none.
// Postconditions: identical inputs yield byte-identical literals.
// Failure modes: none (format decoding errors are raised by the collector).
// Side effects: none.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::location::LocationKey;

/// Base added to the reduced digest value for `Timestamp` literals, so they
/// read like millisecond Unix timestamps from late 2023 onward.
pub const TIMESTAMP_BASE: u64 = 1_700_000_000_000;
/// Width of the window the digest value is reduced into.
pub const TIMESTAMP_WINDOW: u64 = 100_000_000_000;
/// Number of encoded characters kept for `ShortHash` and `HtmlId`.
pub const SHORT_HASH_LEN: usize = 8;

/// Output encoding requested by a parameter marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IdFormat {
    /// 32 lowercase hex digits, no dashes.
    #[default]
    Guid,
    /// `ShortHash`-style text guaranteed to start with an ASCII letter.
    HtmlId,
    /// Decimal digits shaped like a millisecond Unix timestamp.
    Timestamp,
    /// First 8 characters of a base64 digest with `+`/`/` mapped to letters.
    ShortHash,
}

impl IdFormat {
    /// All formats, in marker ordinal order.
    pub const ALL: [IdFormat; 4] = [
        IdFormat::Guid,
        IdFormat::HtmlId,
        IdFormat::Timestamp,
        IdFormat::ShortHash,
    ];

    /// Decode the marker's integer argument.
    pub fn from_ordinal(value: i64) -> Option<Self> {
        usize::try_from(value)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// Decode the marker's argument when the facility reports it by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            IdFormat::Guid => "Guid",
            IdFormat::HtmlId => "HtmlId",
            IdFormat::Timestamp => "Timestamp",
            IdFormat::ShortHash => "ShortHash",
        }
    }

    /// Suffix appended to the hash input for this format.
    fn salt(self) -> &'static str {
        match self {
            IdFormat::Guid => "guid",
            IdFormat::HtmlId => "htmlid",
            IdFormat::Timestamp => "timestamp",
            IdFormat::ShortHash => "shorthash",
        }
    }
}

impl fmt::Display for IdFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// SHA-256 of the format-salted hash input for one marked parameter.
pub fn site_digest(key: &LocationKey, ordinal: usize, format: IdFormat) -> [u8; 32] {
    let input = format!("{}:{}:{}", key.as_str(), ordinal, format.salt());
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let result = hasher.finalize();
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&result);
    digest
}

/// Derive the literal for a marked parameter.
///
/// `prefix` is prepended verbatim; `Some("")` is valid and yields the same
/// text as `None`.
pub fn format_literal(
    key: &LocationKey,
    ordinal: usize,
    format: IdFormat,
    prefix: Option<&str>,
) -> String {
    let digest = site_digest(key, ordinal, format);
    let base = render(format, &digest);
    match prefix {
        Some(prefix) => format!("{}{}", prefix, base),
        None => base,
    }
}

fn render(format: IdFormat, digest: &[u8; 32]) -> String {
    match format {
        IdFormat::Guid => {
            // Microsoft GUID byte order, as the host's Guid(byte[]) would read it.
            let mut bytes = [0u8; 16];
            bytes.copy_from_slice(&digest[..16]);
            Uuid::from_bytes_le(bytes).simple().to_string()
        }
        IdFormat::ShortHash => short_hash(digest),
        IdFormat::HtmlId => {
            let hash = short_hash(digest);
            if hash.starts_with(|c: char| c.is_ascii_alphabetic()) {
                hash
            } else {
                format!("x{}", hash)
            }
        }
        IdFormat::Timestamp => {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&digest[..8]);
            let raw = i64::from_le_bytes(bytes);
            (TIMESTAMP_BASE + raw.unsigned_abs() % TIMESTAMP_WINDOW).to_string()
        }
    }
}

fn short_hash(digest: &[u8]) -> String {
    let encoded: String = STANDARD
        .encode(digest)
        .chars()
        .filter(|&c| c != '=')
        .map(|c| match c {
            '+' => 'a',
            '/' => 'b',
            other => other,
        })
        .collect();
    // Never cut below what the encoding produced.
    let len = encoded.len().min(SHORT_HASH_LEN);
    encoded[..len].to_string()
}
