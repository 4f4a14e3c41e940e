// diag.rs — Unified diagnostics model
//
// Provides the shared diagnostic types used by the collect and emit passes.
// A diagnostic never aborts a pass: it reports why one call site produced no
// interceptor (or produced one with a caveat) while the rest of the batch
// continues.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

use serde::Serialize;

use crate::location::SourceLocation;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0001`, `W0003`).
///
/// Codes are `&'static str` constants defined in the `codes` module.
/// Once assigned, a code must never be reassigned to a different meaning:
/// hosts match on them to decide which missing interceptors are expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub mod codes {
    use super::DiagCode;

    /// Marker `format` argument is out of range or names no known format.
    pub const E0001: DiagCode = DiagCode("E0001");
    /// Marked parameter ordinal does not index the parameter list.
    pub const E0002: DiagCode = DiagCode("E0002");

    /// Call site has no resolvable source location; candidate dropped.
    pub const W0001: DiagCode = DiagCode("W0001");
    /// Reserved `deterministic` flag set to false; it has no effect.
    pub const W0002: DiagCode = DiagCode("W0002");
    /// Same location key reported twice; later candidate dropped.
    pub const W0003: DiagCode = DiagCode("W0003");
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagLevel {
    Error,
    Warning,
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A diagnostic emitted by either generation pass.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub code: Option<DiagCode>,
    pub level: DiagLevel,
    /// Call-site position, when one is known.
    pub location: Option<SourceLocation>,
    /// Target method the candidate invokes, as `Type.Method`.
    pub target: Option<String>,
    pub message: String,
    pub hint: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with no code, location, target, or hint.
    pub fn new(level: DiagLevel, message: impl Into<String>) -> Self {
        Self {
            code: None,
            level,
            location: None,
            target: None,
            message: message.into(),
            hint: None,
        }
    }

    /// Attach a stable diagnostic code.
    pub fn with_code(mut self, code: DiagCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach the call-site location.
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Attach the invoked target method.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagLevel::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagLevel::Error => "error",
            DiagLevel::Warning => "warning",
        };
        if let Some(code) = &self.code {
            write!(f, "{}[{}]: ", level, code)?;
        } else {
            write!(f, "{}: ", level)?;
        }
        if let Some(location) = &self.location {
            write!(f, "{}: ", location)?;
        }
        write!(f, "{}", self.message)?;
        if let Some(target) = &self.target {
            write!(f, " (in call to {})", target)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}

/// True if any diagnostic in the slice is error-level.
pub fn has_errors(diags: &[Diagnostic]) -> bool {
    diags.iter().any(Diagnostic::is_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_without_code() {
        let d = Diagnostic::new(DiagLevel::Error, "something failed");
        assert_eq!(format!("{d}"), "error: something failed");
    }

    #[test]
    fn display_with_code_and_location() {
        let d = Diagnostic::new(DiagLevel::Warning, "duplicate call site")
            .with_code(codes::W0003)
            .with_location(SourceLocation::new("/src/Page.cs", 4, 9));
        assert_eq!(
            format!("{d}"),
            "warning[W0003]: /src/Page.cs:4:9: duplicate call site"
        );
    }

    #[test]
    fn display_with_target_and_hint() {
        let d = Diagnostic::new(DiagLevel::Warning, "no source location")
            .with_code(codes::W0001)
            .with_target("Html.Form")
            .with_hint("synthetic invocations cannot be intercepted");
        assert_eq!(
            format!("{d}"),
            "warning[W0001]: no source location (in call to Html.Form)\n  hint: synthetic invocations cannot be intercepted"
        );
    }

    #[test]
    fn builder_chain() {
        let d = Diagnostic::new(DiagLevel::Error, "bad format")
            .with_code(codes::E0001)
            .with_location(SourceLocation::new("a.cs", 1, 1))
            .with_target("T.M")
            .with_hint("use one of Guid, HtmlId, Timestamp, ShortHash");

        assert_eq!(d.code, Some(codes::E0001));
        assert!(d.is_error());
        assert_eq!(d.target.as_deref(), Some("T.M"));
        assert_eq!(
            d.hint.as_deref(),
            Some("use one of Guid, HtmlId, Timestamp, ShortHash")
        );
    }

    #[test]
    fn has_errors_ignores_warnings() {
        let warn = Diagnostic::new(DiagLevel::Warning, "w");
        let err = Diagnostic::new(DiagLevel::Error, "e");
        assert!(!has_errors(std::slice::from_ref(&warn)));
        assert!(has_errors(&[warn, err]));
    }
}
