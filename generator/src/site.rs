// site.rs — Call-site records
//
// One `CallSiteRecord` per intercepted invocation. Records are built by the
// collector, never mutated, and consumed once by the emitter.

use serde::Serialize;

use crate::format::{format_literal, IdFormat};
use crate::location::{LocationKey, SourceLocation};

/// Position of a kept call site within one generation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SiteId(pub u32);

/// Allocates `SiteId`s in manifest order. Lives for a single collect pass.
#[derive(Debug, Default)]
pub struct SiteIdAllocator {
    next: u32,
}

impl SiteIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self) -> SiteId {
        let id = SiteId(self.next);
        self.next += 1;
        id
    }
}

/// A declared parameter of the target method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    /// Default-value literal exactly as declared.
    pub default: Option<String>,
}

impl ParameterInfo {
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// Decoded marker configuration of one parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkedParameter {
    /// Index into `CallSiteRecord::parameters` (full declaration order).
    pub ordinal: usize,
    pub format: IdFormat,
    pub prefix: Option<String>,
    /// Reserved; literals are deterministic either way.
    pub deterministic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallSiteRecord {
    pub site_id: SiteId,
    /// Declaring type, as the host spells it in generated code.
    pub target_type: String,
    pub method_name: String,
    /// `void` for methods without a result.
    pub return_type: String,
    pub is_static: bool,
    pub location: SourceLocation,
    pub location_key: LocationKey,
    pub parameters: Vec<ParameterInfo>,
    /// Never empty.
    pub marked_parameters: Vec<MarkedParameter>,
}

impl CallSiteRecord {
    pub fn is_void(&self) -> bool {
        self.return_type == "void"
    }

    /// `Type.Method`, for diagnostics.
    pub fn target_display(&self) -> String {
        format!("{}.{}", self.target_type, self.method_name)
    }

    /// Literal injected for `marked` when the caller passes null.
    pub fn literal_for(&self, marked: &MarkedParameter) -> String {
        format_literal(
            &self.location_key,
            marked.ordinal,
            marked.format,
            marked.prefix.as_deref(),
        )
    }

    /// The parameter a marker refers to, if its ordinal is in range.
    pub fn marked_parameter_info(&self, marked: &MarkedParameter) -> Option<&ParameterInfo> {
        self.parameters.get(marked.ordinal)
    }
}
