// pipeline.rs — Generation state and pass orchestration
//
// Holds the manifest and every pass artifact, and runs the minimal set of
// passes for a given terminal PassId.
//
// Preconditions: the manifest is decoded before calling run_pipeline.
// Postconditions: artifacts for all required passes are populated. Record-level
//                 errors set `has_error` but never stop later passes: valid
//                 call sites are still emitted.
// Failure modes: none beyond diagnostics.
// Side effects: calls on_pass_complete after each pass for immediate display.

use std::path::Path;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::collect::collect;
use crate::descriptor::{read_manifest_text, InvocationManifest, ManifestError};
use crate::diag::{has_errors, Diagnostic};
use crate::emit::{emit, EmitOptions, EmittedSite, GeneratedSource};
use crate::pass::{descriptor, required_passes, PassId};
use crate::site::CallSiteRecord;

// ── Provenance ─────────────────────────────────────────────────────────────

/// Provenance metadata for hermetic builds and cache-key use.
///
/// `manifest_hash`: SHA-256 of the raw manifest text.
/// `generator_version`: crate version from `Cargo.toml`.
#[derive(Debug, Clone)]
pub struct Provenance {
    pub manifest_hash: [u8; 32],
    pub generator_version: &'static str,
}

#[derive(Serialize)]
struct BuildInfo<'a> {
    manifest_hash: String,
    generator_version: &'a str,
}

impl Provenance {
    /// Hex string of the manifest hash (64 characters).
    pub fn manifest_hash_hex(&self) -> String {
        bytes_to_hex(&self.manifest_hash)
    }

    /// Serialize provenance as pretty JSON for `--emit build-info`.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let info = BuildInfo {
            manifest_hash: self.manifest_hash_hex(),
            generator_version: self.generator_version,
        };
        let mut json = serde_json::to_string_pretty(&info)?;
        json.push('\n');
        Ok(json)
    }
}

fn bytes_to_hex(bytes: &[u8; 32]) -> String {
    let mut s = String::with_capacity(64);
    for b in bytes {
        use std::fmt::Write;
        let _ = write!(s, "{:02x}", b);
    }
    s
}

/// Compute provenance from the raw manifest text.
pub fn compute_provenance(manifest_text: &str) -> Provenance {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(manifest_text.as_bytes());
    let result = hasher.finalize();
    let mut manifest_hash = [0u8; 32];
    manifest_hash.copy_from_slice(&result);

    Provenance {
        manifest_hash,
        generator_version: env!("CARGO_PKG_VERSION"),
    }
}

// ── Generation state ───────────────────────────────────────────────────────

/// Holds all generation artifacts and accumulated diagnostics.
pub struct GenerationState {
    pub manifest: InvocationManifest,
    pub records: Option<Vec<CallSiteRecord>>,
    pub generated: Option<GeneratedSource>,
    pub sites: Option<Vec<EmittedSite>>,
    pub diagnostics: Vec<Diagnostic>,
    pub has_error: bool,
    pub provenance: Option<Provenance>,
}

impl GenerationState {
    pub fn new(manifest: InvocationManifest) -> Self {
        Self {
            manifest,
            records: None,
            generated: None,
            sites: None,
            diagnostics: Vec::new(),
            has_error: false,
            provenance: None,
        }
    }

    /// Decode `text` and record its provenance.
    pub fn from_manifest_text(text: &str) -> Result<Self, ManifestError> {
        let manifest = InvocationManifest::from_json(text)?;
        let mut state = Self::new(manifest);
        state.provenance = Some(compute_provenance(text));
        Ok(state)
    }

    /// Read, decode and hash the manifest at `path`.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = read_manifest_text(path)?;
        Self::from_manifest_text(&text)
    }
}

/// Per-pass post-processing: callback, accumulate, log, error flag.
fn finish_pass(
    state: &mut GenerationState,
    pass_id: PassId,
    diags: Vec<Diagnostic>,
    elapsed: Duration,
    on_pass_complete: &mut impl FnMut(PassId, &[Diagnostic]),
) {
    on_pass_complete(pass_id, &diags);
    if has_errors(&diags) {
        state.has_error = true;
    }
    let desc = descriptor(pass_id);
    tracing::info!(
        pass = desc.name,
        diagnostics = diags.len(),
        "{} complete, {:.1}ms",
        desc.name,
        elapsed.as_secs_f64() * 1000.0
    );
    tracing::debug!(
        pass = desc.name,
        invalidated_by = desc.invalidation_key,
        "guarantees: {}",
        desc.invariants
    );
    state.diagnostics.extend(diags);
}

// ── Pipeline runner ────────────────────────────────────────────────────────

/// Run the minimal set of passes to produce `terminal`.
///
/// Per-pass sequence: execute → on_pass_complete(callback) → log → error flag.
pub fn run_pipeline(
    state: &mut GenerationState,
    terminal: PassId,
    emit_options: &EmitOptions,
    mut on_pass_complete: impl FnMut(PassId, &[Diagnostic]),
) {
    for pass_id in required_passes(terminal) {
        match pass_id {
            PassId::Collect => {
                let t = Instant::now();
                let result = collect(&state.manifest);
                let elapsed = t.elapsed();
                state.records = Some(result.records);
                finish_pass(
                    state,
                    PassId::Collect,
                    result.diagnostics,
                    elapsed,
                    &mut on_pass_complete,
                );
            }
            PassId::Emit => {
                let t = Instant::now();
                let records = state.records.as_deref().unwrap_or_default();
                let result = emit(records, emit_options);
                let elapsed = t.elapsed();
                state.generated = Some(result.generated);
                state.sites = Some(result.sites);
                finish_pass(
                    state,
                    PassId::Emit,
                    result.diagnostics,
                    elapsed,
                    &mut on_pass_complete,
                );
            }
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
