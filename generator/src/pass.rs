// pass.rs — Pass descriptor module: metadata, dependency resolution, artifact IDs
//
// Declares the generator's passes (manifest decoding is outside the runner),
// their dependency edges, and the artifacts they produce. Used by the pipeline
// runner to compute the minimal pass subset for each --emit target.

use std::collections::HashSet;

// ── Pass and Artifact identifiers ──────────────────────────────────────────

/// Identifies each generator pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    Collect,
    Emit,
}

/// Machine-readable artifact identifiers. Each maps to a concrete type
/// in `GenerationState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactId {
    Records,   // Vec<CallSiteRecord>
    Generated, // GeneratedSource
    Sites,     // Vec<EmittedSite>
}

// ── Pass descriptor ────────────────────────────────────────────────────────

/// Static metadata about a generator pass.
pub struct PassDescriptor {
    /// Human-readable name for log output.
    pub name: &'static str,
    /// Pass dependencies (other passes whose outputs this pass consumes).
    pub inputs: &'static [PassId],
    /// Artifacts this pass produces.
    pub outputs: &'static [ArtifactId],
    /// What invalidates this pass's output for an incremental host.
    pub invalidation_key: &'static str,
    /// Postconditions, logged at debug level after the pass runs.
    pub invariants: &'static str,
}

/// Return the static descriptor for a given pass.
pub fn descriptor(id: PassId) -> PassDescriptor {
    match id {
        PassId::Collect => PassDescriptor {
            name: "collect",
            inputs: &[],
            outputs: &[ArtifactId::Records],
            invalidation_key: "manifest",
            invariants: "every record has marked parameters and a unique location key",
        },
        PassId::Emit => PassDescriptor {
            name: "emit",
            inputs: &[PassId::Collect],
            outputs: &[ArtifactId::Generated, ArtifactId::Sites],
            invalidation_key: "records + emit_options",
            invariants: "one routine per valid record, byte-identical for identical input",
        },
    }
}

// ── Dependency resolution ──────────────────────────────────────────────────

/// All pass IDs in declaration order (used for iteration).
pub const ALL_PASSES: [PassId; 2] = [PassId::Collect, PassId::Emit];

/// Compute the minimal ordered set of passes needed to produce `terminal`.
/// Returns passes in topological (execution) order.
pub fn required_passes(terminal: PassId) -> Vec<PassId> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    visit(terminal, &mut visited, &mut order);
    order
}

fn visit(id: PassId, visited: &mut HashSet<PassId>, order: &mut Vec<PassId>) {
    if !visited.insert(id) {
        return;
    }
    for &dep in descriptor(id).inputs {
        visit(dep, visited, order);
    }
    order.push(id);
}

// ── Tests ──────────────────────────────────────────────────────────────────
