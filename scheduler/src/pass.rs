// pass.rs — Pass descriptor module: metadata and dependency resolution
//
// Declares the scheduler's 5 passes, their dependency edges, and the
// invariants each one establishes. Used by the pipeline runner to compute
// the minimal pass chain for a given terminal pass.

use std::collections::HashSet;

// ── Pass identifiers ───────────────────────────────────────────────────────

/// Identifies each scheduling pass (input validation is outside the runner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    Enforce,
    Toposort,
    Lift,
    Fuse,
    Guard,
}

// ── Pass descriptor ────────────────────────────────────────────────────────

/// Static metadata about a scheduling pass.
pub struct PassDescriptor {
    /// Human-readable name for diagnostics/verbose output.
    pub name: &'static str,
    /// Pass dependencies (passes whose output this pass consumes).
    pub inputs: &'static [PassId],
    /// Conditions the pass establishes (documentation only).
    pub invariants: &'static str,
}

/// Return the static descriptor for a given pass.
pub fn descriptor(id: PassId) -> PassDescriptor {
    match id {
        PassId::Enforce => PassDescriptor {
            name: "enforce",
            inputs: &[],
            invariants: "no Any direction on any prefix-defined dimension",
        },
        PassId::Toposort => PassDescriptor {
            name: "toposort",
            inputs: &[PassId::Enforce],
            invariants: "sibling order respects every dependence edge",
        },
        PassId::Lift => PassDescriptor {
            name: "lift",
            inputs: &[PassId::Toposort],
            invariants: "hoisted clusters precede their former loop nest",
        },
        PassId::Fuse => PassDescriptor {
            name: "fuse",
            inputs: &[PassId::Lift],
            invariants: "no two adjacent unguarded clusters share a tuple",
        },
        PassId::Guard => PassDescriptor {
            name: "guard",
            inputs: &[PassId::Fuse],
            invariants: "guarded clusters hold exactly one conditional equation",
        },
    }
}

// ── Dependency resolution ──────────────────────────────────────────────────

/// All 5 pass ids in declaration order (used for iteration).
pub const ALL_PASSES: [PassId; 5] = [
    PassId::Enforce,
    PassId::Toposort,
    PassId::Lift,
    PassId::Fuse,
    PassId::Guard,
];

/// Compute the minimal ordered set of passes needed to reach `terminal`.
/// Returns passes in execution order.
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

// ── Stage certification ────────────────────────────────────────────────────

/// Machine-checkable evidence that a stage's postconditions hold.
pub trait StageCert {
    fn all_pass(&self) -> bool;
    fn obligations(&self) -> Vec<(&'static str, bool)>;
}

// ── Tests ──────────────────────────────────────────────────────────────────
