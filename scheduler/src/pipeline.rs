// pipeline.rs — Entry point and pass orchestration
//
// `clusterize` is the single entry contract: an ordered equation list in, a
// correctness-preserving ordered cluster sequence out. `run` executes the
// minimal pass chain up to a terminal pass, collecting warnings and
// per-pass timings (observability only; the output never depends on them).
// `verify` produces a machine-checkable cert over the output, and
// `fingerprint` hashes a canonical summary for reproducibility checks.
//
// Preconditions: equations come from a validated upstream construction
//                stage; `run` re-validates the cheap structural bits.
// Postconditions: deterministic output for identical input.
// Failure modes: E0100/E0101 at validation, E0200/E0300 from the passes.
// Side effects: none.

use std::time::{Duration, Instant};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::cluster::{Cluster, ClusterGroup};
use crate::diag::Diagnostic;
use crate::enforce::Enforce;
use crate::eq::Equation;
use crate::fuse;
use crate::guard;
use crate::id::EqId;
use crate::lift::Lift;
use crate::pass::{required_passes, PassId, StageCert};
use crate::queue;
use crate::space::{DimTable, Direction};
use crate::toposort::Toposort;

// ── Results ────────────────────────────────────────────────────────────────

/// Result of a pipeline run: the cluster sequence, accumulated warnings,
/// and per-pass wall-clock timings.
#[derive(Debug)]
pub struct PipelineResult {
    pub clusters: Vec<Cluster>,
    pub diagnostics: Vec<Diagnostic>,
    pub timings: Vec<(PassId, Duration)>,
}

// ── Entry points ───────────────────────────────────────────────────────────

/// Turn a sequence of lowered equations into an ordered sequence of fused,
/// direction-resolved, guarded clusters.
pub fn clusterize(eqs: &[Equation], dims: &DimTable) -> Result<Vec<Cluster>, Diagnostic> {
    run(eqs, dims, PassId::Guard).map(|r| r.clusters)
}

/// Run the minimal pass chain up to `terminal`.
pub fn run(
    eqs: &[Equation],
    dims: &DimTable,
    terminal: PassId,
) -> Result<PipelineResult, Diagnostic> {
    for eq in eqs {
        eq.validate(dims)?;
    }

    let mut clusters: Vec<Cluster> = eqs.iter().cloned().map(Cluster::from_equation).collect();
    let mut diagnostics = Vec::new();
    let mut timings = Vec::new();

    for pass in required_passes(terminal) {
        let start = Instant::now();
        clusters = match pass {
            PassId::Enforce => {
                let mut enforce = Enforce::new(dims);
                let out = queue::process(&mut enforce, clusters)?;
                diagnostics.append(&mut enforce.diagnostics);
                out
            }
            PassId::Toposort => {
                let groups: Vec<ClusterGroup> =
                    clusters.into_iter().map(ClusterGroup::from_cluster).collect();
                let mut toposort = Toposort::new(dims);
                ClusterGroup::concatenate(queue::process(&mut toposort, groups)?)
            }
            PassId::Lift => {
                let mut lift = Lift::new(dims);
                queue::process(&mut lift, clusters)?
            }
            PassId::Fuse => fuse::fuse(clusters),
            PassId::Guard => guard::guard(clusters, dims),
        };
        timings.push((pass, start.elapsed()));
    }

    Ok(PipelineResult {
        clusters,
        diagnostics,
        timings,
    })
}

// ── Verification ───────────────────────────────────────────────────────────

/// Machine-checkable evidence for pipeline postconditions (C1-C3).
#[derive(Debug, Clone)]
pub struct ClusterizeCert {
    /// C1: No residual `Any` direction in any output cluster.
    pub c1_no_residual_any: bool,
    /// C2: Every input equation appears exactly once in the output.
    pub c2_equations_preserved: bool,
    /// C3: Guarded clusters hold exactly one conditional equation and
    /// unguarded clusters hold none.
    pub c3_guard_separation: bool,
}

impl StageCert for ClusterizeCert {
    fn all_pass(&self) -> bool {
        self.c1_no_residual_any && self.c2_equations_preserved && self.c3_guard_separation
    }

    fn obligations(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("C1_no_residual_any", self.c1_no_residual_any),
            ("C2_equations_preserved", self.c2_equations_preserved),
            ("C3_guard_separation", self.c3_guard_separation),
        ]
    }
}

/// Verify pipeline postconditions over `clusters`, given the input `eqs`.
pub fn verify(eqs: &[Equation], clusters: &[Cluster]) -> ClusterizeCert {
    let c1 = clusters.iter().all(|c| {
        c.itintervals()
            .iter()
            .all(|it| it.direction != Direction::Any)
    });

    let mut expected: Vec<EqId> = eqs.iter().map(|e| e.id).collect();
    expected.sort();
    let mut seen: Vec<EqId> = clusters
        .iter()
        .flat_map(|c| &c.exprs)
        .map(|e| e.id)
        .collect();
    seen.sort();
    let c2 = expected == seen;

    let c3 = clusters.iter().all(|c| {
        if c.has_guards() {
            c.exprs.len() == 1 && !c.exprs[0].conditionals.is_empty()
        } else {
            c.exprs.iter().all(|e| e.conditionals.is_empty())
        }
    });

    ClusterizeCert {
        c1_no_residual_any: c1,
        c2_equations_preserved: c2,
        c3_guard_separation: c3,
    }
}

// ── Provenance fingerprint ─────────────────────────────────────────────────

#[derive(Serialize)]
struct IntervalSummary {
    dim: u32,
    direction: String,
    lower: i64,
    upper: i64,
}

#[derive(Serialize)]
struct ClusterSummary {
    equations: Vec<u32>,
    ispace: Vec<IntervalSummary>,
    guards: Vec<(u32, String)>,
    atomics: Vec<u32>,
}

/// Canonical compact-JSON summary of a cluster sequence. Stable across
/// runs: every collection is emitted in a defined order.
pub fn canonical_json(clusters: &[Cluster]) -> String {
    let summaries: Vec<ClusterSummary> = clusters
        .iter()
        .map(|c| ClusterSummary {
            equations: c.exprs.iter().map(|e| e.id.0).collect(),
            ispace: c
                .itintervals()
                .iter()
                .map(|it| IntervalSummary {
                    dim: it.dim.0,
                    direction: it.direction.to_string(),
                    lower: it.interval.lower,
                    upper: it.interval.upper,
                })
                .collect(),
            guards: c
                .guards
                .iter()
                .map(|(d, p)| (d.0, p.to_string()))
                .collect(),
            atomics: c.atomics.iter().map(|d| d.0).collect(),
        })
        .collect();
    serde_json::to_string(&summaries).expect("summary serialization is infallible")
}

/// SHA-256 over the canonical summary; the reproducibility anchor.
pub fn fingerprint(clusters: &[Cluster]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(clusters).as_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Hex string of a fingerprint (64 characters).
pub fn fingerprint_hex(clusters: &[Cluster]) -> String {
    let mut s = String::with_capacity(64);
    for b in fingerprint(clusters) {
        use std::fmt::Write;
        let _ = write!(s, "{:02x}", b);
    }
    s
}

/// Render a cluster sequence for humans (and snapshots): one line per
/// cluster, index-prefixed.
pub fn pretty_sequence(clusters: &[Cluster], dims: &DimTable) -> String {
    let mut out = String::new();
    for (i, c) in clusters.iter().enumerate() {
        out.push_str(&format!("{}: {}\n", i, c.pretty(dims)));
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────
