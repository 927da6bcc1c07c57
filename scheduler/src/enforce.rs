// enforce.rs — Direction enforcement pass
//
// Resolves `Any` iteration directions into Forward/Backward per dimension,
// one sibling group at a time. A dimension carrying both a flow and an anti
// relation is ambiguous: the group is peeled from the end into a backlog
// until the ambiguity disappears, the surviving clusters get concrete
// directions, and the backlog is widened (conflict dimensions reset to
// `Any`) and resolved again at the same prefix.
//
// Preconditions: runs before reordering; prefixes come from the traversal
//                engine.
// Postconditions: no `Any` direction survives on any dimension the prefix
//                 defines; outer fixed directions are preserved.
// Failure modes: an empty group entering the resolver (E0200) — must not be
//                reachable from validated input.
// Side effects: accumulates split warnings (W0500) in `diagnostics`.

use std::collections::{BTreeMap, BTreeSet};

use crate::cluster::Cluster;
use crate::diag::{codes, Diagnostic};
use crate::eq::Equation;
use crate::queue::Pass;
use crate::scope::Scope;
use crate::space::{DimId, DimTable, Direction, IterationInterval};

pub struct Enforce<'a> {
    dims: &'a DimTable,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> Enforce<'a> {
    pub fn new(dims: &'a DimTable) -> Self {
        Enforce {
            dims,
            diagnostics: Vec::new(),
        }
    }

    fn resolve(
        &mut self,
        mut clusters: Vec<Cluster>,
        prefix: &[IterationInterval],
        mut backlog: Vec<Cluster>,
        known_conflict: BTreeSet<DimId>,
    ) -> Result<Vec<Cluster>, Diagnostic> {
        // The top level imposes no direction constraint.
        let innermost = match prefix.last() {
            Some(it) => it,
            None => return Ok(clusters),
        };

        if clusters.is_empty() {
            return Err(Diagnostic::error(
                "direction-conflict resolution exhausted a cluster group",
            )
            .with_code(codes::E0200)
            .with_hint("the upstream equation construction violated an invariant"));
        }

        let candidates = self.dims.defines(innermost.dim);
        let eqs: Vec<&Equation> = clusters.iter().flat_map(|c| &c.exprs).collect();
        let scope = Scope::new(&eqs, self.dims);

        let flow = scope.flow_candidates(&candidates, self.dims);
        let anti = scope.anti_candidates(&candidates, self.dims);
        let conflict: BTreeSet<DimId> = flow.intersection(&anti).copied().collect();

        if !conflict.is_empty() && clusters.len() > 1 {
            // Peel the last cluster into the backlog and retry with the
            // shrunken group; the group size strictly decreases, so this
            // terminates.
            if let Some(peeled) = clusters.pop() {
                backlog.insert(0, peeled);
            }
            let known: BTreeSet<DimId> = known_conflict.union(&conflict).copied().collect();
            return self.resolve(clusters, prefix, backlog, known);
        }

        // Anti relations march backward, flow relations forward; flow wins
        // on a leftover tie. Unconstrained candidates default forward, but
        // only where the direction is still `Any` — directions already
        // fixed are preserved.
        let mut forced: BTreeMap<DimId, Direction> = BTreeMap::new();
        for &d in &anti {
            forced.insert(d, Direction::Backward);
        }
        for &d in &flow {
            forced.insert(d, Direction::Forward);
        }

        let mut processed: Vec<Cluster> = clusters
            .iter()
            .map(|c| c.with_directions(&forced, &candidates))
            .collect();

        if backlog.is_empty() {
            return Ok(processed);
        }

        let conflict_names: Vec<&str> =
            known_conflict.iter().map(|d| self.dims.name(*d)).collect();
        self.diagnostics.push(
            Diagnostic::warning(format!(
                "coupled flow and anti dependences on {{{}}}: {} cluster(s) split into a \
                 separate loop nest",
                conflict_names.join(","),
                backlog.len()
            ))
            .with_code(codes::W0500),
        );

        // Widen the backlog over every conflicting dimension seen while
        // peeling, then resolve it at the same prefix.
        let widened: Vec<Cluster> = backlog.iter().map(|c| c.relax(&known_conflict)).collect();
        processed.extend(self.resolve(widened, prefix, Vec::new(), BTreeSet::new())?);
        Ok(processed)
    }
}

impl Pass for Enforce<'_> {
    type Elem = Cluster;

    fn conquer(
        &mut self,
        clusters: Vec<Cluster>,
        prefix: &[IterationInterval],
    ) -> Result<Vec<Cluster>, Diagnostic> {
        self.resolve(clusters, prefix, Vec::new(), BTreeSet::new())
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
