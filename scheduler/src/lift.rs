// lift.rs — Loop-invariant cluster hoisting
//
// Per prefix, a cluster is a hoisting candidate when it operates on a
// multi-dimensional array, is not a reduction, and uses none of the prefix
// dimensions. A candidate is actually hoisted only when no sibling cluster
// writes any symbol it touches — whole-symbol granularity, conservative.
// Hoisted clusters lose the prefix dimensions from both spaces and are
// emitted before the rest: they must execute prior to entering the elided
// loop nest.
//
// Preconditions: directions enforced, siblings reordered.
// Postconditions: non-hoisted clusters keep their relative order.
// Failure modes: none.
// Side effects: none.

use std::collections::BTreeSet;

use crate::cluster::Cluster;
use crate::diag::Diagnostic;
use crate::queue::Pass;
use crate::space::{DimId, DimTable, IterationInterval, Symbol};

pub struct Lift<'a> {
    dims: &'a DimTable,
}

impl<'a> Lift<'a> {
    pub fn new(dims: &'a DimTable) -> Self {
        Lift { dims }
    }
}

impl Pass for Lift<'_> {
    type Elem = Cluster;

    fn conquer(
        &mut self,
        clusters: Vec<Cluster>,
        prefix: &[IterationInterval],
    ) -> Result<Vec<Cluster>, Diagnostic> {
        if prefix.is_empty() {
            // No enclosing iteration space to hoist out of.
            return Ok(clusters);
        }

        let invariant: BTreeSet<DimId> =
            prefix.iter().map(|it| self.dims.root(it.dim)).collect();

        let candidate: Vec<bool> = clusters
            .iter()
            .map(|c| {
                c.is_tensor()
                    && !c.is_increment()
                    && c.used_roots(self.dims).is_disjoint(&invariant)
            })
            .collect();
        if !candidate.iter().any(|&f| f) {
            return Ok(clusters);
        }

        let writes: Vec<BTreeSet<Symbol>> = clusters.iter().map(|c| c.writes()).collect();

        let mut hoisted = Vec::new();
        let mut processed = Vec::new();
        for (i, c) in clusters.into_iter().enumerate() {
            if candidate[i] {
                let touched = c.symbols();
                let shared = writes
                    .iter()
                    .enumerate()
                    .any(|(j, w)| j != i && !w.is_disjoint(&touched));
                if !shared {
                    hoisted.push(c.project(&invariant, self.dims));
                    continue;
                }
            }
            processed.push(c);
        }

        hoisted.extend(processed);
        Ok(hoisted)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
