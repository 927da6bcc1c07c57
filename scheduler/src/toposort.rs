// toposort.rs — Heuristic topological reordering of sibling cluster groups
//
// Reorders the sibling groups at one nesting level to maximize adjacency of
// groups with identical iteration-interval tuples (adjacent compatible
// groups fuse later), then aggregates the siblings into a single group
// carrying the common prefix for the next level up.
//
// Reordering is skipped when no two groups share a tuple (nothing could
// fuse) or when all groups already share one tuple (nothing to sort).
//
// Preconditions: directions are already enforced.
// Postconditions: every dependence edge is respected by the new order.
// Failure modes: cyclic dependence graph (E0300, via dag).
// Side effects: none.

use std::collections::{BTreeSet, HashMap};

use crate::cluster::ClusterGroup;
use crate::dag::DepDag;
use crate::diag::Diagnostic;
use crate::eq::Equation;
use crate::queue::Pass;
use crate::scope::{DepKey, Scope};
use crate::space::{DimId, DimTable, IterationInterval};

pub struct Toposort<'a> {
    dims: &'a DimTable,
}

impl<'a> Toposort<'a> {
    pub fn new(dims: &'a DimTable) -> Self {
        Toposort { dims }
    }

    fn reorder(
        &self,
        cgroups: Vec<ClusterGroup>,
        prefix: &[IterationInterval],
    ) -> Result<Vec<ClusterGroup>, Diagnostic> {
        let mut counts: HashMap<Vec<IterationInterval>, usize> = HashMap::new();
        for cg in &cgroups {
            *counts.entry(cg.itintervals().to_vec()).or_insert(0) += 1;
        }
        // Nothing fusible, or nothing to resort.
        if !counts.values().any(|&v| v > 1) || counts.len() == 1 {
            return Ok(cgroups);
        }

        let dag = self.build_dag(&cgroups, prefix);

        let order = dag.topological_sort(|ready, scheduled| {
            // Prefer a ready group with the same tuple as the last
            // scheduled one, excluding temporary writers (kept in place to
            // preserve later blocking opportunities); otherwise take the
            // oldest-inserted ready group.
            if let Some(&last) = scheduled.last() {
                let target = cgroups[last].itintervals();
                for (pos, &cand) in ready.iter().enumerate() {
                    if cgroups[cand].itintervals() == target
                        && !cgroups[cand].writes_temporary()
                    {
                        return pos;
                    }
                }
            }
            0
        })?;

        let mut slots: Vec<Option<ClusterGroup>> = cgroups.into_iter().map(Some).collect();
        Ok(order
            .into_iter()
            .map(|i| slots[i].take().expect("topological order repeats a node"))
            .collect())
    }

    /// A DAG capturing which sibling groups must stay ordered. For a pair
    /// `(g0, g1)` with `g0` textually first, an edge is added when the
    /// union scope shows a relation neither group has on its own:
    /// any anti relation, or a flow relation whose cause does not reach
    /// the prefix (an iteration-local flow, or one carried entirely on
    /// dimensions outside the prefix — either way no shared loop level
    /// sequences the two groups).
    fn build_dag(&self, cgroups: &[ClusterGroup], prefix: &[IterationInterval]) -> DepDag {
        let prefix_roots: BTreeSet<DimId> =
            prefix.iter().map(|it| self.dims.root(it.dim)).collect();
        let mut dag = DepDag::new(cgroups.len());

        for (i, g0) in cgroups.iter().enumerate() {
            for (jj, g1) in cgroups.iter().enumerate().skip(i + 1) {
                let mut union_eqs: Vec<&Equation> = g0.exprs();
                union_eqs.extend(g1.exprs());
                let union_scope = Scope::new(&union_eqs, self.dims);

                let mut local: BTreeSet<DepKey> = g0.scope(self.dims).keys();
                local.extend(g1.scope(self.dims).keys());

                let anti_crossing = union_scope
                    .anti()
                    .any(|d| !local.contains(&d.key()));
                if anti_crossing {
                    dag.add_edge(i, jj);
                    continue;
                }

                let flow_crossing = union_scope.flow().any(|d| {
                    !local.contains(&d.key())
                        && (d.cause.is_empty() || d.cause.is_disjoint(&prefix_roots))
                });
                if flow_crossing {
                    dag.add_edge(i, jj);
                }
            }
        }
        dag
    }
}

impl Pass for Toposort<'_> {
    type Elem = ClusterGroup;

    fn conquer(
        &mut self,
        cgroups: Vec<ClusterGroup>,
        prefix: &[IterationInterval],
    ) -> Result<Vec<ClusterGroup>, Diagnostic> {
        let cgroups = self.reorder(cgroups, prefix)?;
        Ok(vec![ClusterGroup::from_groups(cgroups, prefix.to_vec())])
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
