// queue.rs — Divide-and-conquer traversal engine
//
// Drives a pass over a sequence of prefix-carrying elements (clusters or
// cluster groups): recursively groups consecutive elements by their first
// `level` iteration intervals, passes through any run whose tuple is
// shorter than the current level, recurses one level deeper on the rest,
// and runs the pass's conquer step on the regrouped sequence at every
// level with that level's prefix (empty at the top).
//
// Preconditions: none.
// Postconditions: element multiset is preserved up to what conquer does.
// Failure modes: conquer errors propagate out of the recursion immediately.
// Side effects: none beyond pass-internal state.

use crate::cluster::{Cluster, ClusterGroup};
use crate::diag::Diagnostic;
use crate::space::IterationInterval;

/// An element carrying an iteration-interval tuple the engine can group by.
pub trait Prefixed {
    fn itintervals(&self) -> &[IterationInterval];
}

impl Prefixed for Cluster {
    fn itintervals(&self) -> &[IterationInterval] {
        Cluster::itintervals(self)
    }
}

impl Prefixed for ClusterGroup {
    fn itintervals(&self) -> &[IterationInterval] {
        ClusterGroup::itintervals(self)
    }
}

/// A transformation invoked at each conquer step. Passes may carry state
/// (e.g. a diagnostics sink) across invocations.
pub trait Pass {
    type Elem: Prefixed;

    fn conquer(
        &mut self,
        elements: Vec<Self::Elem>,
        prefix: &[IterationInterval],
    ) -> Result<Vec<Self::Elem>, Diagnostic>;
}

/// Run `pass` over `elements`, depth-first by increasingly long prefixes.
pub fn process<P: Pass>(pass: &mut P, elements: Vec<P::Elem>) -> Result<Vec<P::Elem>, Diagnostic> {
    descend(pass, elements, 1, &[])
}

fn descend<P: Pass>(
    pass: &mut P,
    elements: Vec<P::Elem>,
    level: usize,
    prefix: &[IterationInterval],
) -> Result<Vec<P::Elem>, Diagnostic> {
    let mut processed = Vec::new();
    for (key, run) in group_by_prefix(elements, level) {
        if key.len() < level {
            // Base case: the tuple is exhausted; pass the run through.
            processed.extend(run);
        } else {
            processed.extend(descend(pass, run, level + 1, &key)?);
        }
    }
    pass.conquer(processed, prefix)
}

/// Split a sequence into maximal consecutive runs sharing the first `level`
/// iteration intervals (or the whole tuple, if shorter).
fn group_by_prefix<E: Prefixed>(
    elements: Vec<E>,
    level: usize,
) -> Vec<(Vec<IterationInterval>, Vec<E>)> {
    let mut runs: Vec<(Vec<IterationInterval>, Vec<E>)> = Vec::new();
    for e in elements {
        let tuple = e.itintervals();
        let key = tuple[..level.min(tuple.len())].to_vec();
        match runs.last_mut() {
            Some((k, run)) if *k == key => run.push(e),
            _ => runs.push((key, vec![e])),
        }
    }
    runs
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eq::{Access, Equation};
    use crate::id::EqId;
    use crate::space::{
        DataSpace, DimId, DimTable, Direction, Interval, IterationSpace,
    };

    /// A probe pass that records every (prefix length, element count)
    /// conquer call and reverses nothing.
    struct Probe {
        calls: Vec<(usize, usize)>,
    }

    impl Pass for Probe {
        type Elem = Cluster;

        fn conquer(
            &mut self,
            elements: Vec<Cluster>,
            prefix: &[IterationInterval],
        ) -> Result<Vec<Cluster>, Diagnostic> {
            self.calls.push((prefix.len(), elements.len()));
            Ok(elements)
        }
    }

    fn cluster_over(dims: &[DimId], id: u32) -> Cluster {
        let intervals = dims
            .iter()
            .map(|&d| IterationInterval::new(d, Direction::Forward, Interval::zero()))
            .collect();
        let eq = Equation::new(
            EqId(id),
            Access::new("u", dims.iter().map(|&d| (d, 0)).collect()),
            vec![],
            IterationSpace::new(intervals),
            DataSpace::default(),
        );
        Cluster::from_equation(eq)
    }

    #[test]
    fn conquer_runs_at_every_prefix_depth() {
        let mut dims = DimTable::new();
        let t = dims.insert("t");
        let x = dims.insert("x");
        let mut probe = Probe { calls: Vec::new() };
        let elements = vec![cluster_over(&[t, x], 0), cluster_over(&[t, x], 1)];
        let out = process(&mut probe, elements).unwrap();
        assert_eq!(out.len(), 2);
        // Depth-first: innermost prefix (t,x) first, then (t), then top.
        assert_eq!(probe.calls, vec![(2, 2), (1, 2), (0, 2)]);
    }

    #[test]
    fn short_elements_pass_through_unchanged() {
        let mut dims = DimTable::new();
        let t = dims.insert("t");
        let x = dims.insert("x");
        let mut probe = Probe { calls: Vec::new() };
        // A scalar-space cluster between two deep ones splits the runs.
        let elements = vec![
            cluster_over(&[t, x], 0),
            cluster_over(&[], 1),
            cluster_over(&[t, x], 2),
        ];
        let out = process(&mut probe, elements).unwrap();
        let ids: Vec<u32> = out.iter().map(|c| c.exprs[0].id.0).collect();
        assert_eq!(ids, vec![0, 1, 2], "order is preserved");
    }

    #[test]
    fn consecutive_runs_only() {
        let mut dims = DimTable::new();
        let t = dims.insert("t");
        let x = dims.insert("x");
        let y = dims.insert("y");
        let elements = vec![
            cluster_over(&[t, x], 0),
            cluster_over(&[t, y], 1),
            cluster_over(&[t, x], 2),
        ];
        let runs = group_by_prefix(elements, 2);
        assert_eq!(runs.len(), 3, "non-adjacent equal keys stay separate");
    }
}
