// dag.rs — Dependency graph over sibling cluster groups
//
// An explicit adjacency-list DAG over group indices, with a topological
// sort parameterized by a node-selection strategy: at each step the chooser
// picks a position in the ready queue (seeded and refilled in deterministic
// order). A drained ready queue with unscheduled nodes left means a cycle.
//
// Preconditions: node indices are dense, 0..len.
// Postconditions: a successful sort respects every edge.
// Failure modes: cyclic graph → E0300.
// Side effects: none.

use std::collections::{BTreeSet, VecDeque};

use crate::diag::{codes, Diagnostic};

#[derive(Debug)]
pub struct DepDag {
    succ: Vec<BTreeSet<usize>>,
}

impl DepDag {
    pub fn new(nodes: usize) -> Self {
        DepDag {
            succ: vec![BTreeSet::new(); nodes],
        }
    }

    pub fn len(&self) -> usize {
        self.succ.len()
    }

    pub fn is_empty(&self) -> bool {
        self.succ.is_empty()
    }

    /// Add `from -> to`. Duplicate edges collapse; self-edges are rejected
    /// by debug assertion (a pair is never compared against itself).
    pub fn add_edge(&mut self, from: usize, to: usize) {
        debug_assert_ne!(from, to);
        self.succ[from].insert(to);
    }

    pub fn has_edge(&self, from: usize, to: usize) -> bool {
        self.succ[from].contains(&to)
    }

    pub fn edge_count(&self) -> usize {
        self.succ.iter().map(|s| s.len()).sum()
    }

    /// Kahn's algorithm with a pluggable selection strategy. `choose` maps
    /// (ready queue, schedule so far) to the position of the next node in
    /// the ready queue; it must return a valid position.
    pub fn topological_sort<F>(&self, mut choose: F) -> Result<Vec<usize>, Diagnostic>
    where
        F: FnMut(&VecDeque<usize>, &[usize]) -> usize,
    {
        let n = self.len();
        let mut in_degree = vec![0usize; n];
        for targets in &self.succ {
            for &t in targets {
                in_degree[t] += 1;
            }
        }

        let mut ready: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut scheduled = Vec::with_capacity(n);

        while !ready.is_empty() {
            let pos = choose(&ready, &scheduled);
            let node = ready
                .remove(pos)
                .expect("chooser returned an out-of-bounds ready position");
            scheduled.push(node);
            for &next in &self.succ[node] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push_back(next);
                }
            }
        }

        if scheduled.len() < n {
            let done: BTreeSet<usize> = scheduled.iter().copied().collect();
            let stuck: Vec<usize> = (0..n).filter(|i| !done.contains(i)).collect();
            return Err(Diagnostic::error(format!(
                "cyclic dependence among cluster groups: {} node(s) unschedulable ({:?})",
                stuck.len(),
                stuck
            ))
            .with_code(codes::E0300));
        }

        Ok(scheduled)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Oldest-ready-first chooser: plain Kahn order.
    fn oldest(_: &VecDeque<usize>, _: &[usize]) -> usize {
        0
    }

    #[test]
    fn respects_edges() {
        let mut dag = DepDag::new(4);
        dag.add_edge(2, 0);
        dag.add_edge(0, 1);
        dag.add_edge(2, 3);
        let order = dag.topological_sort(oldest).unwrap();
        let pos = |n: usize| order.iter().position(|&x| x == n).unwrap();
        assert!(pos(2) < pos(0));
        assert!(pos(0) < pos(1));
        assert!(pos(2) < pos(3));
    }

    #[test]
    fn preserves_insertion_order_among_independent_nodes() {
        let dag = DepDag::new(3);
        let order = dag.topological_sort(oldest).unwrap();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn cycle_is_a_hard_error() {
        let mut dag = DepDag::new(2);
        dag.add_edge(0, 1);
        dag.add_edge(1, 0);
        let err = dag.topological_sort(oldest).unwrap_err();
        assert_eq!(err.code, Some(codes::E0300));
        assert!(err.message.contains("cyclic"));
    }

    #[test]
    fn chooser_controls_tie_breaks() {
        // 0 and 1 both ready; a last-position chooser flips the order.
        let dag = DepDag::new(2);
        let order = dag
            .topological_sort(|ready, _| ready.len() - 1)
            .unwrap();
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn duplicate_edges_collapse() {
        let mut dag = DepDag::new(2);
        dag.add_edge(0, 1);
        dag.add_edge(0, 1);
        assert_eq!(dag.edge_count(), 1);
        let order = dag.topological_sort(oldest).unwrap();
        assert_eq!(order, vec![0, 1]);
    }
}
