// cluster.rs — Clusters and cluster groups
//
// A `Cluster` is the minimal scheduling unit: equations sharing one
// iteration space, one data space, and one guard set. A `ClusterGroup` is an
// immutable ordered run of clusters plus the iteration-interval prefix
// common to all of them; its dependence scope is computed once, lazily, and
// cached for the group's lifetime (groups are never mutated after
// construction, so no invalidation exists).
//
// Preconditions: member equations share the cluster's spaces at
//                construction time.
// Side effects: none.

use std::cell::OnceCell;
use std::collections::{BTreeMap, BTreeSet};

use crate::eq::{Equation, Predicate};
use crate::scope::Scope;
use crate::space::{DataSpace, DimId, DimTable, Direction, IterationInterval, IterationSpace, Symbol};

// ── Cluster ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub exprs: Vec<Equation>,
    pub ispace: IterationSpace,
    pub dspace: DataSpace,
    pub guards: BTreeMap<DimId, Predicate>,
    /// Opaque atomics metadata, passed through and unioned on fusion.
    pub atomics: BTreeSet<DimId>,
}

impl Cluster {
    /// The initial one-equation cluster, inheriting the equation's spaces.
    pub fn from_equation(eq: Equation) -> Self {
        let ispace = eq.ispace.clone();
        let dspace = eq.dspace.clone();
        Cluster {
            exprs: vec![eq],
            ispace,
            dspace,
            guards: BTreeMap::new(),
            atomics: BTreeSet::new(),
        }
    }

    /// Fuse compatible clusters into one: equations concatenate in order,
    /// spaces merge, atomics union. Callers guarantee identical
    /// iteration-interval tuples and empty guards.
    pub fn from_clusters(parts: Vec<Cluster>) -> Cluster {
        debug_assert!(parts.iter().all(|c| c.guards.is_empty()));
        let mut parts = parts.into_iter();
        let first = match parts.next() {
            Some(c) => c,
            None => {
                return Cluster {
                    exprs: Vec::new(),
                    ispace: IterationSpace::default(),
                    dspace: DataSpace::default(),
                    guards: BTreeMap::new(),
                    atomics: BTreeSet::new(),
                }
            }
        };
        let mut exprs = first.exprs;
        let mut ispace = first.ispace;
        let mut dspace = first.dspace;
        let mut atomics = first.atomics;
        for c in parts {
            exprs.extend(c.exprs);
            ispace = ispace.merge(&c.ispace);
            dspace = dspace.merge(&c.dspace);
            atomics.extend(c.atomics);
        }
        Cluster {
            exprs,
            ispace,
            dspace,
            guards: BTreeMap::new(),
            atomics,
        }
    }

    /// The full iteration-interval tuple.
    pub fn itintervals(&self) -> &[IterationInterval] {
        &self.ispace.intervals
    }

    /// Rebuild with a direction map merged over the iteration space; see
    /// `IterationSpace::with_directions` for the forced/default split.
    pub fn with_directions(
        &self,
        forced: &BTreeMap<DimId, Direction>,
        defaults: &BTreeSet<DimId>,
    ) -> Cluster {
        Cluster {
            ispace: self.ispace.with_directions(forced, defaults),
            ..self.clone()
        }
    }

    /// Rebuild with the given dimensions widened to `Any` + reset interval.
    pub fn relax(&self, dims: &BTreeSet<DimId>) -> Cluster {
        Cluster {
            ispace: self.ispace.relax(dims),
            ..self.clone()
        }
    }

    /// Contract iteration and data space, dropping every dimension whose
    /// root lies in `invariant` (lifting).
    pub fn project(&self, invariant: &BTreeSet<DimId>, dims: &DimTable) -> Cluster {
        let keep = |d: DimId| !invariant.contains(&dims.root(d));
        Cluster {
            ispace: self.ispace.project(keep),
            dspace: self.dspace.project(keep),
            ..self.clone()
        }
    }

    pub fn is_tensor(&self) -> bool {
        self.exprs.iter().any(|e| e.tensor)
    }

    pub fn is_increment(&self) -> bool {
        self.exprs.iter().any(|e| e.increment)
    }

    pub fn writes_temporary(&self) -> bool {
        self.exprs.iter().any(|e| e.temporary)
    }

    pub fn has_guards(&self) -> bool {
        !self.guards.is_empty()
    }

    /// Symbols written by the cluster.
    pub fn writes(&self) -> BTreeSet<Symbol> {
        self.exprs.iter().map(|e| e.write.symbol.clone()).collect()
    }

    /// All symbols the cluster touches, read or written.
    pub fn symbols(&self) -> BTreeSet<Symbol> {
        let mut out = self.writes();
        for e in &self.exprs {
            for r in &e.reads {
                out.insert(r.symbol.clone());
            }
        }
        out
    }

    /// Root dimensions the cluster's equations actually use.
    pub fn used_roots(&self, dims: &DimTable) -> BTreeSet<DimId> {
        let mut out = BTreeSet::new();
        for e in &self.exprs {
            out.extend(e.used_roots(dims));
        }
        out
    }

    pub fn pretty(&self, dims: &DimTable) -> String {
        let eqs: Vec<String> = self.exprs.iter().map(|e| e.pretty(dims)).collect();
        let mut out = format!("{} {{ {} }}", self.ispace.pretty(dims), eqs.join("; "));
        if !self.guards.is_empty() {
            let guards: Vec<String> = self
                .guards
                .iter()
                .map(|(d, p)| format!("{}: {}", dims.name(*d), p.pretty(dims)))
                .collect();
            out.push_str(&format!(" when {{{}}}", guards.join(", ")));
        }
        out
    }
}

// ── ClusterGroup ────────────────────────────────────────────────────────────

/// An ordered, immutable sequence of clusters sharing a common
/// iteration-interval prefix.
#[derive(Debug)]
pub struct ClusterGroup {
    clusters: Vec<Cluster>,
    itintervals: Vec<IterationInterval>,
    scope: OnceCell<Scope>,
}

impl ClusterGroup {
    pub fn new(clusters: Vec<Cluster>, itintervals: Vec<IterationInterval>) -> Self {
        ClusterGroup {
            clusters,
            itintervals,
            scope: OnceCell::new(),
        }
    }

    /// A singleton group carrying the cluster's full tuple as its prefix.
    pub fn from_cluster(cluster: Cluster) -> Self {
        let itintervals = cluster.itintervals().to_vec();
        ClusterGroup::new(vec![cluster], itintervals)
    }

    /// Aggregate sibling groups into one group carrying the common prefix.
    pub fn from_groups(groups: Vec<ClusterGroup>, prefix: Vec<IterationInterval>) -> Self {
        let clusters = groups.into_iter().flat_map(|g| g.clusters).collect();
        ClusterGroup::new(clusters, prefix)
    }

    /// Flatten a sequence of groups back into a flat cluster sequence.
    pub fn concatenate(groups: Vec<ClusterGroup>) -> Vec<Cluster> {
        groups.into_iter().flat_map(|g| g.clusters).collect()
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn itintervals(&self) -> &[IterationInterval] {
        &self.itintervals
    }

    pub fn exprs(&self) -> Vec<&Equation> {
        self.clusters.iter().flat_map(|c| &c.exprs).collect()
    }

    pub fn writes_temporary(&self) -> bool {
        self.clusters.iter().any(|c| c.writes_temporary())
    }

    /// The group's dependence scope, computed on first access and cached for
    /// the group's lifetime.
    pub fn scope(&self, dims: &DimTable) -> &Scope {
        self.scope.get_or_init(|| Scope::new(&self.exprs(), dims))
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eq::Access;
    use crate::id::EqId;
    use crate::space::Interval;

    fn dims1() -> (DimTable, DimId) {
        let mut dims = DimTable::new();
        let x = dims.insert("x");
        (dims, x)
    }

    fn simple_eq(id: u32, x: DimId, write: &str, read: &str) -> Equation {
        Equation::new(
            EqId(id),
            Access::new(write, vec![(x, 0)]),
            vec![Access::new(read, vec![(x, 0)])],
            IterationSpace::new(vec![IterationInterval::new(
                x,
                Direction::Forward,
                Interval::zero(),
            )]),
            DataSpace::default(),
        )
    }

    #[test]
    fn fusion_concatenates_in_order() {
        let (_, x) = dims1();
        let c0 = Cluster::from_equation(simple_eq(0, x, "a", "b"));
        let c1 = Cluster::from_equation(simple_eq(1, x, "c", "a"));
        let fused = Cluster::from_clusters(vec![c0, c1]);
        let ids: Vec<EqId> = fused.exprs.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![EqId(0), EqId(1)]);
        assert_eq!(fused.itintervals().len(), 1);
        assert!(fused.guards.is_empty());
    }

    #[test]
    fn fusion_merges_interval_extents() {
        let (_, x) = dims1();
        let mut e0 = simple_eq(0, x, "a", "b");
        e0.ispace.intervals[0].interval = Interval::new(-1, 0);
        let mut e1 = simple_eq(1, x, "c", "a");
        e1.ispace.intervals[0].interval = Interval::new(0, 2);
        let fused = Cluster::from_clusters(vec![
            Cluster::from_equation(e0),
            Cluster::from_equation(e1),
        ]);
        assert_eq!(fused.itintervals()[0].interval, Interval::new(-1, 2));
    }

    #[test]
    fn group_scope_is_cached() {
        let (dims, x) = dims1();
        let group = ClusterGroup::from_cluster(Cluster::from_equation(simple_eq(0, x, "a", "b")));
        let first = group.scope(&dims) as *const Scope;
        let second = group.scope(&dims) as *const Scope;
        assert_eq!(first, second);
    }

    #[test]
    fn project_contracts_both_spaces() {
        let mut dims = DimTable::new();
        let t = dims.insert("t");
        let x = dims.insert("x");
        let mut eq = simple_eq(0, x, "k", "w");
        eq.ispace = IterationSpace::new(vec![
            IterationInterval::new(t, Direction::Forward, Interval::zero()),
            IterationInterval::new(x, Direction::Forward, Interval::zero()),
        ]);
        eq.dspace
            .parts
            .entry(Symbol::from("k"))
            .or_default()
            .insert(t, Interval::zero());
        let c = Cluster::from_equation(eq);
        let projected = c.project(&[t].into_iter().collect(), &dims);
        assert_eq!(projected.itintervals().len(), 1);
        assert_eq!(projected.itintervals()[0].dim, x);
        assert!(projected.dspace.parts[&Symbol::from("k")].is_empty());
    }
}
