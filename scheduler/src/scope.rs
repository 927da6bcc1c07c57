// scope.rs — Dependence analysis over a set of equations
//
// Computes flow, anti, and increment dependence relations for every textual
// pair of equations, each relation recording its cause: the set of root
// dimensions on which the producer and consumer indices differ. An empty
// cause means the dependence is local to the current iteration.
//
// This is the sole source of dependence truth for enforcement, graph
// construction, and lifting.
//
// Preconditions: equations carry well-formed access metadata.
// Postconditions: relation order is deterministic in equation order.
// Failure modes: none.
// Side effects: none.

use std::collections::BTreeSet;

use crate::eq::{Access, Equation};
use crate::id::EqId;
use crate::space::{DimId, DimTable, Symbol};

// ── Relations ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DepKind {
    /// An earlier equation writes a symbol a later one reads.
    Flow,
    /// An earlier equation reads a symbol a later one writes.
    Anti,
    /// Reduction-style self-referential accumulation.
    Increment,
}

/// Identity of a relation, used to subtract group-local relations from a
/// union scope.
pub type DepKey = (EqId, EqId, Symbol, DepKind);

/// One dependence relation instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependence {
    pub source: EqId,
    pub sink: EqId,
    pub symbol: Symbol,
    pub kind: DepKind,
    /// Root dimensions carrying the relation; empty = iteration-local.
    pub cause: BTreeSet<DimId>,
}

impl Dependence {
    pub fn is_carried(&self) -> bool {
        !self.cause.is_empty()
    }

    pub fn key(&self) -> DepKey {
        (self.source, self.sink, self.symbol.clone(), self.kind)
    }

    pub fn pretty(&self, dims: &DimTable) -> String {
        let kind = match self.kind {
            DepKind::Flow => "flow",
            DepKind::Anti => "anti",
            DepKind::Increment => "increment",
        };
        let cause: Vec<&str> = self.cause.iter().map(|d| dims.name(*d)).collect();
        format!(
            "{} e{} -> e{} on {} [{}]",
            kind,
            self.source.0,
            self.sink.0,
            self.symbol,
            cause.join(",")
        )
    }
}

// ── Scope ───────────────────────────────────────────────────────────────────

/// All dependence relations among one set of equations.
#[derive(Debug)]
pub struct Scope {
    deps: Vec<Dependence>,
}

impl Scope {
    pub fn new(eqs: &[&Equation], dims: &DimTable) -> Self {
        let mut deps = Vec::new();

        for (i, &a) in eqs.iter().enumerate() {
            if a.increment {
                deps.push(Dependence {
                    source: a.id,
                    sink: a.id,
                    symbol: a.write.symbol.clone(),
                    kind: DepKind::Increment,
                    cause: reduction_roots(a, dims),
                });
            }

            for &b in &eqs[i + 1..] {
                // Increments over one symbol commute; they relate as
                // Increment rather than Flow/Anti.
                let commuting = (a.increment && b.increment
                    && a.write.symbol == b.write.symbol)
                    .then(|| a.write.symbol.clone());
                if let Some(sym) = &commuting {
                    deps.push(Dependence {
                        source: a.id,
                        sink: b.id,
                        symbol: sym.clone(),
                        kind: DepKind::Increment,
                        cause: differing_roots(&a.write, &b.write, dims),
                    });
                }

                for read in &b.reads {
                    if read.symbol == a.write.symbol && Some(&read.symbol) != commuting.as_ref() {
                        deps.push(Dependence {
                            source: a.id,
                            sink: b.id,
                            symbol: read.symbol.clone(),
                            kind: DepKind::Flow,
                            cause: differing_roots(&a.write, read, dims),
                        });
                    }
                }

                for read in &a.reads {
                    if read.symbol == b.write.symbol && Some(&read.symbol) != commuting.as_ref() {
                        deps.push(Dependence {
                            source: a.id,
                            sink: b.id,
                            symbol: read.symbol.clone(),
                            kind: DepKind::Anti,
                            cause: differing_roots(&b.write, read, dims),
                        });
                    }
                }
            }
        }

        Scope { deps }
    }

    pub fn all(&self) -> &[Dependence] {
        &self.deps
    }

    pub fn flow(&self) -> impl Iterator<Item = &Dependence> {
        self.deps.iter().filter(|d| d.kind == DepKind::Flow)
    }

    pub fn anti(&self) -> impl Iterator<Item = &Dependence> {
        self.deps.iter().filter(|d| d.kind == DepKind::Anti)
    }

    pub fn increments(&self) -> impl Iterator<Item = &Dependence> {
        self.deps.iter().filter(|d| d.kind == DepKind::Increment)
    }

    /// Union of the causes of all flow relations.
    pub fn flow_causes(&self) -> BTreeSet<DimId> {
        self.flow().flat_map(|d| d.cause.iter().copied()).collect()
    }

    /// Union of the causes of all anti relations.
    pub fn anti_causes(&self) -> BTreeSet<DimId> {
        self.anti().flat_map(|d| d.cause.iter().copied()).collect()
    }

    /// The candidate dimensions whose root carries a flow relation.
    pub fn flow_candidates(
        &self,
        candidates: &BTreeSet<DimId>,
        dims: &DimTable,
    ) -> BTreeSet<DimId> {
        restrict(&self.flow_causes(), candidates, dims)
    }

    /// The candidate dimensions whose root carries an anti relation.
    pub fn anti_candidates(
        &self,
        candidates: &BTreeSet<DimId>,
        dims: &DimTable,
    ) -> BTreeSet<DimId> {
        restrict(&self.anti_causes(), candidates, dims)
    }

    /// Relation identities, for subtracting local relations from a union
    /// scope.
    pub fn keys(&self) -> BTreeSet<DepKey> {
        self.deps.iter().map(|d| d.key()).collect()
    }
}

/// Candidate dimensions whose root appears in `causes` (causes are stored as
/// roots).
fn restrict(
    causes: &BTreeSet<DimId>,
    candidates: &BTreeSet<DimId>,
    dims: &DimTable,
) -> BTreeSet<DimId> {
    candidates
        .iter()
        .copied()
        .filter(|&d| causes.contains(&dims.root(d)))
        .collect()
}

/// Root dimensions on which two accesses to one symbol index differently.
/// Axes are aligned positionally; an axis whose dimensions disagree
/// contributes both roots, as does an axis present on one side only.
fn differing_roots(write: &Access, read: &Access, dims: &DimTable) -> BTreeSet<DimId> {
    let mut out = BTreeSet::new();
    let n = write.offsets.len().max(read.offsets.len());
    for k in 0..n {
        match (write.offsets.get(k), read.offsets.get(k)) {
            (Some(&(dw, ow)), Some(&(dr, or))) => {
                if dw != dr {
                    out.insert(dims.root(dw));
                    out.insert(dims.root(dr));
                } else if ow != or {
                    out.insert(dims.root(dw));
                }
            }
            (Some(&(d, _)), None) | (None, Some(&(d, _))) => {
                out.insert(dims.root(d));
            }
            (None, None) => {}
        }
    }
    out
}

/// Iteration-space roots an increment equation reduces over: the dimensions
/// of its iteration space that its write access does not index.
fn reduction_roots(eq: &Equation, dims: &DimTable) -> BTreeSet<DimId> {
    let written: BTreeSet<DimId> = eq.write.dims().map(|d| dims.root(d)).collect();
    eq.ispace
        .dimensions()
        .map(|d| dims.root(d))
        .filter(|d| !written.contains(d))
        .collect()
}

// ── Tests ───────────────────────────────────────────────────────────────────
