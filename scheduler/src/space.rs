// space.rs — Dimension, direction, and iteration/data space model
//
// The vocabulary every pass speaks: dimensions interned in an arena with
// optional parents (derived dimensions, e.g. modulo-indexed buffers),
// iteration intervals carrying a direction tag, ordered iteration spaces,
// and per-symbol data spaces.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ── Dimensions ──────────────────────────────────────────────────────────────

/// Unique identifier for a dimension interned in a `DimTable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DimId(pub u32);

#[derive(Debug, Clone)]
struct DimEntry {
    name: String,
    parent: Option<DimId>,
}

/// Arena of interned dimensions. Equations and spaces refer to dimensions by
/// `DimId` only; passes query parent/root relations and the "defined"
/// closure through this table.
#[derive(Debug, Default)]
pub struct DimTable {
    entries: Vec<DimEntry>,
}

impl DimTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a root dimension.
    pub fn insert(&mut self, name: impl Into<String>) -> DimId {
        let id = DimId(self.entries.len() as u32);
        self.entries.push(DimEntry {
            name: name.into(),
            parent: None,
        });
        id
    }

    /// Intern a dimension derived from `parent`.
    pub fn insert_derived(&mut self, name: impl Into<String>, parent: DimId) -> DimId {
        let id = DimId(self.entries.len() as u32);
        self.entries.push(DimEntry {
            name: name.into(),
            parent: Some(parent),
        });
        id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn name(&self, d: DimId) -> &str {
        &self.entries[d.0 as usize].name
    }

    pub fn parent(&self, d: DimId) -> Option<DimId> {
        self.entries[d.0 as usize].parent
    }

    /// Walk the parent chain up to the root dimension.
    pub fn root(&self, d: DimId) -> DimId {
        let mut cur = d;
        while let Some(p) = self.parent(cur) {
            cur = p;
        }
        cur
    }

    /// The dimensions "defined" by `d`: itself, its derived dimensions, and
    /// (for a derived dimension) its parent plus the siblings sharing it.
    pub fn defines(&self, d: DimId) -> BTreeSet<DimId> {
        let mut out = BTreeSet::new();
        out.insert(d);
        let pivot = self.parent(d).unwrap_or(d);
        out.insert(pivot);
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.parent == Some(pivot) {
                out.insert(DimId(i as u32));
            }
        }
        out
    }

    /// Map a set of dimensions to their roots.
    pub fn roots(&self, dims: &BTreeSet<DimId>) -> BTreeSet<DimId> {
        dims.iter().map(|&d| self.root(d)).collect()
    }
}

// ── Direction ───────────────────────────────────────────────────────────────

/// Iteration direction of a loop dimension. `Any` is unconstrained and must
/// not survive past the enforcement pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
    Any,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Forward => "++",
            Direction::Backward => "--",
            Direction::Any => "*",
        };
        write!(f, "{s}")
    }
}

// ── Interval ────────────────────────────────────────────────────────────────

/// Accumulated offset range of a dimension. Ill-formed when `lower > upper`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub lower: i64,
    pub upper: i64,
}

impl Interval {
    pub fn new(lower: i64, upper: i64) -> Self {
        Self { lower, upper }
    }

    pub fn zero() -> Self {
        Self { lower: 0, upper: 0 }
    }

    pub fn is_wellformed(&self) -> bool {
        self.lower <= self.upper
    }

    /// Union of two intervals over the same dimension.
    pub fn union(&self, other: &Interval) -> Interval {
        Interval {
            lower: self.lower.min(other.lower),
            upper: self.upper.max(other.upper),
        }
    }

    /// Contract the accumulated offsets back to the empty extent.
    pub fn reset(&self) -> Interval {
        Interval::zero()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.lower, self.upper)
    }
}

// ── Iteration intervals and spaces ──────────────────────────────────────────

/// One loop-nest entry: (dimension, direction, accumulated offset interval).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IterationInterval {
    pub dim: DimId,
    pub direction: Direction,
    pub interval: Interval,
}

impl IterationInterval {
    pub fn new(dim: DimId, direction: Direction, interval: Interval) -> Self {
        Self {
            dim,
            direction,
            interval,
        }
    }

    pub fn pretty(&self, dims: &DimTable) -> String {
        format!("{}{}{}", dims.name(self.dim), self.direction, self.interval)
    }
}

impl fmt::Display for IterationInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}{}{}", self.dim.0, self.direction, self.interval)
    }
}

/// An ordered loop nest: iteration intervals, outermost first, plus opaque
/// sub-iterator detail attached per dimension. Sub-iterators pass through
/// every transformation untouched except for projection and merging.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IterationSpace {
    pub intervals: Vec<IterationInterval>,
    pub sub_iterators: BTreeMap<DimId, Vec<String>>,
}

impl IterationSpace {
    pub fn new(intervals: Vec<IterationInterval>) -> Self {
        Self {
            intervals,
            sub_iterators: BTreeMap::new(),
        }
    }

    pub fn with_sub_iterators(
        intervals: Vec<IterationInterval>,
        sub_iterators: BTreeMap<DimId, Vec<String>>,
    ) -> Self {
        Self {
            intervals,
            sub_iterators,
        }
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn dimensions(&self) -> impl Iterator<Item = DimId> + '_ {
        self.intervals.iter().map(|it| it.dim)
    }

    /// The leading `level` iteration intervals (all of them if shorter).
    pub fn prefix(&self, level: usize) -> &[IterationInterval] {
        &self.intervals[..level.min(self.intervals.len())]
    }

    /// Merge a direction map over matching dimensions. `forced` entries
    /// always apply; `defaults` dimensions fall to Forward only where the
    /// current direction is still `Any`, so directions already fixed are
    /// preserved.
    pub fn with_directions(
        &self,
        forced: &BTreeMap<DimId, Direction>,
        defaults: &BTreeSet<DimId>,
    ) -> IterationSpace {
        let intervals = self
            .intervals
            .iter()
            .map(|it| match forced.get(&it.dim) {
                Some(&direction) => IterationInterval { direction, ..*it },
                None if defaults.contains(&it.dim) && it.direction == Direction::Any => {
                    IterationInterval {
                        direction: Direction::Forward,
                        ..*it
                    }
                }
                None => *it,
            })
            .collect();
        IterationSpace {
            intervals,
            sub_iterators: self.sub_iterators.clone(),
        }
    }

    /// Widen the space over `dims`: the matching entries get direction `Any`
    /// and a contracted (reset) interval, in place.
    pub fn relax(&self, dims: &BTreeSet<DimId>) -> IterationSpace {
        let intervals = self
            .intervals
            .iter()
            .map(|it| {
                if dims.contains(&it.dim) {
                    IterationInterval {
                        dim: it.dim,
                        direction: Direction::Any,
                        interval: it.interval.reset(),
                    }
                } else {
                    *it
                }
            })
            .collect();
        IterationSpace {
            intervals,
            sub_iterators: self.sub_iterators.clone(),
        }
    }

    /// Contract the space to the dimensions `keep` accepts; sub-iterators of
    /// dropped dimensions are dropped with them.
    pub fn project(&self, keep: impl Fn(DimId) -> bool) -> IterationSpace {
        let intervals: Vec<_> = self
            .intervals
            .iter()
            .filter(|it| keep(it.dim))
            .copied()
            .collect();
        let sub_iterators = self
            .sub_iterators
            .iter()
            .filter(|(d, _)| keep(**d))
            .map(|(d, v)| (*d, v.clone()))
            .collect();
        IterationSpace {
            intervals,
            sub_iterators,
        }
    }

    /// Merge with a space over the same dimension sequence: per-dimension
    /// interval union, sub-iterator union.
    pub fn merge(&self, other: &IterationSpace) -> IterationSpace {
        let intervals = self
            .intervals
            .iter()
            .zip(other.intervals.iter())
            .map(|(a, b)| IterationInterval {
                dim: a.dim,
                direction: a.direction,
                interval: a.interval.union(&b.interval),
            })
            .collect();
        let mut sub_iterators = self.sub_iterators.clone();
        for (d, subs) in &other.sub_iterators {
            let slot = sub_iterators.entry(*d).or_default();
            for s in subs {
                if !slot.contains(s) {
                    slot.push(s.clone());
                }
            }
        }
        IterationSpace {
            intervals,
            sub_iterators,
        }
    }

    pub fn pretty(&self, dims: &DimTable) -> String {
        let parts: Vec<String> = self.intervals.iter().map(|it| it.pretty(dims)).collect();
        format!("[{}]", parts.join(" "))
    }
}

// ── Symbols and data spaces ─────────────────────────────────────────────────

/// An interned array/scalar name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Symbol(name.into())
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol(name.to_string())
    }
}

impl From<String> for Symbol {
    fn from(name: String) -> Self {
        Symbol(name)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-symbol accessed-index intervals. Opaque to the scheduler except for
/// contraction (projection) during lifting and merging during fusion.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataSpace {
    pub parts: BTreeMap<Symbol, BTreeMap<DimId, Interval>>,
}

impl DataSpace {
    pub fn new(parts: BTreeMap<Symbol, BTreeMap<DimId, Interval>>) -> Self {
        Self { parts }
    }

    /// Contract the data space to the dimensions `keep` accepts.
    pub fn project(&self, keep: impl Fn(DimId) -> bool) -> DataSpace {
        let parts = self
            .parts
            .iter()
            .map(|(sym, per_dim)| {
                let kept = per_dim
                    .iter()
                    .filter(|(d, _)| keep(**d))
                    .map(|(d, iv)| (*d, *iv))
                    .collect();
                (sym.clone(), kept)
            })
            .collect();
        DataSpace { parts }
    }

    /// Per-symbol, per-dimension interval union.
    pub fn merge(&self, other: &DataSpace) -> DataSpace {
        let mut parts = self.parts.clone();
        for (sym, per_dim) in &other.parts {
            let slot = parts.entry(sym.clone()).or_default();
            for (d, iv) in per_dim {
                slot.entry(*d)
                    .and_modify(|cur| *cur = cur.union(iv))
                    .or_insert(*iv);
            }
        }
        DataSpace { parts }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
