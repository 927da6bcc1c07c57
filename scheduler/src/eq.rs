// eq.rs — Lowered equations and their access metadata
//
// An `Equation` is one assignment-like computation produced by the upstream
// symbolic layer: one written access, the accesses it reads, its iteration
// and data spaces, three capability flags, and optional conditional
// dimension annotations. The scheduler never looks inside the right-hand
// side; the access footprint is all it consumes.
//
// Preconditions: none (types only); `validate` is the entry check.
// Failure modes: `validate` rejects ill-formed intervals (E0100) and
//                zero modulo factors (E0101).
// Side effects: none.

use std::collections::BTreeSet;
use std::fmt;

use crate::diag::{codes, Diagnostic};
use crate::id::EqId;
use crate::space::{DataSpace, DimId, DimTable, IterationSpace, Symbol};

// ── Accesses ────────────────────────────────────────────────────────────────

/// One array access: a symbol plus its per-axis constant offsets, e.g.
/// `u[t+1, x-1]` is `(u, [(t, 1), (x, -1)])`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Access {
    pub symbol: Symbol,
    pub offsets: Vec<(DimId, i64)>,
}

impl Access {
    pub fn new(symbol: impl Into<Symbol>, offsets: Vec<(DimId, i64)>) -> Self {
        Self {
            symbol: symbol.into(),
            offsets,
        }
    }

    pub fn dims(&self) -> impl Iterator<Item = DimId> + '_ {
        self.offsets.iter().map(|(d, _)| *d)
    }

    pub fn pretty(&self, dims: &DimTable) -> String {
        let idx: Vec<String> = self
            .offsets
            .iter()
            .map(|(d, off)| match off {
                0 => dims.name(*d).to_string(),
                o if *o > 0 => format!("{}+{}", dims.name(*d), o),
                o => format!("{}{}", dims.name(*d), o),
            })
            .collect();
        format!("{}[{}]", self.symbol, idx.join(","))
    }
}

// ── Guard predicates ────────────────────────────────────────────────────────

/// A boolean predicate gating conditional execution of a cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `dim % factor == 0`.
    Modulo { dim: DimId, factor: u64 },
    /// An opaque condition supplied upstream, carried through verbatim.
    Expr(String),
    /// Conjunction of several conditions on one parent dimension.
    And(Vec<Predicate>),
}

impl Predicate {
    pub fn pretty(&self, dims: &DimTable) -> String {
        match self {
            Predicate::Modulo { dim, factor } => {
                format!("{} % {} == 0", dims.name(*dim), factor)
            }
            Predicate::Expr(e) => e.clone(),
            Predicate::And(parts) => {
                let rendered: Vec<String> = parts.iter().map(|p| p.pretty(dims)).collect();
                rendered.join(" && ")
            }
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Modulo { dim, factor } => write!(f, "d{} % {} == 0", dim.0, factor),
            Predicate::Expr(e) => write!(f, "{e}"),
            Predicate::And(parts) => {
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, " && ")?;
                    }
                    write!(f, "{p}")?;
                }
                Ok(())
            }
        }
    }
}

/// A conditional-dimension annotation: the equation only executes when the
/// condition holds. With no explicit condition, the default is
/// `parent % factor == 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalDim {
    pub dim: DimId,
    pub condition: Option<Predicate>,
    pub factor: u64,
}

// ── Equations ───────────────────────────────────────────────────────────────

/// One lowered assignment-like computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equation {
    pub id: EqId,
    pub write: Access,
    pub reads: Vec<Access>,
    pub ispace: IterationSpace,
    pub dspace: DataSpace,
    /// Operates on a multi-dimensional array (lifting candidate gate).
    pub tensor: bool,
    /// Reduction-style self-referential accumulation.
    pub increment: bool,
    /// Writes a temporary array (excluded from the fusion preference).
    pub temporary: bool,
    pub conditionals: Vec<ConditionalDim>,
}

impl Equation {
    pub fn new(
        id: EqId,
        write: Access,
        reads: Vec<Access>,
        ispace: IterationSpace,
        dspace: DataSpace,
    ) -> Self {
        Self {
            id,
            write,
            reads,
            ispace,
            dspace,
            tensor: false,
            increment: false,
            temporary: false,
            conditionals: Vec::new(),
        }
    }

    pub fn tensor(mut self) -> Self {
        self.tensor = true;
        self
    }

    pub fn increment(mut self) -> Self {
        self.increment = true;
        self
    }

    pub fn temporary(mut self) -> Self {
        self.temporary = true;
        self
    }

    pub fn with_conditional(mut self, cond: ConditionalDim) -> Self {
        self.conditionals.push(cond);
        self
    }

    /// Root dimensions the equation's accesses and conditionals touch.
    pub fn used_roots(&self, dims: &DimTable) -> BTreeSet<DimId> {
        let mut out = BTreeSet::new();
        for d in self.write.dims() {
            out.insert(dims.root(d));
        }
        for read in &self.reads {
            for d in read.dims() {
                out.insert(dims.root(d));
            }
        }
        for cond in &self.conditionals {
            out.insert(dims.root(cond.dim));
        }
        out
    }

    /// Entry validation: every interval well-formed, every default-modulo
    /// factor nonzero.
    pub fn validate(&self, dims: &DimTable) -> Result<(), Diagnostic> {
        for it in &self.ispace.intervals {
            if !it.interval.is_wellformed() {
                return Err(Diagnostic::error(format!(
                    "equation e{}: ill-formed interval {} on dimension '{}'",
                    self.id.0,
                    it.interval,
                    dims.name(it.dim),
                ))
                .with_code(codes::E0100));
            }
        }
        for (sym, per_dim) in &self.dspace.parts {
            for (d, iv) in per_dim {
                if !iv.is_wellformed() {
                    return Err(Diagnostic::error(format!(
                        "equation e{}: ill-formed data interval {} for '{}' on dimension '{}'",
                        self.id.0,
                        iv,
                        sym,
                        dims.name(*d),
                    ))
                    .with_code(codes::E0100));
                }
            }
        }
        for cond in &self.conditionals {
            if cond.condition.is_none() && cond.factor == 0 {
                return Err(Diagnostic::error(format!(
                    "equation e{}: conditional on dimension '{}' has a zero modulo factor",
                    self.id.0,
                    dims.name(cond.dim),
                ))
                .with_code(codes::E0101));
            }
        }
        Ok(())
    }

    pub fn pretty(&self, dims: &DimTable) -> String {
        let op = if self.increment { "<+" } else { "<-" };
        let reads: Vec<String> = self.reads.iter().map(|r| r.pretty(dims)).collect();
        format!("{} {} {}", self.write.pretty(dims), op, reads.join(", "))
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::{Direction, Interval, IterationInterval};

    fn table() -> (DimTable, DimId, DimId) {
        let mut dims = DimTable::new();
        let t = dims.insert("t");
        let x = dims.insert("x");
        (dims, t, x)
    }

    #[test]
    fn pretty_renders_offsets() {
        let (dims, t, x) = table();
        let eq = Equation::new(
            EqId(0),
            Access::new("u", vec![(t, 1), (x, 0)]),
            vec![Access::new("u", vec![(t, 0), (x, -1)])],
            IterationSpace::default(),
            DataSpace::default(),
        );
        assert_eq!(eq.pretty(&dims), "u[t+1,x] <- u[t,x-1]");
    }

    #[test]
    fn validate_rejects_bad_interval() {
        let (dims, t, _) = table();
        let eq = Equation::new(
            EqId(3),
            Access::new("u", vec![(t, 0)]),
            vec![],
            IterationSpace::new(vec![IterationInterval::new(
                t,
                Direction::Any,
                Interval::new(2, 1),
            )]),
            DataSpace::default(),
        );
        let err = eq.validate(&dims).unwrap_err();
        assert_eq!(err.code, Some(codes::E0100));
        assert!(err.message.contains("e3"));
    }

    #[test]
    fn validate_rejects_zero_factor() {
        let (dims, t, _) = table();
        let eq = Equation::new(
            EqId(0),
            Access::new("u", vec![(t, 0)]),
            vec![],
            IterationSpace::default(),
            DataSpace::default(),
        )
        .with_conditional(ConditionalDim {
            dim: t,
            condition: None,
            factor: 0,
        });
        let err = eq.validate(&dims).unwrap_err();
        assert_eq!(err.code, Some(codes::E0101));
    }

    #[test]
    fn validate_accepts_explicit_condition_with_zero_factor() {
        let (dims, t, _) = table();
        let eq = Equation::new(
            EqId(0),
            Access::new("u", vec![(t, 0)]),
            vec![],
            IterationSpace::default(),
            DataSpace::default(),
        )
        .with_conditional(ConditionalDim {
            dim: t,
            condition: Some(Predicate::Expr("t > 0".to_string())),
            factor: 0,
        });
        assert!(eq.validate(&dims).is_ok());
    }

    #[test]
    fn used_roots_cover_reads_writes_and_conditionals(){
        let mut dims = DimTable::new();
        let time = dims.insert("time");
        let t = dims.insert_derived("t", time);
        let x = dims.insert("x");
        let y = dims.insert("y");
        let eq = Equation::new(
            EqId(0),
            Access::new("u", vec![(t, 1), (x, 0)]),
            vec![Access::new("v", vec![(t, 0), (x, 0)])],
            IterationSpace::default(),
            DataSpace::default(),
        )
        .with_conditional(ConditionalDim {
            dim: t,
            condition: None,
            factor: 2,
        });
        let roots = eq.used_roots(&dims);
        assert!(roots.contains(&time));
        assert!(roots.contains(&x));
        assert!(!roots.contains(&y));
    }
}
