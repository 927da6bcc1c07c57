// guard.rs — Conditional-guard splitting
//
// Splits clusters containing conditionally-executed equations: free
// equations accumulate into unguarded clusters, each conditional equation
// becomes its own single-equation cluster whose guard map is built per
// parent dimension (explicit predicate if given, else the default
// `parent % factor == 0`; several conditions on one parent conjoin).
// Equation order is never altered; a cluster with no conditional equations
// is returned unchanged, which makes the pass idempotent.
//
// Preconditions: runs once, after fusion.
// Postconditions: guarded clusters hold exactly one equation.
// Failure modes: none (zero factors are rejected at entry validation).
// Side effects: none.

use std::collections::BTreeMap;

use crate::cluster::Cluster;
use crate::eq::{Equation, Predicate};
use crate::space::{DimId, DimTable};

pub fn guard(clusters: Vec<Cluster>, dims: &DimTable) -> Vec<Cluster> {
    let mut processed = Vec::new();

    for c in clusters {
        if c.exprs.iter().all(|e| e.conditionals.is_empty()) {
            processed.push(c);
            continue;
        }

        let Cluster {
            exprs,
            ispace,
            dspace,
            atomics,
            ..
        } = c;

        let mut free: Vec<Equation> = Vec::new();
        for e in exprs {
            if e.conditionals.is_empty() {
                free.push(e);
                continue;
            }
            if !free.is_empty() {
                processed.push(Cluster {
                    exprs: std::mem::take(&mut free),
                    ispace: ispace.clone(),
                    dspace: dspace.clone(),
                    guards: BTreeMap::new(),
                    atomics: atomics.clone(),
                });
            }
            let guards = build_guards(&e, dims);
            processed.push(Cluster {
                exprs: vec![e],
                ispace: ispace.clone(),
                dspace: dspace.clone(),
                guards,
                atomics: atomics.clone(),
            });
        }
        if !free.is_empty() {
            processed.push(Cluster {
                exprs: free,
                ispace,
                dspace,
                guards: BTreeMap::new(),
                atomics,
            });
        }
    }

    processed
}

/// One combined predicate per parent dimension: the explicit condition if
/// given, else `parent % factor == 0`; conjunction when a parent carries
/// several conditions.
fn build_guards(e: &Equation, dims: &DimTable) -> BTreeMap<DimId, Predicate> {
    let mut by_parent: BTreeMap<DimId, Vec<Predicate>> = BTreeMap::new();
    for cond in &e.conditionals {
        let parent = dims.parent(cond.dim).unwrap_or(cond.dim);
        let predicate = cond.condition.clone().unwrap_or(Predicate::Modulo {
            dim: parent,
            factor: cond.factor,
        });
        by_parent.entry(parent).or_default().push(predicate);
    }
    by_parent
        .into_iter()
        .map(|(parent, mut conditions)| {
            let combined = if conditions.len() == 1 {
                conditions.remove(0)
            } else {
                Predicate::And(conditions)
            };
            (parent, combined)
        })
        .collect()
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eq::{Access, ConditionalDim};
    use crate::id::EqId;
    use crate::space::{DataSpace, Direction, Interval, IterationInterval, IterationSpace};

    struct Fixture {
        dims: DimTable,
        time: DimId,
        t: DimId,
        x: DimId,
    }

    fn fixture() -> Fixture {
        let mut dims = DimTable::new();
        let time = dims.insert("time");
        let t = dims.insert_derived("t", time);
        let x = dims.insert("x");
        Fixture { dims, time, t, x }
    }

    fn eq(fx: &Fixture, id: u32, conditionals: Vec<ConditionalDim>) -> Equation {
        let mut e = Equation::new(
            EqId(id),
            Access::new("u", vec![(fx.t, 0), (fx.x, 0)]),
            vec![Access::new("v", vec![(fx.t, 0), (fx.x, 0)])],
            IterationSpace::new(vec![
                IterationInterval::new(fx.t, Direction::Forward, Interval::zero()),
                IterationInterval::new(fx.x, Direction::Forward, Interval::zero()),
            ]),
            DataSpace::default(),
        );
        e.conditionals = conditionals;
        e
    }

    #[test]
    fn default_guard_is_parent_modulo_factor() {
        let fx = fixture();
        let e = eq(
            &fx,
            0,
            vec![ConditionalDim {
                dim: fx.t,
                condition: None,
                factor: 2,
            }],
        );
        let out = guard(vec![Cluster::from_equation(e)], &fx.dims);
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].guards.get(&fx.time),
            Some(&Predicate::Modulo {
                dim: fx.time,
                factor: 2
            })
        );
    }

    #[test]
    fn split_preserves_equation_order() {
        let fx = fixture();
        let free0 = eq(&fx, 0, vec![]);
        let cond = eq(
            &fx,
            1,
            vec![ConditionalDim {
                dim: fx.t,
                condition: None,
                factor: 4,
            }],
        );
        let free1 = eq(&fx, 2, vec![]);
        let mut cluster = Cluster::from_equation(free0);
        cluster.exprs.push(cond);
        cluster.exprs.push(free1);
        let out = guard(vec![cluster], &fx.dims);
        assert_eq!(out.len(), 3);
        let ids: Vec<u32> = out.iter().flat_map(|c| &c.exprs).map(|e| e.id.0).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(!out[0].has_guards());
        assert!(out[1].has_guards());
        assert!(!out[2].has_guards());
    }

    #[test]
    fn conditions_on_one_parent_conjoin() {
        let fx = fixture();
        let e = eq(
            &fx,
            0,
            vec![
                ConditionalDim {
                    dim: fx.t,
                    condition: None,
                    factor: 2,
                },
                ConditionalDim {
                    dim: fx.t,
                    condition: Some(Predicate::Expr("time > 8".to_string())),
                    factor: 0,
                },
            ],
        );
        let out = guard(vec![Cluster::from_equation(e)], &fx.dims);
        match out[0].guards.get(&fx.time) {
            Some(Predicate::And(parts)) => assert_eq!(parts.len(), 2),
            other => panic!("expected a conjunction, got {other:?}"),
        }
    }

    #[test]
    fn guarding_is_idempotent() {
        let fx = fixture();
        let e = eq(
            &fx,
            0,
            vec![ConditionalDim {
                dim: fx.t,
                condition: None,
                factor: 2,
            }],
        );
        let once = guard(vec![Cluster::from_equation(e)], &fx.dims);
        let twice = guard(once.clone(), &fx.dims);
        assert_eq!(once, twice);
    }
}
