// Property-based tests for scheduler invariants.
//
// Three categories:
// 1. Pipeline totality: generated equation systems clusterize without error
// 2. Cert obligations: C1-C3 hold on every pipeline output
// 3. Determinism and guard idempotence over generated inputs
//
// Uses proptest with explicit configuration to prevent CI flakiness.

use proptest::prelude::*;

use csched::eq::{Access, ConditionalDim, Equation};
use csched::guard;
use csched::id::EqId;
use csched::pass::StageCert;
use csched::pipeline::{clusterize, fingerprint, verify};
use csched::space::{
    DataSpace, DimId, DimTable, Direction, Interval, IterationInterval, IterationSpace,
};

// ── Generators ──────────────────────────────────────────────────────────────

const SYMBOLS: [&str; 5] = ["a", "b", "c", "u", "v"];

/// Blueprint for one generated equation: which symbol it writes, with which
/// offsets, what it reads, and its flags.
#[derive(Debug, Clone)]
struct EqShape {
    write_sym: usize,
    write_off: (i64, i64),
    reads: Vec<(usize, (i64, i64))>,
    tensor: bool,
    increment: bool,
    conditional_factor: Option<u64>,
}

fn arb_eq_shape() -> impl Strategy<Value = EqShape> {
    (
        0..SYMBOLS.len(),
        (-1i64..=1, -1i64..=1),
        prop::collection::vec((0..SYMBOLS.len(), ((-1i64..=1), (-1i64..=1))), 0..3),
        prop::bool::ANY,
        prop::bool::weighted(0.2),
        prop::option::weighted(0.25, 2u64..=4),
    )
        .prop_map(
            |(write_sym, write_off, reads, tensor, increment, conditional_factor)| EqShape {
                write_sym,
                write_off,
                reads,
                tensor,
                increment,
                conditional_factor,
            },
        )
}

/// Realize a blueprint list into equations over a shared (t, x) nest with
/// unconstrained directions.
fn build_equations(shapes: &[EqShape], t: DimId, x: DimId) -> Vec<Equation> {
    shapes
        .iter()
        .enumerate()
        .map(|(i, shape)| {
            let ispace = IterationSpace::new(vec![
                IterationInterval::new(t, Direction::Any, Interval::zero()),
                IterationInterval::new(x, Direction::Any, Interval::zero()),
            ]);
            let write = Access::new(
                SYMBOLS[shape.write_sym],
                vec![(t, shape.write_off.0), (x, shape.write_off.1)],
            );
            let reads = shape
                .reads
                .iter()
                .map(|(sym, off)| Access::new(SYMBOLS[*sym], vec![(t, off.0), (x, off.1)]))
                .collect();
            let mut eq = Equation::new(EqId(i as u32), write, reads, ispace, DataSpace::default());
            if shape.tensor {
                eq = eq.tensor();
            }
            if shape.increment {
                eq = eq.increment();
            }
            if let Some(factor) = shape.conditional_factor {
                eq = eq.with_conditional(ConditionalDim {
                    dim: t,
                    condition: None,
                    factor,
                });
            }
            eq
        })
        .collect()
}

// ── Properties ──────────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn pipeline_output_satisfies_cert(shapes in prop::collection::vec(arb_eq_shape(), 1..8)) {
        let mut dims = DimTable::new();
        let t = dims.insert("t");
        let x = dims.insert("x");
        let eqs = build_equations(&shapes, t, x);

        let out = clusterize(&eqs, &dims).unwrap();
        let cert = verify(&eqs, &out);
        prop_assert!(cert.all_pass(), "cert failed: {:?}", cert.obligations());
    }

    #[test]
    fn no_residual_any_direction(shapes in prop::collection::vec(arb_eq_shape(), 1..8)) {
        let mut dims = DimTable::new();
        let t = dims.insert("t");
        let x = dims.insert("x");
        let eqs = build_equations(&shapes, t, x);

        let out = clusterize(&eqs, &dims).unwrap();
        for c in &out {
            for it in c.itintervals() {
                prop_assert!(it.direction != Direction::Any);
            }
        }
    }

    #[test]
    fn pipeline_is_deterministic(shapes in prop::collection::vec(arb_eq_shape(), 1..8)) {
        let mut dims = DimTable::new();
        let t = dims.insert("t");
        let x = dims.insert("x");
        let eqs = build_equations(&shapes, t, x);

        let out1 = clusterize(&eqs, &dims).unwrap();
        let out2 = clusterize(&eqs, &dims).unwrap();
        prop_assert_eq!(fingerprint(&out1), fingerprint(&out2));
        prop_assert_eq!(out1, out2);
    }

    #[test]
    fn guarding_is_idempotent_on_output(shapes in prop::collection::vec(arb_eq_shape(), 1..8)) {
        let mut dims = DimTable::new();
        let t = dims.insert("t");
        let x = dims.insert("x");
        let eqs = build_equations(&shapes, t, x);

        let out = clusterize(&eqs, &dims).unwrap();
        let again = guard::guard(out.clone(), &dims);
        prop_assert_eq!(out, again);
    }
}
