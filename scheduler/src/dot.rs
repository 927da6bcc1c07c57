// dot.rs — Graphviz DOT output for cluster sequences
//
// Renders a cluster sequence and its dependence relations in DOT format
// suitable for `dot`, `neato`, or other Graphviz layout engines. Debug aid
// for inspecting what the scheduler produced and why the order is pinned.
//
// Preconditions: `clusters` is a fully constructed sequence.
// Postconditions: returns a valid DOT string; output is deterministic.
// Failure modes: none (pure string formatting).
// Side effects: none.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use crate::cluster::Cluster;
use crate::eq::Equation;
use crate::id::EqId;
use crate::scope::{DepKind, Scope};
use crate::space::DimTable;

/// Emit a cluster sequence as a Graphviz DOT string.
pub fn emit_dot(clusters: &[Cluster], dims: &DimTable) -> String {
    let mut buf = String::new();
    writeln!(buf, "digraph csched {{").unwrap();
    writeln!(buf, "    rankdir=TB;").unwrap();
    writeln!(
        buf,
        "    node [shape=box, fontname=\"Helvetica\", fontsize=10];"
    )
    .unwrap();
    writeln!(buf, "    edge [fontname=\"Helvetica\", fontsize=9];").unwrap();

    let mut owner: BTreeMap<EqId, usize> = BTreeMap::new();
    for (i, c) in clusters.iter().enumerate() {
        for e in &c.exprs {
            owner.insert(e.id, i);
        }
    }

    for (i, c) in clusters.iter().enumerate() {
        let mut label = c.ispace.pretty(dims);
        for e in &c.exprs {
            label.push_str("\\n");
            label.push_str(&sanitize(&e.pretty(dims)));
        }
        if c.has_guards() {
            let guards: Vec<String> = c
                .guards
                .iter()
                .map(|(d, p)| format!("{}: {}", dims.name(*d), p.pretty(dims)))
                .collect();
            label.push_str("\\nwhen ");
            label.push_str(&sanitize(&guards.join(", ")));
        }
        writeln!(buf, "    c{i} [label=\"{label}\"];").unwrap();
    }

    let eqs: Vec<&Equation> = clusters.iter().flat_map(|c| &c.exprs).collect();
    let scope = Scope::new(&eqs, dims);

    let mut edges: BTreeSet<(usize, usize, String)> = BTreeSet::new();
    for dep in scope.all() {
        let (src, dst) = match (owner.get(&dep.source), owner.get(&dep.sink)) {
            (Some(&s), Some(&t)) if s != t => (s, t),
            _ => continue,
        };
        let kind = match dep.kind {
            DepKind::Flow => "flow",
            DepKind::Anti => "anti",
            DepKind::Increment => "increment",
        };
        let cause: Vec<&str> = dep.cause.iter().map(|d| dims.name(*d)).collect();
        edges.insert((src, dst, format!("{}({})", kind, cause.join(","))));
    }

    for (src, dst, label) in edges {
        writeln!(buf, "    c{src} -> c{dst} [label=\"{label}\"];").unwrap();
    }

    writeln!(buf, "}}").unwrap();
    buf
}

fn sanitize(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

// ── Tests ───────────────────────────────────────────────────────────────────
