// fuse.rs — Cluster fusion
//
// Merges maximal consecutive runs of clusters sharing an identical full
// iteration-interval tuple into a single cluster. Runs of length one and
// runs containing any guarded cluster are left untouched. Equation order
// within a run is preserved by construction.
//
// Preconditions: reordering has already brought compatible clusters
//                together.
// Postconditions: output equation sequence equals the input sequence.
// Failure modes: none.
// Side effects: none.

use crate::cluster::Cluster;

pub fn fuse(clusters: Vec<Cluster>) -> Vec<Cluster> {
    let mut processed = Vec::new();
    let mut run: Vec<Cluster> = Vec::new();

    let flush = |run: &mut Vec<Cluster>, processed: &mut Vec<Cluster>| {
        if run.len() <= 1 || run.iter().any(Cluster::has_guards) {
            processed.append(run);
        } else {
            processed.push(Cluster::from_clusters(std::mem::take(run)));
        }
    };

    for c in clusters {
        let compatible = run
            .last()
            .map(|prev| prev.itintervals() == c.itintervals())
            .unwrap_or(true);
        if !compatible {
            flush(&mut run, &mut processed);
        }
        run.push(c);
    }
    flush(&mut run, &mut processed);
    processed
}

// ── Tests ───────────────────────────────────────────────────────────────────
