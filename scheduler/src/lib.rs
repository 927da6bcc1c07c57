// csched — cluster scheduling core
//
// Turns a flat list of lowered loop-nest equations into an ordered sequence
// of fused, direction-resolved, conditionally-guarded clusters, ready for a
// downstream lowering stage. Entry point: `pipeline::clusterize`.

pub mod cluster;
pub mod dag;
pub mod diag;
pub mod dot;
pub mod enforce;
pub mod eq;
pub mod fuse;
pub mod guard;
pub mod id;
pub mod lift;
pub mod pass;
pub mod pipeline;
pub mod queue;
pub mod scope;
pub mod space;
pub mod toposort;
