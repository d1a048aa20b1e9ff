//! High-level operations behind the `dunepack` commands.
//!
//! [`concretize`] and [`plan`] turn a spec string into orchestrator-facing
//! data; the `ops_*` modules load recipes and print results.

pub mod concretize;
pub mod ops_check;
pub mod ops_conflicts;
pub mod ops_info;
pub mod ops_resolve;
pub mod ops_setup;
pub mod ops_tree;
pub mod plan;
