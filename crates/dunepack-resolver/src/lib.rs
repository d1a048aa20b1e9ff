//! Variant dependency resolution.
//!
//! Given a package's module dependency edges and its variant↔module
//! bijection, this crate computes the transitive closure of required modules,
//! derives the variant conflicts that closure implies, and validates and
//! expands a requested variant set into a [`resolver::BuildConfiguration`].
//!
//! Everything here is a pure function of immutable tables.

pub mod closure;
pub mod conflict;
pub mod flags;
pub mod graph;
pub mod resolver;
