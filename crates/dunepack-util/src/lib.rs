//! Shared utilities for dunepack.
//!
//! Cross-cutting concerns used by the other dunepack crates: the unified
//! error type, filesystem helpers and Cargo-style status lines.

pub mod errors;
pub mod fs;
pub mod progress;
