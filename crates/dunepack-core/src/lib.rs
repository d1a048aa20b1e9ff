//! Core data types for dunepack.
//!
//! This crate defines what a recipe is: package metadata, the versions it
//! can be built at, its variants, the optional source modules those variants
//! pull in, upstream dependencies, patches and build flags. It also provides
//! the spec-string and version grammar shared by requests and recipe
//! predicates, and loads recipe repositories and the global configuration.
//!
//! This crate is intentionally free of resolution logic and of any I/O
//! besides reading recipe and config files.

/// Build type used when neither the request nor the config names one.
pub const DEFAULT_BUILD_TYPE: &str = "RelWithDebInfo";

pub mod config;
pub mod module;
pub mod recipe;
pub mod repository;
pub mod spec;
pub mod version;
