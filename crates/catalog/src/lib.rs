//! Catalog domain module.
//!
//! This crate contains the aggregate-maintaining collection over products:
//! dual indexing, incremental statistics, name-uniqueness enforcement, and
//! sorted views, implemented purely as deterministic domain logic (no IO, no
//! storage).

pub mod catalog;

pub use catalog::Catalog;
