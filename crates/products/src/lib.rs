//! Products domain module.
//!
//! This crate contains the product entity and its two-phase change
//! notification contract, implemented purely as deterministic domain logic
//! (no IO, no storage).

pub mod observer;
pub mod product;

pub use observer::{ChangeObserver, FieldChange, HookId};
pub use product::{MARKUP_FACTOR, Product, SHIPPING_FACTOR};
