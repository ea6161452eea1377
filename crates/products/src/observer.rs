//! Two-phase change notification contract.
//!
//! A product carries an ordered list of observers. For every accepted field
//! mutation the product invokes `before_change` on each observer (any error
//! cancels the mutation with no state change anywhere), then writes the
//! field, then invokes `after_change` on each observer. Observers are invoked
//! in attachment order; the entity itself carries no owner-specific logic.

use rust_decimal::Decimal;

use stockbook_core::DomainResult;

use crate::product::Product;

/// Identifies one attached observer so its owner can detach it later.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct HookId(pub(crate) u64);

/// A single proposed (pre phase) or committed (post phase) field mutation.
///
/// Carries both the outgoing and the incoming value, so observers recover the
/// old value without a side channel on the entity.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    Name { old: String, new: String },
    Quantity { old: i64, new: i64 },
    Weight { old: Decimal, new: Decimal },
    WholesalePrice { old: Decimal, new: Decimal },
}

impl FieldChange {
    /// Stable field name, useful for logging and assertions.
    pub fn field(&self) -> &'static str {
        match self {
            FieldChange::Name { .. } => "name",
            FieldChange::Quantity { .. } => "quantity",
            FieldChange::Weight { .. } => "weight",
            FieldChange::WholesalePrice { .. } => "wholesale_price",
        }
    }
}

/// Pre/post hook pair surrounding a product field mutation.
///
/// `before_change` runs before the field is written and may reject the
/// mutation by returning an error; the rejection propagates to the setter's
/// caller and `after_change` does not run for any observer. `after_change`
/// runs after the field is written and must not fail; `product` reflects the
/// post-mutation state.
pub trait ChangeObserver {
    fn before_change(&self, product: &Product, change: &FieldChange) -> DomainResult<()>;

    fn after_change(&self, product: &Product, change: &FieldChange);
}
