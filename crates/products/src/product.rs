use std::cell::RefCell;
use std::rc::Rc;

use rust_decimal::Decimal;

use stockbook_core::{DomainError, DomainResult};

use crate::observer::{ChangeObserver, FieldChange, HookId};

/// Retail markup applied to the wholesale price: 1.7.
pub const MARKUP_FACTOR: Decimal = Decimal::from_parts(17, 0, 0, false, 1);

/// Shipping cost per unit of weight: 3.25.
pub const SHIPPING_FACTOR: Decimal = Decimal::from_parts(325, 0, 0, false, 2);

struct ProductCell {
    name: String,
    quantity: i64,
    weight: Decimal,
    wholesale_price: Decimal,
    observers: Vec<(HookId, Rc<dyn ChangeObserver>)>,
    next_hook: u64,
}

/// A single catalog record with validated scalar fields.
///
/// `Product` is a cheap-clone shared handle: the same entity may be indexed
/// by any number of catalogs at once, each attaching its own observer pair.
/// The entity knows nothing about who observes it.
///
/// Every setter runs the full two-phase protocol: validate, no-op on equal
/// value, pre-notify (cancellable), write, post-notify. A rejected mutation
/// leaves the field untouched and skips the post phase entirely.
#[derive(Clone)]
pub struct Product {
    cell: Rc<RefCell<ProductCell>>,
}

impl Product {
    /// Create a product, validating every field as the setters do.
    pub fn new(
        name: impl Into<String>,
        quantity: i64,
        weight: Decimal,
        wholesale_price: Decimal,
    ) -> DomainResult<Self> {
        check_quantity(quantity)?;
        check_weight(weight)?;
        check_wholesale_price(wholesale_price)?;
        Ok(Self {
            cell: Rc::new(RefCell::new(ProductCell {
                name: name.into(),
                quantity,
                weight,
                wholesale_price,
                observers: Vec::new(),
                next_hook: 0,
            })),
        })
    }

    /// Handle identity: do both handles refer to the same entity?
    pub fn ptr_eq(a: &Product, b: &Product) -> bool {
        Rc::ptr_eq(&a.cell, &b.cell)
    }

    pub fn name(&self) -> String {
        self.cell.borrow().name.clone()
    }

    pub fn quantity(&self) -> i64 {
        self.cell.borrow().quantity
    }

    pub fn weight(&self) -> Decimal {
        self.cell.borrow().weight
    }

    pub fn wholesale_price(&self) -> Decimal {
        self.cell.borrow().wholesale_price
    }

    /// Derived: `SHIPPING_FACTOR * weight`. Never stored.
    pub fn shipping_cost(&self) -> Decimal {
        SHIPPING_FACTOR * self.cell.borrow().weight
    }

    /// Derived: `MARKUP_FACTOR * wholesale_price + shipping_cost`. Never stored.
    pub fn retail_price(&self) -> Decimal {
        let cell = self.cell.borrow();
        MARKUP_FACTOR * cell.wholesale_price + SHIPPING_FACTOR * cell.weight
    }

    /// Attach an observer; it runs after all previously attached ones.
    pub fn attach(&self, observer: Rc<dyn ChangeObserver>) -> HookId {
        let mut cell = self.cell.borrow_mut();
        let hook = HookId(cell.next_hook);
        cell.next_hook += 1;
        cell.observers.push((hook, observer));
        hook
    }

    /// Detach a previously attached observer. Returns false if the hook was
    /// already gone.
    pub fn detach(&self, hook: HookId) -> bool {
        let mut cell = self.cell.borrow_mut();
        let before = cell.observers.len();
        cell.observers.retain(|(id, _)| *id != hook);
        cell.observers.len() != before
    }

    pub fn set_name(&self, new: impl Into<String>) -> DomainResult<()> {
        let new = new.into();
        let old = self.cell.borrow().name.clone();
        if old == new {
            return Ok(());
        }
        let written = new.clone();
        self.commit(FieldChange::Name { old, new }, move |cell| {
            cell.name = written;
        })
    }

    pub fn set_quantity(&self, new: i64) -> DomainResult<()> {
        check_quantity(new)?;
        let old = self.cell.borrow().quantity;
        if old == new {
            return Ok(());
        }
        self.commit(FieldChange::Quantity { old, new }, move |cell| {
            cell.quantity = new;
        })
    }

    pub fn set_weight(&self, new: Decimal) -> DomainResult<()> {
        check_weight(new)?;
        let old = self.cell.borrow().weight;
        if old == new {
            return Ok(());
        }
        self.commit(FieldChange::Weight { old, new }, move |cell| {
            cell.weight = new;
        })
    }

    pub fn set_wholesale_price(&self, new: Decimal) -> DomainResult<()> {
        check_wholesale_price(new)?;
        let old = self.cell.borrow().wholesale_price;
        if old == new {
            return Ok(());
        }
        self.commit(FieldChange::WholesalePrice { old, new }, move |cell| {
            cell.wholesale_price = new;
        })
    }

    /// Shared 'pre-notify > write > post-notify' path for every setter.
    ///
    /// Observers are invoked without any cell borrow held, so they are free
    /// to read this product (and mutate their own state) from either phase.
    fn commit(&self, change: FieldChange, write: impl FnOnce(&mut ProductCell)) -> DomainResult<()> {
        let observers: Vec<(HookId, Rc<dyn ChangeObserver>)> =
            self.cell.borrow().observers.clone();
        for (_, observer) in &observers {
            observer.before_change(self, &change)?;
        }
        write(&mut *self.cell.borrow_mut());
        for (_, observer) in &observers {
            observer.after_change(self, &change);
        }
        Ok(())
    }
}

impl core::fmt::Debug for Product {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let cell = self.cell.borrow();
        f.debug_struct("Product")
            .field("name", &cell.name)
            .field("quantity", &cell.quantity)
            .field("weight", &cell.weight)
            .field("wholesale_price", &cell.wholesale_price)
            .finish()
    }
}

fn check_quantity(quantity: i64) -> DomainResult<()> {
    if quantity < 0 {
        return Err(DomainError::validation(format!(
            "{quantity} is an unsuitable value for quantity"
        )));
    }
    Ok(())
}

fn check_weight(weight: Decimal) -> DomainResult<()> {
    if weight <= Decimal::ZERO {
        return Err(DomainError::validation(format!(
            "{weight} is an unsuitable value for weight"
        )));
    }
    Ok(())
}

fn check_wholesale_price(price: Decimal) -> DomainResult<()> {
    if price <= Decimal::ZERO {
        return Err(DomainError::validation(format!(
            "{price} is an unsuitable value for wholesale price"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_product() -> Product {
        Product::new("Widget", 10, dec!(1.5), dec!(10.99)).unwrap()
    }

    /// Records every notification it sees; rejects names in `reject_names`.
    struct RecordingObserver {
        label: &'static str,
        log: Rc<RefCell<Vec<String>>>,
        reject_names: Vec<String>,
    }

    impl RecordingObserver {
        fn new(label: &'static str, log: Rc<RefCell<Vec<String>>>) -> Rc<Self> {
            Rc::new(Self {
                label,
                log,
                reject_names: Vec::new(),
            })
        }

        fn rejecting(
            label: &'static str,
            log: Rc<RefCell<Vec<String>>>,
            name: &str,
        ) -> Rc<Self> {
            Rc::new(Self {
                label,
                log,
                reject_names: vec![name.to_string()],
            })
        }
    }

    impl ChangeObserver for RecordingObserver {
        fn before_change(&self, _product: &Product, change: &FieldChange) -> DomainResult<()> {
            self.log
                .borrow_mut()
                .push(format!("{}:before:{}", self.label, change.field()));
            if let FieldChange::Name { new, .. } = change {
                if self.reject_names.contains(new) {
                    return Err(DomainError::duplicate_name(new.clone()));
                }
            }
            Ok(())
        }

        fn after_change(&self, _product: &Product, change: &FieldChange) {
            self.log
                .borrow_mut()
                .push(format!("{}:after:{}", self.label, change.field()));
        }
    }

    #[test]
    fn new_rejects_negative_quantity() {
        let err = Product::new("Widget", -1, dec!(1.5), dec!(10.99)).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for negative quantity"),
        }
    }

    #[test]
    fn new_rejects_non_positive_weight() {
        let err = Product::new("Widget", 1, dec!(0), dec!(10.99)).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for zero weight"),
        }
    }

    #[test]
    fn new_rejects_non_positive_wholesale_price() {
        let err = Product::new("Widget", 1, dec!(1.5), dec!(-0.01)).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for negative price"),
        }
    }

    #[test]
    fn derived_fields_follow_the_pricing_constants() {
        let product = test_product();
        assert_eq!(product.shipping_cost(), dec!(4.875));
        assert_eq!(product.retail_price(), dec!(23.558));
    }

    #[test]
    fn setter_validation_failure_leaves_field_unchanged() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let product = test_product();
        product.attach(RecordingObserver::new("a", log.clone()));

        let err = product.set_quantity(-5).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error"),
        }
        assert_eq!(product.quantity(), 10);
        // Validation fails before the pre phase; no notification fires.
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn setting_current_value_fires_no_notifications() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let product = test_product();
        product.attach(RecordingObserver::new("a", log.clone()));

        product.set_quantity(10).unwrap();
        product.set_name("Widget").unwrap();
        product.set_weight(dec!(1.5)).unwrap();
        product.set_wholesale_price(dec!(10.99)).unwrap();

        assert!(log.borrow().is_empty());
    }

    #[test]
    fn accepted_mutation_runs_both_phases_in_attachment_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let product = test_product();
        product.attach(RecordingObserver::new("a", log.clone()));
        product.attach(RecordingObserver::new("b", log.clone()));

        product.set_quantity(11).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                "a:before:quantity",
                "b:before:quantity",
                "a:after:quantity",
                "b:after:quantity",
            ]
        );
        assert_eq!(product.quantity(), 11);
    }

    #[test]
    fn observer_rejection_cancels_the_mutation() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let product = test_product();
        product.attach(RecordingObserver::rejecting("a", log.clone(), "Taken"));
        product.attach(RecordingObserver::new("b", log.clone()));

        let err = product.set_name("Taken").unwrap_err();
        match err {
            DomainError::DuplicateName(name) => assert_eq!(name, "Taken"),
            _ => panic!("Expected DuplicateName error"),
        }

        assert_eq!(product.name(), "Widget");
        // The rejecting observer ran its pre phase; nothing ran after it.
        assert_eq!(*log.borrow(), vec!["a:before:name"]);
    }

    #[test]
    fn detached_observer_sees_no_further_notifications() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let product = test_product();
        let hook = product.attach(RecordingObserver::new("a", log.clone()));

        product.set_quantity(11).unwrap();
        assert!(product.detach(hook));
        assert!(!product.detach(hook));
        product.set_quantity(12).unwrap();

        assert_eq!(*log.borrow(), vec!["a:before:quantity", "a:after:quantity"]);
    }

    #[test]
    fn pre_phase_observes_the_old_state() {
        struct AssertOld;
        impl ChangeObserver for AssertOld {
            fn before_change(&self, product: &Product, change: &FieldChange) -> DomainResult<()> {
                if let FieldChange::Quantity { old, .. } = change {
                    assert_eq!(product.quantity(), *old);
                }
                Ok(())
            }

            fn after_change(&self, product: &Product, change: &FieldChange) {
                if let FieldChange::Quantity { new, .. } = change {
                    assert_eq!(product.quantity(), *new);
                }
            }
        }

        let product = test_product();
        product.attach(Rc::new(AssertOld));
        product.set_quantity(42).unwrap();
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn money() -> impl Strategy<Value = Decimal> {
            // Positive amounts with two decimal places.
            (1i64..1_000_000).prop_map(|cents| Decimal::new(cents, 2))
        }

        proptest! {
            /// Property: retail price always equals the pricing identity.
            #[test]
            fn retail_price_identity(
                quantity in 0i64..10_000,
                weight in money(),
                wholesale in money(),
            ) {
                let product = Product::new("p", quantity, weight, wholesale).unwrap();
                prop_assert_eq!(
                    product.retail_price(),
                    MARKUP_FACTOR * wholesale + SHIPPING_FACTOR * weight
                );
            }

            /// Property: a rejected mutation is invisible.
            #[test]
            fn rejected_mutations_leave_no_trace(
                quantity in 0i64..10_000,
                weight in money(),
                wholesale in money(),
                bad_quantity in i64::MIN..0,
            ) {
                let product = Product::new("p", quantity, weight, wholesale).unwrap();
                prop_assert!(product.set_quantity(bad_quantity).is_err());
                prop_assert_eq!(product.quantity(), quantity);
                prop_assert_eq!(product.weight(), weight);
                prop_assert_eq!(product.wholesale_price(), wholesale);
            }
        }
    }
}
