use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use rust_decimal::Decimal;

use stockbook_core::{DomainError, DomainResult};
use stockbook_products::{
    ChangeObserver, FieldChange, HookId, MARKUP_FACTOR, Product, SHIPPING_FACTOR,
};

/// One live membership: the product handle plus the hook this catalog
/// attached to it, so `remove` can detach exactly its own observer.
struct Entry {
    product: Product,
    hook: HookId,
}

#[derive(Default)]
struct CatalogInner {
    /// Insertion-ordered sequence. May contain stale entries (products no
    /// longer in `by_name`) pending compaction.
    order: Vec<Product>,
    /// Name index over exactly the currently present products. BTreeMap
    /// iteration gives the ascending-name view for free.
    by_name: BTreeMap<String, Entry>,
    items_in_stock: i64,
    total_wholesale: Decimal,
    total_retail: Decimal,
}

impl CatalogInner {
    /// A sequence entry is live iff the name index maps its current name to
    /// this very handle. Name equality alone would resurrect a removed
    /// product whose name was later reused.
    fn is_live(&self, product: &Product) -> bool {
        self.by_name
            .get(&product.name())
            .is_some_and(|entry| Product::ptr_eq(&entry.product, product))
    }
}

/// The dual-indexed, aggregate-maintaining product collection.
///
/// A catalog owns only its indexing structures, never the products: members
/// are shared handles that may simultaneously belong to other catalogs. On
/// `add` the catalog attaches a pre/post observer pair to the product; from
/// then on every accepted field mutation flows back through those hooks,
/// which keep four running statistics exactly consistent with what a full
/// scan over the live members would produce, and which veto renames that
/// would collide with an existing name.
pub struct Catalog {
    inner: Rc<RefCell<CatalogInner>>,
}

/// The observer a catalog attaches to each member. Holds the catalog state
/// weakly: products never keep a dropped catalog alive, and a hook whose
/// catalog is gone degrades to a no-op.
struct CatalogHook {
    inner: Weak<RefCell<CatalogInner>>,
}

impl ChangeObserver for CatalogHook {
    fn before_change(&self, _product: &Product, change: &FieldChange) -> DomainResult<()> {
        let Some(inner) = self.inner.upgrade() else {
            return Ok(());
        };
        if let FieldChange::Name { new, .. } = change {
            if inner.borrow().by_name.contains_key(new) {
                return Err(DomainError::duplicate_name(new.clone()));
            }
        }
        Ok(())
    }

    fn after_change(&self, product: &Product, change: &FieldChange) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let mut inner = inner.borrow_mut();
        match change {
            FieldChange::Quantity { old, new } => {
                let delta = new - old;
                inner.items_in_stock += delta;
                let delta = Decimal::from(delta);
                inner.total_wholesale += delta * product.wholesale_price();
                inner.total_retail += delta * product.retail_price();
            }
            FieldChange::WholesalePrice { old, new } => {
                let delta = new - old;
                let quantity = Decimal::from(product.quantity());
                inner.total_wholesale += delta * quantity;
                inner.total_retail += MARKUP_FACTOR * delta * quantity;
            }
            FieldChange::Weight { old, new } => {
                let delta = new - old;
                let quantity = Decimal::from(product.quantity());
                inner.total_retail += SHIPPING_FACTOR * delta * quantity;
            }
            FieldChange::Name { old, new } => {
                // The pre phase already excluded a collision on `new`. The
                // order sequence is untouched: renames keep their position.
                if let Some(entry) = inner.by_name.remove(old) {
                    inner.by_name.insert(new.clone(), entry);
                }
            }
        }
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(CatalogInner::default())),
        }
    }

    /// Index a product and fold its contribution into the running totals.
    ///
    /// Fails with `DuplicateName` if a product with the same name is already
    /// present; the catalog is unchanged on failure.
    pub fn add(&self, product: &Product) -> DomainResult<()> {
        let name = product.name();
        if self.inner.borrow().by_name.contains_key(&name) {
            return Err(DomainError::duplicate_name(name));
        }

        let hook = product.attach(Rc::new(CatalogHook {
            inner: Rc::downgrade(&self.inner),
        }));

        let mut inner = self.inner.borrow_mut();
        let quantity = Decimal::from(product.quantity());
        inner.items_in_stock += product.quantity();
        inner.total_wholesale += quantity * product.wholesale_price();
        inner.total_retail += quantity * product.retail_price();
        // A stale entry left by an earlier membership of this same handle
        // would turn live again the moment the name index points back at it,
        // duplicating the product in the insertion order.
        inner
            .order
            .retain(|existing| !Product::ptr_eq(existing, product));
        inner.order.push(product.clone());
        inner.by_name.insert(
            name,
            Entry {
                product: product.clone(),
                hook,
            },
        );
        Ok(())
    }

    /// Drop a product from the index, subtract its contribution from the
    /// running totals, and detach this catalog's observer.
    ///
    /// The insertion-order sequence is left untouched: the entry goes stale
    /// and is swept by the next [`Catalog::compact`] instead of paying for a
    /// mid-sequence delete here.
    pub fn remove(&self, product: &Product) -> DomainResult<()> {
        let name = product.name();
        let hook = {
            let mut inner = self.inner.borrow_mut();
            let entry = match inner.by_name.remove(&name) {
                Some(entry) if Product::ptr_eq(&entry.product, product) => entry,
                Some(entry) => {
                    // Same name, different entity: put it back, report absent.
                    inner.by_name.insert(name.clone(), entry);
                    return Err(DomainError::not_found(name));
                }
                None => return Err(DomainError::not_found(name)),
            };
            let quantity = Decimal::from(product.quantity());
            inner.items_in_stock -= product.quantity();
            inner.total_wholesale -= quantity * product.wholesale_price();
            inner.total_retail -= quantity * product.retail_price();
            entry.hook
        };
        product.detach(hook);
        Ok(())
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.inner.borrow().by_name.contains_key(name)
    }

    pub fn contains(&self, product: &Product) -> bool {
        self.inner.borrow().is_live(product)
    }

    /// Look a product up by name.
    pub fn get(&self, name: &str) -> DomainResult<Product> {
        self.inner
            .borrow()
            .by_name
            .get(name)
            .map(|entry| entry.product.clone())
            .ok_or_else(|| DomainError::not_found(name))
    }

    /// Number of distinct products currently indexed.
    pub fn total_products(&self) -> usize {
        self.inner.borrow().by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_products() == 0
    }

    /// Sum of member quantities.
    pub fn items_in_stock(&self) -> i64 {
        self.inner.borrow().items_in_stock
    }

    /// Sum of `quantity * wholesale_price` over members.
    pub fn total_wholesale(&self) -> Decimal {
        self.inner.borrow().total_wholesale
    }

    /// Sum of `quantity * retail_price` over members.
    pub fn total_retail(&self) -> Decimal {
        self.inner.borrow().total_retail
    }

    /// Sweep stale entries out of the insertion-order sequence.
    ///
    /// Called before any operation whose correctness depends on the sequence
    /// holding only live entries (views, snapshotting); also callable
    /// directly as an explicit compaction point.
    pub fn compact(&self) {
        let mut inner = self.inner.borrow_mut();
        let CatalogInner { order, by_name, .. } = &mut *inner;
        order.retain(|product| {
            by_name
                .get(&product.name())
                .is_some_and(|entry| Product::ptr_eq(&entry.product, product))
        });
    }

    /// The live products in ascending name order. Returns owned handles, so
    /// the catalog's structure cannot be mutated through the view.
    pub fn by_name(&self) -> Vec<Product> {
        self.compact();
        self.inner
            .borrow()
            .by_name
            .values()
            .map(|entry| entry.product.clone())
            .collect()
    }

    /// The live products in original add order. Renames do not move a
    /// product's position; removed products are absent.
    pub fn by_insertion_order(&self) -> Vec<Product> {
        self.compact();
        self.inner.borrow().order.clone()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Catalog {
    /// Detach this catalog's hooks so dropped catalogs leave no dead
    /// observers on still-live products.
    fn drop(&mut self) {
        let entries: Vec<(Product, HookId)> = self
            .inner
            .borrow()
            .by_name
            .values()
            .map(|entry| (entry.product.clone(), entry.hook))
            .collect();
        for (product, hook) in entries {
            product.detach(hook);
        }
    }
}

impl core::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Catalog")
            .field("total_products", &inner.by_name.len())
            .field("items_in_stock", &inner.items_in_stock)
            .field("total_wholesale", &inner.total_wholesale)
            .field("total_retail", &inner.total_retail)
            .finish()
    }
}
