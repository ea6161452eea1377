use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockbook_products::Product;

/// The persisted shape of one product: the four primitive fields, nothing
/// else. Derived fields are recomputed on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,
    pub quantity: i64,
    pub weight: Decimal,
    pub wholesale_price: Decimal,
}

impl From<&Product> for ProductRecord {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name(),
            quantity: product.quantity(),
            weight: product.weight(),
            wholesale_price: product.wholesale_price(),
        }
    }
}
