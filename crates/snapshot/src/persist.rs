//! Record-list conversion and JSON save/load.

use std::io::{Read, Write};

use tracing::debug;

use stockbook_catalog::Catalog;
use stockbook_products::Product;

use crate::SnapshotError;
use crate::record::ProductRecord;

/// Emit one record per live product, in insertion order. Compacts the
/// catalog's order sequence first so stale entries never leak into a
/// snapshot.
pub fn to_records(catalog: &Catalog) -> Vec<ProductRecord> {
    catalog
        .by_insertion_order()
        .iter()
        .map(ProductRecord::from)
        .collect()
}

/// Rebuild a catalog by replaying `add` for each record in order.
///
/// Aggregates are recomputed and subscriptions re-established as a natural
/// consequence of the replay. A record list carrying a duplicate name (or an
/// out-of-domain field value) fails; no partially-built catalog escapes.
pub fn from_records(records: &[ProductRecord]) -> Result<Catalog, SnapshotError> {
    let catalog = Catalog::new();
    for record in records {
        let product = Product::new(
            record.name.clone(),
            record.quantity,
            record.weight,
            record.wholesale_price,
        )?;
        catalog.add(&product)?;
    }
    Ok(catalog)
}

/// Write the catalog's record list to `sink` as JSON.
pub fn save<W: Write>(catalog: &Catalog, sink: W) -> Result<(), SnapshotError> {
    let records = to_records(catalog);
    debug!(products = records.len(), "saving catalog snapshot");
    serde_json::to_writer(sink, &records)?;
    Ok(())
}

/// Read a JSON record list from `source` and rebuild the catalog.
pub fn load<R: Read>(source: R) -> Result<Catalog, SnapshotError> {
    let records: Vec<ProductRecord> = serde_json::from_reader(source)?;
    debug!(products = records.len(), "loaded catalog snapshot");
    from_records(&records)
}
