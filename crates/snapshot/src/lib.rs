//! Snapshot adapter: converts a catalog to/from a flat persisted record list.
//!
//! Only the four primitive product fields are persisted; derived pricing and
//! subscription state never leave the process. Loading replays `add` per
//! record, so a loaded catalog's subscriptions are freshly established rather
//! than restored.

pub mod persist;
pub mod record;

use thiserror::Error;

use stockbook_core::DomainError;

pub use persist::{from_records, load, save, to_records};
pub use record::ProductRecord;

/// Failure while encoding, decoding, or replaying a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot bytes were not a valid record list.
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Replaying the record list violated a domain rule (duplicate name,
    /// invalid field value).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The source or sink failed.
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),
}
