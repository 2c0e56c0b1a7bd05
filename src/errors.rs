//! Typed error taxonomy for the store.
//!
//! Every variant is a synchronous rejection of `submit()`/`open()`:
//! validation strictly precedes the canonical-state swap and any disk
//! write, so a returned error means nothing was modified.
//!
//! Propagation uses anyhow (`?` + context) like the rest of the crate;
//! callers that need to branch on a variant use `err.downcast_ref::<StoreError>()`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Structural or referential violation detected before commit.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A collection grew past its configured maximum.
    #[error("capacity exceeded: {collection} has {len} entries, max {max}")]
    CapacityExceeded {
        collection: &'static str,
        len: usize,
        max: usize,
    },

    /// Infrastructure failure while encoding state (not a business error).
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The persisted store is held by a live, non-stale owner.
    #[error("lock acquisition failed: {0}")]
    LockAcquisition(String),
}
