//! Read-model projections over published event envelopes.
//!
//! Each projection is idempotent (at-least-once delivery safe) and keeps a
//! per-stream cursor so duplicates and replays are ignored.

pub mod invoices;
pub mod payouts;
pub mod recipients;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("failed to deserialize event payload: {0}")]
    Deserialize(String),

    #[error("stream mismatch: {0}")]
    StreamMismatch(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}
