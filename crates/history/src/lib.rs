//! `payline-history` — unified transaction timeline.
//!
//! Pure read side: merges invoice and payout records into one ordered,
//! filterable sequence with inflow/outflow summary totals. Performs no
//! mutation, so it is safe to call concurrently with writers.

pub mod timeline;

pub use timeline::{
    HistoryFilter, HistorySummary, HistoryView, TransactionKind, TransactionRecord,
    TransactionStatus, aggregate,
};
