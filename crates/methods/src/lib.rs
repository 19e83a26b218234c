//! `payline-methods` — the payout method catalog.
//!
//! A static, validated registry of payout channels with per-method fee
//! schedules and amount constraints. Loaded once at startup; read-only
//! thereafter.

pub mod registry;

pub use registry::{FeeSchedule, MethodRegistry, PayoutMethodSpec, ProcessingTime};
