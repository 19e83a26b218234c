//! `payline-payouts` — payout lifecycle.
//!
//! A payout moves earmarked wallet funds out through a payout method. The
//! wallet debit itself lives on the recipient aggregate; this crate owns the
//! payout's own state machine (processing -> completed | failed).

pub mod payout;

pub use payout::{
    CancelPayout, CompletePayout, FailPayout, Payout, PayoutCommand, PayoutEvent, PayoutId,
    PayoutPriority, PayoutStatus, RequestPayout,
};
