//! Domain error model.

use thiserror::Error;

use crate::money::MinorUnits;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every variant is deterministic and recoverable: the caller can inspect the
/// kind and retry with corrected input. Infrastructure failures (storage,
/// publication) live in their own error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The referenced recipient does not exist.
    #[error("unknown recipient")]
    UnknownRecipient,

    /// The named payout method is not in the catalog.
    #[error("unknown payout method")]
    UnknownMethod,

    /// A monetary amount was zero or negative where a positive one is required.
    #[error("invalid amount")]
    InvalidAmount,

    /// Amount is below the method's minimum.
    #[error("amount below method minimum of {minimum}")]
    AmountBelowMinimum { minimum: MinorUnits },

    /// Amount is above the method's maximum.
    #[error("amount above method maximum of {maximum}")]
    AmountAboveMaximum { maximum: MinorUnits },

    /// The wallet's withdrawable balance cannot cover the requested amount.
    #[error("insufficient funds (available: {available})")]
    InsufficientFunds { available: MinorUnits },

    /// The requested status transition is not legal from the current state.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    /// An entity with the same identifier already exists.
    #[error("duplicate id")]
    DuplicateId,

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A conflict occurred (e.g. stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_transition(from: &'static str, to: &'static str) -> Self {
        Self::InvalidTransition { from, to }
    }

    pub fn insufficient_funds(available: MinorUnits) -> Self {
        Self::InsufficientFunds { available }
    }
}
