//! HTTP API application wiring (Axum router + engine wiring).
//!
//! Layout:
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request DTOs and parsing helpers
//! - `errors.rs`: consistent `{data, error}` envelope responses
//! - `seed.rs`: demo-data seeding for dev runs

use std::sync::Arc;

use axum::{Extension, Router, routing::get};

use payline_infra::PayoutEngine;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod seed;

/// Build the full HTTP router around an engine instance.
pub fn build_app(engine: Arc<PayoutEngine>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/recipients", routes::recipients::router())
        .nest("/methods", routes::methods::router())
        .nest("/invoices", routes::invoices::router())
        .nest("/payouts", routes::payouts::router())
        .nest("/history", routes::history::router())
        .layer(Extension(engine))
}
