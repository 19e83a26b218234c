use std::sync::Arc;

use axum::{Router, extract::Extension, http::StatusCode, routing::get};

use payline_infra::PayoutEngine;

use crate::app::errors;

pub fn router() -> Router {
    Router::new().route("/", get(list_methods))
}

pub async fn list_methods(
    Extension(engine): Extension<Arc<PayoutEngine>>,
) -> axum::response::Response {
    errors::json_data(StatusCode::OK, engine.list_payout_methods())
}
