use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Query},
    http::StatusCode,
    routing::get,
};

use payline_history::HistoryFilter;
use payline_infra::PayoutEngine;

use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/", get(get_history))
}

pub async fn get_history(
    Extension(engine): Extension<Arc<PayoutEngine>>,
    Query(params): Query<dto::HistoryParams>,
) -> axum::response::Response {
    let filter = HistoryFilter {
        from: params.from,
        to: params.to,
        kind: params.kind,
        status: params.status,
        method: params.method,
    };
    errors::json_data(StatusCode::OK, engine.transaction_history(&filter))
}
