use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
};

use payline_core::MinorUnits;
use payline_infra::PayoutEngine;
use payline_infra::engine::CreatePayoutRequest;
use payline_payouts::{PayoutId, PayoutPriority};
use payline_recipients::RecipientId;

use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_payout))
        .route("/balance", get(get_balance))
        .route("/:id/transition", post(transition_payout))
        .route("/:id/cancel", post(cancel_payout))
}

pub async fn create_payout(
    Extension(engine): Extension<Arc<PayoutEngine>>,
    Json(body): Json<dto::CreatePayoutRequest>,
) -> axum::response::Response {
    let recipient_id = match dto::parse_id(&body.recipient_id) {
        Ok(id) => RecipientId::new(id),
        Err(resp) => return resp,
    };

    let result = engine.create_payout(CreatePayoutRequest {
        recipient_id,
        amount: MinorUnits::new(body.amount),
        method: body.method,
        priority: body.priority.unwrap_or(PayoutPriority::Standard),
        description: body.description,
        scheduled_date: body.scheduled_date,
    });

    match result {
        Ok(rm) => errors::json_data(StatusCode::CREATED, rm),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn get_balance(
    Extension(engine): Extension<Arc<PayoutEngine>>,
) -> axum::response::Response {
    errors::json_data(StatusCode::OK, engine.get_balance())
}

pub async fn transition_payout(
    Extension(engine): Extension<Arc<PayoutEngine>>,
    Path(id): Path<String>,
    Json(body): Json<dto::TransitionPayoutRequest>,
) -> axum::response::Response {
    let id = match dto::parse_id(&id) {
        Ok(id) => PayoutId::new(id),
        Err(resp) => return resp,
    };

    match engine.transition_payout(id, body.status) {
        Ok(rm) => errors::json_data(StatusCode::OK, rm),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn cancel_payout(
    Extension(engine): Extension<Arc<PayoutEngine>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match dto::parse_id(&id) {
        Ok(id) => PayoutId::new(id),
        Err(resp) => return resp,
    };

    match engine.cancel_payout(id) {
        Ok(rm) => errors::json_data(StatusCode::OK, rm),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}
