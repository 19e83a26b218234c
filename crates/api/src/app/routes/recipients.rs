use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, post},
};

use payline_core::MinorUnits;
use payline_infra::PayoutEngine;
use payline_infra::engine::CreateRecipientRequest;
use payline_infra::projections::recipients::{RecipientQuery, RecipientSort};
use payline_recipients::RecipientId;

use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_recipient).get(search_recipients))
        .route("/:id", get(get_recipient))
        .route("/:id/fund", post(fund_wallet))
        .route("/:id/status", post(set_status))
        .route("/:id/compliance", post(update_compliance))
}

pub async fn create_recipient(
    Extension(engine): Extension<Arc<PayoutEngine>>,
    Json(body): Json<dto::CreateRecipientRequest>,
) -> axum::response::Response {
    let contact = body.contact();
    let result = engine.create_recipient(CreateRecipientRequest {
        recipient_id: None,
        first_name: body.first_name,
        last_name: body.last_name,
        contact,
        default_method: body.default_payout_method,
    });

    match result {
        Ok(rm) => errors::json_data(StatusCode::CREATED, rm),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn get_recipient(
    Extension(engine): Extension<Arc<PayoutEngine>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match dto::parse_id(&id) {
        Ok(id) => RecipientId::new(id),
        Err(resp) => return resp,
    };

    match engine.get_recipient(id) {
        Some(rm) => errors::json_data(StatusCode::OK, rm),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "recipient not found"),
    }
}

pub async fn search_recipients(
    Extension(engine): Extension<Arc<PayoutEngine>>,
    Query(params): Query<dto::RecipientSearchParams>,
) -> axum::response::Response {
    let sort = match params.sort.as_deref() {
        None | Some("insertion") => RecipientSort::Insertion,
        Some("name") => RecipientSort::Name,
        Some("created_at") => RecipientSort::CreatedAt,
        Some(other) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                format!("unknown sort key '{other}'"),
            );
        }
    };

    let query = RecipientQuery {
        status: params.status,
        method: params.method,
        text: params.q,
        sort,
    };
    errors::json_data(StatusCode::OK, engine.search_recipients(&query))
}

pub async fn fund_wallet(
    Extension(engine): Extension<Arc<PayoutEngine>>,
    Path(id): Path<String>,
    Json(body): Json<dto::FundWalletRequest>,
) -> axum::response::Response {
    let id = match dto::parse_id(&id) {
        Ok(id) => RecipientId::new(id),
        Err(resp) => return resp,
    };

    match engine.fund_wallet(id, MinorUnits::new(body.amount)) {
        Ok(rm) => errors::json_data(StatusCode::OK, rm),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn set_status(
    Extension(engine): Extension<Arc<PayoutEngine>>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetStatusRequest>,
) -> axum::response::Response {
    let id = match dto::parse_id(&id) {
        Ok(id) => RecipientId::new(id),
        Err(resp) => return resp,
    };

    match engine.set_recipient_status(id, body.status) {
        Ok(rm) => errors::json_data(StatusCode::OK, rm),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn update_compliance(
    Extension(engine): Extension<Arc<PayoutEngine>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateComplianceRequest>,
) -> axum::response::Response {
    let id = match dto::parse_id(&id) {
        Ok(id) => RecipientId::new(id),
        Err(resp) => return resp,
    };

    match engine.update_compliance(id, body.compliance) {
        Ok(rm) => errors::json_data(StatusCode::OK, rm),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}
