use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::post,
};

use payline_core::MinorUnits;
use payline_infra::PayoutEngine;
use payline_infra::engine::CreateInvoiceRequest;
use payline_infra::projections::invoices::InvoiceFilter;
use payline_invoicing::InvoiceId;
use payline_recipients::RecipientId;

use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_invoice).get(list_invoices))
        .route("/:id/transition", post(transition_invoice))
}

pub async fn create_invoice(
    Extension(engine): Extension<Arc<PayoutEngine>>,
    Json(body): Json<dto::CreateInvoiceRequest>,
) -> axum::response::Response {
    let recipient_id = match dto::parse_id(&body.recipient_id) {
        Ok(id) => RecipientId::new(id),
        Err(resp) => return resp,
    };

    let result = engine.create_invoice(CreateInvoiceRequest {
        recipient_id,
        amount: MinorUnits::new(body.amount),
        due_date: body.due_date,
        method_hint: body.method_hint,
        description: body.description,
    });

    match result {
        Ok(rm) => errors::json_data(StatusCode::CREATED, rm),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn list_invoices(
    Extension(engine): Extension<Arc<PayoutEngine>>,
    Query(params): Query<dto::InvoiceListParams>,
) -> axum::response::Response {
    let recipient_id = match params.recipient_id.as_deref() {
        Some(raw) => match dto::parse_id(raw) {
            Ok(id) => Some(RecipientId::new(id)),
            Err(resp) => return resp,
        },
        None => None,
    };

    let filter = InvoiceFilter {
        status: params.status,
        recipient_id,
        from: params.from,
        to: params.to,
    };
    errors::json_data(StatusCode::OK, engine.list_invoices(&filter))
}

pub async fn transition_invoice(
    Extension(engine): Extension<Arc<PayoutEngine>>,
    Path(id): Path<String>,
    Json(body): Json<dto::TransitionInvoiceRequest>,
) -> axum::response::Response {
    let id = match dto::parse_id(&id) {
        Ok(id) => InvoiceId::new(id),
        Err(resp) => return resp,
    };

    match engine.transition_invoice(id, body.status) {
        Ok(rm) => errors::json_data(StatusCode::OK, rm),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}
