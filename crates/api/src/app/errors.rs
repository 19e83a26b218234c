use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use payline_core::DomainError;
use payline_infra::command_dispatcher::DispatchError;

pub fn dispatch_error_to_response(err: DispatchError) -> axum::response::Response {
    match err {
        DispatchError::Domain(domain) => domain_error_to_response(domain),
        DispatchError::Concurrency(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DispatchError::Deserialize(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "deserialize_error", msg)
        }
        DispatchError::Store(e) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            e.to_string(),
        ),
        DispatchError::Publish(msg) => json_error(StatusCode::BAD_GATEWAY, "publish_error", msg),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let (status, code) = match &err {
        DomainError::UnknownRecipient => (StatusCode::NOT_FOUND, "unknown_recipient"),
        DomainError::UnknownMethod => (StatusCode::NOT_FOUND, "unknown_method"),
        DomainError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
        DomainError::InvalidAmount => (StatusCode::BAD_REQUEST, "invalid_amount"),
        DomainError::AmountBelowMinimum { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "amount_below_minimum")
        }
        DomainError::AmountAboveMaximum { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "amount_above_maximum")
        }
        DomainError::InsufficientFunds { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_funds")
        }
        DomainError::InvalidTransition { .. } => (StatusCode::CONFLICT, "invalid_transition"),
        DomainError::DuplicateId => (StatusCode::CONFLICT, "duplicate_id"),
        DomainError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
        DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
        DomainError::InvalidId(_) => (StatusCode::BAD_REQUEST, "invalid_id"),
    };
    json_error(status, code, err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        Json(json!({
            "error": {
                "code": code,
                "message": message.into(),
            }
        })),
    )
        .into_response()
}

pub fn json_data(status: StatusCode, value: impl serde::Serialize) -> axum::response::Response {
    (status, Json(json!({ "data": value }))).into_response()
}
