use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use salesdesk_core::DomainError;
use salesdesk_forecast::DataIntegrityError;
use salesdesk_infra::StoreError;
use salesdesk_sales::StockError;

use crate::app::services::ReportError;

pub fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

pub fn store_error_to_response(err: StoreError) -> Response {
    match err {
        StoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StoreError::Domain(e) => domain_error_to_response(e),
        StoreError::Stock(e) => stock_error_to_response(e),
        StoreError::Unavailable(msg) => {
            tracing::error!(error = %msg, "store unavailable");
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", msg)
        }
        e @ (StoreError::Corrupt(_) | StoreError::Database(_)) => {
            tracing::error!(error = %e, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "storage failure")
        }
    }
}

/// 409 listing every short product.
pub fn stock_error_to_response(err: StockError) -> Response {
    (
        StatusCode::CONFLICT,
        axum::Json(json!({
            "error": "insufficient_stock",
            "message": err.to_string(),
            "shortfalls": err.shortfalls,
        })),
    )
        .into_response()
}

/// 422 naming the offending transaction; no partial report is returned.
pub fn integrity_error_to_response(err: DataIntegrityError) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        axum::Json(json!({
            "error": "data_integrity",
            "message": err.to_string(),
            "transaction_id": err.transaction_id(),
        })),
    )
        .into_response()
}

pub fn report_error_to_response(err: ReportError) -> Response {
    match err {
        ReportError::Store(e) => store_error_to_response(e),
        ReportError::Integrity(e) => integrity_error_to_response(e),
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
