use std::str::FromStr;

use axum::http::StatusCode;
use axum::response::Response;

use crate::app::errors;

/// Parse a path segment, answering 400 with `what` in the message on failure.
pub fn parse_path<T: FromStr>(raw: &str, what: &str) -> Result<T, Response> {
    raw.parse().map_err(|_| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_id",
            format!("invalid {what}: {raw}"),
        )
    })
}
