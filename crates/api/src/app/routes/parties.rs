use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/search", get(search_parties))
}

/// Admins matching on name, email or code, plus customers matching on name,
/// email, person in charge or code.
pub async fn search_parties(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::SearchQuery>,
) -> axum::response::Response {
    match services.parties.search_parties(&query.q).await {
        Ok(found) => (StatusCode::OK, Json(found)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
