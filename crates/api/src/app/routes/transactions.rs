use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use salesdesk_core::TransactionId;
use salesdesk_sales::{NewTransaction, TransactionEdit};

use crate::app::routes::common::parse_path;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_transaction).get(list_transactions))
        .route("/search", get(search_transactions))
        .route(
            "/:id",
            get(get_transaction)
                .put(edit_transaction)
                .delete(delete_transaction),
        )
}

/// Stock is checked for every line first; a shortfall rejects the whole
/// transaction with 409 and the list of short products.
pub async fn create_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<NewTransaction>,
) -> axum::response::Response {
    match services.create_transaction(body).await {
        Ok(transaction) => (StatusCode::CREATED, Json(transaction)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ViewerQuery>,
) -> axum::response::Response {
    match services.list_transactions(query.viewer_id).await {
        Ok(items) => (StatusCode::OK, Json(dto::items(items))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn search_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::TransactionSearchQuery>,
) -> axum::response::Response {
    match services
        .transactions
        .search_transactions(query.admin_id, &query.q)
        .await
    {
        Ok(items) => (StatusCode::OK, Json(dto::items(items))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: TransactionId = match parse_path(&id, "transaction id") {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.transactions.transaction_detail(id).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn edit_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<TransactionEdit>,
) -> axum::response::Response {
    let id: TransactionId = match parse_path(&id, "transaction id") {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.edit_transaction(id, body).await {
        Ok(transaction) => (StatusCode::OK, Json(transaction)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: TransactionId = match parse_path(&id, "transaction id") {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.transactions.delete_transaction(id).await {
        Ok(()) => {
            tracing::info!(transaction_id = %id, "transaction deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}
