use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use salesdesk_core::CustomerId;
use salesdesk_parties::NewCustomer;

use crate::app::routes::common::parse_path;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_customer).get(list_customers))
        .route(
            "/:id",
            get(get_customer).put(replace_customer).delete(delete_customer),
        )
}

pub async fn create_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<NewCustomer>,
) -> axum::response::Response {
    let draft = match body.validate() {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.parties.insert_customer(draft).await {
        Ok(customer) => {
            tracing::info!(customer_id = %customer.id, admin_id = %customer.admin_id, "customer created");
            (StatusCode::CREATED, Json(customer)).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

/// `viewer_id` scopes the list: a salesperson only sees their own customers.
pub async fn list_customers(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ViewerQuery>,
) -> axum::response::Response {
    match services.list_customers(query.viewer_id).await {
        Ok(items) => (StatusCode::OK, Json(dto::items(items))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CustomerId = match parse_path(&id, "customer id") {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.parties.get_customer(id).await {
        Ok(customer) => (StatusCode::OK, Json(customer)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn replace_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<NewCustomer>,
) -> axum::response::Response {
    let id: CustomerId = match parse_path(&id, "customer id") {
        Ok(v) => v,
        Err(res) => return res,
    };
    let draft = match body.validate() {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.parties.replace_customer(id, draft).await {
        Ok(customer) => (StatusCode::OK, Json(customer)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CustomerId = match parse_path(&id, "customer id") {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.parties.delete_customer(id).await {
        Ok(()) => {
            tracing::info!(customer_id = %id, "customer deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}
