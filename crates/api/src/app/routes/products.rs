use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use salesdesk_products::{NewProduct, ProductCode, ProductPatch};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_product).get(list_products))
        .route("/search", get(search_products))
        .route(
            "/:code",
            get(get_product).patch(patch_product).delete(delete_product),
        )
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<NewProduct>,
) -> axum::response::Response {
    let product = match body.validate() {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.products.insert_product(product).await {
        Ok(created) => {
            tracing::info!(code = %created.code, "product created");
            (StatusCode::CREATED, Json(created)).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.products.list_products().await {
        Ok(items) => (StatusCode::OK, Json(dto::items(items))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn search_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::SearchQuery>,
) -> axum::response::Response {
    match services.products.search_products(&query.q).await {
        Ok(items) => (StatusCode::OK, Json(dto::items(items))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(code): Path<String>,
) -> axum::response::Response {
    let code = match ProductCode::parse(code) {
        Ok(c) => c,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.products.get_product(&code).await {
        Ok(product) => (StatusCode::OK, Json(product)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn patch_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(code): Path<String>,
    Json(patch): Json<ProductPatch>,
) -> axum::response::Response {
    let code = match ProductCode::parse(code) {
        Ok(c) => c,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let current = match services.products.get_product(&code).await {
        Ok(p) => p,
        Err(e) => return errors::store_error_to_response(e),
    };
    let patched = match current.apply_patch(patch) {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.products.update_product(patched).await {
        Ok(product) => (StatusCode::OK, Json(product)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(code): Path<String>,
) -> axum::response::Response {
    let code = match ProductCode::parse(code) {
        Ok(c) => c,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.products.delete_product(&code).await {
        Ok(()) => {
            tracing::info!(%code, "product deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}
