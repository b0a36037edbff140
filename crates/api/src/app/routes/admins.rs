use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use salesdesk_core::AdminId;
use salesdesk_parties::{AdminPatch, NewAdmin};

use crate::app::routes::common::parse_path;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_admin).get(list_admins))
        .route(
            "/:id",
            get(get_admin).patch(patch_admin).delete(delete_admin),
        )
}

pub async fn create_admin(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<NewAdmin>,
) -> axum::response::Response {
    let draft = match body.validate() {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.parties.insert_admin(draft).await {
        Ok(admin) => {
            tracing::info!(admin_id = %admin.id, role = admin.role.code(), "admin created");
            (StatusCode::CREATED, Json(admin)).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_admins(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.parties.list_admins().await {
        Ok(items) => (StatusCode::OK, Json(dto::items(items))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_admin(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: AdminId = match parse_path(&id, "admin id") {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.parties.get_admin(id).await {
        Ok(admin) => (StatusCode::OK, Json(admin)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn patch_admin(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(patch): Json<AdminPatch>,
) -> axum::response::Response {
    let id: AdminId = match parse_path(&id, "admin id") {
        Ok(v) => v,
        Err(res) => return res,
    };
    let current = match services.parties.get_admin(id).await {
        Ok(a) => a,
        Err(e) => return errors::store_error_to_response(e),
    };
    let patched = match current.apply_patch(patch) {
        Ok(a) => a,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.parties.update_admin(patched).await {
        Ok(admin) => (StatusCode::OK, Json(admin)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_admin(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: AdminId = match parse_path(&id, "admin id") {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.parties.delete_admin(id).await {
        Ok(()) => {
            tracing::info!(admin_id = %id, "admin deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}
