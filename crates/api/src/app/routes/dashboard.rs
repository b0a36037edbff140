use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};

use salesdesk_core::ForecastRowId;
use salesdesk_forecast::{ForecastKind, RegionTargets};

use crate::app::routes::common::parse_path;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/forecast", get(forecast_tables))
        .route("/forecast/:kind/:id", put(update_forecast_row))
        .route("/current-sales", get(current_sales))
        .route("/forecast-vs-actual", get(forecast_vs_actual))
}

pub async fn forecast_tables(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.forecast_tables().await {
        Ok(tables) => (StatusCode::OK, Json(tables)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_forecast_row(
    Extension(services): Extension<Arc<AppServices>>,
    Path((kind, id)): Path<(String, String)>,
    Json(targets): Json<RegionTargets>,
) -> axum::response::Response {
    let kind: ForecastKind = match kind.parse() {
        Ok(k) => k,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let id: ForecastRowId = match parse_path(&id, "forecast row id") {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.forecasts.update_forecast(kind, id, targets).await {
        Ok(row) => {
            tracing::info!(kind = kind.code(), row_id = %id, "forecast targets updated");
            (StatusCode::OK, Json(row)).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Weight (`mt`) and value (`costing`) sold per item group and region,
/// over approved transactions only.
pub async fn current_sales(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.current_sales().await {
        Ok(summary) => (StatusCode::OK, Json(dto::current_sales_response(&summary))).into_response(),
        Err(e) => errors::report_error_to_response(e),
    }
}

pub async fn forecast_vs_actual(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.forecast_vs_actual().await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => errors::report_error_to_response(e),
    }
}
