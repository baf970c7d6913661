use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::Utc;

use stockrec_core::WarehouseId;

use crate::app::routes::parse_id;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::CallerContext;
use crate::middleware::caller_middleware;

pub fn router() -> Router {
    Router::new()
        .route(
            "/:id/physical-counts",
            post(submit_physical_counts).layer(axum::middleware::from_fn(caller_middleware)),
        )
        .route("/:id/variance-report", post(variance_report))
}

pub async fn submit_physical_counts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::CountsRequest>, JsonRejection>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::authorize_count_submission(&services.config, &caller) {
        return resp;
    }
    let warehouse_id: WarehouseId = match parse_id(&id, "warehouse") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::rejection_to_response(e),
    };

    match services
        .engine
        .submit_physical_counts(&caller.identity(), warehouse_id, body.counts, Utc::now())
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn variance_report(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::CountsRequest>, JsonRejection>,
) -> axum::response::Response {
    let warehouse_id: WarehouseId = match parse_id(&id, "warehouse") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::rejection_to_response(e),
    };

    match services
        .engine
        .variance_report(warehouse_id, &body.counts, Utc::now())
        .await
    {
        Ok(report) => Json(report).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}
