use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Extension, Path, Query},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockrec_core::WarehouseId;
use stockrec_inventory::AccountingPeriod;

use crate::app::routes::parse_id;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/:id/inventory", get(get_inventory))
        .route("/:id/inventory/preview", post(preview_counts))
        .route("/:id/inventory/export", get(export_inventory))
}

pub async fn get_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    query: Result<Query<dto::InventoryQuery>, QueryRejection>,
) -> axum::response::Response {
    let warehouse_id: WarehouseId = match parse_id(&id, "warehouse") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return errors::rejection_to_response(e),
    };
    let window = match services.engine.window(query.granularity()) {
        Ok(w) => w,
        Err(e) => return errors::engine_error_to_response(e),
    };

    let as_of = query.as_of();
    match services.engine.get_inventory(warehouse_id, window, as_of).await {
        Ok(lines) => Json(dto::InventoryResponse::new(
            warehouse_id,
            query.granularity(),
            as_of,
            &lines,
        ))
        .into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn preview_counts(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    query: Result<Query<dto::InventoryQuery>, QueryRejection>,
    body: Result<Json<dto::CountsRequest>, JsonRejection>,
) -> axum::response::Response {
    let warehouse_id: WarehouseId = match parse_id(&id, "warehouse") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return errors::rejection_to_response(e),
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::rejection_to_response(e),
    };
    let window = match services.engine.window(query.granularity()) {
        Ok(w) => w,
        Err(e) => return errors::engine_error_to_response(e),
    };

    let as_of = query.as_of();
    match services
        .engine
        .preview_counts(warehouse_id, window, &body.counts, as_of)
        .await
    {
        Ok(lines) => Json(
            dto::InventoryResponse::new(warehouse_id, query.granularity(), as_of, &lines)
                .with_summary(&lines),
        )
        .into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn export_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    query: Result<Query<dto::InventoryQuery>, QueryRejection>,
) -> axum::response::Response {
    let warehouse_id: WarehouseId = match parse_id(&id, "warehouse") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return errors::rejection_to_response(e),
    };
    let window = match services.engine.window(query.granularity()) {
        Ok(w) => w,
        Err(e) => return errors::engine_error_to_response(e),
    };

    let as_of = query.as_of();
    let bytes = match services.engine.export_inventory(warehouse_id, window, as_of).await {
        Ok(b) => b,
        Err(e) => return errors::engine_error_to_response(e),
    };

    let label = AccountingPeriod::containing(as_of.date_naive()).label();
    let disposition = format!("attachment; filename=\"inventory-{warehouse_id}-{label}.csv\"");
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}
