use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveTime, Utc};

use stockrec_core::{ProductId, WarehouseId};
use stockrec_infra::EngineError;
use stockrec_inventory::{AccountingPeriod, StockedProduct};

use crate::app::routes::parse_id;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_warehouse))
        .route("/:id/products", post(register_product))
        .route("/:id/products/:pid/receipts", post(record_receipt))
        .route("/:id/products/:pid/issues", post(record_issue))
        .route("/:id/products/:pid/valuation", get(get_valuation))
}

pub async fn create_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateWarehouseRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::rejection_to_response(e),
    };

    match services.engine.register_warehouse(&body.name).await {
        Ok(warehouse) => (StatusCode::CREATED, Json(warehouse)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn register_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::RegisterProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let warehouse_id: WarehouseId = match parse_id(&id, "warehouse") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::rejection_to_response(e),
    };

    let product = match StockedProduct::new(
        body.product_id.unwrap_or_default(),
        body.name,
        body.sku,
        body.unit,
        body.min_stock,
        body.max_stock,
    ) {
        Ok(p) => p,
        Err(e) => return errors::engine_error_to_response(EngineError::from(e)),
    };

    match services.engine.register_product(warehouse_id, product).await {
        Ok(product) => (StatusCode::CREATED, Json(product)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn record_receipt(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, pid)): Path<(String, String)>,
    body: Result<Json<dto::ReceiptRequest>, JsonRejection>,
) -> axum::response::Response {
    let (warehouse_id, product_id) = match parse_pair(&id, &pid) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::rejection_to_response(e),
    };

    let occurred_at = body.occurred_at.unwrap_or_else(Utc::now);
    match services
        .engine
        .record_receipt(warehouse_id, product_id, body.quantity, body.unit_cost, occurred_at)
        .await
    {
        Ok(position) => (StatusCode::OK, Json(dto::PositionResponse::from(&position))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn record_issue(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, pid)): Path<(String, String)>,
    body: Result<Json<dto::IssueRequest>, JsonRejection>,
) -> axum::response::Response {
    let (warehouse_id, product_id) = match parse_pair(&id, &pid) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::rejection_to_response(e),
    };

    let occurred_at = body.occurred_at.unwrap_or_else(Utc::now);
    match services
        .engine
        .record_issue(warehouse_id, product_id, body.quantity, occurred_at)
        .await
    {
        Ok(position) => (StatusCode::OK, Json(dto::PositionResponse::from(&position))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn get_valuation(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, pid)): Path<(String, String)>,
    query: Result<Query<dto::ValuationQuery>, QueryRejection>,
) -> axum::response::Response {
    let (warehouse_id, product_id) = match parse_pair(&id, &pid) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return errors::rejection_to_response(e),
    };

    // Default span: the accounting period in progress.
    let since = query.since.unwrap_or_else(|| {
        AccountingPeriod::containing(Utc::now().date_naive())
            .start()
            .and_time(NaiveTime::MIN)
            .and_utc()
    });

    let cmp = match services.engine.compute_cmp(warehouse_id, product_id).await {
        Ok(v) => v,
        Err(e) => return errors::engine_error_to_response(e),
    };
    let purchases = match services
        .engine
        .purchase_cost_since(warehouse_id, product_id, since)
        .await
    {
        Ok(v) => v,
        Err(e) => return errors::engine_error_to_response(e),
    };

    Json(dto::ValuationResponse {
        warehouse_id,
        product_id,
        cmp,
        since,
        purchases,
    })
    .into_response()
}

fn parse_pair(id: &str, pid: &str) -> Result<(WarehouseId, ProductId), axum::response::Response> {
    Ok((parse_id(id, "warehouse")?, parse_id(pid, "product")?))
}
