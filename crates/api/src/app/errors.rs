use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockrec_infra::EngineError;

pub fn engine_error_to_response(err: EngineError) -> axum::response::Response {
    let (status, code) = match &err {
        EngineError::InvalidArgument { .. } => (StatusCode::BAD_REQUEST, "invalid_argument"),
        EngineError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
        EngineError::Conflict { .. } => (StatusCode::CONFLICT, "conflict"),
        EngineError::UpstreamFailure { .. } => (StatusCode::BAD_GATEWAY, "upstream_failure"),
        EngineError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
        EngineError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
    };

    let mut body = json!({
        "error": code,
        "message": err.to_string(),
    });
    if let Some(product_id) = err.product_id() {
        body["product_id"] = json!(product_id);
    }
    if let Some(pending) = err.pending() {
        body["pending"] = json!(pending);
    }

    (status, axum::Json(body)).into_response()
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Malformed bodies and query strings are invalid arguments, not 422s.
pub fn rejection_to_response(rejection: impl std::fmt::Display) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_argument", rejection.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockrec_core::{ProductId, WarehouseId};
    use stockrec_infra::PendingBatch;
    use stockrec_inventory::PhysicalCount;

    #[test]
    fn statuses_follow_the_taxonomy() {
        let cases = [
            (EngineError::invalid("bad"), StatusCode::BAD_REQUEST),
            (EngineError::warehouse_not_found(WarehouseId::new()), StatusCode::NOT_FOUND),
            (
                EngineError::Conflict {
                    warehouse_id: WarehouseId::new(),
                },
                StatusCode::CONFLICT,
            ),
            (
                EngineError::UpstreamFailure {
                    message: "down".into(),
                    pending: None,
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                EngineError::Timeout {
                    operation: "read_position",
                    pending: Some(PendingBatch {
                        warehouse_id: WarehouseId::new(),
                        counts: vec![PhysicalCount::new(ProductId::new(), 1)],
                    }),
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(engine_error_to_response(err).status(), status);
        }
    }
}
