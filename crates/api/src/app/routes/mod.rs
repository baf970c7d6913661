use axum::Router;

pub mod counts;
pub mod inventory;
pub mod system;
pub mod warehouses;

/// Router for all warehouse-scoped endpoints.
pub fn router() -> Router {
    Router::new().nest(
        "/warehouses",
        warehouses::router()
            .merge(inventory::router())
            .merge(counts::router()),
    )
}

pub(crate) fn parse_id<T>(raw: &str, what: &'static str) -> Result<T, axum::response::Response>
where
    T: core::str::FromStr,
{
    raw.parse().map_err(|_| {
        crate::app::errors::json_error(
            axum::http::StatusCode::BAD_REQUEST,
            "invalid_argument",
            format!("invalid {what} id '{raw}'"),
        )
    })
}
