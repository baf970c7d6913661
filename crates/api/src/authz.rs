//! API-side authorization guard for count submissions.
//!
//! Enforced at the HTTP boundary, before the engine is called; the engine only
//! records the identity it is given.

use axum::http::StatusCode;
use axum::response::Response;

use crate::app::errors::json_error;
use crate::config::ApiConfig;
use crate::context::CallerContext;

pub fn authorize_count_submission(
    config: &ApiConfig,
    caller: &CallerContext,
) -> Result<(), Response> {
    if config.may_submit_counts(caller.role()) {
        return Ok(());
    }

    tracing::warn!(
        user_id = %caller.user_id(),
        role = caller.role(),
        "count submission refused for role"
    );
    Err(json_error(
        StatusCode::FORBIDDEN,
        "forbidden",
        format!("role '{}' may not submit physical counts", caller.role()),
    ))
}
