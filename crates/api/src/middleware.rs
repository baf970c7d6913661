use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use stockrec_core::UserId;

use crate::app::errors::json_error;
use crate::context::CallerContext;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Require an authenticated caller. Identity is established upstream and
/// forwarded in headers; this layer only parses it.
pub async fn caller_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let caller = match extract_caller(req.headers()) {
        Ok(caller) => caller,
        Err(message) => return json_error(StatusCode::UNAUTHORIZED, "unauthenticated", message),
    };

    req.extensions_mut().insert(caller);
    next.run(req).await
}

fn extract_caller(headers: &HeaderMap) -> Result<CallerContext, &'static str> {
    let user_id = header(headers, USER_ID_HEADER).ok_or("missing x-user-id header")?;
    let user_id: UserId = user_id.parse().map_err(|_| "x-user-id is not a valid id")?;
    let role = header(headers, USER_ROLE_HEADER).ok_or("missing x-user-role header")?;

    Ok(CallerContext::new(user_id, role.to_ascii_lowercase()))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn caller_is_read_from_headers() {
        let user_id = UserId::new();
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_str(&user_id.to_string()).unwrap());
        headers.insert(USER_ROLE_HEADER, HeaderValue::from_static("Manager"));

        let caller = extract_caller(&headers).unwrap();
        assert_eq!(caller.user_id(), user_id);
        assert_eq!(caller.role(), "manager");
    }

    #[test]
    fn missing_or_malformed_identity_is_rejected() {
        let mut headers = HeaderMap::new();
        assert!(extract_caller(&headers).is_err());

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
        headers.insert(USER_ROLE_HEADER, HeaderValue::from_static("manager"));
        assert!(extract_caller(&headers).is_err());
    }
}
