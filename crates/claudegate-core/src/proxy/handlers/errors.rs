//! OpenAI-style error bodies.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use claudegate_types::BridgeError;
use serde_json::json;

/// `{"error": {"message", "type", "code"}}` with the status the error maps to.
pub fn error_response(err: &BridgeError, request_id: &str) -> Response {
    let status = StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::BAD_GATEWAY);
    (
        status,
        [("X-Request-Id", request_id.to_string())],
        Json(json!({
            "error": {
                "message": err.message(),
                "type": err.error_type(),
                "code": status.as_u16(),
            }
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_follows_error_kind() {
        assert_eq!(error_response(&BridgeError::parse("bad"), "r").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            error_response(&BridgeError::assembly("broken"), "r").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            error_response(&BridgeError::backend(Some(529), "overloaded"), "r").status().as_u16(),
            529
        );
        assert_eq!(error_response(&BridgeError::backend(None, "reset"), "r").status(), StatusCode::BAD_GATEWAY);
    }
}
