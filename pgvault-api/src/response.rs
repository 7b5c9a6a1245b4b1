//! Success envelopes.
//!
//! Every successful call answers `{"status":"success", "data"?, "count"?, "message"?}`.
//! The HTTP status travels with the envelope and is not serialized.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Success envelope around `T`; `T = ()` carries only a message.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize = ()> {
    #[serde(skip)]
    code: StatusCode,
    /// Always `success`.
    pub status: &'static str,
    /// Payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Number of items, for list payloads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    /// Human-readable outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn new(code: StatusCode, data: Option<T>, message: Option<String>) -> Self {
        Self {
            code,
            status: "success",
            data,
            count: None,
            message,
        }
    }

    /// 200 with a payload.
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self::new(StatusCode::OK, Some(data), None)
    }

    /// 200 with a payload and a message.
    #[must_use]
    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, Some(data), Some(message.into()))
    }

    /// 201 for a newly registered resource.
    #[must_use]
    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CREATED, Some(data), Some(message.into()))
    }

    /// HTTP status this envelope is sent with.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.code
    }
}

impl<I: Serialize> ApiResponse<Vec<I>> {
    /// 200 with a list payload and its length.
    #[must_use]
    pub fn list(items: Vec<I>) -> Self {
        let count = items.len();
        let mut response = Self::ok(items);
        response.count = Some(count);
        response
    }
}

impl ApiResponse {
    /// 200 with no payload.
    #[must_use]
    pub fn done(message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, None, Some(message.into()))
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.code, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_reports_count() {
        let json = serde_json::to_value(ApiResponse::list(vec!["a", "b"])).unwrap();
        assert_eq!(json["count"], 2);
        assert_eq!(json["data"][1], "b");
        assert!(json.get("message").is_none());
    }

    #[test]
    fn test_created_uses_201() {
        let response = ApiResponse::created(1, "Registered");
        assert_eq!(response.status_code(), StatusCode::CREATED);
        assert_eq!(response.into_response().status(), StatusCode::CREATED);
    }

    #[test]
    fn test_done_has_no_data() {
        let json = serde_json::to_string(&ApiResponse::done("Deleted")).unwrap();
        assert_eq!(json, r#"{"status":"success","message":"Deleted"}"#);
    }
}
