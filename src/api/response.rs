use std::fmt::Display;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Uniform JSON body: `{"error": string|null, "code": int, "data": ...}`.
#[derive(Debug, Serialize)]
pub struct JsonResponse<T> {
    #[serde(skip)]
    status: StatusCode,
    error: Option<String>,
    code: i64,
    data: Option<T>,
}

impl<T: Serialize> JsonResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            error: None,
            code: 0,
            data: Some(data),
        }
    }
}

impl JsonResponse<()> {
    /// Error envelope. `code` is the application error code, independent of
    /// the HTTP status.
    pub fn error(status: StatusCode, err: impl Display, code: i64) -> Self {
        Self {
            status,
            error: Some(err.to_string()),
            code,
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for JsonResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
