//! Maps the shared `Error` type onto HTTP responses: `Validation`
//! carries the violated field and reason at 400, `NotFound`/`Conflict` map
//! to their matching status codes, everything else becomes a 500 with no
//! internal detail leaked to the client.

use crate::error::Error;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, field, message) = match self {
            Error::Validation { field, reason } => (StatusCode::BAD_REQUEST, Some(field), reason),
            Error::NotFound => (StatusCode::NOT_FOUND, None, "not found".to_string()),
            Error::Conflict(reason) => (StatusCode::CONFLICT, None, reason),
            Error::FormatError(reason) => (StatusCode::BAD_REQUEST, None, reason),
            Error::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, None, "shutting down".to_string()),
            Error::Internal(_) | Error::InvalidState(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, None, "internal error".to_string())
            }
        };

        (status, Json(ErrorBody { error: message, field })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn validation_error_maps_to_400_with_field() {
        let err = Error::validation("page_size", "must be between 1 and 1000");
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["field"], "page_size");
    }

    #[tokio::test]
    async fn internal_error_hides_detail_behind_500() {
        let err = Error::Internal("connection pool exhausted".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "internal error");
    }

    #[test]
    fn not_found_maps_to_404() {
        assert_eq!(Error::NotFound.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn conflict_maps_to_409() {
        assert_eq!(
            Error::Conflict("duplicate".to_string()).into_response().status(),
            StatusCode::CONFLICT
        );
    }
}
