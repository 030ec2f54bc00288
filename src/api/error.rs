//! HTTP error responses
//!
//! Handlers fail in one of two ways: the addressed record does not exist
//! (404), or a store operation failed (500). Both render as
//! `{"error": "<message>"}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::handlers::ErrorResponse;
use crate::error::Error;

#[derive(Debug)]
pub enum ApiError {
    /// Record not found (404)
    NotFound(String),

    /// Store operation failed (500, logged)
    Store { action: String, source: Error },
}

impl ApiError {
    /// Map a store error for the operation described by `action`.
    ///
    /// `action` reads as a gerund phrase, e.g. "fetching post with ID 4".
    pub fn store(action: impl Into<String>) -> impl FnOnce(Error) -> ApiError {
        let action = action.into();
        move |source| match source {
            Error::PostNotFound(id) => ApiError::post_not_found(id),
            source => ApiError::Store { action, source },
        }
    }

    pub fn post_not_found(id: impl std::fmt::Display) -> Self {
        ApiError::NotFound(format!("Post with ID {id} does not exist in the database"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::NotFound(message) => message,
            ApiError::Store { action, source } => {
                tracing::error!(error = %source, "Error {}", action);
                format!("Error {action}")
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_not_found_is_404() {
        let response = ApiError::post_not_found(7).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await["error"],
            "Post with ID 7 does not exist in the database"
        );
    }

    #[tokio::test]
    async fn test_store_error_is_generic_500() {
        let err = ApiError::store("fetching users")(Error::Other("disk on fire".into()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "Error fetching users");
    }

    #[test]
    fn test_missing_post_maps_to_not_found() {
        let err = ApiError::store("deleting post with ID 3")(Error::PostNotFound(3));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_invalid_id_is_store_failure() {
        let err = ApiError::store("fetching post with ID abc")(Error::InvalidId("abc".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
