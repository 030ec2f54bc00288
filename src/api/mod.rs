//! HTTP API layer

mod error;
mod handlers;
mod routes;

pub use error::ApiError;
pub use handlers::{CreatePostRequest, ErrorResponse, FeedParams, UpdatePostRequest};
pub use routes::{create_router, ApiDoc, AppState};
