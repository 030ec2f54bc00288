//! API route definitions

use axum::{
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use super::handlers::{
    self, CreatePostRequest, ErrorResponse, HealthResponse, MessageResponse, UpdatePostRequest,
};
use crate::store::BlogDb;
use crate::types::{Post, PostWithAuthor, User};

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Blog API",
        version = "0.1.0",
        description = "Posts, drafts, publishing and a searchable feed"
    ),
    tags(
        (name = "posts", description = "Post management and feed"),
        (name = "users", description = "Users and their drafts"),
        (name = "health", description = "Health checks")
    ),
    paths(
        handlers::root,
        handlers::health,
        handlers::create_post,
        handlers::get_post,
        handlers::increment_views,
        handlers::toggle_publish,
        handlers::update_post,
        handlers::delete_post,
        handlers::list_users,
        handlers::user_drafts,
        handlers::feed,
    ),
    components(schemas(
        User,
        Post,
        PostWithAuthor,
        CreatePostRequest,
        UpdatePostRequest,
        MessageResponse,
        HealthResponse,
        ErrorResponse,
    ))
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<BlogDb>,
}

impl AppState {
    pub fn new(db: BlogDb) -> Self {
        Self { db: Arc::new(db) }
    }
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::root))

        // Posts
        .route("/post", post(handlers::create_post))
        .route(
            "/post/{id}",
            get(handlers::get_post)
                .put(handlers::update_post)
                .delete(handlers::delete_post),
        )
        .route("/post/{id}/views", put(handlers::increment_views))
        .route("/publish/{id}", put(handlers::toggle_publish))
        .route("/feed", get(handlers::feed))

        // Users
        .route("/users", get(handlers::list_users))
        .route("/user/{id}/drafts", get(handlers::user_drafts))

        // Health
        .route("/health", get(handlers::health))

        // OpenAPI spec
        .route("/openapi.json", get(openapi_json))

        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
