//! API request handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::error::ApiError;
use super::routes::AppState;
use crate::error::Error;
use crate::types::{FeedQuery, NewPost, Post, PostUpdate, PostWithAuthor, User};

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

// Query parameters

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct FeedParams {
    /// Substring to look for in the title or content
    pub search_string: Option<String>,
    /// Number of posts to skip
    pub skip: Option<String>,
    /// Maximum number of posts to return
    pub take: Option<String>,
    /// Order by last update: `asc` or `desc`
    pub order_by: Option<String>,
}

impl From<FeedParams> for FeedQuery {
    fn from(params: FeedParams) -> Self {
        FeedQuery::from_raw(
            params.search_string,
            params.skip.as_deref(),
            params.take.as_deref(),
            params.order_by.as_deref(),
        )
    }
}

// Request bodies

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    /// Title of the post
    pub title: String,
    /// Body of the post
    pub content: Option<String>,
    /// Email of an existing user who becomes the author
    pub author_email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePostRequest {
    /// Replacement title (optional)
    pub title: Option<String>,
    /// Replacement content (optional)
    pub content: Option<String>,
}

// Response types

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// API version
    pub version: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

fn parse_id(raw: &str) -> crate::Result<i64> {
    raw.trim()
        .parse()
        .map_err(|_| Error::InvalidId(raw.to_string()))
}

// Handlers

/// Greeting
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Greeting", body = MessageResponse)
    ),
    tag = "health"
)]
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Hello World".into(),
    })
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Create a post for an existing author
#[utoipa::path(
    post,
    path = "/post",
    request_body = CreatePostRequest,
    responses(
        (status = 200, description = "Post created", body = Post),
        (status = 404, description = "Author not found", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "posts"
)]
pub async fn create_post(
    State(state): State<AppState>,
    Json(req): Json<CreatePostRequest>,
) -> ApiResult<Post> {
    let author = state
        .db
        .find_user_by_email(&req.author_email)
        .map_err(ApiError::store("creating post"))?
        .ok_or_else(|| ApiError::NotFound("Author not found".into()))?;

    let post = state
        .db
        .create_post(NewPost {
            title: req.title,
            content: req.content,
            author_id: author.id,
        })
        .map_err(ApiError::store("creating post"))?;

    tracing::info!(post_id = post.id, author_id = author.id, "Created post");
    Ok(Json(post))
}

/// Get a single post by ID
#[utoipa::path(
    get,
    path = "/post/{id}",
    params(
        ("id" = i64, Path, description = "Post ID")
    ),
    responses(
        (status = 200, description = "Post found", body = Post),
        (status = 404, description = "Post not found", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "posts"
)]
pub async fn get_post(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Post> {
    parse_id(&id)
        .and_then(|post_id| state.db.find_post(post_id))
        .map_err(ApiError::store(format!("fetching post with ID {id}")))?
        .map(Json)
        .ok_or_else(|| ApiError::post_not_found(&id))
}

/// Increment a post's view count
#[utoipa::path(
    put,
    path = "/post/{id}/views",
    params(
        ("id" = i64, Path, description = "Post ID")
    ),
    responses(
        (status = 200, description = "View count incremented", body = Post),
        (status = 404, description = "Post not found", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "posts"
)]
pub async fn increment_views(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Post> {
    let post = parse_id(&id)
        .and_then(|post_id| state.db.increment_views(post_id))
        .map_err(ApiError::store(format!("updating post with ID {id}")))?;

    Ok(Json(post))
}

/// Toggle a post's published flag
#[utoipa::path(
    put,
    path = "/publish/{id}",
    params(
        ("id" = i64, Path, description = "Post ID")
    ),
    responses(
        (status = 200, description = "Publish state toggled", body = Post),
        (status = 404, description = "Post not found", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "posts"
)]
pub async fn toggle_publish(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Post> {
    let post = parse_id(&id)
        .and_then(|post_id| state.db.toggle_published(post_id))
        .map_err(ApiError::store(format!("updating post with ID {id}")))?;

    tracing::info!(post_id = post.id, published = post.published, "Toggled publish state");
    Ok(Json(post))
}

/// Update a post's title and/or content
#[utoipa::path(
    put,
    path = "/post/{id}",
    params(
        ("id" = i64, Path, description = "Post ID")
    ),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Post updated", body = Post),
        (status = 404, description = "Post not found", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "posts"
)]
pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdatePostRequest>,
) -> ApiResult<Post> {
    let update = PostUpdate {
        title: req.title,
        content: req.content,
    };

    let post = parse_id(&id)
        .and_then(|post_id| state.db.update_post(post_id, update))
        .map_err(ApiError::store(format!("updating post with ID {id}")))?;

    Ok(Json(post))
}

/// Delete a post
#[utoipa::path(
    delete,
    path = "/post/{id}",
    params(
        ("id" = i64, Path, description = "Post ID")
    ),
    responses(
        (status = 200, description = "Post deleted", body = Post),
        (status = 404, description = "Post not found", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "posts"
)]
pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Post> {
    let post = parse_id(&id)
        .and_then(|post_id| state.db.delete_post(post_id))
        .map_err(ApiError::store(format!("deleting post with ID {id}")))?;

    tracing::info!(post_id = post.id, "Deleted post");
    Ok(Json(post))
}

/// List all users
#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "All users", body = Vec<User>),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<User>> {
    let users = state
        .db
        .list_users()
        .map_err(ApiError::store("fetching users"))?;

    Ok(Json(users))
}

/// List a user's unpublished posts
#[utoipa::path(
    get,
    path = "/user/{id}/drafts",
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Drafts of the user", body = Vec<Post>),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn user_drafts(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Post>> {
    let drafts = parse_id(&id)
        .and_then(|author_id| state.db.drafts_by_author(author_id))
        .map_err(ApiError::store(format!("fetching drafts for user with ID {id}")))?;

    Ok(Json(drafts))
}

/// Published posts, optionally searched, paginated and ordered
#[utoipa::path(
    get,
    path = "/feed",
    params(FeedParams),
    responses(
        (status = 200, description = "Published posts with authors", body = Vec<PostWithAuthor>),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "posts"
)]
pub async fn feed(
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> ApiResult<Vec<PostWithAuthor>> {
    let query = FeedQuery::from(params);
    tracing::debug!(?query, "Fetching feed");

    let posts = state
        .db
        .feed(&query)
        .map_err(ApiError::store("fetching feed"))?;

    Ok(Json(posts))
}
