use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::posts::domain::validate_text;
use crate::posts::{DeletionPlan, FeedPage, PostId, PostView, UserId};
use crate::state::AppState;

// --- Requests ---

#[derive(Deserialize)]
pub struct FeedQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub text: String,
    pub author_id: String,
    /// Community account id, if posting as a community
    pub community_id: Option<String>,
    pub path: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    pub text: String,
    pub user_id: String,
    pub path: Option<String>,
}

#[derive(Deserialize)]
pub struct DeleteQuery {
    pub path: Option<String>,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/posts", get(list_posts).post(create_post))
        .route("/api/posts/{id}", get(get_post).delete(delete_post))
        .route("/api/posts/{id}/comments", post(create_comment))
}

// --- Handlers ---

async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> AppResult<Json<FeedPage>> {
    let page = state.posts.fetch_posts(query.page, query.size).await?;
    Ok(Json(page))
}

async fn create_post(
    State(state): State<AppState>,
    Json(req): Json<CreatePostRequest>,
) -> AppResult<(StatusCode, Json<PostView>)> {
    let text = validate_text(&req.text, state.config.validation.min_text_len)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let path = req.path.as_deref().unwrap_or("/");

    let id = state
        .posts
        .create_post(
            &text,
            &UserId::new(req.author_id),
            req.community_id.as_deref(),
            path,
        )
        .await?;

    let post = state.posts.fetch_post_by_id(&id).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PostView>> {
    let post = state.posts.fetch_post_by_id(&PostId::new(id)).await?;
    Ok(Json(post))
}

async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> AppResult<Json<DeletionPlan>> {
    let path = query.path.as_deref().unwrap_or("/");
    let plan = state.posts.delete_post(&PostId::new(id), path).await?;
    Ok(Json(plan))
}

async fn create_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<(StatusCode, Json<PostView>)> {
    let text = validate_text(&req.text, state.config.validation.min_text_len)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let path = req
        .path
        .clone()
        .unwrap_or_else(|| format!("/rendezveux/{}", id));

    let parent = PostId::new(id);
    let comment_id = state
        .posts
        .add_comment(&parent, &text, &UserId::new(req.user_id), &path)
        .await?;

    let comment = state.posts.fetch_post_by_id(&comment_id).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}
