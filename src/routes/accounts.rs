use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::accounts::{self, NewCommunity, UserProfile};
use crate::db::models::{Community, User};
use crate::error::{AppError, AppResult};
use crate::posts::ProfilePosts;
use crate::state::AppState;

/// Onboarding body; the account id comes from the path.
#[derive(Deserialize)]
pub struct UpsertUserRequest {
    pub username: String,
    pub name: String,
    pub image: Option<String>,
    pub bio: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users/{account_id}", get(get_user).put(upsert_user))
        .route("/api/users/{account_id}/posts", get(user_posts))
        .route("/api/communities", post(create_community))
        .route("/api/communities/{account_id}/posts", get(community_posts))
}

async fn upsert_user(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    Json(req): Json<UpsertUserRequest>,
) -> AppResult<Json<User>> {
    if req.username.trim().is_empty() || req.name.trim().is_empty() {
        return Err(AppError::BadRequest("Username and name are required".into()));
    }

    let profile = UserProfile {
        account_id,
        username: req.username.trim().to_string(),
        name: req.name.trim().to_string(),
        image: req.image,
        bio: req.bio,
    };
    let user = accounts::upsert_user(&state.db, &profile)?;
    Ok(Json(user))
}

async fn get_user(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> AppResult<Json<User>> {
    accounts::fetch_user(&state.db, &account_id)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", account_id)))
}

async fn user_posts(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> AppResult<Json<ProfilePosts<User>>> {
    Ok(Json(state.posts.fetch_user_posts(&account_id).await?))
}

async fn create_community(
    State(state): State<AppState>,
    Json(req): Json<NewCommunity>,
) -> AppResult<(StatusCode, Json<Community>)> {
    if req.username.trim().is_empty() || req.name.trim().is_empty() {
        return Err(AppError::BadRequest("Username and name are required".into()));
    }
    let community = accounts::create_community(&state.db, &req)?;
    Ok((StatusCode::CREATED, Json(community)))
}

async fn community_posts(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> AppResult<Json<ProfilePosts<Community>>> {
    Ok(Json(state.posts.fetch_community_posts(&account_id).await?))
}
