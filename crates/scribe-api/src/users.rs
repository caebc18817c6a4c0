use axum::{
    Extension,
    extract::{Path, State},
};
use scribe_db::models::{NewPost, NewUser};
use scribe_types::Identity;
use scribe_types::api::{Post, SignupRequest, User};

use crate::error::ApiError;
use crate::extract::Json;
use crate::state::{AppState, parse_id, with_scoped};
use crate::views;

/// POST /signup — create a user, optionally with initial posts.
pub async fn signup(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<SignupRequest>,
) -> Result<Json<User>, ApiError> {
    let new = NewUser {
        name: req.name,
        email: req.email,
        posts: req
            .posts
            .unwrap_or_default()
            .into_iter()
            .map(|p| NewPost {
                title: p.title,
                content: p.content,
            })
            .collect(),
    };

    let row = with_scoped(&state, identity, move |db| db.create_user(&new)).await?;
    Ok(Json(views::user(row)))
}

/// GET /users
pub async fn list_users(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<User>>, ApiError> {
    let rows = with_scoped(&state, identity, |db| db.list_users()).await?;
    Ok(Json(rows.into_iter().map(views::user).collect()))
}

/// GET /user/{id}/drafts — unpublished posts of one user.
pub async fn drafts(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let user_id = parse_id(&id)?;
    let rows = with_scoped(&state, identity, move |db| db.drafts(user_id)).await?;
    Ok(Json(rows.into_iter().map(views::post).collect()))
}
