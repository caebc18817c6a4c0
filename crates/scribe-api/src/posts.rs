use axum::{
    Extension,
    extract::{Path, State},
};
use scribe_db::models::NewPost;
use scribe_types::Identity;
use scribe_types::api::{CreatePostRequest, Post, PostWithAuthor};

use crate::error::ApiError;
use crate::extract::Json;
use crate::state::{AppState, parse_id, with_scoped};
use crate::views;

/// POST /post — create a draft authored by the caller.
pub async fn create_post(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CreatePostRequest>,
) -> Result<Json<Post>, ApiError> {
    let new = NewPost {
        title: req.title,
        content: req.content,
    };

    let row = with_scoped(&state, identity, move |db| db.create_post(&new)).await?;
    Ok(Json(views::post(row)))
}

/// GET /post
pub async fn list_posts(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<PostWithAuthor>>, ApiError> {
    let rows = with_scoped(&state, identity, |db| db.list_posts()).await?;
    Ok(Json(rows.into_iter().map(views::post_with_author).collect()))
}

/// GET /post/{id}
pub async fn get_post(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<Post>, ApiError> {
    let id = parse_id(&id)?;
    let row = with_scoped(&state, identity, move |db| db.get_post(id)).await?;
    Ok(Json(views::post(row)))
}

/// PUT /post/{id}/views
pub async fn increment_views(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<Post>, ApiError> {
    let id = parse_id(&id)?;
    let row = with_scoped(&state, identity, move |db| db.increment_views(id)).await?;
    Ok(Json(views::post(row)))
}

/// PUT /publish/{id} — flip the published flag.
pub async fn toggle_publish(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<Post>, ApiError> {
    let id = parse_id(&id)?;
    let row = with_scoped(&state, identity, move |db| db.toggle_published(id)).await?;
    Ok(Json(views::post(row)))
}

/// DELETE /post/{id} — responds with the deleted post.
pub async fn delete_post(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<Post>, ApiError> {
    let id = parse_id(&id)?;
    let row = with_scoped(&state, identity, move |db| db.delete_post(id)).await?;
    Ok(Json(views::post(row)))
}
