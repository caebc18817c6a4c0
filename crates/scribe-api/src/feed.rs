use axum::{Extension, extract::State};
use scribe_db::models::FeedFilter;
use scribe_types::Identity;
use scribe_types::api::{FeedQuery, PostWithAuthor};

use crate::error::ApiError;
use crate::extract::{Json, Query};
use crate::state::{AppState, with_scoped};
use crate::views;

/// GET /feed — published posts, searchable and paginated.
///
/// `skip` and `take` that are not positive integers are ignored;
/// `orderBy` sorts on the last update time and defaults to newest first.
pub async fn feed(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<PostWithAuthor>>, ApiError> {
    let filter = FeedFilter {
        search: query.search().map(str::to_string),
        skip: query.skip(),
        take: query.take(),
        order: query
            .order()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?,
    };

    let rows = with_scoped(&state, identity, move |db| db.feed(&filter)).await?;
    Ok(Json(rows.into_iter().map(views::post_with_author).collect()))
}
