pub mod error;
pub mod extract;
pub mod feed;
pub mod middleware;
pub mod posts;
pub mod state;
pub mod users;
mod views;


use axum::{
    Router,
    http::Uri,
    middleware::from_fn,
    routing::{get, post, put},
};

pub use error::ApiError;
pub use state::{AppState, AppStateInner};

/// All routes. Every request, including unknown paths, goes through
/// [`middleware::require_identity`] first.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/signup", post(users::signup))
        .route("/users", get(users::list_users))
        .route("/user/{id}/drafts", get(users::drafts))
        .route("/post", post(posts::create_post).get(posts::list_posts))
        .route("/post/{id}", get(posts::get_post).delete(posts::delete_post))
        .route("/post/{id}/views", put(posts::increment_views))
        .route("/publish/{id}", put(posts::toggle_publish))
        .route("/feed", get(feed::feed))
        .fallback(not_found)
        .layer(from_fn(middleware::require_identity))
        .with_state(state)
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}
