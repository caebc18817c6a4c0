//! Row types as stored in SQLite, and the inputs for creating them.
//! Distinct from the scribe-types wire models to keep the store independent
//! of the HTTP surface.

use chrono::{DateTime, Utc};
use scribe_types::api::SortOrder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub id: i64,
    pub name: Option<String>,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRow {
    pub id: i64,
    pub title: String,
    pub content: Option<String>,
    pub published: bool,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: String,
    /// Posts created together with the user and authored by it.
    pub posts: Vec<NewPost>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FeedFilter {
    /// Substring matched against title or content.
    pub search: Option<String>,
    pub skip: Option<usize>,
    pub take: Option<usize>,
    pub order: SortOrder,
}
