use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// -- Users --

/// Fields other than the ones below are ignored, here and in the nested
/// posts, so a client cannot set `published` or counters on signup.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: String,
    /// Initial posts, authored by the new user. Missing and `null` both
    /// mean none.
    #[serde(default)]
    pub posts: Option<Vec<PostDraft>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: Option<String>,
    pub email: String,
}

// -- Posts --

#[derive(Debug, Deserialize)]
pub struct PostDraft {
    pub title: String,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: Option<String>,
    pub published: bool,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostWithAuthor {
    #[serde(flatten)]
    pub post: Post,
    pub author: User,
}

// -- Feed --

/// Query string of `GET /feed`.
///
/// `skip` and `take` stay raw so that junk values can be ignored instead of
/// failing the request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    pub search_string: Option<String>,
    pub skip: Option<String>,
    pub take: Option<String>,
    pub order_by: Option<String>,
}

impl FeedQuery {
    /// Non-empty search string, if any.
    pub fn search(&self) -> Option<&str> {
        self.search_string.as_deref().filter(|s| !s.is_empty())
    }

    pub fn skip(&self) -> Option<usize> {
        lenient_count(self.skip.as_deref())
    }

    pub fn take(&self) -> Option<usize> {
        lenient_count(self.take.as_deref())
    }

    pub fn order(&self) -> Result<SortOrder, UnknownSortOrder> {
        match self.order_by.as_deref() {
            None | Some("") => Ok(SortOrder::default()),
            Some(raw) => raw.parse(),
        }
    }
}

/// Positive integers pass; zero, negatives and junk count as absent.
fn lenient_count(raw: Option<&str>) -> Option<usize> {
    raw?.trim().parse::<usize>().ok().filter(|n| *n > 0)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("orderBy must be 'asc' or 'desc', got {0:?}")]
pub struct UnknownSortOrder(pub String);

impl FromStr for SortOrder {
    type Err = UnknownSortOrder;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(UnknownSortOrder(s.to_string())),
        }
    }
}

// -- Errors --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
