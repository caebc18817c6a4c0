//! Access policy: a capability check of identity x resource x action.
//!
//! Every operation on a [`Scoped`](crate::Scoped) handle asks the policy
//! before it returns or changes a row. Point operations fail on a denial;
//! collection reads keep only the rows the caller may read.

use std::fmt;

use scribe_types::Identity;

use crate::models::{PostRow, UserRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    User,
    Post,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "User",
            Self::Post => "Post",
        })
    }
}

/// The attributes of a row a policy may decide on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    User { id: i64 },
    Post { author_id: i64, published: bool },
}

impl Resource {
    pub fn entity(&self) -> Entity {
        match self {
            Self::User { .. } => Entity::User,
            Self::Post { .. } => Entity::Post,
        }
    }
}

impl From<&UserRow> for Resource {
    fn from(row: &UserRow) -> Self {
        Self::User { id: row.id }
    }
}

impl From<&PostRow> for Resource {
    fn from(row: &PostRow) -> Self {
        Self::Post {
            author_id: row.author_id,
            published: row.published,
        }
    }
}

pub trait Policy: Send + Sync {
    fn allows(&self, identity: Identity, action: Action, resource: &Resource) -> bool;
}

/// Default rules:
///
/// - users are public and anyone may sign up; only the user itself may
///   update or delete its row
/// - published posts are readable by everyone; the author has full access
///   to its own posts, published or not
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnershipPolicy;

impl Policy for OwnershipPolicy {
    fn allows(&self, identity: Identity, action: Action, resource: &Resource) -> bool {
        let caller = identity.id();
        match (*resource, action) {
            (Resource::User { .. }, Action::Create | Action::Read) => true,
            (Resource::User { id }, Action::Update | Action::Delete) => id == caller,
            (Resource::Post { author_id, published }, Action::Read) => {
                published || author_id == caller
            }
            (Resource::Post { author_id, .. }, _) => author_id == caller,
        }
    }
}
