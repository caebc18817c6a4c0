use thiserror::Error;

use crate::policy::{Action, Entity};

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} with ID {id} does not exist in the database")]
    NotFound { entity: Entity, id: i64 },

    #[error("{action} on {entity} denied by policy")]
    Denied { action: Action, entity: Entity },

    /// A uniqueness constraint rejected the write.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("database lock poisoned")]
    Poisoned,

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl DbError {
    pub(crate) fn post_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: Entity::Post,
            id,
        }
    }

    pub(crate) fn user_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: Entity::User,
            id,
        }
    }
}

/// True when SQLite refused a write because of a table constraint.
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
