pub mod error;
pub mod migrations;
pub mod models;
pub mod policy;
mod queries;
pub mod scoped;

pub use error::{DbError, Result};
pub use policy::{Action, Entity, OwnershipPolicy, Policy, Resource};
pub use scoped::Scoped;

use rusqlite::Connection;
use scribe_types::Identity;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// The single store connection shared by every request, plus the policy
/// every scoped handle is checked against.
pub struct Database {
    conn: Mutex<Connection>,
    policy: Box<dyn Policy>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let db = Self::init(conn)?;
        info!("Database opened at {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            policy: Box::new(OwnershipPolicy),
        })
    }

    /// Replace the default [`OwnershipPolicy`].
    pub fn with_policy(mut self, policy: impl Policy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// A data-access handle acting on behalf of `identity`.
    pub fn scoped(&self, identity: Identity) -> Scoped<'_> {
        Scoped::new(self, identity)
    }

    pub(crate) fn policy(&self) -> &dyn Policy {
        self.policy.as_ref()
    }

    /// Run `f` while holding the connection lock. Read-modify-write sequences
    /// that must not interleave belong inside a single call.
    pub(crate) fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| DbError::Poisoned)?;
        f(&mut conn)
    }
}
