use rusqlite::Connection;
use tracing::info;

use crate::Result;

/// Bring the schema up to date. Safe to run on every start.
pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (users, posts)");
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(
            "
            CREATE TABLE users (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT,
                email       TEXT NOT NULL UNIQUE
            );

            CREATE TABLE posts (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                title       TEXT NOT NULL,
                content     TEXT,
                published   INTEGER NOT NULL DEFAULT 0,
                view_count  INTEGER NOT NULL DEFAULT 0 CHECK (view_count >= 0),
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                author_id   INTEGER NOT NULL REFERENCES users(id)
            );

            CREATE INDEX idx_posts_author
                ON posts(author_id, published);

            CREATE INDEX idx_posts_feed
                ON posts(published, updated_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
        tx.commit()?;
    }

    info!("Database migrations complete");
    Ok(())
}
