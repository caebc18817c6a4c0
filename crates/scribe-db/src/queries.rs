//! Raw, unscoped SQL. Only [`Scoped`](crate::Scoped) calls into here, after
//! or around its policy checks.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use scribe_types::api::SortOrder;

use crate::error::{DbError, Result, is_constraint_violation};
use crate::models::{PostRow, UserRow};

const USER_COLUMNS: &str = "u.id, u.name, u.email";
const POST_COLUMNS: &str =
    "p.id, p.title, p.content, p.published, p.view_count, p.created_at, p.updated_at, p.author_id";
/// Number of columns in `POST_COLUMNS`; author columns follow in joins.
const POST_WIDTH: usize = 8;

// -- Users --

pub fn insert_user(conn: &Connection, name: Option<&str>, email: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO users (name, email) VALUES (?1, ?2)",
        params![name, email],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            DbError::Conflict(format!("A user with email {email} already exists"))
        } else {
            e.into()
        }
    })?;
    Ok(conn.last_insert_rowid())
}

pub fn user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?1"),
            [id],
            |row| user_from_row(row, 0),
        )
        .optional()?;
    Ok(row)
}

pub fn all_users(conn: &Connection) -> Result<Vec<UserRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users u ORDER BY u.id"))?;
    let rows = stmt
        .query_map([], |row| user_from_row(row, 0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// -- Posts --

pub fn insert_post(
    conn: &Connection,
    author_id: i64,
    title: &str,
    content: Option<&str>,
    now: DateTime<Utc>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO posts (title, content, created_at, updated_at, author_id)
         VALUES (?1, ?2, ?3, ?3, ?4)",
        params![title, content, now, author_id],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn post_by_id(conn: &Connection, id: i64) -> Result<Option<PostRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = ?1"),
            [id],
            |row| post_from_row(row, 0),
        )
        .optional()?;
    Ok(row)
}

pub fn drafts_by_author(conn: &Connection, author_id: i64) -> Result<Vec<PostRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {POST_COLUMNS} FROM posts p
         WHERE p.author_id = ?1 AND p.published = 0
         ORDER BY p.id"
    ))?;
    let rows = stmt
        .query_map([author_id], |row| post_from_row(row, 0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn all_posts_with_authors(conn: &Connection) -> Result<Vec<(PostRow, UserRow)>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {POST_COLUMNS}, {USER_COLUMNS}
         FROM posts p
         JOIN users u ON p.author_id = u.id
         ORDER BY p.id"
    ))?;
    let rows = stmt
        .query_map([], post_with_author_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Published posts, optionally restricted to those whose title or content
/// contains `search` (case-sensitive, no wildcards), ordered by last update.
pub fn published_posts_with_authors(
    conn: &Connection,
    search: Option<&str>,
    order: SortOrder,
) -> Result<Vec<(PostRow, UserRow)>> {
    let direction = match order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT {POST_COLUMNS}, {USER_COLUMNS}
         FROM posts p
         JOIN users u ON p.author_id = u.id
         WHERE p.published = 1
           AND (?1 IS NULL OR instr(p.title, ?1) > 0 OR instr(p.content, ?1) > 0)
         ORDER BY p.updated_at {direction}, p.id {direction}"
    ))?;
    let rows = stmt
        .query_map([search], post_with_author_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn increment_view_count(conn: &Connection, id: i64, now: DateTime<Utc>) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE posts SET view_count = view_count + 1, updated_at = ?2 WHERE id = ?1",
        params![id, now],
    )?;
    Ok(changed)
}

pub fn toggle_published(conn: &Connection, id: i64, now: DateTime<Utc>) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE posts SET published = NOT published, updated_at = ?2 WHERE id = ?1",
        params![id, now],
    )?;
    Ok(changed)
}

pub fn delete_post(conn: &Connection, id: i64) -> Result<usize> {
    let changed = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
    Ok(changed)
}

// -- Row mapping --

fn user_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        email: row.get(offset + 2)?,
    })
}

fn post_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(offset)?,
        title: row.get(offset + 1)?,
        content: row.get(offset + 2)?,
        published: row.get(offset + 3)?,
        view_count: row.get(offset + 4)?,
        created_at: row.get(offset + 5)?,
        updated_at: row.get(offset + 6)?,
        author_id: row.get(offset + 7)?,
    })
}

fn post_with_author_from_row(row: &Row<'_>) -> rusqlite::Result<(PostRow, UserRow)> {
    Ok((post_from_row(row, 0)?, user_from_row(row, POST_WIDTH)?))
}
