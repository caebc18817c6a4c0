//! Store rows to wire models.

use scribe_db::models::{PostRow, UserRow};
use scribe_types::api::{Post, PostWithAuthor, User};

pub(crate) fn user(row: UserRow) -> User {
    User {
        id: row.id,
        name: row.name,
        email: row.email,
    }
}

pub(crate) fn post(row: PostRow) -> Post {
    Post {
        id: row.id,
        title: row.title,
        content: row.content,
        published: row.published,
        view_count: row.view_count,
        created_at: row.created_at,
        updated_at: row.updated_at,
        author_id: row.author_id,
    }
}

pub(crate) fn post_with_author((post_row, author): (PostRow, UserRow)) -> PostWithAuthor {
    PostWithAuthor {
        post: post(post_row),
        author: user(author),
    }
}
