use chrono::{DateTime, Utc};
use rusqlite::Connection;
use scribe_types::Identity;
use tracing::{debug, warn};

use crate::error::{DbError, Result};
use crate::models::{FeedFilter, NewPost, NewUser, PostRow, UserRow};
use crate::policy::{Action, Resource};
use crate::{Database, queries};

/// Data-access handle bound to one caller. Every operation is checked
/// against the database's policy for that caller.
pub struct Scoped<'db> {
    db: &'db Database,
    identity: Identity,
}

impl<'db> Scoped<'db> {
    pub(crate) fn new(db: &'db Database, identity: Identity) -> Self {
        Self { db, identity }
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    // -- Users --

    /// Create a user together with its initial posts, atomically.
    ///
    /// The initial posts are authored by the new user, so they are
    /// authorized with the new user as the acting identity.
    pub fn create_user(&self, new: &NewUser) -> Result<UserRow> {
        if new.email.trim().is_empty() {
            return Err(DbError::InvalidInput("email must not be empty".into()));
        }

        self.db.with_conn(|conn| {
            let tx = conn.transaction()?;

            let user_id = queries::insert_user(&tx, new.name.as_deref(), &new.email)?;
            let user = queries::user_by_id(&tx, user_id)?
                .ok_or_else(|| DbError::user_not_found(user_id))?;
            self.authorize(self.identity, Action::Create, Resource::from(&user))?;

            let owner = Identity::new(user_id)
                .map_err(|e| DbError::InvalidInput(e.to_string()))?;
            let now = Utc::now();
            for post in &new.posts {
                let post_id = queries::insert_post(
                    &tx,
                    user_id,
                    &post.title,
                    post.content.as_deref(),
                    now,
                )?;
                let row = queries::post_by_id(&tx, post_id)?
                    .ok_or_else(|| DbError::post_not_found(post_id))?;
                self.authorize(owner, Action::Create, Resource::from(&row))?;
            }

            tx.commit()?;
            debug!(
                "User {} created user {} with {} post(s)",
                self.identity,
                user.id,
                new.posts.len()
            );
            Ok(user)
        })
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        let users = self.db.with_conn(|conn| queries::all_users(conn))?;
        Ok(users.into_iter().filter(|u| self.can_read(u.into())).collect())
    }

    // -- Posts --

    /// Create a post authored by the caller.
    pub fn create_post(&self, new: &NewPost) -> Result<PostRow> {
        self.db.with_conn(|conn| {
            let tx = conn.transaction()?;
            let author_id = self.identity.id();

            if queries::user_by_id(&tx, author_id)?.is_none() {
                return Err(DbError::user_not_found(author_id));
            }

            let post_id = queries::insert_post(
                &tx,
                author_id,
                &new.title,
                new.content.as_deref(),
                Utc::now(),
            )?;
            let post = queries::post_by_id(&tx, post_id)?
                .ok_or_else(|| DbError::post_not_found(post_id))?;
            self.authorize(self.identity, Action::Create, Resource::from(&post))?;

            tx.commit()?;
            debug!("User {} created post {}", self.identity, post.id);
            Ok(post)
        })
    }

    pub fn get_post(&self, id: i64) -> Result<PostRow> {
        self.db.with_conn(|conn| {
            let post = existing_post(conn, id)?;
            self.authorize(self.identity, Action::Read, Resource::from(&post))?;
            Ok(post)
        })
    }

    /// Every post the caller may read, with its author.
    pub fn list_posts(&self) -> Result<Vec<(PostRow, UserRow)>> {
        let rows = self.db.with_conn(|conn| queries::all_posts_with_authors(conn))?;
        Ok(self.readable(rows).collect())
    }

    /// Unpublished posts of `user_id` that the caller may read.
    pub fn drafts(&self, user_id: i64) -> Result<Vec<PostRow>> {
        self.db.with_conn(|conn| {
            let user =
                queries::user_by_id(conn, user_id)?.ok_or_else(|| DbError::user_not_found(user_id))?;
            self.authorize(self.identity, Action::Read, Resource::from(&user))?;

            let drafts = queries::drafts_by_author(conn, user_id)?;
            Ok(drafts
                .into_iter()
                .filter(|p| self.can_read(p.into()))
                .collect())
        })
    }

    pub fn increment_views(&self, id: i64) -> Result<PostRow> {
        self.update_post(id, "increment views", queries::increment_view_count)
    }

    pub fn toggle_published(&self, id: i64) -> Result<PostRow> {
        self.update_post(id, "toggle publish", queries::toggle_published)
    }

    /// Delete a post and return it as it was.
    pub fn delete_post(&self, id: i64) -> Result<PostRow> {
        self.db.with_conn(|conn| {
            let tx = conn.transaction()?;
            let post = existing_post(&tx, id)?;
            self.authorize(self.identity, Action::Delete, Resource::from(&post))?;

            queries::delete_post(&tx, id)?;
            tx.commit()?;
            debug!("User {} deleted post {}", self.identity, id);
            Ok(post)
        })
    }

    /// Published posts with their authors, filtered by `filter.search`,
    /// ordered by last update and then paginated.
    ///
    /// Pagination counts only posts the caller may read.
    pub fn feed(&self, filter: &FeedFilter) -> Result<Vec<(PostRow, UserRow)>> {
        let rows = self.db.with_conn(|conn| {
            queries::published_posts_with_authors(conn, filter.search.as_deref(), filter.order)
        })?;

        Ok(self
            .readable(rows)
            .skip(filter.skip.unwrap_or(0))
            .take(filter.take.unwrap_or(usize::MAX))
            .collect())
    }

    // -- Helpers --

    /// Lookup, check and write run in one transaction under the connection
    /// lock, and the write itself is a single atomic UPDATE.
    fn update_post(
        &self,
        id: i64,
        what: &str,
        write: fn(&Connection, i64, DateTime<Utc>) -> Result<usize>,
    ) -> Result<PostRow> {
        self.db.with_conn(|conn| {
            let tx = conn.transaction()?;
            let before = existing_post(&tx, id)?;
            self.authorize(self.identity, Action::Update, Resource::from(&before))?;

            if write(&tx, id, Utc::now())? == 0 {
                return Err(DbError::post_not_found(id));
            }
            let after = existing_post(&tx, id)?;
            tx.commit()?;

            debug!("User {} ran {} on post {}", self.identity, what, id);
            Ok(after)
        })
    }

    fn authorize(&self, identity: Identity, action: Action, resource: Resource) -> Result<()> {
        if self.db.policy().allows(identity, action, &resource) {
            return Ok(());
        }

        warn!(
            "Policy denied {} on {} {:?} for user {}",
            action,
            resource.entity(),
            resource,
            identity
        );
        Err(DbError::Denied {
            action,
            entity: resource.entity(),
        })
    }

    fn can_read(&self, resource: Resource) -> bool {
        self.db.policy().allows(self.identity, Action::Read, &resource)
    }

    fn readable(
        &self,
        rows: Vec<(PostRow, UserRow)>,
    ) -> impl Iterator<Item = (PostRow, UserRow)> + '_ {
        rows.into_iter()
            .filter(|(post, author)| self.can_read(post.into()) && self.can_read(author.into()))
    }
}

fn existing_post(conn: &Connection, id: i64) -> Result<PostRow> {
    queries::post_by_id(conn, id)?.ok_or_else(|| DbError::post_not_found(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Policy;
    use scribe_types::api::SortOrder;
    use std::thread::sleep;
    use std::time::Duration;

    struct DenyAll;

    impl Policy for DenyAll {
        fn allows(&self, _: Identity, _: Action, _: &Resource) -> bool {
            false
        }
    }

    fn who(id: i64) -> Identity {
        Identity::new(id).unwrap()
    }

    fn signup(db: &Database, email: &str) -> UserRow {
        db.scoped(who(1))
            .create_user(&NewUser {
                name: Some(email.split('@').next().unwrap_or_default().to_string()),
                email: email.to_string(),
                posts: vec![],
            })
            .unwrap()
    }

    fn post(db: &Database, author: &UserRow, title: &str, content: &str) -> PostRow {
        db.scoped(who(author.id))
            .create_post(&NewPost {
                title: title.to_string(),
                content: Some(content.to_string()),
            })
            .unwrap()
    }

    #[test]
    fn create_then_get_returns_same_post() {
        let db = Database::open_in_memory().unwrap();
        let alice = signup(&db, "a@x.com");

        let created = post(&db, &alice, "T", "C");
        assert!(!created.published);
        assert_eq!(created.view_count, 0);

        let loaded = db.scoped(who(alice.id)).get_post(created.id).unwrap();
        assert_eq!(loaded.title, "T");
        assert_eq!(loaded.content.as_deref(), Some("C"));
        assert_eq!(loaded.author_id, alice.id);
    }

    #[test]
    fn signup_creates_nested_posts() {
        let db = Database::open_in_memory().unwrap();
        let user = db
            .scoped(who(99))
            .create_user(&NewUser {
                name: None,
                email: "new@x.com".into(),
                posts: vec![
                    NewPost {
                        title: "one".into(),
                        content: None,
                    },
                    NewPost {
                        title: "two".into(),
                        content: Some("body".into()),
                    },
                ],
            })
            .unwrap();

        let drafts = db.scoped(who(user.id)).drafts(user.id).unwrap();
        assert_eq!(drafts.len(), 2);
        assert!(drafts.iter().all(|p| p.author_id == user.id));
    }

    #[test]
    fn duplicate_email_is_a_conflict() {
        let db = Database::open_in_memory().unwrap();
        signup(&db, "a@x.com");

        let err = db
            .scoped(who(1))
            .create_user(&NewUser {
                name: None,
                email: "a@x.com".into(),
                posts: vec![],
            })
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
    }

    #[test]
    fn create_post_requires_an_existing_author() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .scoped(who(7))
            .create_post(&NewPost {
                title: "T".into(),
                content: None,
            })
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { id: 7, .. }));
    }

    #[test]
    fn increment_twice_adds_two() {
        let db = Database::open_in_memory().unwrap();
        let alice = signup(&db, "a@x.com");
        let p = post(&db, &alice, "T", "C");
        let scoped = db.scoped(who(alice.id));

        scoped.increment_views(p.id).unwrap();
        let after = scoped.increment_views(p.id).unwrap();
        assert_eq!(after.view_count, p.view_count + 2);
    }

    #[test]
    fn toggle_twice_restores_state() {
        let db = Database::open_in_memory().unwrap();
        let alice = signup(&db, "a@x.com");
        let p = post(&db, &alice, "T", "C");
        let scoped = db.scoped(who(alice.id));

        assert!(scoped.toggle_published(p.id).unwrap().published);
        assert!(!scoped.toggle_published(p.id).unwrap().published);
    }

    #[test]
    fn updates_on_missing_posts_are_not_found() {
        let db = Database::open_in_memory().unwrap();
        let scoped = db.scoped(who(1));

        assert!(matches!(scoped.increment_views(404), Err(DbError::NotFound { id: 404, .. })));
        assert!(matches!(scoped.toggle_published(404), Err(DbError::NotFound { .. })));
        assert!(matches!(scoped.delete_post(404), Err(DbError::NotFound { .. })));
    }

    #[test]
    fn delete_then_get_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let alice = signup(&db, "a@x.com");
        let p = post(&db, &alice, "T", "C");
        let scoped = db.scoped(who(alice.id));

        let deleted = scoped.delete_post(p.id).unwrap();
        assert_eq!(deleted.id, p.id);
        assert!(matches!(scoped.get_post(p.id), Err(DbError::NotFound { .. })));
    }

    #[test]
    fn strangers_cannot_touch_drafts() {
        let db = Database::open_in_memory().unwrap();
        let alice = signup(&db, "a@x.com");
        let bob = signup(&db, "b@x.com");
        let p = post(&db, &alice, "T", "C");
        let as_bob = db.scoped(who(bob.id));

        assert!(matches!(as_bob.get_post(p.id), Err(DbError::Denied { action: Action::Read, .. })));
        assert!(matches!(as_bob.increment_views(p.id), Err(DbError::Denied { .. })));
        assert!(matches!(as_bob.toggle_published(p.id), Err(DbError::Denied { .. })));
        assert!(matches!(as_bob.delete_post(p.id), Err(DbError::Denied { .. })));
        assert!(as_bob.list_posts().unwrap().is_empty());
        assert!(as_bob.drafts(alice.id).unwrap().is_empty());

        // Nothing changed behind the denials.
        let unchanged = db.scoped(who(alice.id)).get_post(p.id).unwrap();
        assert_eq!(unchanged, p);
    }

    #[test]
    fn published_posts_are_visible_to_everyone() {
        let db = Database::open_in_memory().unwrap();
        let alice = signup(&db, "a@x.com");
        let bob = signup(&db, "b@x.com");
        let p = post(&db, &alice, "T", "C");
        db.scoped(who(alice.id)).toggle_published(p.id).unwrap();

        let as_bob = db.scoped(who(bob.id));
        assert!(as_bob.get_post(p.id).unwrap().published);
        let listed = as_bob.list_posts().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].1, alice);
    }

    #[test]
    fn feed_filters_by_search_and_published() {
        let db = Database::open_in_memory().unwrap();
        let alice = signup(&db, "a@x.com");
        let scoped = db.scoped(who(alice.id));

        let rust = post(&db, &alice, "Rust tips", "ownership");
        let go = post(&db, &alice, "Go tips", "goroutines and Rust");
        let other = post(&db, &alice, "Cooking", "pasta");
        post(&db, &alice, "Rust draft", "unpublished");
        for p in [&rust, &go, &other] {
            scoped.toggle_published(p.id).unwrap();
        }

        let found = scoped
            .feed(&FeedFilter {
                search: Some("Rust".into()),
                ..FeedFilter::default()
            })
            .unwrap();
        let mut ids: Vec<i64> = found.iter().map(|(p, _)| p.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![rust.id, go.id]);
        assert!(found.iter().all(|(p, _)| p.published));
    }

    #[test]
    fn feed_orders_by_update_time_and_paginates() {
        let db = Database::open_in_memory().unwrap();
        let alice = signup(&db, "a@x.com");
        let scoped = db.scoped(who(alice.id));

        let mut ids = Vec::new();
        for title in ["first", "second", "third"] {
            let p = post(&db, &alice, title, "");
            scoped.toggle_published(p.id).unwrap();
            ids.push(p.id);
            sleep(Duration::from_millis(5));
        }

        let asc = scoped
            .feed(&FeedFilter {
                order: SortOrder::Asc,
                ..FeedFilter::default()
            })
            .unwrap();
        assert_eq!(asc.iter().map(|(p, _)| p.id).collect::<Vec<_>>(), ids);

        let page = scoped
            .feed(&FeedFilter {
                skip: Some(1),
                take: Some(1),
                order: SortOrder::Desc,
                ..FeedFilter::default()
            })
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].0.id, ids[1]);
    }

    #[test]
    fn deny_all_policy_rolls_back_signup() {
        let db = Database::open_in_memory().unwrap().with_policy(DenyAll);

        let err = db
            .scoped(who(1))
            .create_user(&NewUser {
                name: None,
                email: "a@x.com".into(),
                posts: vec![],
            })
            .unwrap_err();
        assert!(matches!(err, DbError::Denied { action: Action::Create, .. }));

        // The insert was rolled back, so the email is still free.
        let db = db.with_policy(crate::OwnershipPolicy);
        assert!(db.scoped(who(1)).list_users().unwrap().is_empty());
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let db = Database::open_in_memory().unwrap();
        let alice = signup(&db, "a@x.com");
        let target = post(&db, &alice, "T", "C");

        const THREADS: i64 = 8;
        const PER_THREAD: i64 = 25;
        std::thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    let scoped = db.scoped(who(alice.id));
                    for _ in 0..PER_THREAD {
                        scoped.increment_views(target.id).unwrap();
                    }
                });
            }
        });

        let after = db.scoped(who(alice.id)).get_post(target.id).unwrap();
        assert_eq!(after.view_count, THREADS * PER_THREAD);
    }

    #[test]
    fn updates_advance_updated_at() {
        let db = Database::open_in_memory().unwrap();
        let alice = signup(&db, "a@x.com");
        let scoped = db.scoped(who(alice.id));
        let created = post(&db, &alice, "T", "C");

        sleep(Duration::from_millis(5));
        let viewed = scoped.increment_views(created.id).unwrap();
        assert!(viewed.updated_at > created.updated_at);
        assert_eq!(viewed.created_at, created.created_at);

        sleep(Duration::from_millis(5));
        let toggled = scoped.toggle_published(created.id).unwrap();
        assert!(toggled.updated_at > viewed.updated_at);
        assert_eq!(toggled.created_at, created.created_at);
    }

    #[test]
    fn feed_follows_last_update_not_creation() {
        let db = Database::open_in_memory().unwrap();
        let alice = signup(&db, "a@x.com");
        let scoped = db.scoped(who(alice.id));

        let older = post(&db, &alice, "older", "");
        let newer = post(&db, &alice, "newer", "");
        scoped.toggle_published(older.id).unwrap();
        sleep(Duration::from_millis(5));
        scoped.toggle_published(newer.id).unwrap();
        sleep(Duration::from_millis(5));
        scoped.increment_views(older.id).unwrap();

        let ids = |order: SortOrder| {
            scoped
                .feed(&FeedFilter {
                    order,
                    ..FeedFilter::default()
                })
                .unwrap()
                .iter()
                .map(|(p, _)| p.id)
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(SortOrder::Asc), vec![newer.id, older.id]);
        assert_eq!(ids(SortOrder::Desc), vec![older.id, newer.id]);
    }
}
