//! In-process [`Store`] kept behind a single `RwLock`.
//!
//! Selected with a `memory://` DSN. Every mutation happens under the write lock,
//! which gives the same per-record atomicity the Postgres store gets from single
//! statements and transactions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    Comment, NewComment, NewUser, Page, SortDirection, Store, StoreError, User, UserChanges,
};

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    comments: HashMap<Uuid, Comment>,
}

impl Inner {
    fn username_taken(&self, username: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|user| Some(user.id) != except && user.username == username)
    }

    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|user| Some(user.id) != except && user.email.eq_ignore_ascii_case(email))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully-formed user, bypassing the allow-list.
    ///
    /// Used to provision admins and to backdate records in fixtures.
    pub async fn seed_user(&self, user: User) {
        self.inner.write().await.users.insert(user.id, user);
    }

    /// Insert a fully-formed comment, bypassing validation.
    pub async fn seed_comment(&self, comment: Comment) {
        self.inner.write().await.comments.insert(comment.id, comment);
    }
}

/// Order by creation time, id as tie-breaker, then cut the requested window.
fn paginate<T, F>(mut items: Vec<T>, page: Page, key: F) -> Vec<T>
where
    F: Fn(&T) -> (DateTime<Utc>, Uuid),
{
    items.sort_by_key(&key);
    if page.sort == SortDirection::Descending {
        items.reverse();
    }
    let start = usize::try_from(page.start_index).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);
    items.into_iter().skip(start).take(limit).collect()
}

fn count_since<'a, I>(timestamps: I, since: Option<DateTime<Utc>>) -> u64
where
    I: Iterator<Item = &'a DateTime<Utc>>,
{
    let count = timestamps
        .filter(|created_at| since.map_or(true, |since| **created_at >= since))
        .count();
    u64::try_from(count).unwrap_or(u64::MAX)
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.username_taken(&user.username, None) || inner.email_taken(&user.email, None) {
            return Err(StoreError::Conflict);
        }
        let now = Utc::now();
        let record = User {
            id: Uuid::now_v7(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            profile_picture: user.profile_picture,
            is_admin: false,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update_user(
        &self,
        id: Uuid,
        changes: UserChanges,
    ) -> Result<Option<User>, StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&id) {
            return Ok(None);
        }
        if let Some(username) = &changes.username {
            if inner.username_taken(username, Some(id)) {
                return Err(StoreError::Conflict);
            }
        }
        if let Some(email) = &changes.email {
            if inner.email_taken(email, Some(id)) {
                return Err(StoreError::Conflict);
            }
        }

        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(password_hash) = changes.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(profile_picture) = changes.profile_picture {
            user.profile_picture = profile_picture;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let removed = inner.users.remove(&id).is_some();
        if removed {
            inner.comments.retain(|_, comment| comment.user_id != id);
        }
        Ok(removed)
    }

    async fn list_users(&self, page: Page) -> Result<Vec<User>, StoreError> {
        let users = self.inner.read().await.users.values().cloned().collect();
        Ok(paginate(users, page, |user: &User| (user.created_at, user.id)))
    }

    async fn count_users(&self, since: Option<DateTime<Utc>>) -> Result<u64, StoreError> {
        let inner = self.inner.read().await;
        Ok(count_since(
            inner.users.values().map(|user| &user.created_at),
            since,
        ))
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment, StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&comment.user_id) {
            return Err(StoreError::MissingUser);
        }
        let now = Utc::now();
        let record = Comment {
            id: Uuid::now_v7(),
            post_id: comment.post_id,
            user_id: comment.user_id,
            content: comment.content,
            likes: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        inner.comments.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, StoreError> {
        Ok(self.inner.read().await.comments.get(&id).cloned())
    }

    async fn post_comments(&self, post_id: Uuid) -> Result<Vec<Comment>, StoreError> {
        let mut comments: Vec<Comment> = self
            .inner
            .read()
            .await
            .comments
            .values()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(comments)
    }

    async fn toggle_comment_like(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Comment>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(comment) = inner.comments.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(index) = comment.likes.iter().position(|liker| *liker == user_id) {
            comment.likes.remove(index);
        } else {
            comment.likes.push(user_id);
        }
        Ok(Some(comment.clone()))
    }

    async fn update_comment_content(
        &self,
        id: Uuid,
        content: String,
    ) -> Result<Option<Comment>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(comment) = inner.comments.get_mut(&id) else {
            return Ok(None);
        };
        comment.content = content;
        comment.updated_at = Utc::now();
        Ok(Some(comment.clone()))
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.comments.remove(&id).is_some())
    }

    async fn list_comments(&self, page: Page) -> Result<Vec<Comment>, StoreError> {
        let comments = self.inner.read().await.comments.values().cloned().collect();
        Ok(paginate(comments, page, |comment: &Comment| {
            (comment.created_at, comment.id)
        }))
    }

    async fn count_comments(&self, since: Option<DateTime<Utc>>) -> Result<u64, StoreError> {
        let inner = self.inner.read().await;
        Ok(count_since(
            inner.comments.values().map(|comment| &comment.created_at),
            since,
        ))
    }
}
