//! Persistence boundary for users and comments.
//!
//! Handlers only talk to [`Store`]; the concrete backend is picked from the DSN
//! at startup (`postgres://` for [`PgStore`], `memory://` for [`MemoryStore`]).
//! Writes go through explicit change sets ([`UserChanges`], comment content) so
//! client payloads can never reach columns outside the allow-list, such as
//! `is_admin`.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

pub const MEMORY_DSN_SCHEME: &str = "memory:";

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique column (username or email) already holds the value.
    #[error("unique constraint violated")]
    Conflict,
    /// The referenced user no longer exists.
    #[error("referenced user does not exist")]
    MissingUser,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Full user record as persisted, password hash included.
///
/// Never serialize this type directly; handlers convert it to a sanitized view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub profile_picture: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub profile_picture: String,
}

/// Allow-listed user fields a client may change. `None` leaves the column as is.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub profile_picture: Option<String>,
}

impl UserChanges {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.profile_picture.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    /// Users who liked the comment, in the order they liked it.
    pub likes: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    #[must_use]
    pub fn number_of_likes(&self) -> usize {
        self.likes.len()
    }
}

#[derive(Clone, Debug)]
pub struct NewComment {
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    /// Only the literal `asc` selects ascending order.
    #[must_use]
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("asc") => Self::Ascending,
            _ => Self::Descending,
        }
    }

    pub(crate) const fn as_sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Offset/limit window over records ordered by creation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub start_index: u64,
    pub limit: u64,
    pub sort: SortDirection,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap round trip used by `/health`.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Case-insensitive lookup.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Apply `changes` atomically and return the updated record, `None` if the user is gone.
    async fn update_user(
        &self,
        id: Uuid,
        changes: UserChanges,
    ) -> Result<Option<User>, StoreError>;

    /// Returns `false` when no user had that id. Deleting a user drops their comments.
    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn list_users(&self, page: Page) -> Result<Vec<User>, StoreError>;

    /// Count users, optionally only those created at or after `since`.
    async fn count_users(&self, since: Option<DateTime<Utc>>) -> Result<u64, StoreError>;

    /// Fails with [`StoreError::MissingUser`] when the author has been deleted.
    async fn create_comment(&self, comment: NewComment) -> Result<Comment, StoreError>;

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, StoreError>;

    /// All comments on a post, newest first.
    async fn post_comments(&self, post_id: Uuid) -> Result<Vec<Comment>, StoreError>;

    /// Add `user_id` to the likers, or remove it if already present.
    async fn toggle_comment_like(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Comment>, StoreError>;

    async fn update_comment_content(
        &self,
        id: Uuid,
        content: String,
    ) -> Result<Option<Comment>, StoreError>;

    async fn delete_comment(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn list_comments(&self, page: Page) -> Result<Vec<Comment>, StoreError>;

    async fn count_comments(&self, since: Option<DateTime<Utc>>) -> Result<u64, StoreError>;
}

pub type DynStore = Arc<dyn Store>;

/// Open the store named by `dsn`.
///
/// # Errors
/// Returns an error if the Postgres pool cannot be established.
pub async fn connect(dsn: &str, max_connections: u32) -> Result<DynStore> {
    if dsn.starts_with(MEMORY_DSN_SCHEME) {
        info!("Using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let store = PgStore::connect(dsn, max_connections)
        .await
        .context("Failed to connect to database")?;
    Ok(Arc::new(store))
}
