//! Postgres-backed [`Store`].
//!
//! Queries are plain runtime `sqlx::query` calls against the tables in
//! `sql/schema.sql`. Likes live in `comment_likes` and are folded back into
//! each comment row with `array_agg`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    Connection, PgPool, Row,
    postgres::{PgPoolOptions, PgRow},
};
use std::time::Duration;
use tracing::{Instrument, info_span};
use uuid::Uuid;

use super::{Comment, NewComment, NewUser, Page, Store, StoreError, User, UserChanges};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, profile_picture, is_admin, created_at, updated_at";

// Expands to the comment projection so callers can `concat!` their own filters.
macro_rules! comment_select {
    () => {
        r"
    SELECT
        c.id,
        c.post_id,
        c.user_id,
        c.content,
        c.created_at,
        c.updated_at,
        COALESCE(
            array_agg(l.user_id ORDER BY l.liked_at) FILTER (WHERE l.user_id IS NOT NULL),
            '{}'::uuid[]
        ) AS likes
    FROM comments c
    LEFT JOIN comment_likes l ON l.comment_id = c.id
"
    };
}

const COMMENT_BY_ID: &str = concat!(comment_select!(), " WHERE c.id = $1 GROUP BY c.id");

const COMMENTS_BY_POST: &str = concat!(
    comment_select!(),
    " WHERE c.post_id = $1 GROUP BY c.id ORDER BY c.created_at DESC, c.id DESC"
);

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Open a pool against `dsn`.
    ///
    /// # Errors
    /// Returns the driver error if no connection can be established.
    pub async fn connect(dsn: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(max_connections)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_comment<'e, E>(executor: E, id: Uuid) -> Result<Option<Comment>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let row = sqlx::query(COMMENT_BY_ID)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        row.as_ref().map(comment_from_row).transpose()
    }
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        profile_picture: row.try_get("profile_picture")?,
        is_admin: row.try_get("is_admin")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn comment_from_row(row: &PgRow) -> Result<Comment, sqlx::Error> {
    Ok(Comment {
        id: row.try_get("id")?,
        post_id: row.try_get("post_id")?,
        user_id: row.try_get("user_id")?,
        content: row.try_get("content")?,
        likes: row.try_get("likes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().map(|code| code.into_owned()),
        _ => None,
    }
}

/// Unique violations (23505) become [`StoreError::Conflict`], foreign key
/// violations (23503) [`StoreError::MissingUser`].
fn map_write_error(err: sqlx::Error) -> StoreError {
    match sqlstate(&err).as_deref() {
        Some("23505") => StoreError::Conflict,
        Some("23503") => StoreError::MissingUser,
        _ => StoreError::Database(err),
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;
        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let query = format!(
            r"
            INSERT INTO users (id, username, email, password_hash, profile_picture)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "
        );
        let row = sqlx::query(&query)
            .bind(Uuid::now_v7())
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.profile_picture)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)?;
        Ok(user_from_row(&row)?)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)");
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn update_user(
        &self,
        id: Uuid,
        changes: UserChanges,
    ) -> Result<Option<User>, StoreError> {
        // Single statement: the row is replaced atomically, untouched columns keep their value.
        let query = format!(
            r"
            UPDATE users
            SET
                username = COALESCE($1, username),
                email = COALESCE($2, email),
                password_hash = COALESCE($3, password_hash),
                profile_picture = COALESCE($4, profile_picture),
                updated_at = NOW()
            WHERE id = $5
            RETURNING {USER_COLUMNS}
            "
        );
        let row = sqlx::query(&query)
            .bind(changes.username)
            .bind(changes.email)
            .bind(changes.password_hash)
            .bind(changes.profile_picture)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_users(&self, page: Page) -> Result<Vec<User>, StoreError> {
        let direction = page.sort.as_sql();
        let query = format!(
            r"
            SELECT {USER_COLUMNS}
            FROM users
            ORDER BY created_at {direction}, id {direction}
            OFFSET $1
            LIMIT $2
            "
        );
        let rows = sqlx::query(&query)
            .bind(to_i64(page.start_index))
            .bind(to_i64(page.limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(user_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn count_users(&self, since: Option<DateTime<Utc>>) -> Result<u64, StoreError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total FROM users WHERE $1::timestamptz IS NULL OR created_at >= $1",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(to_u64(row.try_get("total")?))
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment, StoreError> {
        let row = sqlx::query(
            r"
            INSERT INTO comments (id, post_id, user_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, post_id, user_id, content, '{}'::uuid[] AS likes, created_at, updated_at
            ",
        )
        .bind(Uuid::now_v7())
        .bind(comment.post_id)
        .bind(comment.user_id)
        .bind(&comment.content)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(comment_from_row(&row)?)
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, StoreError> {
        Ok(Self::fetch_comment(&self.pool, id).await?)
    }

    async fn post_comments(&self, post_id: Uuid) -> Result<Vec<Comment>, StoreError> {
        let rows = sqlx::query(COMMENTS_BY_POST)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(comment_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn toggle_comment_like(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Comment>, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Lock the comment row so concurrent toggles on it serialize.
        let exists = sqlx::query("SELECT 1 FROM comments WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let removed = sqlx::query("DELETE FROM comment_likes WHERE comment_id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        if removed.rows_affected() == 0 {
            sqlx::query("INSERT INTO comment_likes (comment_id, user_id) VALUES ($1, $2)")
                .bind(id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        let comment = Self::fetch_comment(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(comment)
    }

    async fn update_comment_content(
        &self,
        id: Uuid,
        content: String,
    ) -> Result<Option<Comment>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("UPDATE comments SET content = $1, updated_at = NOW() WHERE id = $2")
            .bind(&content)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        let comment = Self::fetch_comment(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(comment)
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_comments(&self, page: Page) -> Result<Vec<Comment>, StoreError> {
        let direction = page.sort.as_sql();
        let query = format!(
            r"
            {}
            GROUP BY c.id
            ORDER BY c.created_at {direction}, c.id {direction}
            OFFSET $1
            LIMIT $2
            ",
            comment_select!()
        );
        let rows = sqlx::query(&query)
            .bind(to_i64(page.start_index))
            .bind(to_i64(page.limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(comment_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn count_comments(&self, since: Option<DateTime<Utc>>) -> Result<u64, StoreError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total FROM comments WHERE $1::timestamptz IS NULL OR created_at >= $1",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(to_u64(row.try_get("total")?))
    }
}
