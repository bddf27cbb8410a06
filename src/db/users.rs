use sqlx::PgConnection;

use crate::auth::Identity;
use crate::error::{AppError, Result};
use crate::models::User;

impl super::Database {
    /// Get a user with their lifetime aggregates.
    pub async fn get_user(&self, uid: i64) -> Result<User> {
        let row = sqlx::query_as::<_, User>("SELECT * FROM users WHERE uid = $1")
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        Ok(row)
    }

    /// Resolve a session token hash to a caller identity.
    pub async fn identity_by_token_hash(&self, token_hash: &str) -> Result<Identity> {
        let row: Option<(i64, i16)> = sqlx::query_as(
            r#"
            SELECT u.uid, u.gid
            FROM sessions s
            JOIN users u ON u.uid = s.uid
            WHERE s.token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        let (uid, gid) =
            row.ok_or_else(|| AppError::Unauthorized("Invalid session token".to_string()))?;
        Ok(Identity { uid, gid })
    }
}

// Lifetime-stat mutations. All of these run inside the operation's
// transaction and are expressed as relative increments against the stored
// value, never a read-then-write.

/// Thread creation: +1 thread, +1 post, +2 credits, +2 golds.
pub(crate) async fn apply_thread_create_stats(conn: &mut PgConnection, uid: i64) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET threads = threads + 1, posts = posts + 1,
            credits = credits + 2, golds = golds + 2
        WHERE uid = $1
        "#,
    )
    .bind(uid)
    .execute(conn)
    .await?;
    Ok(())
}

/// Reply creation: +1 post, +1 credit, +1 gold.
pub(crate) async fn apply_reply_create_stats(conn: &mut PgConnection, uid: i64) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET posts = posts + 1, credits = credits + 1, golds = golds + 1
        WHERE uid = $1
        "#,
    )
    .bind(uid)
    .execute(conn)
    .await?;
    Ok(())
}

/// Reply soft-delete: the inverse of reply creation.
pub(crate) async fn apply_reply_delete_stats(conn: &mut PgConnection, uid: i64) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET posts = posts - 1, credits = credits - 1, golds = golds - 1
        WHERE uid = $1
        "#,
    )
    .bind(uid)
    .execute(conn)
    .await?;
    Ok(())
}

/// Thread-root soft-delete: the inverse of thread creation. Orphaned reply
/// authors keep their stats (known asymmetry of the root-deletion branch).
pub(crate) async fn apply_thread_delete_stats(conn: &mut PgConnection, uid: i64) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET threads = threads - 1, posts = posts - 1,
            credits = credits - 2, golds = golds - 2
        WHERE uid = $1
        "#,
    )
    .bind(uid)
    .execute(conn)
    .await?;
    Ok(())
}
