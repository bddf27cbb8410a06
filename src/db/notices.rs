use sqlx::PgConnection;

use crate::error::Result;
use crate::models::{Notice, NoticeView};

impl super::Database {
    /// Upsert the notification cursor for a reply's quoted target: the
    /// cursor jumps to the new post and turns unread. Race-safe under
    /// concurrent first-replies via ON CONFLICT. Runs on the pool after the
    /// primary mutation commits; the caller swallows and logs failures.
    pub async fn upsert_notice(&self, tid: i64, uid: i64, pid: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notices (tid, uid, last_pid, read_pid, unread)
            VALUES ($1, $2, $3, 0, TRUE)
            ON CONFLICT (tid, uid)
            DO UPDATE SET last_pid = EXCLUDED.last_pid, unread = TRUE
            "#,
        )
        .bind(tid)
        .bind(uid)
        .bind(pid)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// A user's notification cursors joined with thread subjects.
    pub async fn list_notices(&self, uid: i64) -> Result<Vec<NoticeView>> {
        let rows = sqlx::query_as::<_, NoticeView>(
            r#"
            SELECT n.tid, n.uid, n.last_pid, n.read_pid, n.unread, t.subject
            FROM notices n
            JOIN threads t ON t.tid = n.tid
            WHERE n.uid = $1
            ORDER BY n.last_pid DESC
            "#,
        )
        .bind(uid)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Mark a thread's notifications as read for a user, returning the
    /// refreshed cursor (None when the user has no cursor on the thread).
    pub async fn mark_notice_read(&self, tid: i64, uid: i64) -> Result<Option<Notice>> {
        let row = sqlx::query_as::<_, Notice>(
            r#"
            UPDATE notices
            SET read_pid = last_pid, unread = FALSE
            WHERE tid = $1 AND uid = $2
            RETURNING tid, uid, last_pid, read_pid, unread
            "#,
        )
        .bind(tid)
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

// Transaction-scoped cursor maintenance.

/// Advance the replier's own cursor so their reply never shows as unread to
/// themselves: last_pid always moves; read_pid moves with it only if the
/// user was already caught up.
pub(crate) async fn advance_own_cursor(
    conn: &mut PgConnection,
    tid: i64,
    uid: i64,
    new_pid: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE notices
        SET last_pid = $3,
            read_pid = CASE WHEN last_pid = read_pid THEN $3 ELSE read_pid END
        WHERE tid = $1 AND uid = $2
        "#,
    )
    .bind(tid)
    .bind(uid)
    .bind(new_pid)
    .execute(conn)
    .await?;
    Ok(())
}

/// Repoint a cursor away from a deleted post onto the nearest surviving
/// relevant post, recomputing unread against read_pid. Guarded on
/// `last_pid = deleted_pid` so a cursor already pointing elsewhere is left
/// alone.
pub(crate) async fn repoint_cursor(
    conn: &mut PgConnection,
    tid: i64,
    uid: i64,
    deleted_pid: i64,
    new_pid: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE notices
        SET last_pid = $4, unread = (read_pid < $4)
        WHERE tid = $1 AND uid = $2 AND last_pid = $3
        "#,
    )
    .bind(tid)
    .bind(uid)
    .bind(deleted_pid)
    .bind(new_pid)
    .execute(conn)
    .await?;
    Ok(())
}

/// Drop a cursor entirely; no relevant post remains for this pair.
pub(crate) async fn delete_cursor(conn: &mut PgConnection, tid: i64, uid: i64) -> Result<()> {
    sqlx::query("DELETE FROM notices WHERE tid = $1 AND uid = $2")
        .bind(tid)
        .bind(uid)
        .execute(conn)
        .await?;
    Ok(())
}

/// Drop every cursor of a deleted thread, returning the affected users so
/// their presence badges can be refreshed.
pub(crate) async fn delete_thread_cursors(
    conn: &mut PgConnection,
    tid: i64,
) -> Result<Vec<i64>> {
    let rows: Vec<(i64,)> = sqlx::query_as("DELETE FROM notices WHERE tid = $1 RETURNING uid")
        .bind(tid)
        .fetch_all(conn)
        .await?;
    Ok(rows.into_iter().map(|(uid,)| uid).collect())
}
