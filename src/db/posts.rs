use sqlx::PgConnection;

use crate::auth::Identity;
use crate::error::{AppError, Result};
use crate::models::{Post, Thread, ACCESS_DELETED, ACCESS_VISIBLE};

impl super::Database {
    /// Get a post by id, invisible rows treated as absent.
    pub async fn get_visible_post(&self, pid: i64) -> Result<Post> {
        let row = sqlx::query_as::<_, Post>(
            "SELECT * FROM posts WHERE pid = $1 AND access = $2",
        )
        .bind(pid)
        .bind(ACCESS_VISIBLE)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
        Ok(row)
    }

    /// Get a thread rollup by id, invisible rows treated as absent.
    pub async fn get_visible_thread(&self, tid: i64) -> Result<Thread> {
        let row = sqlx::query_as::<_, Thread>(
            "SELECT * FROM threads WHERE tid = $1 AND access = $2",
        )
        .bind(tid)
        .bind(ACCESS_VISIBLE)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Thread not found".to_string()))?;
        Ok(row)
    }

    /// One page of a thread's visible posts, root first, optionally filtered
    /// to a single author (`uid_filter = 0` disables the filter).
    pub async fn get_thread_page(
        &self,
        tid: i64,
        uid_filter: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, Post>(
            r#"
            SELECT * FROM posts
            WHERE access = $2
              AND ((tid = 0 AND pid = $1) OR tid = $1)
              AND ($3 = 0 OR uid = $3)
            ORDER BY pid ASC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(tid)
        .bind(ACCESS_VISIBLE)
        .bind(uid_filter)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

// Transaction-scoped write helpers composed by the consistency engine.

/// Insert a thread-root post (`tid = 0`) and return its pid.
pub(crate) async fn insert_root_post(
    conn: &mut PgConnection,
    uid: i64,
    now: i64,
    content: &str,
) -> Result<i64> {
    let (pid,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO posts (tid, uid, create_date, content, quote_pid, quote_uid, access)
        VALUES (0, $1, $2, $3, 0, 0, $4)
        RETURNING pid
        "#,
    )
    .bind(uid)
    .bind(now)
    .bind(content)
    .bind(ACCESS_VISIBLE)
    .fetch_one(conn)
    .await?;
    Ok(pid)
}

/// Insert the thread rollup row for a fresh root. `posts` starts at 1
/// (root included) and the last-activity pointer is the root itself.
pub(crate) async fn insert_thread(
    conn: &mut PgConnection,
    tid: i64,
    uid: i64,
    now: i64,
    subject: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO threads (tid, uid, subject, create_date, last_date, last_uid, posts, access)
        VALUES ($1, $2, $3, $4, $4, $2, 1, $5)
        "#,
    )
    .bind(tid)
    .bind(uid)
    .bind(subject)
    .bind(now)
    .bind(ACCESS_VISIBLE)
    .execute(conn)
    .await?;
    Ok(())
}

/// Conditionally bump a thread for a new reply: increment the rollup and
/// advance the last-activity pointer, but only while the thread is visible
/// and still inside the staleness window. The window check shares the
/// UPDATE with the increment so two concurrent replies cannot both pass it
/// against pre-increment state. Returns false when the thread is missing,
/// deleted, or cold.
pub(crate) async fn bump_thread(
    conn: &mut PgConnection,
    tid: i64,
    uid: i64,
    now: i64,
    stale_window: i64,
) -> Result<bool> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        UPDATE threads
        SET posts = posts + 1, last_uid = $2, last_date = $3
        WHERE tid = $1 AND access = $4 AND last_date + $5 > $3
        RETURNING tid
        "#,
    )
    .bind(tid)
    .bind(uid)
    .bind(now)
    .bind(ACCESS_VISIBLE)
    .bind(stale_window)
    .fetch_optional(conn)
    .await?;
    Ok(row.is_some())
}

/// Insert a reply post and return its pid.
pub(crate) async fn insert_reply(
    conn: &mut PgConnection,
    tid: i64,
    uid: i64,
    now: i64,
    content: &str,
    quote_pid: i64,
    quote_uid: i64,
) -> Result<i64> {
    let (pid,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO posts (tid, uid, create_date, content, quote_pid, quote_uid, access)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING pid
        "#,
    )
    .bind(tid)
    .bind(uid)
    .bind(now)
    .bind(content)
    .bind(quote_pid)
    .bind(quote_uid)
    .bind(ACCESS_VISIBLE)
    .fetch_one(conn)
    .await?;
    Ok(pid)
}

/// Soft-delete a post. Moderators may mark any visible post; regular users
/// only their own. The authorization predicate lives in the WHERE clause so
/// a rejected call touches nothing. Returns the marked row, or None when no
/// visible row matched the caller's rights.
pub(crate) async fn mark_post_deleted(
    conn: &mut PgConnection,
    pid: i64,
    caller: Identity,
) -> Result<Option<Post>> {
    let row = sqlx::query_as::<_, Post>(
        r#"
        UPDATE posts
        SET access = $4
        WHERE pid = $1 AND access = $5 AND ($2 OR uid = $3)
        RETURNING pid, tid, uid, create_date, content, quote_pid, quote_uid, access
        "#,
    )
    .bind(pid)
    .bind(caller.is_moderator())
    .bind(caller.uid)
    .bind(ACCESS_DELETED)
    .bind(ACCESS_VISIBLE)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

/// Soft-delete the thread rollup row itself (root-deletion branch).
pub(crate) async fn mark_thread_deleted(conn: &mut PgConnection, tid: i64) -> Result<()> {
    sqlx::query("UPDATE threads SET access = $2 WHERE tid = $1")
        .bind(tid)
        .bind(ACCESS_DELETED)
        .execute(conn)
        .await?;
    Ok(())
}

/// The highest-pid visible post of a thread, root included. After a reply
/// deletion the root always remains, so this only returns None when the
/// whole thread is gone.
pub(crate) async fn latest_visible_post(
    conn: &mut PgConnection,
    tid: i64,
) -> Result<Option<Post>> {
    let row = sqlx::query_as::<_, Post>(
        r#"
        SELECT * FROM posts
        WHERE access = $2
          AND ((tid = 0 AND pid = $1) OR tid = $1)
        ORDER BY pid DESC
        LIMIT 1
        "#,
    )
    .bind(tid)
    .bind(ACCESS_VISIBLE)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

/// The most recent visible post in a thread that is relevant to `uid`:
/// authored by them, quoting them, or the thread root (always relevant).
/// Non-root candidates must predate the deleted post.
pub(crate) async fn latest_relevant_post(
    conn: &mut PgConnection,
    tid: i64,
    uid: i64,
    before_pid: i64,
) -> Result<Option<Post>> {
    let row = sqlx::query_as::<_, Post>(
        r#"
        SELECT * FROM posts
        WHERE access = $4
          AND ((tid = 0 AND pid = $1) OR (tid = $1 AND pid < $3))
          AND (uid = $2 OR quote_uid = $2 OR tid = 0)
        ORDER BY pid DESC
        LIMIT 1
        "#,
    )
    .bind(tid)
    .bind(uid)
    .bind(before_pid)
    .bind(ACCESS_VISIBLE)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

/// Roll the thread's reply count down and repoint last-activity at the
/// surviving post (the root's own author/date when no reply remains).
pub(crate) async fn apply_reply_delete_rollup(
    conn: &mut PgConnection,
    tid: i64,
    last: &Post,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE threads
        SET posts = posts - 1, last_uid = $2, last_date = $3
        WHERE tid = $1
        "#,
    )
    .bind(tid)
    .bind(last.uid)
    .bind(last.create_date)
    .execute(conn)
    .await?;
    Ok(())
}

/// Rewrite a post's content. Moderators may edit any visible post; authors
/// only their own and only while the edit window is open (rejected at
/// exactly create_date + window). Returns the updated row, or None when no
/// visible row matched the caller's rights.
pub(crate) async fn edit_post_content(
    conn: &mut PgConnection,
    pid: i64,
    content: &str,
    caller: Identity,
    now: i64,
    edit_window: i64,
) -> Result<Option<Post>> {
    let row = sqlx::query_as::<_, Post>(
        r#"
        UPDATE posts
        SET content = $2
        WHERE pid = $1 AND access = $6
          AND ($3 OR (uid = $4 AND create_date + $7 > $5))
        RETURNING pid, tid, uid, create_date, content, quote_pid, quote_uid, access
        "#,
    )
    .bind(pid)
    .bind(content)
    .bind(caller.is_moderator())
    .bind(caller.uid)
    .bind(now)
    .bind(ACCESS_VISIBLE)
    .bind(edit_window)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

/// Recompute a thread's derived subject after its root was edited.
pub(crate) async fn update_thread_subject(
    conn: &mut PgConnection,
    tid: i64,
    subject: &str,
) -> Result<()> {
    sqlx::query("UPDATE threads SET subject = $2 WHERE tid = $1")
        .bind(tid)
        .bind(subject)
        .execute(conn)
        .await?;
    Ok(())
}
