//! The consistency engine: the four mutating operations, each run as one
//! mandatory atomic phase (post mutation, thread rollup, user stats, cursor
//! maintenance) inside a single transaction, followed by an advisory phase
//! (counters, target-user notification upsert, presence signals) that runs
//! before the operation returns but cannot roll the mandatory phase back.

use anyhow::anyhow;
use sqlx::PgConnection;

use crate::{
    auth::Identity,
    config::ForumConfig,
    content,
    cooldown::CooldownLimiter,
    counter::CounterService,
    db::{self, Database},
    error::{AppError, Result},
    models::epoch_now,
    presence::PresenceSignal,
};

#[derive(Clone)]
pub struct ConsistencyEngine {
    db: Database,
    cooldown: CooldownLimiter,
    counters: CounterService,
    presence: PresenceSignal,
    limits: ForumConfig,
}

impl ConsistencyEngine {
    pub fn new(
        db: Database,
        cooldown: CooldownLimiter,
        counters: CounterService,
        presence: PresenceSignal,
        limits: ForumConfig,
    ) -> Self {
        Self {
            db,
            cooldown,
            counters,
            presence,
            limits,
        }
    }

    /// Create a new thread from its root post. Returns the root pid, which
    /// doubles as the thread id.
    pub async fn create_thread(&self, caller: Identity, raw_content: &str) -> Result<i64> {
        let now = epoch_now();
        if !self.cooldown.check(caller.uid, now).await {
            return Err(AppError::RateLimited);
        }

        let body = content::sanitize(raw_content);
        if body.is_empty() {
            return Err(AppError::InvalidContent("Empty content".to_string()));
        }
        let subject = content::derive_subject(&body, self.limits.subject_max_chars);

        let mut tx = self.db.pool().begin().await?;
        let pid = db::insert_root_post(&mut *tx, caller.uid, now, &body).await?;
        db::insert_thread(&mut *tx, pid, caller.uid, now, &subject).await?;
        db::apply_thread_create_stats(&mut *tx, caller.uid).await?;
        tx.commit().await?;

        self.counters.add(0, 0).await;
        self.counters.add(caller.uid, 0).await;
        self.cooldown.touch(caller.uid, now).await;
        self.presence.notify(caller.uid, Some(10));

        tracing::debug!(uid = caller.uid, tid = pid, "thread created");
        Ok(pid)
    }

    /// Reply to the post `quote_pid`. Returns the new reply's pid.
    pub async fn create_reply(
        &self,
        caller: Identity,
        quote_pid: i64,
        raw_content: &str,
    ) -> Result<i64> {
        let now = epoch_now();
        if !self.cooldown.check(caller.uid, now).await {
            return Err(AppError::RateLimited);
        }

        // A soft-deleted quote target reads as absent and rejects the reply
        let quote = match self.db.get_visible_post(quote_pid).await {
            Ok(post) => post,
            Err(AppError::NotFound(_)) => {
                return Err(AppError::Forbidden("Quoted post is not visible".to_string()))
            }
            Err(e) => return Err(e),
        };

        let body = content::sanitize(raw_content);
        if body.is_empty() {
            return Err(AppError::InvalidContent("Empty content".to_string()));
        }

        let tid = quote.thread_id();

        let mut tx = self.db.pool().begin().await?;
        let bumped =
            db::bump_thread(&mut *tx, tid, caller.uid, now, self.limits.stale_window_secs).await?;
        if !bumped {
            // Thread missing, deleted, or past the activity window
            return Err(AppError::Forbidden("Thread no longer accepts replies".to_string()));
        }
        let pid =
            db::insert_reply(&mut *tx, tid, caller.uid, now, &body, quote.pid, quote.uid).await?;
        db::apply_reply_create_stats(&mut *tx, caller.uid).await?;
        db::advance_own_cursor(&mut *tx, tid, caller.uid, pid).await?;
        tx.commit().await?;

        self.counters.add(0, tid).await;
        self.counters.add(caller.uid, tid).await;

        if quote.uid != caller.uid {
            // Best-effort: a failed notification must not fail the reply
            if let Err(e) = self.db.upsert_notice(tid, quote.uid, pid).await {
                tracing::error!(tid, uid = quote.uid, "notice upsert failed: {}", e);
            }
            self.presence.notify(quote.uid, Some(1));
        }

        self.cooldown.touch(caller.uid, now).await;
        self.presence.notify(caller.uid, Some(10));

        tracing::debug!(uid = caller.uid, tid, pid, "reply created");
        Ok(pid)
    }

    /// Edit a post's content. Moderators may edit any visible post; authors
    /// only their own, inside the edit window. Editing a thread root also
    /// re-derives the thread subject. Counters, stats, and notifications
    /// are untouched.
    pub async fn edit_post(&self, caller: Identity, pid: i64, raw_content: &str) -> Result<()> {
        let body = content::sanitize(raw_content);
        if body.is_empty() {
            return Err(AppError::InvalidContent("Empty content".to_string()));
        }
        let now = epoch_now();

        let mut tx = self.db.pool().begin().await?;
        let post = db::edit_post_content(
            &mut *tx,
            pid,
            &body,
            caller,
            now,
            self.limits.edit_window_secs,
        )
        .await?
        .ok_or_else(|| AppError::Forbidden("Cannot edit this post".to_string()))?;

        if post.is_root() {
            let subject = content::derive_subject(&body, self.limits.subject_max_chars);
            db::update_thread_subject(&mut *tx, post.pid, &subject).await?;
        }
        tx.commit().await?;

        tracing::debug!(uid = caller.uid, pid, "post edited");
        Ok(())
    }

    /// Soft-delete a post. Replies roll the thread's counters and
    /// last-activity pointer back and repoint the affected notification
    /// cursors; deleting a thread root takes the whole thread and its
    /// notices with it.
    pub async fn delete_post(&self, caller: Identity, pid: i64) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;
        let post = db::mark_post_deleted(&mut *tx, pid, caller)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        if !post.is_root() {
            // Reply: repoint the thread rollup at the surviving last post
            let tid = post.tid;
            let last = db::latest_visible_post(&mut *tx, tid).await?.ok_or_else(|| {
                AppError::Internal(anyhow!("thread {} lost its root during reply delete", tid))
            })?;
            db::apply_reply_delete_rollup(&mut *tx, tid, &last).await?;
            db::apply_reply_delete_stats(&mut *tx, post.uid).await?;

            repoint_for_user(&mut *tx, tid, post.uid, pid).await?;
            let quoted = post.quote_uid;
            if quoted != 0 && quoted != post.uid {
                repoint_for_user(&mut *tx, tid, quoted, pid).await?;
            }
            tx.commit().await?;

            self.counters.sub(0, tid).await;
            self.counters.sub(post.uid, tid).await;
            self.presence.notify(post.uid, None);
            if quoted != 0 && quoted != post.uid {
                self.presence.notify(quoted, None);
            }

            tracing::debug!(uid = caller.uid, tid, pid, "reply soft-deleted");
        } else {
            // Thread root: the thread and every cursor on it disappear.
            // Orphaned replies keep their authors' stats (known asymmetry).
            let tid = post.pid;
            db::mark_thread_deleted(&mut *tx, tid).await?;
            db::apply_thread_delete_stats(&mut *tx, post.uid).await?;
            let affected = db::delete_thread_cursors(&mut *tx, tid).await?;
            tx.commit().await?;

            self.counters.sub(0, 0).await;
            self.counters.sub(post.uid, 0).await;
            for uid in affected {
                self.presence.notify(uid, None);
            }

            tracing::debug!(uid = caller.uid, tid, "thread soft-deleted");
        }

        Ok(())
    }
}

/// Roll a user's notification cursor back to the nearest surviving relevant
/// post, or drop the cursor when none remains. A cursor must never point at
/// a post that is no longer visible.
async fn repoint_for_user(
    conn: &mut PgConnection,
    tid: i64,
    uid: i64,
    deleted_pid: i64,
) -> Result<()> {
    match db::latest_relevant_post(conn, tid, uid, deleted_pid).await? {
        Some(prior) => db::repoint_cursor(conn, tid, uid, deleted_pid, prior.pid).await,
        None => db::delete_cursor(conn, tid, uid).await,
    }
}
