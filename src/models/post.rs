use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Access flag for a visible post or thread.
pub const ACCESS_VISIBLE: i16 = 0;
/// Access flag for a soft-deleted post or thread. Rows are never removed;
/// every read path filters on `access = 0` instead.
pub const ACCESS_DELETED: i16 = 3;

/// A forum post. A post with `tid = 0` is a thread root and the thread's id
/// equals the post's own `pid`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub pid: i64,
    /// Owning thread id, or 0 when this post is itself the thread root
    pub tid: i64,
    /// Author
    pub uid: i64,
    /// Epoch seconds
    pub create_date: i64,
    /// Sanitized HTML body
    pub content: String,
    /// The post this one replies to, or 0 for roots
    pub quote_pid: i64,
    /// Author of the quoted post, denormalized for notification lookups
    pub quote_uid: i64,
    pub access: i16,
}

impl Post {
    /// The id of the thread this post belongs to (self for roots).
    pub fn thread_id(&self) -> i64 {
        if self.tid == 0 {
            self.pid
        } else {
            self.tid
        }
    }

    /// Whether this post starts its thread.
    pub fn is_root(&self) -> bool {
        self.tid == 0
    }

    pub fn is_visible(&self) -> bool {
        self.access == ACCESS_VISIBLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(pid: i64, tid: i64, access: i16) -> Post {
        Post {
            pid,
            tid,
            uid: 7,
            create_date: 0,
            content: String::new(),
            quote_pid: 0,
            quote_uid: 0,
            access,
        }
    }

    #[test]
    fn test_root_thread_id_is_own_pid() {
        let root = post(42, 0, ACCESS_VISIBLE);
        assert!(root.is_root());
        assert_eq!(root.thread_id(), 42);
    }

    #[test]
    fn test_reply_thread_id_is_tid() {
        let reply = post(43, 42, ACCESS_VISIBLE);
        assert!(!reply.is_root());
        assert_eq!(reply.thread_id(), 42);
    }

    #[test]
    fn test_soft_deleted_is_not_visible() {
        assert!(post(1, 0, ACCESS_VISIBLE).is_visible());
        assert!(!post(1, 0, ACCESS_DELETED).is_visible());
    }
}
