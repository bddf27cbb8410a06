use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Per-(thread, user) notification cursor. One row per thread a user
/// participates in; created lazily on the first relevant reply and deleted
/// when no relevant post remains.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notice {
    pub tid: i64,
    pub uid: i64,
    /// Most recent visible post relevant to this user
    pub last_pid: i64,
    /// Last post the user has viewed
    pub read_pid: i64,
    pub unread: bool,
}

/// Notice joined with its thread's subject, for the notification listing.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct NoticeView {
    pub tid: i64,
    pub uid: i64,
    pub last_pid: i64,
    pub read_pid: i64,
    pub unread: bool,
    pub subject: String,
}
