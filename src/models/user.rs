use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Moderator group id.
pub const GID_MODERATOR: i16 = 1;

/// A forum user with lifetime aggregates. The counters move in lockstep
/// with post/thread mutations and are not hard-clamped at zero.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub uid: i64,
    pub name: String,
    /// Role group: 1 = moderator, anything else = regular
    pub gid: i16,
    pub posts: i64,
    pub threads: i64,
    pub credits: i64,
    pub golds: i64,
}

impl User {
    pub fn is_moderator(&self) -> bool {
        self.gid == GID_MODERATOR
    }
}
