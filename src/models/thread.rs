use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A thread rollup row. `tid` equals the root post's pid. The denormalized
/// fields are maintained on write by the consistency engine and never
/// recomputed on read.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Thread {
    pub tid: i64,
    /// Author of the root post
    pub uid: i64,
    /// Derived from the root content, not free text
    pub subject: String,
    pub create_date: i64,
    /// Date of the most recent visible post (the root's own if no reply survives)
    pub last_date: i64,
    /// Author of the most recent visible post
    pub last_uid: i64,
    /// Count of visible posts, root included
    pub posts: i64,
    pub access: i16,
}
