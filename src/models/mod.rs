mod notice;
mod post;
mod thread;
mod user;

pub use notice::{Notice, NoticeView};
pub use post::{Post, ACCESS_DELETED, ACCESS_VISIBLE};
pub use thread::Thread;
pub use user::{User, GID_MODERATOR};

/// Current time as epoch seconds, the unit every date column uses.
pub fn epoch_now() -> i64 {
    chrono::Utc::now().timestamp()
}
