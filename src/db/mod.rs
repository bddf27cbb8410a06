mod notices;
mod posts;
mod users;

pub(crate) use notices::*;
pub(crate) use posts::*;
pub(crate) use users::*;

use sqlx::PgPool;

/// Database connection wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
