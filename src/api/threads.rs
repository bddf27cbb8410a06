use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    models::{Post, Thread},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct ThreadQuery {
    #[serde(default = "default_page")]
    page: i64,
    /// Restrict the listing to one author's posts
    #[serde(default)]
    uid: i64,
}

fn default_page() -> i64 {
    1
}

#[derive(Debug, Serialize)]
pub struct ThreadResponse {
    pub thread: Thread,
    pub posts: Vec<Post>,
    pub page: i64,
    /// Advisory reply total from the pagination counters
    pub total_replies: i64,
}

/// Get a visible thread with one page of its visible posts, root first.
pub async fn get_thread(
    State(state): State<AppState>,
    Path(tid): Path<i64>,
    Query(query): Query<ThreadQuery>,
) -> Result<Json<ThreadResponse>> {
    let thread = state.db.get_visible_thread(tid).await?;

    let page = query.page.max(1);
    let page_size = state.config.forum.page_size;
    let posts = state
        .db
        .get_thread_page(tid, query.uid, page_size, (page - 1) * page_size)
        .await?;

    let total_replies = state.counters.get(query.uid, tid).await;

    Ok(Json(ThreadResponse {
        thread,
        posts,
        page,
        total_replies,
    }))
}
