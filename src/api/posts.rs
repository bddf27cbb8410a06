use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{auth::Identity, error::Result, AppState};

#[derive(Debug, Deserialize)]
pub struct CreateThreadRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateReplyRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct EditPostRequest {
    pub content: String,
}

/// Create a new thread. The returned pid is also the thread id.
pub async fn create_thread(
    State(state): State<AppState>,
    caller: Identity,
    Json(req): Json<CreateThreadRequest>,
) -> Result<Json<Value>> {
    let pid = state.engine.create_thread(caller, &req.content).await?;
    Ok(Json(json!({ "pid": pid })))
}

/// Reply to an existing post.
pub async fn create_reply(
    State(state): State<AppState>,
    caller: Identity,
    Path(pid): Path<i64>,
    Json(req): Json<CreateReplyRequest>,
) -> Result<Json<Value>> {
    let reply_pid = state.engine.create_reply(caller, pid, &req.content).await?;
    Ok(Json(json!({ "pid": reply_pid })))
}

/// Edit a post's content.
pub async fn edit_post(
    State(state): State<AppState>,
    caller: Identity,
    Path(pid): Path<i64>,
    Json(req): Json<EditPostRequest>,
) -> Result<Json<Value>> {
    state.engine.edit_post(caller, pid, &req.content).await?;
    Ok(Json(json!({ "status": "ok" })))
}

/// Soft-delete a post (or, for a thread root, the whole thread).
pub async fn delete_post(
    State(state): State<AppState>,
    caller: Identity,
    Path(pid): Path<i64>,
) -> Result<Json<Value>> {
    state.engine.delete_post(caller, pid).await?;
    Ok(Json(json!({ "status": "ok" })))
}
