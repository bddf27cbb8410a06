use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    auth::Identity,
    error::{AppError, Result},
    models::{Notice, NoticeView},
    AppState,
};

/// List the caller's notification cursors, newest first.
pub async fn list_notices(
    State(state): State<AppState>,
    caller: Identity,
) -> Result<Json<Vec<NoticeView>>> {
    let notices = state.db.list_notices(caller.uid).await?;
    Ok(Json(notices))
}

/// Mark a thread's notifications read for the caller, returning the
/// refreshed cursor.
pub async fn mark_read(
    State(state): State<AppState>,
    caller: Identity,
    Path(tid): Path<i64>,
) -> Result<Json<Notice>> {
    let notice = state
        .db
        .mark_notice_read(tid, caller.uid)
        .await?
        .ok_or_else(|| AppError::NotFound("No notifications for this thread".to_string()))?;
    state.presence.notify(caller.uid, None);
    Ok(Json(notice))
}
