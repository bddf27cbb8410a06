use axum::{
    extract::{Path, State},
    Json,
};

use crate::{error::Result, models::User, AppState};

/// Get a user's profile with lifetime aggregates.
pub async fn get_user(State(state): State<AppState>, Path(uid): Path<i64>) -> Result<Json<User>> {
    let user = state.db.get_user(uid).await?;
    Ok(Json(user))
}
