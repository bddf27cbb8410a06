mod notices;
mod posts;
mod threads;
mod users;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::AppState;

/// Build the API router
pub fn router() -> Router<AppState> {
    Router::new()
        // Thread routes
        .route("/threads", post(posts::create_thread))
        .route("/threads/{tid}", get(threads::get_thread))
        // Post routes
        .route("/posts/{pid}/replies", post(posts::create_reply))
        .route("/posts/{pid}", put(posts::edit_post))
        .route("/posts/{pid}", delete(posts::delete_post))
        // Notification cursor routes
        .route("/notices", get(notices::list_notices))
        .route("/notices/{tid}/read", post(notices::mark_read))
        // User routes
        .route("/users/{uid}", get(users::get_user))
}
