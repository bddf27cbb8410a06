use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use sha2::{Digest, Sha256};

use crate::{db::Database, error::AppError, models::GID_MODERATOR, AppState};

/// Caller identity resolved from a session token. Gates every mutating
/// operation: absence of an identity is `unauthorized` before the store is
/// touched.
#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub uid: i64,
    pub gid: i16,
}

impl Identity {
    pub fn is_moderator(&self) -> bool {
        self.gid == GID_MODERATOR
    }
}

impl<S> FromRequestParts<S> for Identity
where
    Database: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Get the database from state
        let db = Database::from_ref(state);

        // Get Authorization header
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

        // Parse Bearer token
        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| {
                AppError::Unauthorized("Invalid Authorization header format".to_string())
            })?;

        // Validate token format (must start with prefix)
        if !token.starts_with("palaver_") {
            return Err(AppError::Unauthorized("Invalid session token format".to_string()));
        }

        // Hash the token for lookup
        let token_hash = hash_session_token(token);

        db.identity_by_token_hash(&token_hash).await
    }
}

// Implement FromRef so we can extract Database from AppState
impl FromRef<AppState> for Database {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

/// Hash a session token for storage/lookup
pub fn hash_session_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moderator_gid() {
        assert!(Identity { uid: 1, gid: 1 }.is_moderator());
        assert!(!Identity { uid: 1, gid: 0 }.is_moderator());
        assert!(!Identity { uid: 1, gid: 2 }.is_moderator());
    }

    #[test]
    fn test_token_hash_is_stable_hex() {
        let h1 = hash_session_token("palaver_abc");
        let h2 = hash_session_token("palaver_abc");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert!(h1.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
