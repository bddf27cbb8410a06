use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub forum: ForumConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum idle connections in pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Connection acquire timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Idle connection timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForumConfig {
    /// Seconds a user must wait between create/reply operations
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: i64,
    /// A thread with no activity for this long rejects new replies
    #[serde(default = "default_stale_window_secs")]
    pub stale_window_secs: i64,
    /// Non-moderators may edit their own posts for this long
    #[serde(default = "default_edit_window_secs")]
    pub edit_window_secs: i64,
    /// Maximum characters in a derived thread subject
    #[serde(default = "default_subject_max_chars")]
    pub subject_max_chars: usize,
    /// Posts per thread page
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Allowed CORS origins (comma-separated, or "*" for any)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
    /// Redis URL for the cooldown limiter and pagination counters (optional)
    /// If not set, falls back to in-memory backends
    pub redis_url: Option<String>,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_max_connections() -> u32 { 100 }
fn default_min_connections() -> u32 { 10 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_cooldown_secs() -> i64 { 60 }
fn default_stale_window_secs() -> i64 { 604_800 }
fn default_edit_window_secs() -> i64 { 604_800 }
fn default_subject_max_chars() -> usize { 140 }
fn default_page_size() -> i64 { 20 }
fn default_cors_origins() -> String { "*".to_string() }

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            server: ServerConfig {
                host: std::env::var("HOST").unwrap_or_else(|_| default_host()),
                port: std::env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_port),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .context("DATABASE_URL must be set")?,
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_max_connections),
                min_connections: std::env::var("DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_min_connections),
                connect_timeout_secs: std::env::var("DATABASE_CONNECT_TIMEOUT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_connect_timeout),
                idle_timeout_secs: std::env::var("DATABASE_IDLE_TIMEOUT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_idle_timeout),
            },
            forum: ForumConfig {
                cooldown_secs: std::env::var("COOLDOWN_SECS")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_cooldown_secs),
                stale_window_secs: std::env::var("STALE_WINDOW_SECS")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_stale_window_secs),
                edit_window_secs: std::env::var("EDIT_WINDOW_SECS")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_edit_window_secs),
                subject_max_chars: std::env::var("SUBJECT_MAX_CHARS")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_subject_max_chars),
                page_size: std::env::var("PAGE_SIZE")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_page_size),
            },
            security: SecurityConfig {
                cors_origins: std::env::var("CORS_ORIGINS")
                    .unwrap_or_else(|_| default_cors_origins()),
                redis_url: std::env::var("REDIS_URL").ok(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_windows() {
        assert_eq!(default_cooldown_secs(), 60);
        assert_eq!(default_stale_window_secs(), 604_800);
        assert_eq!(default_edit_window_secs(), 604_800);
        assert_eq!(default_subject_max_chars(), 140);
    }
}
