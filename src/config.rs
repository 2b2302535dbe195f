//! Configuration module for the gateway planner.
//!
//! Loads configuration from environment variables with sensible defaults.

use chrono::Duration as ChronoDuration;
use std::env;

const MAX_SESSION_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP port for the web server (default: 8080)
    pub http_port: u16,
    /// Path to the SQLite database holding exported plans (default: "gateway-planner.db")
    pub db_path: String,
    /// Maximum number of planning sessions held in memory (default: 256)
    pub max_sessions: usize,
    /// Seconds a session may sit unused before it is evicted (default: 3600)
    pub session_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            db_path: "gateway-planner.db".to_string(),
            max_sessions: 256,
            session_ttl_secs: 3600,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `GATEWAY_PLANNER_HTTP_PORT`: HTTP port (default: 8080)
    /// - `GATEWAY_PLANNER_DB_PATH`: Database file path (default: "gateway-planner.db")
    /// - `GATEWAY_PLANNER_MAX_SESSIONS`: Session cap (default: 256)
    /// - `GATEWAY_PLANNER_SESSION_TTL_SECS`: Idle session timeout (default: 3600)
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(port) = lookup("GATEWAY_PLANNER_HTTP_PORT").and_then(|v| v.parse().ok()) {
            cfg.http_port = port;
        }

        if let Some(db_path) = lookup("GATEWAY_PLANNER_DB_PATH") {
            cfg.db_path = db_path;
        }

        if let Some(max) = lookup("GATEWAY_PLANNER_MAX_SESSIONS").and_then(|v| v.parse().ok()) {
            if max > 0 {
                cfg.max_sessions = max;
            }
        }

        if let Some(ttl) = lookup("GATEWAY_PLANNER_SESSION_TTL_SECS").and_then(|v| v.parse().ok()) {
            if ttl > 0 {
                cfg.session_ttl_secs = ttl;
            }
        }

        cfg
    }

    /// Idle session timeout as a chrono duration, capped at one year.
    pub fn session_ttl(&self) -> ChronoDuration {
        ChronoDuration::seconds(self.session_ttl_secs.min(MAX_SESSION_TTL_SECS) as i64)
    }
}
