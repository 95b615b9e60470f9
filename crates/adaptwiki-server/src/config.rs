use std::env;
use std::path::PathBuf;

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// `None` runs on an in-memory database (useful for local poking).
    pub db_path: Option<PathBuf>,
    pub session_secret: String,
    pub session_ttl_secs: i64,
    pub site_name: String,
    pub from_email: String,
    /// Inbox that receives editor applications and feedback.
    pub site_inbox: String,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            db_path: None,
            session_secret: String::new(),
            session_ttl_secs: adaptwiki_auth::DEFAULT_SESSION_TTL_SECS,
            site_name: "AdaptWiki".to_string(),
            from_email: "noreply@adaptwiki.example".to_string(),
            site_inbox: "editors@adaptwiki.example".to_string(),
            max_body_bytes: 256 * 1024,
        }
    }
}

pub(crate) fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

pub(crate) fn env_i64(name: &str, default: i64) -> i64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

impl ServerConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind: env_string("ADAPTWIKI_BIND", &defaults.bind),
            db_path: env::var("ADAPTWIKI_DB").ok().map(PathBuf::from),
            session_secret: env_string("ADAPTWIKI_SESSION_SECRET", ""),
            session_ttl_secs: env_i64("ADAPTWIKI_SESSION_TTL_SECS", defaults.session_ttl_secs),
            site_name: env_string("ADAPTWIKI_SITE_NAME", &defaults.site_name),
            from_email: env_string("ADAPTWIKI_FROM_EMAIL", &defaults.from_email),
            site_inbox: env_string("ADAPTWIKI_SITE_INBOX", &defaults.site_inbox),
            max_body_bytes: env_usize("ADAPTWIKI_MAX_BODY_BYTES", defaults.max_body_bytes),
        }
    }
}
