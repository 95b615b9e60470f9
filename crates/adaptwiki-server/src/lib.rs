#![forbid(unsafe_code)]
//! AdaptWiki HTTP service.
//!
//! One SQLite connection behind an async mutex, matching the single-writer
//! shape of the catalog; all durability and isolation is the database's.
//! Handlers stay thin over the service layer so the flows are testable
//! without a socket.

use adaptwiki_auth::{AuthError, SessionSigner};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use rusqlite::Connection;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

pub mod config;
mod handlers;
pub mod history;
pub mod notify;
pub mod services;

#[cfg(test)]
mod services_tests;

pub use config::ServerConfig;
pub use notify::{Mailer, RecordingMailer, TracingMailer};

pub const CRATE_NAME: &str = "adaptwiki-server";

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: Arc<ServerConfig>,
    pub signer: SessionSigner,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(
        conn: Connection,
        config: ServerConfig,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self, AuthError> {
        let signer = SessionSigner::new(config.session_secret.as_bytes(), config.session_ttl_secs)?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            config: Arc::new(config),
            signer,
            mailer,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let max_body = state.config.max_body_bytes;
    Router::new()
        .route("/healthz", get(handlers::healthz_handler))
        .route("/search", get(handlers::search_handler))
        .route("/auth/login", post(handlers::login_handler))
        .route("/admin/history", get(handlers::history_handler))
        .route("/admin/pages", post(handlers::create_page_handler))
        .route(
            "/admin/pages/:id",
            get(handlers::get_page_handler)
                .patch(handlers::update_page_handler)
                .delete(handlers::delete_page_handler),
        )
        .route(
            "/admin/pages/:id/:action",
            post(handlers::moderation_handler),
        )
        .route("/become-editor", post(handlers::become_editor_handler))
        .route("/feedback", post(handlers::feedback_handler))
        .layer(DefaultBodyLimit::max(max_body))
        .with_state(state)
}

pub(crate) fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
