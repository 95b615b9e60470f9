#![forbid(unsafe_code)]

use adaptwiki_server::{build_router, AppState, ServerConfig, TracingMailer};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "adaptwiki-server", about = "AdaptWiki catalog service")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "ADAPTWIKI_BIND")]
    bind: Option<String>,
    /// SQLite database path; omitted runs in memory.
    #[arg(long, env = "ADAPTWIKI_DB")]
    db: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut config = ServerConfig::from_env();
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if args.db.is_some() {
        config.db_path = args.db;
    }

    if config.session_secret.len() < 16 {
        error!("ADAPTWIKI_SESSION_SECRET must be set to at least 16 bytes");
        std::process::exit(2);
    }

    let conn = match &config.db_path {
        Some(path) => adaptwiki_store::open(path),
        None => adaptwiki_store::open_in_memory(),
    };
    let conn = match conn {
        Ok(conn) => conn,
        Err(e) => {
            error!(error = %e, "failed to open database");
            std::process::exit(1);
        }
    };

    let bind = config.bind.clone();
    let state = match AppState::new(conn, config, Arc::new(TracingMailer)) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "failed to initialize server state");
            std::process::exit(1);
        }
    };
    let router = build_router(state);

    let listener = match TcpListener::bind(&bind).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, bind = %bind, "failed to bind");
            std::process::exit(1);
        }
    };
    info!(bind = %bind, "adaptwiki-server listening");
    if let Err(e) = axum::serve(listener, router).await {
        error!(error = %e, "server exited with error");
    }
}
