use std::path::PathBuf;
use std::sync::Arc;

use blog::auth::Accounts;
use blog::config::{Cli, Command, Config, default_config_dir, default_config_path};
use blog::db::Database;
use blog::handler::AppState;
use blog::messages;
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const SESSION_SWEEP_INTERVAL_SECS: u64 = 300;

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    let _ = dotenvy::dotenv();

    // With --config, data (the database) lives next to the config file.
    // Otherwise both live in ~/.blog/.
    let (config_path, data_dir) = match args.config_path {
        Some(path) => {
            let path = PathBuf::from(path);
            let dir = path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."));
            (path, dir)
        }
        None => (default_config_path(), default_config_dir()),
    };

    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        eprintln!("failed to create data directory {:?}: {}", data_dir, e);
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    tracing::info!("blog.svc starting");

    let cfg = if config_path.exists() {
        Config::new(&config_path.to_string_lossy()).unwrap_or_else(|e| {
            tracing::error!(error = %e, path = ?config_path, "failed to load config file");
            std::process::exit(1);
        })
    } else {
        tracing::warn!(path = ?config_path, "config file not found, using defaults");
        Config::default()
    };

    let db = Arc::new(Database::new(&cfg.app, &data_dir).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup database");
        std::process::exit(1);
    }));
    if let Err(e) = db.sync().await {
        tracing::warn!(error = %e, "initial replica sync failed");
    }

    if args.command == Some(Command::InitDb) {
        if let Err(e) = db.reset().await {
            tracing::error!(error = %e, "failed to initialize database");
            std::process::exit(1);
        }
        println!("{}", messages::DB_INITIALIZED);
        return;
    }

    let cancellation_token = CancellationToken::new();

    let sweep_db = db.clone();
    let sweep_token = cancellation_token.clone();
    let sweeper = tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(SESSION_SWEEP_INTERVAL_SECS));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match Accounts::new(&sweep_db).purge_expired_sessions().await {
                        Ok(0) => {}
                        Ok(purged) => tracing::info!(purged, "expired sessions removed"),
                        Err(e) => tracing::warn!("failed to purge expired sessions: {}", e),
                    }
                }
                _ = sweep_token.cancelled() => {
                    tracing::info!("session sweeper shutting down");
                    break;
                }
            }
        }
    });

    let app = blog::app(AppState::new(db, cfg.app.session_ttl_hours));
    let address = format!("0.0.0.0:{}", cfg.app.get_port());

    let listener = tokio::net::TcpListener::bind(&address).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup tcp listener");
        std::process::exit(1);
    });

    tracing::info!("blog.svc running on {}", &address);
    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(err) = result {
                tracing::error!(error = %err, "server stopped");
                std::process::exit(1);
            }
        }
        _ = signal::ctrl_c() => {
            tracing::info!("ctrl+c signal received, preparing to shutdown");
        }
    }

    cancellation_token.cancel();
    let _ = sweeper.await;
    tracing::info!("blog.svc going off, graceful shutdown complete");
}
