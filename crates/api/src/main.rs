use std::net::SocketAddr;
use std::sync::Arc;

use courier_core::store::{DispatchLog, MemoryDispatchLog, MemoryPreferenceStore, PreferenceStore};
use courier_db::{PgDispatchLog, PgPreferenceStore};
use courier_delivery::{Dispatcher, SenderRegistry};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use courier_api::config::{LogFormat, ServerConfig};
use courier_api::router::build_app_router;
use courier_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = ServerConfig::from_env().unwrap_or_else(|e| panic!("Invalid configuration: {e}"));

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "courier_api=debug,courier_delivery=debug,tower_http=debug".into());
    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Stores ---
    let (preferences, dispatch_log): (Arc<dyn PreferenceStore>, Arc<dyn DispatchLog>) =
        match &config.database_url {
            Some(database_url) => {
                let pool = courier_db::create_pool(database_url)
                    .await
                    .expect("Failed to connect to database");
                tracing::info!("Database connection pool created");

                courier_db::health_check(&pool)
                    .await
                    .expect("Database health check failed");

                courier_db::run_migrations(&pool)
                    .await
                    .expect("Failed to run database migrations");
                tracing::info!("Database migrations applied");

                let preferences: Arc<dyn PreferenceStore> =
                    Arc::new(PgPreferenceStore::new(pool.clone()));
                let dispatch_log: Arc<dyn DispatchLog> = Arc::new(PgDispatchLog::new(pool));
                (preferences, dispatch_log)
            }
            None => {
                tracing::warn!("DATABASE_URL not set, using in-memory stores");
                let preferences: Arc<dyn PreferenceStore> = Arc::new(MemoryPreferenceStore::new());
                let dispatch_log: Arc<dyn DispatchLog> = Arc::new(MemoryDispatchLog::new());
                (preferences, dispatch_log)
            }
        };

    // --- Senders and dispatcher ---
    let senders = SenderRegistry::from_env().expect("Failed to build channel senders");
    let dispatcher = Dispatcher::new(Arc::clone(&preferences), Arc::clone(&dispatch_log), senders)
        .with_send_timeout(config.sender_timeout);
    tracing::info!(timeout_ms = config.sender_timeout.as_millis() as u64, "Dispatcher ready");

    // --- App state ---
    let state = AppState {
        preferences,
        dispatch_log,
        dispatcher: Arc::new(dispatcher),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
