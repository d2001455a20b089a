//! Margin Notes Server
//!
//! A PDF-chat backend: questions about an uploaded document are answered
//! by a hosted LLM, grounded in chunks retrieved from a vector index and
//! streamed back while the reply is accumulated for persistence.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use margin_notes_server::clients::{HostedIdentityResolver, OpenAiClient, PineconeIndex};
use margin_notes_server::config::Config;
use margin_notes_server::state::AppState;
use margin_notes_server::{db, routes};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "margin_notes_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing::info!("Starting Margin Notes Server v{}", env!("CARGO_PKG_VERSION"));
    if config.openai.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY not set; chat turns will fail closed");
    }
    if config.webhook.secret.is_none() {
        tracing::warn!("PADDLE_WEBHOOK_KEY not set; webhook deliveries will fail closed");
    }

    // Initialize database
    let db_pool = db::create_pool(&config.database.url)
        .await
        .expect("Failed to initialize database");
    tracing::info!("Database initialized at {}", config.database.url);

    // Upstream clients, constructed once and shared
    let http = reqwest::Client::new();
    let openai = OpenAiClient::new(http.clone(), config.openai.clone());
    let index = PineconeIndex::new(http.clone(), config.index.clone(), openai.clone());
    let identity = HostedIdentityResolver::new(http, config.auth.clone());

    let app_state = AppState::new(
        config.clone(),
        db_pool,
        Arc::new(identity),
        Arc::new(index),
        Arc::new(openai),
    );

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = routes::app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server with graceful shutdown
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Margin Notes Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .unwrap();

    tracing::info!("Server shutdown complete");
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
