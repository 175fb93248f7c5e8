use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, error, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use std::panic;

use vantyse_doc::config::Config;
use vantyse_doc::state::AppState;
use vantyse_doc::store::{memory::MemoryStore, pg::PgStore, Store};

#[tokio::main(flavor = "current_thread")]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "vantyse_doc=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });

    // Initialize the document store; fall back to the in-memory store when
    // no database is configured or reachable
    let store = match &config.db_url {
        Some(db_url) => match PgStore::new(db_url).await {
            Ok(pg) => {
                info!("Database initialized successfully");
                Store::Pg(pg)
            }
            Err(e) => {
                error!("Failed to initialize database: {}", e);
                warn!("Falling back to in-memory document store - saves will not survive restarts");
                Store::Memory(MemoryStore::new())
            }
        },
        None => {
            warn!("No database URL configured - using in-memory document store");
            Store::Memory(MemoryStore::new())
        }
    };

    // Shared state: store plus the session room manager
    let app_state = AppState::new(store);

    // CORS policy from configuration
    let cors = match &config.cors_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::permissive(),
    };

    // Combine all routes
    let app_routes = vantyse_doc::app(app_state).layer(cors);

    // Start the server
    let listener = tokio::net::TcpListener::bind(config.server_address())
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", config.server_address()));

    info!("🚀 Server running on http://{}", config.server_address());
    info!("📡 Relay available at ws://{}/ws", config.server_address());
    info!("📚 Swagger UI available at http://{}/swagger", config.server_address());

    axum::serve(listener, app_routes)
        .await
        .expect("Server failed to start");
}
