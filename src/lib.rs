pub mod auth;
pub mod config;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod rooms;
pub mod routes;
pub mod state;
pub mod store;
pub mod websocket;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use docs::ApiDoc;
use routes::api::create_api_routes;
use state::AppState;
use websocket::handler::websocket_handler;

/// Assemble the full application router: relay endpoint, API routes and docs
pub fn app(app_state: Arc<AppState>) -> Router {
    let api_routes = create_api_routes(app_state.clone());

    Router::new()
        // Relay endpoint
        .route("/ws", get(websocket_handler))
        .with_state(app_state)
        // Mount API routes
        .nest("/api", api_routes)
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add tracing layer
        .layer(TraceLayer::new_for_http())
}
