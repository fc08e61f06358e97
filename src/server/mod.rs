//! HTTP surface: browser client, chat endpoint, cache maintenance and the
//! MCP service, all on one axum router.

mod handlers;

use std::path::PathBuf;

use axum::{
    Router,
    routing::{delete, get, post},
};
use rmcp::transport::{
    StreamableHttpServerConfig, StreamableHttpService,
    streamable_http_server::session::local::LocalSessionManager,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{assistant::Assistant, mcp::HrMcpServer};

#[derive(Clone)]
pub struct AppState {
    pub assistant: Assistant,
    pub static_dir: PathBuf,
}

fn mcp_service(state: &AppState) -> StreamableHttpService<HrMcpServer, LocalSessionManager> {
    let tools = state.assistant.tools().clone();
    StreamableHttpService::new(
        move || Ok(HrMcpServer::new(tools.clone())),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    )
}

pub fn router(state: AppState) -> Router {
    let mcp = mcp_service(&state);
    let static_files = ServeDir::new(&state.static_dir);

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/chat", post(handlers::chat))
        .route("/cache/stats", get(handlers::cache_stats))
        .route("/cache/{employee_id}", delete(handlers::clear_cache))
        .nest_service("/static", static_files)
        .nest_service("/mcp", mcp)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
