use std::path::PathBuf;

use anyhow::{Result, anyhow};
use axum::serve;
use dotenv::dotenv;
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod access;
mod assistant;
mod config;
mod dates;
mod employee;
mod error;
mod format;
mod hr;
mod http;
mod llm;
mod mcp;
mod prompt;
mod server;
mod tools;

use assistant::Assistant;
use config::{LogFormat, SETTINGS};
use hr::HrService;
use llm::ChatClient;
use server::AppState;
use tools::ToolSet;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".to_string().into());
    let (pretty, json) = match format {
        LogFormat::Pretty => (Some(fmt::layer()), None),
        LogFormat::Json => (None, Some(fmt::layer().json())),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load variables from .env file if it exists into the environment
    dotenv().ok();

    // Fail fast on malformed configuration
    let settings = SETTINGS
        .as_ref()
        .map_err(|e| anyhow!("Failed to load configuration: {e}"))?;
    init_tracing(settings.log_format);

    let hr = HrService::from_settings(settings)?;
    let llm = ChatClient::from_settings(settings)?;
    let assistant = Assistant::new(
        llm,
        ToolSet::new(hr),
        settings.max_tool_rounds,
        settings.conversation_ttl,
    );
    info!(model = %settings.openai_model, hr_api = %settings.hr_api_base_url, "HR assistant configured");

    let router = server::router(AppState {
        assistant,
        static_dir: PathBuf::from(&settings.static_dir),
    });

    info!("Starting server on {}", settings.bind_address);
    let tcp_listener = TcpListener::bind(&settings.bind_address).await?;

    // Graceful shutdown on CTRL+C
    let shutdown = async {
        signal::ctrl_c().await.unwrap_or_else(|e| {
            eprintln!("failed to install CTRL+C handler: {e}");
        });
    };

    serve(tcp_listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
