use dotenvy::dotenv;
use tracing::{error, info};

mod comic;
mod config;
mod error;
mod handlers;
mod llm;
mod utils;

use config::CONFIG;
use utils::logging::init_logging;

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let _guards = init_logging();

    let addr = CONFIG.bind_address();
    info!(
        "Starting comic studio backend on http://{} (text model={}, image model={})",
        addr, CONFIG.gemini_text_model, CONFIG.gemini_image_model
    );

    let app = handlers::build_router();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
