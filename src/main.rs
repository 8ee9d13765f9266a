use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use leafdoctor::gemini::GeminiClient;
use leafdoctor::server::{self, AppState};
use leafdoctor::session::Session;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("leafdoctor=info")),
        )
        .init();

    // Missing credential is a startup failure, never a per-request one.
    let api_key =
        std::env::var("GEMINI_API_KEY").context("GEMINI_API_KEY must be set in the environment")?;

    let state = Arc::new(AppState {
        analyzer: Arc::new(GeminiClient::new(api_key)),
        session: Mutex::new(Session::new()),
    });

    let addr = std::env::var("LEAFDOCTOR_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(%addr, "leafdoctor listening");

    axum::serve(listener, server::router(state))
        .await
        .context("server error")
}
