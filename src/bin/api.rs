use finlit_engine::{
    api::{start_server, ApiState},
    completion::GeminiCompletion,
    config::AppConfig,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    if !config.has_api_key() {
        warn!("⚠️  GEMINI_API_KEY not set; AI requests will fail");
        warn!("📌 See .env.example for setup instructions");
    }

    info!("🚀 Financial Literacy Engine - API Server");
    info!("📍 Port: {}", config.port);

    let completion = GeminiCompletion::new(config.gemini.clone())?;
    let state = ApiState::new(Arc::new(completion), config.news_cache_ttl)
        .with_session_ttl(config.session_ttl);

    info!("✅ Services initialized");
    info!("📡 Starting API server...");

    start_server(state, config.port).await?;

    Ok(())
}
