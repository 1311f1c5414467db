use agent_cortex::{agent, api::start_server, config::AgentConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AgentConfig::from_env();
    if config.llm.api_key.is_none() {
        warn!("GEMINI_API_KEY not set; every task will be routed to the fallback domain");
    }

    let api_port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("API_PORT"))
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;

    info!("Agent cortex API server");
    info!("Port: {}", api_port);

    let cortex = Arc::new(agent::bootstrap::from_config(&config).await?);

    info!(
        memory_backend = %cortex.memory().active_backend().await,
        "Cortex initialized"
    );

    start_server(cortex, api_port).await?;

    Ok(())
}
