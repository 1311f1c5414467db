use agent_cortex::{agent, config::AgentConfig, models::Task};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let text = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if text.trim().is_empty() {
        eprintln!("usage: cortex <task text>");
        eprintln!("example: cortex What is NVDA price?");
        std::process::exit(2);
    }

    let config = AgentConfig::from_env();
    let cortex = agent::bootstrap::from_config(&config).await?;

    info!(
        memory_backend = %cortex.memory().active_backend().await,
        "Cortex ready"
    );

    let response = cortex.process(Task::new(text).with_source("cli")).await;

    println!("\n=== {} ===", response.domain);
    if response.fell_back {
        println!("(routed to fallback)");
    }
    if !response.reasoning.is_empty() {
        println!("Reasoning: {}", response.reasoning);
    }
    match &response.error {
        None => println!("\n{}", response.output),
        Some(error) => println!("\nFailed: {}", error),
    }
    if response.memory_degraded {
        println!("\n(warning: interaction not saved to long-term memory)");
    }

    if response.is_success() {
        Ok(())
    } else {
        std::process::exit(1);
    }
}
