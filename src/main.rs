use dotenv::dotenv;
use dune_echo_mcp::{config::Config, dune::DuneClient, server, tools::ToolRegistry};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Dune Echo MCP Server...");

    let config = Config::from_env()?;
    info!(
        base_url = %config.base_url,
        timeout_secs = config.request_timeout.as_secs(),
        "Upstream configured"
    );

    let client = DuneClient::new(&config)?;
    let registry = ToolRegistry::standard();

    server::run(client, registry).await?;

    Ok(())
}
