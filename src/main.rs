// Agent Runtime - entry point
//
// Loads the configuration, registers built-in capabilities, connects the
// configured providers and prints the merged capability catalog as JSON.
//
// Environment:
// - `AGENT_RUNTIME_CONFIG` - config file path (default ~/.agent-runtime/config.json)
// - `RUST_LOG` - tracing filter (default "info")

use anyhow::Context;

use agent_runtime::{AppState, ConfigService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_service = match std::env::var_os("AGENT_RUNTIME_CONFIG") {
        Some(path) => ConfigService::from_path(path),
        None => ConfigService::new(),
    }
    .context("failed to load configuration")?;
    tracing::info!(path = %config_service.path().display(), "Configuration loaded");

    let state = AppState::new(config_service.get_config().clone());
    let connected = state
        .initialize()
        .await
        .context("failed to initialize runtime")?;
    for server in &connected {
        tracing::info!(
            provider = %server.server_name,
            tools = server.qualified_tool_names.len(),
            "Provider ready"
        );
    }

    let catalog = serde_json::to_string_pretty(&state.catalog())?;
    println!("{}", catalog);

    state.shutdown().await;
    Ok(())
}
