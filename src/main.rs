use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use sidechat::chat::{ChatClient, ConversationController};
use sidechat::config::Config;
use sidechat::telemetry::{self, TelemetrySettings};
use sidechat::tui;

#[derive(Parser)]
#[command(name = "sidechat", about = "Terminal chat panel for a remote chat API.")]
struct Cli {
    /// Chat API base URL (overrides config file and SIDECHAT_API_URL)
    #[arg(long)]
    api_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sidechat=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::load();
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }

    info!("sidechat starting against {}", config.api.base_url);

    telemetry::initialize_once(&TelemetrySettings {
        connection_string: config.telemetry.connection_string.clone(),
        role_name: config.telemetry.role_name.clone(),
    });
    telemetry::report_event("session.started", HashMap::new());

    let client = ChatClient::from_config(&config);
    let controller = Arc::new(ConversationController::new(Arc::new(client)));

    tui::runner::run_tui(controller).await
}
