use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use ej_bot::actions::ActionContext;
use ej_bot::actions::server::action_routes;
use ej_bot::config::BotConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be set.
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Arc::new(BotConfig::from_env().context("Failed to load configuration")?);
    let port = config.action_server_port;

    eprintln!("🗳️  EJ bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   EJ API: {}", config.api_url());
    match (config.conversation_id, config.board_id) {
        (Some(id), _) => eprintln!("   Conversation: {id}"),
        (None, Some(id)) => eprintln!("   Board: {id} (first conversation)"),
        (None, None) => eprintln!("   Conversation: chosen by /start <id>"),
    }
    eprintln!("   Actions: http://0.0.0.0:{port}/webhook\n");

    let context = Arc::new(ActionContext::new(config).context("Failed to prepare actions")?);
    let app = action_routes(context, reqwest::Client::new());

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind action server port {port}"))?;
    tracing::info!(port, "Action server started");
    axum::serve(listener, app).await?;

    Ok(())
}
