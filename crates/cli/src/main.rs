use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use quill_agent::{AgentRuntime, TemplateProvider};
use quill_auth::AuthService;
use quill_core::Config;
use quill_http::{cors_layer, create_router, AppState};
use quill_llm::AnthropicClient;
use quill_storage::Store;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "AI journaling assistant server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server.
    Serve {
        /// Override the configured bind port.
        #[arg(short, long)]
        port: Option<u16>,
        /// Override the configured bind host.
        #[arg(short = 'H', long)]
        host: Option<String>,
    },
    /// Run database migrations and exit.
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    // Missing required configuration aborts here, before anything binds.
    let config = Config::from_env()?;

    match cli.command {
        Commands::Serve { port, host } => serve(config, host, port).await,
        Commands::Migrate => {
            let store = Store::connect(&config.database_url).await?;
            drop(store);
            tracing::info!("migrations applied");
            Ok(())
        },
    }
}

async fn serve(config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    let store = Store::connect(&config.database_url).await?;
    let provider =
        Arc::new(AnthropicClient::new(config.api_key.clone(), config.api_base_url.clone())?);
    let templates = Arc::new(TemplateProvider::new());
    let runtime =
        AgentRuntime::new(store.clone(), provider, templates.clone(), config.model.clone());
    let auth = AuthService::new(config.jwt_secret.clone(), config.token_ttl_hours);

    let state = Arc::new(AppState { store, auth, runtime, templates });
    let router = create_router(state, cors_layer(&config.cors_origins));

    let addr = format!(
        "{}:{}",
        host.unwrap_or_else(|| config.host.clone()),
        port.unwrap_or(config.port)
    );
    tracing::info!(addr, model = %config.model, "starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
