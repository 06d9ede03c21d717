use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use recipebot::chat::ChatService;
use recipebot::context::ContextBuilder;
use recipebot::graph::{GraphStore, GremlinGraph};
use recipebot::gremlin::{ConnectionSettings, GremlinClient};
use recipebot::llm::{AzureOpenAiClient, ChatCompletion};
use recipebot::search::{AzureSearchClient, DocumentSearch};
use recipebot::server::{self, AppState};
use recipebot::Config;

#[derive(Parser, Debug)]
#[command(name = "recipebot")]
#[command(about = "Recipe assistant backend: graph + search retrieval in front of a chat model")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API (default)
    Serve,
    /// Check connectivity and configuration, then exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", config.logging.level.as_str()),
    )
    .init();

    let settings = ConnectionSettings::from_cosmos(&config.cosmos, config.timeouts.graph())?;
    let gremlin = Arc::new(GremlinClient::new(settings));

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, gremlin).await,
        Command::Check => check(&config, gremlin).await,
    }
}

async fn serve(config: Config, gremlin: Arc<GremlinClient>) -> Result<()> {
    match gremlin.open().await {
        Ok(()) => log::info!("Successfully connected to Gremlin endpoint"),
        Err(e) => {
            log::error!("Error connecting to Gremlin endpoint: {}", e);
            log::error!(
                "Ensure COSMOSDB_DATABASE, COSMOSDB_GRAPH, COSMOSDB_KEY, and COSMOSDB_ENDPOINT are correct in your .env file."
            );
        }
    }

    let graph: Arc<dyn GraphStore> = Arc::new(GremlinGraph::new(
        gremlin.clone(),
        config.graph.partition_key.clone(),
    ));

    let openai = AzureOpenAiClient::new(&config.openai, config.timeouts.completion())
        .context("Failed to create completion client")?;
    log::info!("Using completion deployment '{}'", openai.deployment());
    let llm: Arc<dyn ChatCompletion> = Arc::new(openai);

    let search: Option<Arc<dyn DocumentSearch>> = match &config.search {
        Some(search) => Some(Arc::new(
            AzureSearchClient::new(search, config.search_tuning.clone(), config.timeouts.search())
                .context("Failed to create search client")?,
        )),
        None => {
            log::warn!(
                "Azure Search environment variables missing (AZURE_SEARCH_ENDPOINT, AZURE_SEARCH_KEY, AZURE_SEARCH_INDEX). Website context disabled."
            );
            None
        }
    };

    log::info!(
        "Website search {}",
        if config.search_enabled() { "enabled" } else { "disabled" }
    );

    let context = ContextBuilder::new(graph.clone(), search, config.context.clone());
    let chat = Arc::new(ChatService::new(llm, context, &config.assistant));
    let state = AppState {
        chat,
        graph,
        partition_key: config.graph.partition_key.clone(),
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        log::info!("Shutdown signal received");
    };

    server::run(&config.server, state, shutdown).await?;

    log::info!("Closing Gremlin client connection...");
    gremlin.close().await;
    log::info!("Server shut down");
    Ok(())
}

async fn check(config: &Config, gremlin: Arc<GremlinClient>) -> Result<()> {
    println!("\n=== recipebot configuration check ===\n");
    println!(
        "Completion: deployment '{}' at {} (api-version {})",
        config.openai.deployment, config.openai.endpoint, config.openai.api_version
    );
    match &config.search {
        Some(search) => println!("Search:     index '{}' at {}", search.index, search.endpoint),
        None => println!("Search:     not configured (website context disabled)"),
    }
    println!("Graph:      {} as {}", gremlin.settings().url, config.cosmos.username());

    let graph = GremlinGraph::new(gremlin.clone(), config.graph.partition_key.clone());
    let result = graph.ping().await;
    gremlin.close().await;

    let count = result.context("Graph connectivity check failed")?;
    println!("\nGraph reachable (g.V().limit(1).count() = {})", count);
    Ok(())
}
