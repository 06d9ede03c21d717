use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use recipebot::graph::GremlinGraph;
use recipebot::gremlin::{ConnectionSettings, GremlinClient};
use recipebot::seed::{populate, SeedGraph};
use recipebot::Config;

#[derive(Parser, Debug)]
#[command(name = "populate")]
#[command(about = "Seed the recipe graph with demo recipes, products and ingredients")]
struct Args {
    /// Seed description (JSON)
    #[arg(long, default_value = "data/seed_graph.json")]
    seed: PathBuf,

    /// Only add vertices
    #[arg(long)]
    skip_edges: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", config.logging.level.as_str()),
    )
    .init();

    let seed = SeedGraph::load(&args.seed)
        .with_context(|| format!("Failed to load seed file {}", args.seed.display()))?;

    let settings = ConnectionSettings::from_cosmos(&config.cosmos, config.timeouts.graph())?;
    let client = Arc::new(GremlinClient::new(settings));

    log::info!("Attempting to connect to Gremlin endpoint...");
    client.open().await.context(
        "Failed to connect to the graph. Ensure COSMOSDB_DATABASE, COSMOSDB_GRAPH, COSMOSDB_KEY, \
         and COSMOSDB_ENDPOINT are correct in your .env file",
    )?;

    let graph = GremlinGraph::new(client.clone(), config.graph.partition_key.clone());
    let summary = populate(&graph, &seed, !args.skip_edges).await;

    client.close().await;

    println!("\n=== Graph population complete ===");
    println!("{}", summary);

    if summary.vertices_failed > 0 || summary.edges_failed > 0 {
        anyhow::bail!("{} vertex and {} edge operations failed", summary.vertices_failed, summary.edges_failed);
    }
    Ok(())
}
