//! ShopGraph — multimodal product recommender server.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

mod routes;
mod state;

use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("SHOPGRAPH_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

/// Subcommands run synchronously (the embedding client blocks); only the
/// server path enters the async runtime.
fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "aggregate" => {
                if args.len() < 3 {
                    eprintln!("Usage: shopgraph aggregate <interactions.jsonl>");
                    std::process::exit(1);
                }
                return run_aggregate(PathBuf::from(&args[2]));
            }
            "ingest-catalog" => {
                if args.len() < 3 {
                    eprintln!("Usage: shopgraph ingest-catalog <catalog.jsonl>");
                    std::process::exit(1);
                }
                return run_ingest_catalog(PathBuf::from(&args[2]));
            }
            "--help" | "-h" | "help" => {
                println!("ShopGraph — multimodal product recommender");
                println!();
                println!("Usage: shopgraph [command]");
                println!();
                println!("Commands:");
                println!("  (none)                          Start the server");
                println!("  aggregate <log.jsonl>           Rebuild the co-purchase graph");
                println!("  ingest-catalog <items.jsonl>    Load catalog items");
                println!("  help                            Show this help message");
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'shopgraph help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    // Build everything that can block (store open, embedding client)
    // before entering the runtime.
    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = shopgraph_core::ShopGraphConfig::from_env(&data_dir)?;
    let store =
        shopgraph_store::SqliteStore::open(&config.data_paths.graphdb, config.embedding_dim)
            .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;
    let embedder = shopgraph_infer::create_embedder(&config);

    serve(Arc::new(AppState::new(config, store, embedder)))
}

fn run_aggregate(path: PathBuf) -> anyhow::Result<()> {
    let config = shopgraph_core::ShopGraphConfig::from_env(resolve_data_dir())?;
    let store =
        shopgraph_store::SqliteStore::open(&config.data_paths.graphdb, config.embedding_dim)
            .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;

    let aggregator = shopgraph_aggregate::Aggregator::new(config.settings);
    let report = aggregator
        .run(&store, &path)
        .map_err(|e| anyhow::anyhow!("Aggregation failed: {}", e))?;
    println!(
        "Aggregated {} users / {} interactions into {} edges ({} pairs counted, {} lines skipped)",
        report.users,
        report.interactions,
        report.edges_written,
        report.pairs_counted,
        report.skipped_lines
    );
    Ok(())
}

fn run_ingest_catalog(path: PathBuf) -> anyhow::Result<()> {
    let config = shopgraph_core::ShopGraphConfig::from_env(resolve_data_dir())?;
    let store =
        shopgraph_store::SqliteStore::open(&config.data_paths.graphdb, config.embedding_dim)
            .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;
    let embedder = shopgraph_infer::create_embedder(&config);

    let ingester = shopgraph_aggregate::CatalogIngester::new(
        &store,
        embedder.as_ref(),
        config.settings.write_batch_size,
    );
    let report = ingester
        .run(&path)
        .map_err(|e| anyhow::anyhow!("Catalog ingestion failed: {}", e))?;
    println!(
        "Ingested {} items ({} embedded, {} duplicates, {} lines skipped)",
        report.items_added, report.embedded, report.duplicates, report.skipped_lines
    );
    Ok(())
}

#[tokio::main]
async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let port = state.config.port;
    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("ShopGraph server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
