use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use clap::{Parser, Subcommand};
use tower_http::{request_id::MakeRequestUuid, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use code_knowledge_graph::analyzers::registry::AnalyzerRegistry;
use code_knowledge_graph::config::{Config, GraphBackend};
use code_knowledge_graph::core::orchestrator::{ExtractSource, Extractor};
use code_knowledge_graph::service::{GraphStatistics, KnowledgeGraphService};
use code_knowledge_graph::store::memgraph::MemgraphStore;
use code_knowledge_graph::store::memory::InMemoryStore;
use code_knowledge_graph::store::DynStore;
use code_knowledge_graph::web::server::{AppState, app};

#[derive(Debug, Parser)]
#[command(name = "codegraph", about = "Build a knowledge graph from source code")]
struct Cli {
    /// Persist into Memgraph instead of the in-memory store.
    #[arg(long, global = true)]
    memgraph: bool,

    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API.
    Serve,
    /// Extract a directory tree and store it.
    Codebase { dir: PathBuf },
    /// Extract a single file and store it.
    File { path: PathBuf },
    /// Run the text processor over a snippet (not stored).
    Text { text: String },
    /// Print entity and relationship counts of the stored graph.
    Stats,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn print_statistics(stats: &GraphStatistics) {
    println!("entities: {}", stats.total_entities);
    for (t, n) in &stats.entities_by_type {
        println!("  {t:<16} {n}");
    }
    println!("relationships: {}", stats.total_relationships);
    for (t, n) in &stats.relationships_by_type {
        println!("  {t:<16} {n}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut cfg = Config::from_env()?;
    if cli.memgraph {
        cfg.backend = GraphBackend::Memgraph;
    }

    let store: DynStore = match cfg.backend {
        GraphBackend::Memory => Arc::new(InMemoryStore::new()),
        GraphBackend::Memgraph => Arc::new(MemgraphStore::new(cfg.memgraph.clone())),
    };
    store.connect().await?;

    let extractor = Extractor::new(Arc::new(AnalyzerRegistry::with_defaults()))
        .with_workers(cfg.extract_workers)
        .with_extra_excluded_dirs(cfg.extra_excluded_dirs.clone());
    let service = KnowledgeGraphService::new(Arc::new(extractor), store.clone());

    let outcome = run(cli.command, &cfg, service).await;
    if let Err(err) = store.disconnect().await {
        tracing::warn!(error = %err, "disconnect failed");
    }
    outcome
}

async fn run(command: Command, cfg: &Config, service: KnowledgeGraphService) -> anyhow::Result<()> {
    match command {
        Command::Serve => serve(cfg, service).await,
        Command::Codebase { dir } => {
            let summary = service.extract_and_store(ExtractSource::Path(dir)).await?;
            println!(
                "analyzed {} files ({} skipped, {} directories pruned)",
                summary.files_analyzed, summary.files_skipped, summary.directories_pruned
            );
            println!(
                "stored {} entities, {} relationships ({} failures)",
                summary.merge.entities_written(),
                summary.merge.relationships_written(),
                summary.merge.failures.len()
            );
            print_statistics(&service.statistics().await?);
            Ok(())
        }
        Command::File { path } => {
            let summary = service.extract_and_store(ExtractSource::Path(path)).await?;
            println!(
                "stored {} entities, {} relationships ({} failures)",
                summary.merge.entities_written(),
                summary.merge.relationships_written(),
                summary.merge.failures.len()
            );
            Ok(())
        }
        Command::Text { text } => {
            let report = service.analyze_text(text).await?;
            for (t, n) in report.batch.entity_type_counts() {
                println!("  {t:<16} {n}");
            }
            for (t, n) in report.batch.relationship_type_counts() {
                println!("  {t:<16} {n}");
            }
            println!("{}", serde_json::to_string_pretty(&report.batch)?);
            Ok(())
        }
        Command::Stats => {
            print_statistics(&service.statistics().await?);
            Ok(())
        }
    }
}

async fn serve(cfg: &Config, service: KnowledgeGraphService) -> anyhow::Result<()> {
    let router: Router = app(AppState { service })
        .layer(TraceLayer::new_for_http())
        .layer(tower_http::request_id::SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(tower_http::limit::RequestBodyLimitLayer::new(8 * 1024 * 1024));

    let listener = tokio::net::TcpListener::bind(cfg.bind_addr).await?;
    tracing::info!("codegraph listening on {}", cfg.bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
