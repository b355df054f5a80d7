//! Ontograph CLI: bulk-load ontologies into a property graph

use clap::{Parser, Subcommand};
use ontograph::config::SessionConfig;
use ontograph::session::Session;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "ontograph", version, about = "Ontology-to-property-graph bulk loader")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the configured ontology sources into a graph
    Load {
        /// Session configuration file (YAML)
        #[arg(long)]
        config: PathBuf,

        /// Print the final summary as JSON on stdout
        #[arg(long)]
        json: bool,
    },
}

fn init_logging() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ontograph=info"));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact());
    let _ = tracing::dispatcher::set_global_default(tracing::Dispatch::new(subscriber));
}

fn run_load(config_path: &PathBuf, json: bool) -> anyhow::Result<()> {
    let config = SessionConfig::from_path(config_path)?;
    let session = Session::open(config)?;
    let summary = session.run()?;

    info!(
        nodes = summary.node_count,
        edges = summary.edge_count,
        nodes_created = summary.nodes_created,
        edges_created = summary.edges_created,
        properties = summary.properties_written,
        items = summary.items_processed,
        items_failed = summary.items_failed,
        sources = summary.sources_loaded,
        sources_skipped = summary.sources_skipped,
        elapsed = ?summary.elapsed,
        "load complete"
    );

    if json {
        println!(
            "{}",
            serde_json::json!({
                "nodes": summary.node_count,
                "edges": summary.edge_count,
                "nodes_created": summary.nodes_created,
                "edges_created": summary.edges_created,
                "properties_written": summary.properties_written,
                "items_processed": summary.items_processed,
                "items_failed": summary.items_failed,
                "sources_loaded": summary.sources_loaded,
                "sources_skipped": summary.sources_skipped,
                "elapsed_ms": summary.elapsed.as_millis() as u64,
            })
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Load { config, json } => run_load(config, *json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
