use anyhow::{Context, Result};
use bridge_forge::binning::StaticBinner;
use bridge_forge::core::graph::EdgeKind;
use bridge_forge::io::{load_bins, load_gfa, write_gfa, PafReader};
use bridge_forge::utils::configuration::setup_logging;
use bridge_forge::assembly::BridgeSummary;
use bridge_forge::{
    BridgeResolver, ConfigurationManager, ResolverStats, StreamingResolver, StreamingStats,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "bridge-forge")]
#[command(about = "Resolve repeats in metagenome assembly graphs with long-read bridges")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve repeats and write the reduced graph
    Resolve {
        /// Assembly graph (GFA 1, optionally gzipped)
        #[arg(short, long, value_name = "FILE")]
        graph: PathBuf,

        /// Long-read alignments against the graph segments (PAF)
        #[arg(short, long, value_name = "FILE")]
        alignments: PathBuf,

        /// Segment to population table
        #[arg(short, long, value_name = "FILE")]
        bins: Option<PathBuf>,

        /// Reduced graph output
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// JSON report of resolved paths and unresolved bridges
        #[arg(short, long, value_name = "FILE")]
        report: Option<PathBuf>,

        /// Leave unresolved bridges as they are instead of forcing them
        #[arg(long)]
        no_finalize: bool,
    },
    /// Write the default configuration as TOML
    Config {
        #[arg(short, long, value_name = "FILE", default_value = "bridge-forge.toml")]
        output: PathBuf,
    },
}

#[derive(Serialize)]
struct RunReport {
    resolver: ResolverStats,
    streaming: StreamingStats,
    finalized: Vec<String>,
    reduced_edges: Vec<String>,
    unresolved: Vec<BridgeSummary>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let manager = match &cli.config {
        Some(path) => ConfigurationManager::from_file(path)?,
        None => ConfigurationManager::new()?,
    };
    let mut config = manager.into_config();
    if cli.verbose {
        config.logging.level = "debug".to_string();
    } else if cli.quiet {
        config.logging.level = "warn".to_string();
    }
    let _guard = setup_logging(&config.logging)?;

    match cli.command {
        Commands::Resolve {
            graph: graph_path,
            alignments,
            bins,
            output,
            report,
            no_finalize,
        } => {
            let graph = load_gfa(&graph_path, config.search.kmer_size)
                .with_context(|| format!("loading graph {}", graph_path.display()))?;
            let binner = match &bins {
                Some(path) => load_bins(path, &graph, config.binning.coverage_tolerance)
                    .with_context(|| format!("loading bins {}", path.display()))?,
                None => {
                    warn!("no bin table given, no node is treated as unique");
                    StaticBinner::new(config.binning.coverage_tolerance)
                }
            };
            let records = PafReader::open(&alignments)
                .with_context(|| format!("opening alignments {}", alignments.display()))?;

            let streaming = StreamingResolver::new(BridgeResolver::new(
                graph,
                Box::new(binner),
                config,
            ));
            let streaming_stats = streaming.run(records)?;

            let shared = streaming.resolver();
            let mut resolver = shared.lock();
            let unresolved: Vec<BridgeSummary> = resolver
                .unresolved_bridges()
                .into_iter()
                .map(|bridge| bridge.summary())
                .collect();
            let finalized = if no_finalize {
                Vec::new()
            } else {
                resolver.finalize_all()
            };
            let graph = resolver.graph();

            let file = File::create(&output)
                .with_context(|| format!("creating {}", output.display()))?;
            write_gfa(graph, BufWriter::new(file))?;
            info!("💾 reduced graph written to {}", output.display());

            let run_report = RunReport {
                resolver: resolver.stats().clone(),
                streaming: streaming_stats,
                finalized: finalized.iter().map(|p| p.label(graph)).collect(),
                reduced_edges: graph
                    .active_edges()
                    .filter_map(|edge| match &edge.kind {
                        EdgeKind::Reduced(path) => Some(path.label(graph)),
                        _ => None,
                    })
                    .collect(),
                unresolved,
            };
            print_summary(&run_report);
            if let Some(path) = report {
                write_report(&run_report, &path)?;
            }
        }
        Commands::Config { output } => {
            ConfigurationManager::with_defaults().write_template(&output)?;
            println!("✅ Default configuration written to {}", output.display());
        }
    }

    Ok(())
}

fn print_summary(report: &RunReport) {
    println!("✅ Resolution completed");
    println!("   Reads: {} ({} used)", report.resolver.reads, report.resolver.reads_used);
    println!("   Bridges: {}", report.resolver.bridges_created);
    println!("   Reductions: {}", report.resolver.reductions);
    println!("   Unresolved before finalization: {}", report.unresolved.len());
    if report.streaming.skipped_records > 0 {
        println!("   Skipped records: {}", report.streaming.skipped_records);
    }
}

fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)?;
    info!("📊 report written to {}", path.display());
    Ok(())
}
