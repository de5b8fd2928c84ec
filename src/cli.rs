use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tabled::{settings::Style, Table, Tabled};

use flowprint::classify::{Strategy, UNKNOWN_CATEGORY};
use flowprint::config::Config;
use flowprint::ingest::read_capture_dir;
use flowprint::report::AnalysisReport;
use flowprint::{Classification, Pipeline};

#[derive(Parser)]
#[command(name = "flowprint")]
#[command(author, version, about = "traffic capture fingerprinting and classification")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fingerprint and classify a directory of capture exports
    Analyze {
        /// Directory containing one CSV export per capture
        dir: PathBuf,

        /// Classification strategy (lookup, knn, kmeans, gmm)
        #[arg(short, long)]
        strategy: Option<String>,

        /// Cluster count for the clustering strategies
        #[arg(long)]
        clusters: Option<usize>,

        /// Random seed for clustering initialization
        #[arg(long)]
        seed: Option<u64>,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show per-capture field summaries (protocols, ports, TLS handshakes)
    Features {
        /// Directory containing one CSV export per capture
        dir: PathBuf,

        /// How many top source ports to show
        #[arg(long, default_value = "10")]
        ports: usize,
    },

    /// Generate default configuration file
    GenConfig {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "Sample")]
    name: String,
    #[tabled(rename = "Avg Size")]
    avg_size: String,
    #[tabled(rename = "Std Size")]
    std_size: String,
    #[tabled(rename = "Avg Interval")]
    avg_interval: String,
    #[tabled(rename = "Std Interval")]
    std_interval: String,
    #[tabled(rename = "Packets")]
    packets: String,
    #[tabled(rename = "Entropy")]
    entropy: String,
    #[tabled(rename = "Prediction")]
    prediction: String,
}

pub fn run_command(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default()?,
    };

    match cli.command {
        Commands::Analyze {
            dir,
            strategy,
            clusters,
            seed,
            format,
        } => analyze(config, &dir, strategy, clusters, seed, &format),
        Commands::Features { dir, ports } => features(&dir, ports),
        Commands::GenConfig { output } => gen_config(output),
    }
}

fn analyze(
    mut config: Config,
    dir: &PathBuf,
    strategy: Option<String>,
    clusters: Option<usize>,
    seed: Option<u64>,
    format: &str,
) -> Result<()> {
    if let Some(strategy) = strategy {
        config.classifier.strategy = strategy
            .parse::<Strategy>()
            .map_err(|e| anyhow!(e))?;
    }
    if let Some(clusters) = clusters {
        config.classifier.clustering.clusters = clusters;
    }
    if let Some(seed) = seed {
        config.classifier.clustering.seed = Some(seed);
    }

    let batch = read_capture_dir(dir)
        .with_context(|| format!("Failed to read captures from {}", dir.display()))?;
    let report = Pipeline::new(config).run(&batch)?;

    match format {
        "json" => println!("{}", report.to_json()?),
        _ => print_table(&report),
    }

    Ok(())
}

fn print_table(report: &AnalysisReport) {
    let rows: Vec<ResultRow> = report
        .rows
        .iter()
        .map(|row| ResultRow {
            name: row.name.clone(),
            avg_size: format!("{:.1}", row.avg_packet_size),
            std_size: format!("{:.1}", row.std_packet_size),
            avg_interval: format!("{:.4}", row.avg_interval),
            std_interval: format!("{:.4}", row.std_interval),
            packets: row.packet_count.to_string(),
            entropy: format!("{:.3}", row.flow_entropy),
            prediction: colorize_prediction(&row.prediction),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

fn colorize_prediction(prediction: &Classification) -> String {
    match prediction {
        Classification::Category(category) if category == UNKNOWN_CATEGORY => {
            category.red().to_string()
        }
        Classification::Category(category) => category.green().to_string(),
        Classification::Cluster(_) => prediction.to_string().yellow().to_string(),
    }
}

fn features(dir: &PathBuf, ports: usize) -> Result<()> {
    let batch = read_capture_dir(dir)
        .with_context(|| format!("Failed to read captures from {}", dir.display()))?;

    for sample in batch.samples() {
        println!(
            "{} ({} packets)",
            sample.name().bold(),
            sample.len()
        );

        let protocols = sample.protocol_counts();
        if !protocols.is_empty() {
            println!("  protocols:");
            for (proto, count) in protocols {
                println!("    {:<12} {}", proto, count);
            }
        }

        let top_ports = sample.top_source_ports(ports);
        if !top_ports.is_empty() {
            println!("  top source ports:");
            for (port, count) in top_ports {
                println!("    {:<12} {}", port, count);
            }
        }

        let handshakes = sample.tls_handshake_counts();
        if !handshakes.is_empty() {
            println!("  TLS handshake types:");
            for (hs, count) in handshakes {
                println!("    {:<12} {}", hs, count);
            }
        }

        println!();
    }

    Ok(())
}

fn gen_config(output: Option<PathBuf>) -> Result<()> {
    let config = Config::default();

    match output {
        Some(path) => {
            config.save(&path)?;
            println!("Wrote default config to {}", path.display());
        }
        None => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
