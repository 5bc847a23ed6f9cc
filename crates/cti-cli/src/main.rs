//! CTI CLI - Command-line interface
//!
//! Usage:
//!   cti eval [--annotations DIR] [--gold DIR] [--output CSV]
//!   cti score <annotation.json> <gold.txt>
//!   cti graph build [--annotations DIR] [--output FILE]
//!   cti graph related <FILE> <ENTITY> [--depth N]
//!   cti graph search <FILE> <KEYWORD>...

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cti_core::{AnnotationDocument, AppConfig, LoggingConfig};
use cti_eval::{
    evaluate_config, parse_tagged_file, score_document, write_csv_file, CorpusMetrics,
    EvaluationReport,
};
use cti_graph::KnowledgeGraph;

#[derive(Parser)]
#[command(name = "cti")]
#[command(about = "Entity annotation alignment and scoring for CTI reports")]
#[command(version)]
struct Cli {
    /// TOML configuration file (environment variables still take precedence)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every annotation/gold pair in two directories
    Eval {
        /// Directory of annotation JSON documents
        #[arg(long)]
        annotations: Option<PathBuf>,
        /// Directory of tagged gold files
        #[arg(long)]
        gold: Option<PathBuf>,
        /// CSV report path
        #[arg(long)]
        output: Option<PathBuf>,
        /// Also write a JSON report with per-pair and corpus scores
        #[arg(long)]
        json: Option<PathBuf>,
        /// Evaluate pairs one at a time
        #[arg(long)]
        sequential: bool,
    },
    /// Score a single annotation document against its gold file
    Score {
        annotation: PathBuf,
        gold: PathBuf,
    },
    /// Build and query the knowledge graph
    Graph {
        #[command(subcommand)]
        action: GraphAction,
    },
}

#[derive(Subcommand)]
enum GraphAction {
    /// Build a graph from every annotation document in a directory
    Build {
        #[arg(long)]
        annotations: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List entities reachable from an entity
    Related {
        file: PathBuf,
        entity: String,
        #[arg(long)]
        depth: Option<usize>,
    },
    /// Find entities whose label contains a keyword
    Search {
        file: PathBuf,
        #[arg(required = true)]
        keywords: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    init_tracing(&config.logging);

    match cli.command {
        Commands::Eval {
            annotations,
            gold,
            output,
            json,
            sequential,
        } => {
            let mut eval = config.eval;
            if let Some(dir) = annotations {
                eval.annotation_dir = dir;
            }
            if let Some(dir) = gold {
                eval.gold_dir = dir;
            }
            if let Some(path) = output {
                eval.report_path = path;
            }
            if sequential {
                eval.parallel = false;
            }

            let outcome = evaluate_config(&eval)?;
            for (name, err) in &outcome.failures {
                eprintln!("Skipped {name}: {err}");
            }

            let corpus = CorpusMetrics::aggregate(outcome.metrics())
                .context("No document pairs could be evaluated")?;

            write_csv_file(&eval.report_path, &outcome.reports)?;
            info!(path = %eval.report_path.display(), "Wrote CSV report");

            if let Some(path) = json {
                let report = EvaluationReport::new(&outcome.reports)?;
                std::fs::write(&path, report.to_json()?)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }

            println!("{}", corpus.report());
        }
        Commands::Score { annotation, gold } => {
            let document = AnnotationDocument::from_path(&annotation)?;
            let entities = parse_tagged_file(&gold)?;
            let metrics = score_document(&document, &entities, config.eval.gold_anchoring);

            println!("{}", serde_json::to_string_pretty(&metrics.record())?);
        }
        Commands::Graph { action } => match action {
            GraphAction::Build {
                annotations,
                output,
            } => {
                let dir = annotations.unwrap_or(config.eval.annotation_dir);
                let output = output.unwrap_or(config.graph.output_path);

                let documents = load_documents(&dir)?;
                let graph = KnowledgeGraph::from_documents(&documents);
                graph.save(&output)?;

                println!(
                    "Built graph from {} documents: {} nodes, {} edges -> {}",
                    documents.len(),
                    graph.node_count(),
                    graph.edge_count(),
                    output.display()
                );
            }
            GraphAction::Related {
                file,
                entity,
                depth,
            } => {
                let graph = KnowledgeGraph::load(&file)?;
                let depth = depth.unwrap_or(config.graph.default_depth);

                for label in graph.related_nodes(&entity, depth)? {
                    println!("{label}");
                }
            }
            GraphAction::Search { file, keywords } => {
                let graph = KnowledgeGraph::load(&file)?;
                let keywords: Vec<&str> = keywords.iter().map(String::as_str).collect();

                for (keyword, hits) in graph.search(&keywords) {
                    println!("{keyword}: {}", hits.join(", "));
                }
            }
        },
    }

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,cti_cli={0},cti_eval={0},cti_graph={0}",
            logging.level
        ))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Read every `*.json` annotation document in a directory, skipping unreadable ones
fn load_documents(dir: &Path) -> anyhow::Result<Vec<AnnotationDocument>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        match AnnotationDocument::from_path(&path) {
            Ok(document) => documents.push(document),
            Err(err) => warn!(path = %path.display(), error = %err, "Skipping unreadable document"),
        }
    }
    Ok(documents)
}
