//! canon-kg CLI: canonical knowledge graph.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use canon_kg::analytics::compute_centrality;
use canon_kg::config::CanonConfig;
use canon_kg::error::CanonResult;
use canon_kg::infer::InferenceEngine;
use canon_kg::model::ExtractionBatch;
use canon_kg::paths::{CanonPaths, PathError};
use canon_kg::store::KnowledgeStore;
use canon_kg::tension::{TensionDetector, TensionKind};

#[derive(Parser)]
#[command(name = "canon-kg", version, about = "Canonical knowledge graph")]
struct Cli {
    /// Data directory for persistent storage.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (default: $XDG_CONFIG_HOME/canon-kg/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the XDG directories and a default config file.
    Init,

    /// Ingest extraction batches from a JSON file (one batch or an array).
    Ingest {
        /// Path to the JSON file.
        #[arg(long)]
        file: PathBuf,

        /// Re-ingest sources that were already processed.
        #[arg(long)]
        force: bool,
    },

    /// Show store statistics.
    Stats,

    /// Show a node and its relationships.
    Node {
        /// Node name (resolved before lookup).
        name: String,
    },

    /// List nodes with a given type.
    NodesOfType {
        /// Type tag, e.g. `concept` or `entity`.
        node_type: String,
    },

    /// Resolve names to canonical entities.
    Resolve {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Run rule-based inference and merge the derived relationships.
    Infer {
        /// Iteration cap (default: from config).
        #[arg(long)]
        max_iterations: Option<usize>,

        /// Print derived relationships without storing them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Compute PageRank and degree centrality and attach them to nodes.
    Centrality {
        /// Number of top nodes to print.
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Detect tensions between relationships.
    Tensions {
        /// Print the full report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Export the whole store as JSON.
    Export,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let mut store = KnowledgeStore::open(&config.to_store_config())?;

    match cli.command {
        Commands::Init => {
            let paths = CanonPaths::resolve()?;
            paths.ensure_dirs()?;
            let config_file = paths.config_file();
            if config_file.exists() {
                println!("Config already present at {}", config_file.display());
            } else {
                let defaults = CanonConfig {
                    data_dir: cli.data_dir.clone(),
                    ..CanonConfig::default()
                };
                defaults.save(&config_file)?;
                println!("Wrote default config to {}", config_file.display());
            }
            if let Some(dir) = &config.data_dir {
                println!(
                    "Initialized canon-kg at {} ({} nodes, {} relationships)",
                    dir.display(),
                    store.node_count(),
                    store.relationship_count()
                );
            }
        }

        Commands::Ingest { file, force } => {
            let content = std::fs::read_to_string(&file).into_diagnostic()?;
            let batches = ExtractionBatch::parse_json(&content).into_diagnostic()?;

            let mut skipped = 0usize;
            for batch in &batches {
                if !force && store.is_source_processed(&batch.source) {
                    tracing::info!(source = %batch.source, "source already processed, skipping");
                    skipped += 1;
                    continue;
                }
                let outcome = store.ingest_batch(batch)?;
                println!(
                    "{}: +{} nodes, +{} relationships ({} rejected)",
                    batch.source,
                    outcome.nodes_added,
                    outcome.relationships_added,
                    outcome.rejected
                );
            }
            let stats = store.get_statistics();
            println!(
                "Ingested {} batches from {} ({skipped} skipped). Store: {} nodes, {} relationships.",
                batches.len() - skipped,
                file.display(),
                stats.total_nodes,
                stats.total_relationships
            );
        }

        Commands::Stats => {
            let json = serde_json::to_string_pretty(&store.get_statistics()).into_diagnostic()?;
            println!("{json}");
        }

        Commands::Node { name } => {
            let Some(node) = store.get_node_by_name(&name) else {
                miette::bail!("no node matches \"{name}\"");
            };
            println!("Node: \"{}\"", node.canonical_name);
            println!("  id:         {}", node.id);
            println!("  type:       {}", node.node_type);
            if !node.definition.is_empty() {
                println!("  definition: {}", node.definition);
            }
            if !node.sources.is_empty() {
                let sources: Vec<&str> = node.sources.iter().map(String::as_str).collect();
                println!("  sources:    {}", sources.join(", "));
            }
            for (key, value) in &node.metadata {
                println!("  {key}: {value}");
            }

            let rels = store.get_relationships_for_node(&node.canonical_name);
            if !rels.is_empty() {
                println!("  relationships ({}):", rels.len());
                for r in rels {
                    let lineage = match &r.inferred_by {
                        Some(steps) => format!(" [inferred: {}]", steps.join(", ")),
                        None => String::new(),
                    };
                    println!(
                        "    \"{}\" -{}-> \"{}\" (confidence: {:.2}){lineage}",
                        r.subject, r.predicate, r.object, r.confidence
                    );
                }
            }
        }

        Commands::NodesOfType { node_type } => {
            let nodes = store.get_nodes_by_type(&node_type);
            if nodes.is_empty() {
                println!("No nodes of type \"{node_type}\".");
            } else {
                println!("Nodes of type \"{node_type}\" ({}):", nodes.len());
                for node in nodes {
                    println!("  {} / {}", node.canonical_name, node.id);
                }
            }
        }

        Commands::Resolve { names } => {
            let matches = store.resolver_mut().batch_resolve(&names)?;
            for m in &matches {
                println!(
                    "  \"{}\" -> \"{}\" ({}, confidence: {:.2})",
                    m.original, m.canonical, m.match_type, m.confidence
                );
            }
        }

        Commands::Infer {
            max_iterations,
            dry_run,
        } => {
            let max_iterations = max_iterations.unwrap_or(config.inference.max_iterations);
            let mut engine = InferenceEngine::new(config.inference.clone());

            if dry_run {
                for rule in engine.rules() {
                    println!(
                        "Rule {} (factor {:.2}): {}",
                        rule.name, rule.confidence_factor, rule.description
                    );
                }
                let outcome = engine.run(store.relationships(), max_iterations);
                println!(
                    "Derived {} relationships in {} iterations (fixpoint: {}):",
                    outcome.derived.len(),
                    outcome.iterations,
                    outcome.reached_fixpoint
                );
                for r in &outcome.derived {
                    println!(
                        "  \"{}\" -{}-> \"{}\" (confidence: {:.2})",
                        r.subject, r.predicate, r.object, r.confidence
                    );
                }
            } else {
                let report = store.run_inference(&mut engine, max_iterations)?;
                println!(
                    "Derived {}, added {} in {} iterations (fixpoint: {}).",
                    report.derived, report.added, report.iterations, report.reached_fixpoint
                );
                for (rule, count) in &report.rule_stats {
                    println!("  {rule}: {count}");
                }
            }
        }

        Commands::Centrality { top } => {
            let metrics = compute_centrality(
                &store,
                config.analytics.damping,
                config.analytics.iterations,
            );
            let updated = store.attach_centrality(&metrics)?;
            println!("Updated centrality on {updated} nodes. Top {top} by PageRank:");
            for (i, (name, scores)) in metrics.top_by_pagerank(top).into_iter().enumerate() {
                println!(
                    "  {}. \"{name}\" pagerank={:.4} degree={:.4}",
                    i + 1,
                    scores.pagerank,
                    scores.degree_centrality
                );
            }
        }

        Commands::Tensions { json } => {
            let report = TensionDetector::with_config(&store, config.tension.clone()).get_all_tensions();
            if json {
                let json = serde_json::to_string_pretty(&report).into_diagnostic()?;
                println!("{json}");
            } else if report.productive_tensions.is_empty() {
                println!("No tensions found.");
            } else {
                println!("Tensions ({}):", report.tensions_found);
                for (i, t) in report.productive_tensions.iter().enumerate() {
                    println!(
                        "  {}. [{}] {} (score: {:.2})",
                        i + 1,
                        t.kind.label(),
                        t.crux,
                        t.productivity_score
                    );
                    if let TensionKind::ConflictingStatements { claims, .. } = &t.kind {
                        for c in claims {
                            println!(
                                "       - {} (source: {}, confidence: {:.2})",
                                c.object,
                                c.source.as_deref().unwrap_or("?"),
                                c.confidence
                            );
                        }
                    }
                }
                println!(
                    "Average productivity: {:.2}",
                    report.statistics.average_productivity
                );
            }
        }

        Commands::Export => {
            let json = serde_json::to_string_pretty(&store.snapshot()).into_diagnostic()?;
            println!("{json}");
        }
    }

    Ok(())
}

/// Config file, then `--data-dir`, then the XDG data directory.
fn load_config(cli: &Cli) -> CanonResult<CanonConfig> {
    let paths = CanonPaths::resolve().ok();
    let mut config = match (&cli.config, &paths) {
        (Some(path), _) => CanonConfig::load(path)?,
        (None, Some(paths)) => CanonConfig::load_or_default(&paths.config_file())?,
        (None, None) => CanonConfig::default(),
    };

    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    } else if config.data_dir.is_none() {
        let paths = paths.ok_or(PathError::NoHome)?;
        config.data_dir = Some(paths.data_dir);
    }
    Ok(config)
}
