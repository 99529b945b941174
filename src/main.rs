use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use concord_consensus::{
    Action, ConsensusConfig, Decision, ForestPredictor, Orchestrator, StaticPredictor, combine,
};
use concord_forest::{MaxFeatures, OobMode, RandomForestConfig};
use concord_io::{
    ClassSet, ConsensusInputReader, FeatureReader, PredictionRecord, ReportWriter, RunName,
    TrainingReader, TrainingSummary, prediction_records,
};

#[derive(Parser)]
#[command(name = "concord")]
#[command(about = "Random-forest classification and multi-source consensus signals")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Training data and forest hyperparameters.
#[derive(Args, Debug, Clone)]
struct ForestArgs {
    /// Path to the training CSV (`label,feature1,...`)
    #[arg(long)]
    data: PathBuf,

    /// Class names in index order
    #[arg(long, default_value = "BUY,SELL,HOLD")]
    classes: String,

    /// Class an untrained forest answers with (defaults to HOLD if listed,
    /// else the last class)
    #[arg(long)]
    neutral: Option<String>,

    /// Number of trees in the Random Forest
    #[arg(long, default_value_t = 100)]
    n_trees: usize,

    /// Maximum tree depth
    #[arg(long, default_value_t = 15)]
    max_depth: usize,

    /// Partition size at or below which a node becomes a leaf
    #[arg(long, default_value_t = 5)]
    min_samples_split: usize,

    /// Features drawn per split: "sqrt", "log2", "all", a count, or a
    /// fraction such as 0.5
    #[arg(long, default_value = "sqrt")]
    max_features: String,

    /// Abort training if it runs longer than this many seconds
    #[arg(long)]
    time_budget_secs: Option<u64>,
}

/// Consensus scoring and risk parameters.
#[derive(Args, Debug, Clone)]
struct ConsensusArgs {
    /// Current price
    #[arg(long)]
    price: f64,

    /// Volatility estimate such as ATR (defaults to 2% of price)
    #[arg(long)]
    volatility: Option<f64>,

    /// Volatility multiple between price and target
    #[arg(long, default_value_t = 2.5)]
    target_multiplier: f64,

    /// Volatility multiple between price and stop; must be below the target multiple
    #[arg(long, default_value_t = 1.5)]
    stop_multiplier: f64,

    /// Agreement at or above which a decision is strong
    #[arg(long, default_value_t = 0.6)]
    min_consensus: f64,

    /// Portfolio value used for the max-loss estimate
    #[arg(long, default_value_t = 10_000.0)]
    portfolio_value: f64,
}

/// Where to write JSON reports, if anywhere.
#[derive(Args, Debug, Clone)]
struct OutputArgs {
    /// Run name for output files (must match [a-zA-Z0-9_-]+); no files are
    /// written without it
    #[arg(long)]
    run: Option<String>,

    /// Output directory for result files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Train a Random Forest and optionally predict unlabeled rows
    Train {
        #[command(flatten)]
        forest: ForestArgs,

        /// Compute out-of-bag accuracy and confusion matrix
        #[arg(long, default_value_t = false)]
        oob: bool,

        /// Path to an inference CSV (`id,feature1,...`) to predict
        #[arg(long)]
        predict: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Combine pre-computed source predictions into one decision
    Combine {
        /// Path to a JSON array of {source, action, confidence, weight}
        #[arg(long)]
        inputs: PathBuf,

        #[command(flatten)]
        consensus: ConsensusArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Train a forest, then decide on one feature vector with optional
    /// external sources
    Signal {
        #[command(flatten)]
        forest: ForestArgs,

        /// Comma-separated feature values, in training column order
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        features: Vec<f64>,

        /// Path to a JSON array of external source predictions
        #[arg(long)]
        sources: Option<PathBuf>,

        /// Weight of the forest among the sources
        #[arg(long, default_value_t = 1.0)]
        forest_weight: f64,

        #[command(flatten)]
        consensus: ConsensusArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct TrainOutput {
    #[serde(flatten)]
    summary: TrainingSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    predictions: Option<Vec<PredictionRecord>>,
}

fn parse_max_features(s: &str) -> Result<MaxFeatures> {
    match s {
        "sqrt" => Ok(MaxFeatures::Sqrt),
        "log2" => Ok(MaxFeatures::Log2),
        "all" => Ok(MaxFeatures::All),
        other if other.contains('.') => other
            .parse::<f64>()
            .map(MaxFeatures::Fraction)
            .with_context(|| format!("invalid max-features fraction: {other}")),
        other => other.parse::<usize>().map(MaxFeatures::Fixed).with_context(|| {
            format!("unknown max-features: {other} (expected sqrt, log2, all, a count, a fraction)")
        }),
    }
}

fn neutral_index(classes: &ClassSet, neutral: Option<&str>) -> Result<usize> {
    match neutral {
        Some(name) => classes
            .index_of(name)
            .with_context(|| format!("neutral class {name} is not one of {:?}", classes.names())),
        None => Ok(classes
            .index_of(Action::Hold.as_str())
            .unwrap_or(classes.len() - 1)),
    }
}

fn forest_config(
    args: &ForestArgs,
    classes: &ClassSet,
    feature_names: &[String],
    seed: u64,
) -> Result<RandomForestConfig> {
    let neutral = neutral_index(classes, args.neutral.as_deref())?;
    let mut config = RandomForestConfig::new(args.n_trees)?
        .with_max_depth(args.max_depth)
        .with_min_samples_split(args.min_samples_split)
        .with_max_features(parse_max_features(&args.max_features)?)
        .with_classes(classes.len(), neutral)
        .with_feature_names(feature_names.to_vec())
        .with_seed(seed);
    if let Some(secs) = args.time_budget_secs {
        config = config.with_time_budget(Duration::from_secs(secs));
    }
    Ok(config)
}

fn consensus_config(args: &ConsensusArgs) -> ConsensusConfig {
    ConsensusConfig::new()
        .with_multipliers(args.target_multiplier, args.stop_multiplier)
        .with_min_consensus(args.min_consensus)
        .with_portfolio_value(args.portfolio_value)
}

fn report_writer(output: &OutputArgs) -> Result<Option<ReportWriter>> {
    output
        .run
        .as_ref()
        .map(|run| -> Result<ReportWriter> {
            let run = RunName::new(run.clone())?;
            ReportWriter::new(&output.output_dir, run).context("failed to prepare output directory")
        })
        .transpose()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Train {
            forest,
            oob,
            predict,
            output,
        } => {
            let writer = report_writer(&output)?;
            let classes = ClassSet::parse(&forest.classes)?;

            // 1. Read training data
            let set = TrainingReader::new(&forest.data, classes)
                .read()
                .context("failed to read training CSV")?;

            // 2. Train
            let oob_mode = if oob { OobMode::Enabled } else { OobMode::Disabled };
            let config = forest_config(&forest, set.classes(), set.feature_names(), cli.seed)?
                .with_oob_mode(oob_mode);
            let result = config.fit(set.samples()).context("training failed")?;
            let summary = TrainingSummary::new(set.classes(), set.class_counts(), &result);

            // 3. Optionally predict unlabeled rows
            let predictions = match predict {
                Some(path) => {
                    let table = FeatureReader::new(&path)
                        .read_matching(set.feature_names())
                        .context("failed to read inference CSV")?;
                    let predictions = result
                        .forest()
                        .predict_batch(table.rows())
                        .context("prediction failed")?;
                    Some(prediction_records(&table, &predictions, set.classes()))
                }
                None => None,
            };

            // 4. Write JSON artifacts
            if let Some(writer) = &writer {
                writer.write_training(&summary)?;
                if let Some(records) = &predictions {
                    writer.write_predictions(records)?;
                }
            }

            let output = TrainOutput {
                summary,
                predictions,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Combine {
            inputs,
            consensus,
            output,
        } => {
            let writer = report_writer(&output)?;
            let config = consensus_config(&consensus);

            let inputs = ConsensusInputReader::new(&inputs)
                .read()
                .context("failed to read consensus inputs")?;
            let volatility = consensus
                .volatility
                .unwrap_or(consensus.price * config.fallback_volatility_fraction());
            let result = combine(&inputs, consensus.price, volatility, &config)
                .context("consensus failed")?;

            let decision = Decision {
                result,
                skipped: Vec::new(),
            };
            if let Some(writer) = &writer {
                writer.write_decision(&decision)?;
            }
            println!("{}", serde_json::to_string_pretty(&decision)?);
        }

        Command::Signal {
            forest,
            features,
            sources,
            forest_weight,
            consensus,
            output,
        } => {
            let writer = report_writer(&output)?;
            let classes = ClassSet::parse(&forest.classes)?;
            let class_actions = classes
                .names()
                .iter()
                .map(|name| name.parse::<Action>())
                .collect::<Result<Vec<_>, _>>()
                .context("signal requires class names BUY, SELL or HOLD")?;

            // 1. Train the forest source
            let set = TrainingReader::new(&forest.data, classes)
                .read()
                .context("failed to read training CSV")?;
            let expected = set.feature_names().len();
            if features.len() != expected {
                anyhow::bail!(
                    "--features has {} values but the training data has {expected} columns ({})",
                    features.len(),
                    set.feature_names().join(",")
                );
            }
            let result = forest_config(&forest, set.classes(), set.feature_names(), cli.seed)?
                .fit(set.samples())
                .context("training failed")?;
            let forest_source = ForestPredictor::new("forest", Arc::new(result.into_forest()))
                .and_then(|p| p.with_class_actions(class_actions))?;

            // 2. Register sources
            let mut orchestrator = Orchestrator::new(consensus_config(&consensus))?;
            orchestrator.add_source(Box::new(forest_source), forest_weight)?;
            if let Some(path) = sources {
                let external = ConsensusInputReader::new(&path)
                    .read()
                    .context("failed to read external sources")?;
                for input in external {
                    let predictor =
                        StaticPredictor::new(input.source, input.action, input.confidence);
                    orchestrator.add_source(Box::new(predictor), input.weight)?;
                }
            }
            info!(n_sources = orchestrator.n_sources(), "sources registered");

            // 3. Decide
            let decision = orchestrator
                .decide(&features, consensus.price, consensus.volatility)
                .context("decision failed")?;

            if let Some(writer) = &writer {
                writer.write_decision(&decision)?;
            }
            println!("{}", serde_json::to_string_pretty(&decision)?);
        }
    }

    Ok(())
}
