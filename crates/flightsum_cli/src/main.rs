pub mod config;

use crate::config::Config;
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use flightsum_core::summary::with_json_extension;
use flightsum_core::{
    mine_associations, Dataset, EngineConfig, RecordRewriter, Summary, SummaryEngine, Vocabulary,
};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "flightsum")]
#[command(about = "Fuzzy linguistic summaries and gradual associations over flight records")]
struct Cli {
    /// Configuration file (defaults to ~/.flightsum/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Maximum log level
    #[arg(long, global = true, default_value = "info")]
    log_level: tracing::Level,

    #[command(flatten)]
    engine: EngineOverrides,

    #[command(subcommand)]
    command: Commands,
}

/// Command-line overrides applied on top of the `[engine]` config section.
#[derive(Args, Debug, Default)]
struct EngineOverrides {
    /// Records per batch (one worker per batch)
    #[arg(long, global = true)]
    batch_size: Option<usize>,

    /// Lines starting with this character are skipped
    #[arg(long, global = true)]
    comment_marker: Option<char>,

    /// Dataset field delimiter
    #[arg(long, global = true)]
    delimiter: Option<char>,

    /// Conditional degree from which a term counts as practically certain
    #[arg(long, global = true)]
    certainty_threshold: Option<f64>,
}

impl EngineOverrides {
    fn apply(&self, engine: &mut EngineConfig) {
        if let Some(batch_size) = self.batch_size {
            engine.batch_size = batch_size;
        }
        if let Some(marker) = self.comment_marker {
            engine.comment_marker = marker;
        }
        if let Some(delimiter) = self.delimiter {
            engine.delimiter = delimiter;
        }
        if let Some(threshold) = self.certainty_threshold {
            engine.certainty_threshold = threshold;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a dataset: mean summary, or conditional summary when premise terms are given
    Summarize {
        /// Vocabulary file (TOML)
        vocabulary: PathBuf,
        /// Dataset file (CSV with header)
        dataset: PathBuf,
        /// Premise terms, optionally followed by a numeric alpha threshold
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Mine association degrees from two saved summaries
    Assoc {
        /// Mean summary R (defaults to the configured mean summary path)
        r: Option<PathBuf>,
        /// Conditional summary R_v (defaults to the configured alpha summary path)
        rv: Option<PathBuf>,
        /// Exact number of records summarized into R_v
        #[arg(long)]
        count: Option<usize>,
    },
    /// Mean run, conditional run and association mining in one go
    Pipeline {
        /// Vocabulary file (TOML)
        vocabulary: PathBuf,
        /// Dataset file (CSV with header)
        dataset: PathBuf,
        /// Premise terms, optionally followed by a numeric alpha threshold
        #[arg(required = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

/// Splits trailing arguments into premise terms and alpha.
///
/// The last argument is alpha when it parses as a number, otherwise alpha is 0.
/// No arguments at all means no premise.
fn parse_premise(args: &[String]) -> Option<(Vec<String>, f64)> {
    let (last, rest) = args.split_last()?;
    match last.parse::<f64>() {
        Ok(alpha) => Some((rest.to_vec(), alpha)),
        Err(_) => Some((args.to_vec(), 0.0)),
    }
}

/// Loads the dataset and binds the vocabulary to its header.
///
/// Returns `None` after logging a diagnostic when either file is missing.
fn load_inputs(
    vocabulary: &Path,
    dataset: &Path,
    engine: &EngineConfig,
) -> anyhow::Result<Option<(Dataset, RecordRewriter)>> {
    if !vocabulary.is_file() {
        error!(path = %vocabulary.display(), "Voc file not found");
        return Ok(None);
    }
    if !dataset.is_file() {
        error!(path = %dataset.display(), "Data file not found");
        return Ok(None);
    }

    let vocabulary = Vocabulary::load(vocabulary)
        .with_context(|| format!("loading vocabulary {}", vocabulary.display()))?;
    let data = Dataset::load(dataset, engine)
        .with_context(|| format!("loading dataset {}", dataset.display()))?;
    let rewriter = vocabulary.bind(&data.headers)?;
    info!(
        records = data.len(),
        terms = vocabulary.terms().len(),
        "Inputs loaded"
    );
    Ok(Some((data, rewriter)))
}

fn summarize(config: &Config, vocabulary: &Path, dataset: &Path, args: &[String]) -> anyhow::Result<()> {
    let Some((data, rewriter)) = load_inputs(vocabulary, dataset, &config.engine)? else {
        return Ok(());
    };
    let engine = SummaryEngine::new(&rewriter, config.engine.clone());

    match parse_premise(args) {
        None => {
            let r = engine.summarize_mean(&data.records)?;
            r.save(config.output.mean_summary_path())?;
        }
        Some((premise, alpha)) => {
            let rv = engine.summarize_satisfying(&data.records, &premise, alpha)?;
            rv.summary.save(config.output.alpha_summary_path())?;
            info!(
                total_satisfying_count = rv.total_satisfying_count,
                "Pass --count {} to `assoc` for exact coverage",
                rv.total_satisfying_count
            );
        }
    }
    Ok(())
}

fn assoc(config: &Config, r: Option<PathBuf>, rv: Option<PathBuf>, count: Option<usize>) -> anyhow::Result<()> {
    let r_path = r.unwrap_or_else(|| with_json_extension(config.output.mean_summary_path()));
    let rv_path = rv.unwrap_or_else(|| with_json_extension(config.output.alpha_summary_path()));
    info!(r = %r_path.display(), rv = %rv_path.display(), "Doing assoc");

    let r = Summary::load(&r_path).with_context(|| format!("loading R from {}", r_path.display()))?;
    let rv =
        Summary::load(&rv_path).with_context(|| format!("loading R_v from {}", rv_path.display()))?;

    let table = mine_associations(&r, &rv, count, &config.engine);
    table.save(config.output.association_path())?;
    Ok(())
}

fn pipeline(config: &Config, vocabulary: &Path, dataset: &Path, args: &[String]) -> anyhow::Result<()> {
    let Some((premise, alpha)) = parse_premise(args) else {
        anyhow::bail!("pipeline needs at least one premise term");
    };
    if premise.is_empty() {
        anyhow::bail!("pipeline needs at least one premise term before alpha");
    }
    let Some((data, rewriter)) = load_inputs(vocabulary, dataset, &config.engine)? else {
        return Ok(());
    };
    let engine = SummaryEngine::new(&rewriter, config.engine.clone());

    let r = engine.summarize_mean(&data.records)?;
    r.save(config.output.mean_summary_path())?;

    let rv = engine.summarize_satisfying(&data.records, &premise, alpha)?;
    rv.summary.save(config.output.alpha_summary_path())?;

    let table = engine.mine_associations(&r, &rv);
    table.save(config.output.association_path())?;
    Ok(())
}

fn init_logging(json: bool, level: tracing::Level) {
    let builder = tracing_subscriber::fmt().with_max_level(level);
    let result = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    if let Err(e) = result {
        eprintln!("setting default subscriber failed: {e}");
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.json_logs, cli.log_level);

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Could not load configuration");
            std::process::exit(1);
        }
    };
    cli.engine.apply(&mut config.engine);
    info!(config = ?config, "Starting flightsum with Configuration");

    let result = match cli.command {
        Commands::Summarize {
            vocabulary,
            dataset,
            args,
        } => summarize(&config, &vocabulary, &dataset, &args),
        Commands::Assoc { r, rv, count } => assoc(&config, r, rv, count),
        Commands::Pipeline {
            vocabulary,
            dataset,
            args,
        } => pipeline(&config, &vocabulary, &dataset, &args),
    };

    if let Err(e) = result {
        error!(error = %format!("{e:#}"), "Fatal Error");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_args_means_mean_run() {
        assert_eq!(parse_premise(&[]), None);
    }

    #[test]
    fn test_trailing_number_is_alpha() {
        let (premise, alpha) = parse_premise(&strings(&["Delay.high", "Distance.long", "0.3"])).unwrap();
        assert_eq!(premise, strings(&["Delay.high", "Distance.long"]));
        assert_eq!(alpha, 0.3);
    }

    #[test]
    fn test_alpha_defaults_to_zero() {
        let (premise, alpha) = parse_premise(&strings(&["Delay.high"])).unwrap();
        assert_eq!(premise, strings(&["Delay.high"]));
        assert_eq!(alpha, 0.0);
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "flightsum",
            "--batch-size",
            "500",
            "summarize",
            "voc.toml",
            "flights.csv",
            "Delay.high",
            "0.2",
        ])
        .unwrap();
        assert_eq!(cli.engine.batch_size, Some(500));
        match cli.command {
            Commands::Summarize { args, .. } => assert_eq!(args, strings(&["Delay.high", "0.2"])),
            _ => panic!("expected summarize"),
        }
    }

    #[test]
    fn test_missing_inputs_are_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_inputs(
            &dir.path().join("voc.toml"),
            &dir.path().join("flights.csv"),
            &EngineConfig::default(),
        )
        .unwrap();
        assert!(loaded.is_none());
    }
}
