use std::path::{Path, PathBuf};

use anyhow::Context as _;
use circllhist::HistogramConfig;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;

const DEFAULT_QUANTILES: [f64; 4] = [0.5, 0.9, 0.99, 1.0];

#[derive(Parser)]
#[command(about, version)]
pub struct Cli {
    /// Enable verbose output. (Specify twice for more verbosity.)
    #[arg(global = true, short = 'v', long, action = ArgAction::Count, default_value_t = 0)]
    verbose: u8,

    /// Path to a YAML configuration file.
    #[arg(global = true, short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub action: Action,
}

impl Cli {
    /// Gets the configured log level based on the user-supplied verbosity level.
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

#[derive(Subcommand)]
pub enum Action {
    /// Decode base64-encoded histograms and print their buckets.
    Decode(DecodeArgs),

    /// Decode base64-encoded histograms and print summary statistics.
    Stats(StatsArgs),

    /// Build a histogram interactively from commands and values read from stdin.
    ///
    /// Numbers are inserted as samples. `p` prints the buckets, `j` prints them as JSON, `b` prints the bucket count,
    /// `s` prints the base64 encoding, `x N` compresses with minimum bucket exponent N, and `q` quits.
    Build,
}

#[derive(Args)]
pub struct DecodeArgs {
    /// Output format. Overrides the configuration file.
    #[arg(short = 'f', long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Histograms to decode. Read from stdin, one per line, if none are given.
    pub histograms: Vec<String>,
}

#[derive(Args)]
pub struct StatsArgs {
    /// Comma-separated quantiles to compute. Overrides the configuration file.
    #[arg(short = 'q', long, value_delimiter = ',')]
    pub quantiles: Option<Vec<f64>>,

    /// Histograms to summarize. Read from stdin, one per line, if none are given.
    pub histograms: Vec<String>,
}

/// How decoded histograms are printed.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// One `H[label]->count` line per bucket.
    #[default]
    Text,

    /// A JSON object of bucket labels to counts.
    Json,
}

/// Settings loaded from the configuration file.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolConfig {
    /// Allocation settings for histograms built by the tool.
    pub histogram: HistogramConfig,

    /// Default output format of `decode`.
    pub format: OutputFormat,

    /// Default quantiles computed by `stats`.
    pub quantiles: Vec<f64>,
}

impl ToolConfig {
    /// Loads the configuration from the given YAML file.
    pub fn try_from_file<P>(config_path: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
    {
        let config_path = config_path.as_ref();
        let config_file_raw = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read configuration file '{}'.", config_path.display()))?;
        let config: Self = serde_yaml::from_str(&config_file_raw).context("Failed to parse configuration file.")?;

        Ok(config)
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            histogram: HistogramConfig::default(),
            format: OutputFormat::default(),
            quantiles: DEFAULT_QUANTILES.to_vec(),
        }
    }
}
