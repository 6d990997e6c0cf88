//! Command line argument parsing for the Sapa CLI using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Sapa - an intent-classification chat engine
#[derive(Parser, Debug, Clone)]
#[command(name = "sapa")]
#[command(about = "Normalize, classify and answer chat messages")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct SapaArgs {
    /// Verbosity level (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Engine configuration file (JSON)
    #[arg(short, long, value_name = "FILE", env = "SAPA_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl SapaArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose.saturating_add(1)
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Chat interactively on stdin, one session until EOF
    Chat(ChatArgs),

    /// Classify messages and print their replies
    Classify(ClassifyArgs),

    /// Print the normalized form of messages
    Normalize(NormalizeArgs),

    /// Fit artifacts from a labelled dataset
    Train(TrainArgs),

    /// Measure accuracy against a labelled dataset
    Evaluate(EvaluateArgs),
}

/// Normalizer settings shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct NormalizerArgs {
    /// Slang table (two columns: slang, replacement)
    #[arg(long, value_name = "FILE")]
    pub slang: Option<PathBuf>,

    /// Remove English stop words
    #[arg(long)]
    pub remove_stopwords: bool,

    /// Lemmatize tokens
    #[arg(long)]
    pub lemmatize: bool,
}

/// Settings for commands that run the inference engine.
#[derive(Args, Debug, Clone, Default)]
pub struct EngineArgs {
    /// Directory holding the model artifacts
    #[arg(short, long, value_name = "DIR")]
    pub artifact_dir: Option<PathBuf>,

    /// Response dataset (Intent and Respon columns)
    #[arg(short, long, value_name = "CSV")]
    pub responses: Option<PathBuf>,

    /// Answer predictions scoring below this with the fallback
    #[arg(long, value_name = "SCORE")]
    pub min_confidence: Option<f64>,

    #[command(flatten)]
    pub normalizer: NormalizerArgs,
}

/// Arguments for interactive chat
#[derive(Args, Debug, Clone)]
pub struct ChatArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    /// Print the whole conversation when the session ends
    #[arg(long)]
    pub transcript: bool,
}

/// Arguments for classifying messages
#[derive(Args, Debug, Clone)]
pub struct ClassifyArgs {
    /// Messages to classify
    #[arg(value_name = "TEXT", required = true)]
    pub texts: Vec<String>,

    #[command(flatten)]
    pub engine: EngineArgs,
}

/// Arguments for normalizing messages
#[derive(Args, Debug, Clone)]
pub struct NormalizeArgs {
    /// Messages to normalize
    #[arg(value_name = "TEXT", required = true)]
    pub texts: Vec<String>,

    #[command(flatten)]
    pub normalizer: NormalizerArgs,
}

/// Arguments for training
#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// Labelled dataset (Intent column plus a text column)
    #[arg(short, long, value_name = "CSV")]
    pub dataset: PathBuf,

    /// Output directory for the artifacts
    #[arg(short, long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Name of the text column
    #[arg(long, value_name = "NAME")]
    pub text_column: Option<String>,

    /// Write bincode artifacts instead of JSON
    #[arg(long)]
    pub binary: bool,

    #[command(flatten)]
    pub normalizer: NormalizerArgs,
}

/// Arguments for evaluation
#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    /// Labelled dataset (Intent column plus a text column)
    #[arg(short, long, value_name = "CSV")]
    pub dataset: PathBuf,

    /// Name of the text column
    #[arg(long, value_name = "NAME")]
    pub text_column: Option<String>,

    /// Number of misclassified samples to list
    #[arg(long, default_value = "10")]
    pub show_errors: usize,

    #[command(flatten)]
    pub engine: EngineArgs,
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
