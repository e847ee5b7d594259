//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// CoopCheck - chicken health detector demo
///
/// Pick a photo of a bird, watch the (simulated) analysis, and get a
/// diagnosis with recommendations. Results are kept in a local store.
///
/// Examples:
///   coopcheck analyze ./hen.jpg
///   coopcheck history --format markdown
///   coopcheck show analysis_1719671400000_k3j9x0a2b
///   coopcheck delete sample_2 --yes
///   coopcheck init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for .coopcheck.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Store file holding past analyses
    #[arg(short, long, value_name = "FILE", env = "COOPCHECK_STORE", global = true)]
    pub store: Option<PathBuf>,

    /// Key the analyses are stored under inside the store file
    #[arg(long, value_name = "KEY", global = true)]
    pub store_key: Option<String>,

    /// Output format (text, markdown, json)
    #[arg(short, long, value_name = "FORMAT", global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Analyse an image and store the result
    Analyze {
        /// JPEG or PNG image, at most 5MB
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Seed for reproducible diagnosis selection
        #[arg(long, value_name = "N")]
        seed: Option<u64>,

        /// Milliseconds between progress stages
        #[arg(long, value_name = "MS")]
        stage_interval_ms: Option<u64>,
    },

    /// List stored analyses, newest first
    History {
        /// Only show analyses with this diagnosis
        #[arg(long, value_name = "DIAGNOSIS")]
        diagnosis: Option<String>,

        /// Show at most this many analyses
        #[arg(long, value_name = "COUNT")]
        limit: Option<usize>,
    },

    /// Show one analysis in detail
    Show {
        /// Analysis id
        id: String,
    },

    /// Delete an analysis
    Delete {
        /// Analysis id
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Generate a default .coopcheck.toml configuration file
    InitConfig,
}

/// Output format for listings and detail views.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain terminal text (default)
    #[default]
    Text,
    /// Markdown format
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Stage interval given on the command line, if any.
    pub fn stage_interval_ms(&self) -> Option<u64> {
        match self.command {
            Command::Analyze {
                stage_interval_ms, ..
            } => stage_interval_ms,
            _ => None,
        }
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.stage_interval_ms() == Some(0) {
            return Err("Stage interval must be at least 1 millisecond".to_string());
        }

        if let Command::History { limit: Some(0), .. } = self.command {
            return Err("Limit must be at least 1".to_string());
        }

        if let Some(ref key) = self.store_key {
            if key.trim().is_empty() {
                return Err("Store key must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_parse_analyze() {
        let args = parse(&["coopcheck", "analyze", "hen.jpg", "--seed", "4"]);
        match args.command {
            Command::Analyze { image, seed, .. } => {
                assert_eq!(image, PathBuf::from("hen.jpg"));
                assert_eq!(seed, Some(4));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let args = parse(&["coopcheck", "history", "--format", "json", "-s", "x.json"]);
        assert_eq!(args.format, Some(OutputFormat::Json));
        assert_eq!(args.store, Some(PathBuf::from("x.json")));
    }

    #[test]
    fn test_analyze_options_only_on_analyze() {
        assert!(Args::try_parse_from(["coopcheck", "history", "--seed", "4"]).is_err());
        assert!(Args::try_parse_from(["coopcheck", "--stage-interval-ms", "5", "show", "x"]).is_err());
        assert_eq!(parse(&["coopcheck", "history"]).stage_interval_ms(), None);
    }

    #[test]
    fn test_delete_yes_flag() {
        let args = parse(&["coopcheck", "delete", "sample_1", "-y"]);
        assert!(matches!(args.command, Command::Delete { ref id, yes: true } if id == "sample_1"));
    }

    #[test]
    fn test_missing_subcommand_is_error() {
        assert!(Args::try_parse_from(["coopcheck"]).is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let args = parse(&["coopcheck", "-v", "-q", "history"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_interval() {
        let args = parse(&["coopcheck", "analyze", "a.png", "--stage-interval-ms", "0"]);
        assert!(args.validate().is_err());

        let args = parse(&["coopcheck", "analyze", "a.png", "--stage-interval-ms", "5"]);
        assert!(args.validate().is_ok());
        assert_eq!(args.stage_interval_ms(), Some(5));
    }

    #[test]
    fn test_validation_zero_limit() {
        let args = parse(&["coopcheck", "history", "--limit", "0"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = parse(&["coopcheck", "history"]);
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
