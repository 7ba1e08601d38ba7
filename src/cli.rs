//! CLI argument parsing for the perfbatch stress driver

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "perfbatch")]
#[command(version)]
#[command(
    about = "Drive per-thread sample buffers into a shared aggregator and report the profiles",
    long_about = None
)]
pub struct Cli {
    /// Number of producer threads, each with its own buffer
    #[arg(short = 't', long = "threads", value_name = "N", default_value = "4")]
    pub threads: usize,

    /// Samples recorded by each thread
    #[arg(short = 'n', long = "samples", value_name = "N", default_value = "10000")]
    pub samples: usize,

    /// Distinct operation names shared by all threads
    #[arg(short = 'o', long = "operations", value_name = "N", default_value = "16")]
    pub operations: usize,

    /// Fraction of samples recorded as failures (0.0 to 1.0)
    #[arg(long = "error-rate", value_name = "RATE", default_value = "0.05")]
    pub error_rate: f64,

    /// Samples per thread buffer (overrides the config file)
    #[arg(long = "buffer-capacity", value_name = "N")]
    pub buffer_capacity: Option<usize>,

    /// Maximum tracked operations before LRU eviction (overrides the config file)
    #[arg(long = "max-profiles", value_name = "N")]
    pub max_profiles: Option<usize>,

    /// TOML file with buffer_capacity / max_profiles
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of profiles to print, slowest total time first
    #[arg(long = "top", value_name = "N", default_value = "10")]
    pub top: usize,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["perfbatch"]);
        assert_eq!(cli.threads, 4);
        assert_eq!(cli.samples, 10_000);
        assert_eq!(cli.operations, 16);
        assert_eq!(cli.error_rate, 0.05);
        assert_eq!(cli.top, 10);
        assert!(cli.buffer_capacity.is_none());
        assert!(cli.max_profiles.is_none());
        assert!(cli.config.is_none());
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "perfbatch",
            "-t",
            "8",
            "--samples",
            "500",
            "--buffer-capacity",
            "32",
            "--max-profiles",
            "4",
            "--config",
            "perfbatch.toml",
            "--debug",
        ]);
        assert_eq!(cli.threads, 8);
        assert_eq!(cli.samples, 500);
        assert_eq!(cli.buffer_capacity, Some(32));
        assert_eq!(cli.max_profiles, Some(4));
        assert_eq!(cli.config, Some(PathBuf::from("perfbatch.toml")));
        assert!(cli.debug);
    }

    #[test]
    fn test_cli_rejects_non_numeric_threads() {
        assert!(Cli::try_parse_from(["perfbatch", "--threads", "many"]).is_err());
    }
}
