use anyhow::{Context, Result};
use clap::Parser;
use perfbatch::aggregator::CentralAggregator;
use perfbatch::cli::Cli;
use perfbatch::config::CollectorConfig;
use perfbatch::stress::{self, StressPlan};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::from_default_env()
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Config file first, then command-line overrides
fn resolve_config(args: &Cli) -> Result<CollectorConfig> {
    let mut config = match &args.config {
        Some(path) => CollectorConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => CollectorConfig::default(),
    };

    if let Some(capacity) = args.buffer_capacity {
        config.buffer_capacity = capacity;
    }
    if let Some(max_profiles) = args.max_profiles {
        config.max_profiles = max_profiles;
    }

    config.validate().context("Invalid collector configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = resolve_config(&args)?;
    tracing::debug!(?config, "resolved collector configuration");

    let aggregator = Arc::new(CentralAggregator::with_config(&config)?);
    let plan = StressPlan {
        threads: args.threads,
        samples_per_thread: args.samples,
        operations: args.operations,
        error_rate: args.error_rate,
        buffer_capacity: config.buffer_capacity,
    };

    let report = stress::run(&plan, aggregator).context("Stress run failed")?;
    print!("{}", report.render(args.top));

    Ok(())
}
