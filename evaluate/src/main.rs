use anyhow::{Context, Result};
use evaluate::config::Config;
use std::{env, path::PathBuf};
use structopt::StructOpt;
use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter};

#[derive(Debug, Clone, StructOpt)]
/// Evaluate Mask R-CNN model
struct Args {
    #[structopt(long, default_value = "evaluate.json5")]
    /// configuration file
    pub config_file: PathBuf,
    #[structopt(long)]
    /// reuse an existing results file instead of regenerating it
    pub skip_generation: bool,
}

pub fn main() -> Result<()> {
    // setup tracing
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true).compact();
    let filter_layer = {
        let filter = EnvFilter::from_default_env();
        if env::var("RUST_LOG").is_err() {
            filter.add_directive(LevelFilter::INFO.into())
        } else {
            filter
        }
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    // parse arguments
    let Args {
        config_file,
        skip_generation,
    } = Args::from_args();
    let config = Config::open(&config_file)
        .with_context(|| format!("failed to load config file '{}'", config_file.display()))?;

    // start evaluation program
    evaluate::start(config, !skip_generation)?;

    Ok(())
}
