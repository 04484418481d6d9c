//! A small tool for working with circllhist histograms: decoding and printing them, summarizing them, and building them
//! from a stream of values.

#![deny(missing_docs)]

use std::io;

use clap::Parser as _;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

mod commands;

mod config;
use self::config::{Action, Cli, ToolConfig};

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(cli.log_level().into())
                .from_env_lossy(),
        )
        .with_writer(io::stderr)
        .with_ansi(true)
        .with_target(true)
        .init();

    if let Err(e) = run(cli) {
        error!("{:?}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => ToolConfig::try_from_file(path)?,
        None => ToolConfig::default(),
    };
    debug!(?config, "Loaded configuration.");

    let mut out = io::stdout().lock();
    match cli.action {
        Action::Decode(args) => {
            let inputs = commands::collect_inputs(args.histograms, io::stdin().lock())?;
            commands::decode(&inputs, args.format.unwrap_or(config.format), &mut out)
        }
        Action::Stats(args) => {
            let inputs = commands::collect_inputs(args.histograms, io::stdin().lock())?;
            let quantiles = args.quantiles.unwrap_or(config.quantiles);
            commands::stats(&inputs, &quantiles, &mut out)
        }
        Action::Build => commands::build(&config.histogram, io::stdin().lock(), &mut out),
    }
}
