use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use evi_cli::commands::{export, query, stats};
use evi_cli::{Cli, Commands, Config, InputArgs, edit_log};
use evi_core::EventIndex;

/// Load config and replay the edit log into a fresh index.
fn open_index(config_path: Option<&Path>, input: &InputArgs) -> Result<(EventIndex, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let index = edit_log::load(input.input.as_deref())?;
    Ok((index, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let config_path = cli.config.as_deref();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Some(Commands::Stats { input }) => {
            let (index, _config) = open_index(config_path, input)?;
            stats::run(&mut out, &index)?;
        }
        Some(Commands::Covering { frame, input }) => {
            let (index, _config) = open_index(config_path, input)?;
            query::covering(&mut out, &index, *frame)?;
        }
        Some(Commands::Spanning(range)) => {
            let (index, _config) = open_index(config_path, &range.input)?;
            query::spanning(&mut out, &index, range)?;
        }
        Some(Commands::Within { range, overspill }) => {
            let (index, _config) = open_index(config_path, &range.input)?;
            query::within(&mut out, &index, range, *overspill)?;
        }
        Some(Commands::Starting(range)) => {
            let (index, _config) = open_index(config_path, &range.input)?;
            query::starting(&mut out, &index, range)?;
        }
        Some(Commands::Nearest(args)) => {
            let (index, _config) = open_index(config_path, &args.input)?;
            query::nearest(&mut out, &index, args)?;
        }
        Some(Commands::ExportXml(args)) => {
            let (index, config) = open_index(config_path, &args.input)?;
            export::run_xml(&mut out, &index, args, &config)?;
        }
        Some(Commands::ExportDelimited(args)) => {
            let (index, config) = open_index(config_path, &args.input)?;
            export::run_delimited(&mut out, &index, args, &config)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    out.flush()?;
    Ok(())
}
