mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod utils;

use crate::cli::{Cli, Commands};
use crate::error::Result;
use crate::utils::progress::ProgressDisplay;
use clap::Parser;
use std::num::NonZeroUsize;
use tracing::{debug, error, info};

fn main() {
    if let Err(e) = run_app() {
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    info!("LICHEM CLI v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    let available_cpus = cli
        .threads
        .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, NonZeroUsize::get));
    info!("{} CPU(s) available to this run.", available_cpus);

    let display = if cli.quiet {
        ProgressDisplay::hidden()
    } else {
        ProgressDisplay::new()
    };

    let command_result = match cli.command {
        Commands::Embed(args) => {
            info!("Dispatching to 'embed' command.");
            commands::embed::run(args, available_cpus, display)
        }
        Commands::GlobalPoles(args) => {
            info!("Dispatching to 'global-poles' command.");
            commands::global_poles::run(args, available_cpus, display)
        }
        Commands::Check(args) => {
            info!("Dispatching to 'check' command.");
            commands::check::run(args, available_cpus)
        }
    };

    match &command_result {
        Ok(()) => info!("Command completed successfully."),
        Err(e) => error!("Command failed: {}", e),
    }
    command_result
}
