//! tola-resources - serve versioned resource sets over HTTP.

mod cli;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use tola_resources::config::Config;
use tola_resources::{logger, serve};

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    serve::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let mut config = Config::load(&cli.config)?;
    cli.apply_to(&mut config);

    match &cli.command {
        Commands::Serve { .. } => cli::serve::serve(&config),
        Commands::Serialize { pretty } => cli::serialize::serialize(&config, *pretty),
    }
}
