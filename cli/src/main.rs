//! Main entry point for forcediff CLI

use clap::Parser;

mod cli;
mod commands;
mod output;

use cli::Cli;
use commands::execute_command;

fn main() {
    // Load environment variables from .env file if present
    if std::path::Path::new(".env").exists() {
        if let Err(e) = dotenv::dotenv() {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();

    if cli.verbose {
        log::set_max_level(log::LevelFilter::Debug);
    }

    if let Err(e) = execute_command(cli.command, cli.config.as_deref()) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
