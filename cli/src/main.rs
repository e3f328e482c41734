//! Main entry point for addrdiff CLI

use clap::Parser;

mod cli;
mod commands;
mod output;
mod progress;

use cli::Cli;
use commands::execute_command;

fn main() {
    // Load environment variables from .env file if present
    if std::path::Path::new(".env").exists() {
        if let Err(e) = dotenv::dotenv() {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging (env_logger caps at its own filter, so the
    // verbose flag has to be applied before init)
    env_logger::Builder::from_default_env()
        .filter_level(log_level(cli.verbose))
        .init();

    // Execute the command
    if let Err(e) = execute_command(cli.command) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn log_level(verbose: bool) -> log::LevelFilter {
    if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_flag_raises_log_level() {
        assert_eq!(log_level(false), log::LevelFilter::Info);
        assert_eq!(log_level(true), log::LevelFilter::Debug);
    }
}
