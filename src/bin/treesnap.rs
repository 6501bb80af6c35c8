//! Treesnap CLI Binary
//!
//! Command-line interface for inspecting and maintaining tree snapshots.

use clap::Parser;
use std::process;
use treesnap::logging::init_logging;
use treesnap::tooling::cli::{Cli, CliContext};

fn main() {
    let cli = Cli::parse();

    // Create CLI context
    let context = match CliContext::new(cli.config.clone(), cli.data_dir.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error loading configuration: {:#}", e);
            process::exit(1);
        }
    };

    let logging = cli.logging_config(&context.config().logging);
    if let Err(e) = init_logging(Some(&logging)) {
        eprintln!("Error initializing logging: {}", e);
        process::exit(1);
    }

    // Execute command
    match context.execute(&cli.command) {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
