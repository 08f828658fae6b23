//! Toolbox CLI entry point.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use toolbox_core::log;

mod cli;
mod commands;
mod ui;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = log::init(log::directive(cli.verbose, cli.debug, cli.quiet)) {
        eprintln!("{} {}", "Warning:".yellow().bold(), e);
    }

    match cli.execute().await {
        Ok(_) => Ok(()),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}
