//! Dashkit CLI
//!
//! Command-line interface for running dashboard command scripts

use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "dashkit")]
#[command(about = "Dashkit - Dashboard command runtime", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Replay a JSON command script and print the emitted events
    Replay(commands::replay::ReplayArgs),
    /// List the command types and whether this build handles them
    Commands(commands::list::ListArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Replay(args) => commands::replay::execute(args).await,
        Commands::Commands(args) => commands::list::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
