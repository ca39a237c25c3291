//! mappacker CLI - Command-line interface
//!
//! Packages map styles into MBTiles archives, either once from the command
//! line or continuously from a spool queue.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};
use commands::config::ConfigCommands;
use commands::render::RenderArgs;
use commands::worker::WorkerArgs;

#[derive(Parser)]
#[command(name = "mappacker")]
#[command(version = mappacker::VERSION)]
#[command(about = "Package map styles into MBTiles tile archives", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Package one archive and exit
    Render(RenderArgs),

    /// Process archive requests from the spool queue
    Worker(WorkerArgs),

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Render(args) => commands::render::run(args),
        Commands::Worker(args) => commands::worker::run(args),
        Commands::Config(command) => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
