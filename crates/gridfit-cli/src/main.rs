use clap::Parser;
use std::io;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod case;
mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Solve {
            case,
            solver,
            table,
            pretty,
        } => commands::solve::handle(case, solver, *table, *pretty),
        Commands::Layout { case, json } => commands::layout::handle(case, *json),
        Commands::Evaluate {
            case,
            x,
            solver,
            pretty,
        } => commands::evaluate::handle(case, x.as_deref(), solver, *pretty),
    };

    if let Err(err) = result {
        error!("{err:#}");
        std::process::exit(1);
    }
}
