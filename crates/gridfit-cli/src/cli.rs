use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gridfit", author, version, about, long_about = None)]
pub struct Cli {
    /// Log at debug level (RUST_LOG overrides this)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Solve the AC power flow at the setpoints stored in a case file
    Solve {
        /// Case file (.toml or .json)
        case: PathBuf,

        #[command(flatten)]
        solver: SolverArgs,

        /// Print bus and branch tables instead of JSON
        #[arg(long)]
        table: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Print the decision-vector layout of a case
    Layout {
        /// Case file (.toml or .json)
        case: PathBuf,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Score a decision vector against a case
    Evaluate {
        /// Case file (.toml or .json)
        case: PathBuf,

        /// Comma-separated decision vector; defaults to the case setpoints
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        x: Option<Vec<f64>>,

        #[command(flatten)]
        solver: SolverArgs,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

/// Overrides for the power-flow settings in the case file.
#[derive(Args, Debug, Clone, Default)]
pub struct SolverArgs {
    /// Linear backend (gauss or faer)
    #[arg(long)]
    pub solver: Option<String>,

    /// Convergence tolerance on the largest power mismatch (pu)
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Newton iteration budget
    #[arg(long)]
    pub max_iterations: Option<usize>,
}
