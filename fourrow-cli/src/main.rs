//! Four-in-a-row CLI - Command-line interface
//!
//! Commands:
//! - decide: Choose a move for one position
//! - match: Play agent-vs-agent games
//! - params: Print or write a parameter file

mod decide_cmd;
mod match_cmd;
mod params_cmd;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fourrow")]
#[command(about = "Bounded-rationality four-in-a-row agent")]
struct Cli {
    /// Random seed (decisions are reproducible for a fixed seed)
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Choose a move for a single position
    Decide(decide_cmd::DecideArgs),
    /// Play agent-vs-agent games from the empty board
    Match(match_cmd::MatchArgs),
    /// Print or write the default parameter file
    Params(params_cmd::ParamsArgs),
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Decide(args) => decide_cmd::run(args, cli.seed),
        Commands::Match(args) => match_cmd::run(args, cli.seed),
        Commands::Params(args) => params_cmd::run(args),
    }
}

/// Log to stderr so JSON output on stdout stays clean
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
