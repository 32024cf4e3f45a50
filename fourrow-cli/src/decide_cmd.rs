//! Decide command - choose a move for one position
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: load_position(), load_agent(), report_decision()
//! - Level 4: formatting utilities

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use fourrow_agent::{
    AgentParams, BestFirstAgent, SearchConfig, SearchOutcome, SearchPolicy, DEFAULT_SEED,
};
use fourrow_core::{FourInARow, GameState, Grid, Player, Rules};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct DecideArgs {
    /// Board key: rows joined by '-', cells ('.', '0', '1') separated by spaces
    #[arg(long)]
    pub board: String,

    /// Player to move (0 = black, 1 = white); inferred from piece counts if omitted
    #[arg(long)]
    pub player: Option<usize>,

    /// Parameter JSON file (defaults to the built-in parameters)
    #[arg(long, value_name = "FILE")]
    pub params: Option<PathBuf>,

    /// Stop after this many iterations at the latest
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Use the one-ply greedy policy instead of best-first search
    #[arg(long)]
    pub greedy: bool,

    /// Output the decision as JSON
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run decide command
///
/// 1. Parse the position
/// 2. Build the agent
/// 3. Search and report
pub fn run(args: DecideArgs, seed: Option<u64>) -> Result<()> {
    let state = load_position(&args)?;
    let rules = FourInARow::new(
        state.grid.rows(),
        state.grid.cols(),
        fourrow_core::game::DEFAULT_WIN_LENGTH,
    );
    if rules.valid_actions(&state.grid).is_empty() {
        bail!("The position is already finished; there is no move to choose");
    }

    let mut agent = load_agent(&args, rules, seed.unwrap_or(DEFAULT_SEED))?;
    let outcome = agent.plan(&state)?;

    report_decision(&state, &outcome, args.json)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn load_position(args: &DecideArgs) -> Result<GameState> {
    let grid: Grid = args
        .board
        .parse()
        .with_context(|| format!("Invalid board key: {:?}", args.board))?;

    let to_move = match args.player {
        Some(index) => match Player::from_index(index) {
            Some(player) => player,
            None => bail!("Player must be 0 or 1, got {}", index),
        },
        None => grid.next_player(),
    };

    Ok(GameState::new(grid, to_move))
}

fn load_agent(args: &DecideArgs, rules: FourInARow, seed: u64) -> Result<BestFirstAgent> {
    let params = match &args.params {
        Some(path) => AgentParams::load(path)?,
        None => AgentParams::default(),
    };
    let config = SearchConfig {
        max_iterations: args.max_iterations,
        policy: if args.greedy {
            SearchPolicy::Greedy
        } else {
            SearchPolicy::BestFirst
        },
        ..Default::default()
    };

    Ok(
        BestFirstAgent::with_parts(rules, Default::default(), params, seed)
            .with_config(config),
    )
}

fn report_decision(state: &GameState, outcome: &SearchOutcome, json: bool) -> Result<()> {
    if json {
        print_json_decision(state, outcome)
    } else {
        print_text_decision(state, outcome);
        Ok(())
    }
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

fn print_json_decision(state: &GameState, outcome: &SearchOutcome) -> Result<()> {
    #[derive(serde::Serialize)]
    struct JsonRootChild {
        row: usize,
        col: usize,
        value: f64,
    }

    #[derive(serde::Serialize)]
    struct JsonDecision {
        player: usize,
        row: usize,
        col: usize,
        index: usize,
        iterations: usize,
        evaluations: u64,
        nodes: usize,
        max_depth: usize,
        lapsed: bool,
        stop: String,
        features: Vec<String>,
        root: Vec<JsonRootChild>,
    }

    let output = JsonDecision {
        player: state.to_move.index(),
        row: outcome.action.row,
        col: outcome.action.col,
        index: state.grid.action_index(outcome.action),
        iterations: outcome.iterations,
        evaluations: outcome.evaluations,
        nodes: outcome.nodes,
        max_depth: outcome.max_depth,
        lapsed: outcome.lapsed,
        stop: format!("{:?}", outcome.stop),
        features: outcome.features.iter().map(|f| format!("{:?}", f)).collect(),
        root: outcome
            .tree
            .root_values()
            .into_iter()
            .map(|(a, value)| JsonRootChild {
                row: a.row,
                col: a.col,
                value,
            })
            .collect(),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_text_decision(state: &GameState, outcome: &SearchOutcome) {
    println!("\n=== Position ({:?} to move) ===", state.to_move);
    print!("{}", state.grid);

    println!("\n=== Decision ===");
    println!(
        "Move:        {} (index {})",
        outcome.action,
        state.grid.action_index(outcome.action)
    );
    if outcome.lapsed {
        println!("Lapsed:      yes (random move, no search)");
        return;
    }
    println!("Iterations:  {}", outcome.iterations);
    println!("Evaluations: {}", outcome.evaluations);
    println!("Nodes:       {} (max depth {})", outcome.nodes, outcome.max_depth);
    println!("Stopped by:  {:?}", outcome.stop);
    println!(
        "Features:    {}",
        outcome
            .features
            .iter()
            .map(|f| format!("{:?}", f))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut root = outcome.tree.root_values();
    root.sort_by(|a, b| b.1.total_cmp(&a.1));
    println!("\nRoot children (best first):");
    for (action, value) in root.iter().take(10) {
        println!("  {:<8} {:>8.3}", action.to_string(), value);
    }
}
