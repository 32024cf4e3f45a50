//! Match command - play games between two parameter sets
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: load_params(), play_match(), report_results()
//! - Level 3: play_single_game(), compute_match_statistics()
//! - Level 4: formatting utilities

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use fourrow_agent::{AgentParams, BestFirstAgent, CachedExtractor, PatternExtractor, SearchConfig};
use fourrow_core::{Action, FourInARow, Outcome, Player, Rules};

type SharedCache = Arc<CachedExtractor<PatternExtractor>>;
type MatchAgent = BestFirstAgent<FourInARow, SharedCache>;

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct MatchArgs {
    /// Number of games to play (will alternate colors)
    #[arg(long, default_value = "10")]
    pub games: usize,

    /// Parameters for the agent that plays black in the first game
    #[arg(long, value_name = "FILE")]
    pub black: Option<PathBuf>,

    /// Parameters for the agent that plays white in the first game
    #[arg(long, value_name = "FILE")]
    pub white: Option<PathBuf>,

    /// Maximum moves per game
    #[arg(long, default_value = "36")]
    pub max_moves: usize,

    /// Per-decision iteration ceiling
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Feature cache file, loaded if present and written back after the match
    #[arg(long, value_name = "FILE")]
    pub cache: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

/// One side of the match
struct Contestant {
    label: String,
    params: AgentParams,
}

/// Result of a single game
#[derive(Clone, Debug)]
struct GameRecord {
    game_number: usize,
    outcome: Option<Outcome>,
    black: String,
    white: String,
    first_plays_black: bool,
    moves: Vec<Action>,
}

impl GameRecord {
    fn first_won(&self) -> bool {
        matches!(self.outcome, Some(Outcome::Winner(p)) if (p == Player::Black) == self.first_plays_black)
    }
}

/// Aggregated match results
#[derive(Clone, Debug)]
struct MatchResults {
    games: Vec<GameRecord>,
    first_label: String,
    second_label: String,
    first_wins: usize,
    second_wins: usize,
    black_wins: usize,
    white_wins: usize,
    draws: usize,
    unfinished: usize,
    avg_moves: f32,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run match command
///
/// 1. Load both parameter sets (and the cache, if any)
/// 2. Play the match
/// 3. Save the cache and report results
pub fn run(args: MatchArgs, seed: Option<u64>) -> Result<()> {
    let (first, second) = load_params(&args)?;
    let cache = load_cache(args.cache.as_deref())?;

    tracing::info!(
        "Starting match: {} vs {} ({} games)",
        first.label,
        second.label,
        args.games
    );

    let results = play_match(&first, &second, &cache, &args, seed)?;

    if let Some(path) = &args.cache {
        cache.save(path)?;
    }
    let stats = cache.stats();
    tracing::info!(
        "Feature cache: {} entries, {} hits, {} misses",
        stats.entries,
        stats.hits,
        stats.misses
    );

    report_results(&results, &args)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn load_params(args: &MatchArgs) -> Result<(Contestant, Contestant)> {
    let load = |path: &Option<PathBuf>, fallback: &str| -> Result<Contestant> {
        match path {
            Some(path) => Ok(Contestant {
                label: path.display().to_string(),
                params: AgentParams::load(path)?,
            }),
            None => Ok(Contestant {
                label: fallback.to_string(),
                params: AgentParams::default(),
            }),
        }
    };

    Ok((load(&args.black, "default-a")?, load(&args.white, "default-b")?))
}

fn load_cache(path: Option<&Path>) -> Result<SharedCache> {
    let cache = CachedExtractor::new(PatternExtractor);
    if let Some(path) = path.filter(|p| p.exists()) {
        cache
            .load(path)
            .with_context(|| format!("Failed to load feature cache: {}", path.display()))?;
    }
    Ok(Arc::new(cache))
}

fn play_match(
    first: &Contestant,
    second: &Contestant,
    cache: &SharedCache,
    args: &MatchArgs,
    seed: Option<u64>,
) -> Result<MatchResults> {
    let mut rng = create_rng(seed);
    let mut games = Vec::with_capacity(args.games);
    let progress = create_progress(args)?;

    for game_num in 0..args.games {
        // Alternate colors for fairness
        let first_plays_black = game_num % 2 == 0;
        let (black, white) = if first_plays_black {
            (first, second)
        } else {
            (second, first)
        };

        let record = play_single_game(
            (black, white),
            first_plays_black,
            cache,
            game_num + 1,
            args,
            &mut rng,
        )?;

        tracing::debug!(
            "Game {}: {:?} ({} moves)",
            record.game_number,
            record.outcome,
            record.moves.len()
        );
        progress.inc(1);
        games.push(record);
    }
    progress.finish_and_clear();

    Ok(compute_match_statistics(games, first, second))
}

fn report_results(results: &MatchResults, args: &MatchArgs) -> Result<()> {
    if args.json {
        print_json_results(results)
    } else {
        print_text_results(results);
        Ok(())
    }
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Play one game from the empty board; each agent gets its own stream
fn play_single_game(
    (black, white): (&Contestant, &Contestant),
    first_plays_black: bool,
    cache: &SharedCache,
    game_number: usize,
    args: &MatchArgs,
    rng: &mut ChaCha8Rng,
) -> Result<GameRecord> {
    let rules = FourInARow::default();
    let mut agents = [
        create_agent(black, cache, rng.gen(), args),
        create_agent(white, cache, rng.gen(), args),
    ];

    let mut state = rules.initial_state();
    let mut moves = Vec::new();
    let mut outcome = None;

    while moves.len() < args.max_moves {
        let agent = &mut agents[state.to_move.index()];
        let action = agent
            .get_action(&state)
            .with_context(|| format!("Game {}: no move after {} plies", game_number, moves.len()))?;
        let transition = rules.transit(&state, action)?;

        moves.push(action);
        state = transition.state;
        if transition.done {
            outcome = transition.outcome;
            break;
        }
    }

    Ok(GameRecord {
        game_number,
        outcome,
        black: black.label.clone(),
        white: white.label.clone(),
        first_plays_black,
        moves,
    })
}

fn create_agent(contestant: &Contestant, cache: &SharedCache, seed: u64, args: &MatchArgs) -> MatchAgent {
    let config = SearchConfig {
        max_iterations: args.max_iterations,
        ..Default::default()
    };
    BestFirstAgent::with_parts(FourInARow::default(), cache.clone(), contestant.params.clone(), seed)
        .with_config(config)
}

fn compute_match_statistics(
    games: Vec<GameRecord>,
    first: &Contestant,
    second: &Contestant,
) -> MatchResults {
    let count = |f: &dyn Fn(&GameRecord) -> bool| games.iter().filter(|g| f(g)).count();

    let first_wins = count(&|g| g.first_won());
    let black_wins = count(&|g| g.outcome == Some(Outcome::Winner(Player::Black)));
    let white_wins = count(&|g| g.outcome == Some(Outcome::Winner(Player::White)));
    let draws = count(&|g| g.outcome == Some(Outcome::Draw));
    let unfinished = count(&|g| g.outcome.is_none());
    let second_wins = black_wins + white_wins - first_wins;

    let total_moves: usize = games.iter().map(|g| g.moves.len()).sum();
    let avg_moves = if games.is_empty() {
        0.0
    } else {
        total_moves as f32 / games.len() as f32
    };

    MatchResults {
        games,
        first_label: first.label.clone(),
        second_label: second.label.clone(),
        first_wins,
        second_wins,
        black_wins,
        white_wins,
        draws,
        unfinished,
        avg_moves,
    }
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

/// Create RNG from seed or random
fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// Progress bar on an interactive stderr, hidden otherwise
fn create_progress(args: &MatchArgs) -> Result<ProgressBar> {
    if args.json || !std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(args.games as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} games ({eta})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn percent(part: usize, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        100.0 * part as f32 / total as f32
    }
}

fn print_json_results(results: &MatchResults) -> Result<()> {
    #[derive(serde::Serialize)]
    struct JsonGame {
        game_number: usize,
        result: String,
        black: String,
        white: String,
        moves: Vec<[usize; 2]>,
    }

    #[derive(serde::Serialize)]
    struct JsonOutput {
        total_games: usize,
        first: String,
        second: String,
        first_wins: usize,
        second_wins: usize,
        black_wins: usize,
        white_wins: usize,
        draws: usize,
        unfinished: usize,
        avg_moves: f32,
        games: Vec<JsonGame>,
    }

    let output = JsonOutput {
        total_games: results.games.len(),
        first: results.first_label.clone(),
        second: results.second_label.clone(),
        first_wins: results.first_wins,
        second_wins: results.second_wins,
        black_wins: results.black_wins,
        white_wins: results.white_wins,
        draws: results.draws,
        unfinished: results.unfinished,
        avg_moves: results.avg_moves,
        games: results
            .games
            .iter()
            .map(|g| JsonGame {
                game_number: g.game_number,
                result: match g.outcome {
                    Some(Outcome::Winner(p)) => format!("{:?}Wins", p),
                    Some(Outcome::Draw) => "Draw".to_string(),
                    None => "Unfinished".to_string(),
                },
                black: g.black.clone(),
                white: g.white.clone(),
                moves: g.moves.iter().map(|a| [a.row, a.col]).collect(),
            })
            .collect(),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_text_results(results: &MatchResults) {
    let total = results.games.len();

    println!("\n=== Match Results ===");
    println!("Total games: {}", total);
    println!(
        "{}: {} wins ({:.1}%)",
        results.first_label,
        results.first_wins,
        percent(results.first_wins, total)
    );
    println!(
        "{}: {} wins ({:.1}%)",
        results.second_label,
        results.second_wins,
        percent(results.second_wins, total)
    );
    println!(
        "Black wins:  {} ({:.1}%)",
        results.black_wins,
        percent(results.black_wins, total)
    );
    println!(
        "White wins:  {} ({:.1}%)",
        results.white_wins,
        percent(results.white_wins, total)
    );
    println!("Draws:       {}", results.draws);
    if results.unfinished > 0 {
        println!("Unfinished:  {}", results.unfinished);
    }
    println!("Avg moves:   {:.1}", results.avg_moves);
}
