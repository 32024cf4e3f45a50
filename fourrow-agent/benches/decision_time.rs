//! Decision time benchmark
//!
//! Times single decisions on a few positions for several stop probabilities,
//! with and without the feature cache.

use std::sync::Arc;
use std::time::Instant;

use fourrow_agent::{AgentParams, BestFirstAgent, CachedExtractor, PatternExtractor};
use fourrow_core::{FourInARow, GameState, Grid, Player};

// ============================================================================
// TEST POSITIONS
// ============================================================================

fn opening() -> GameState {
    GameState::default()
}

fn midgame() -> GameState {
    let grid = Grid::from_key(
        ". . . 1 . . . . .-. . 0 0 1 . . . .-. . . 0 1 . . . .-. . . . . . . . .",
    )
    .unwrap_or_default();
    GameState::new(grid, Player::Black)
}

// ============================================================================
// BENCHMARK
// ============================================================================

#[derive(Clone, Debug)]
struct BenchmarkResult {
    config: String,
    avg_decision_ms: f64,
    avg_iterations: f64,
    avg_nodes: f64,
}

impl BenchmarkResult {
    fn to_table_row(&self) -> String {
        format!(
            "| {} | {:.3}ms | {:.1} | {:.1} |",
            self.config, self.avg_decision_ms, self.avg_iterations, self.avg_nodes
        )
    }
}

fn benchmark_position(state: &GameState, name: &str) -> Vec<BenchmarkResult> {
    println!("\n=== DECISION TIME: {} ===", name);
    let mut results = Vec::new();
    let decisions = 20;

    for gamma in [0.2, 0.05, 0.02] {
        let params = AgentParams {
            lmbda: 0.0,
            gamma,
            ..Default::default()
        };

        let mut plain = BestFirstAgent::with_parts(FourInARow::default(), PatternExtractor, params.clone(), 1);
        results.push(run(&format!("gamma {} direct", gamma), decisions, |s| {
            plain.plan(s).map(|o| (o.iterations, o.nodes)).unwrap_or_default()
        }, state));

        let cache = Arc::new(CachedExtractor::new(PatternExtractor));
        let mut cached = BestFirstAgent::with_parts(FourInARow::default(), cache.clone(), params, 1);
        results.push(run(&format!("gamma {} cached", gamma), decisions, |s| {
            cached.plan(s).map(|o| (o.iterations, o.nodes)).unwrap_or_default()
        }, state));
        let stats = cache.stats();
        println!("  cache: {} hits, {} misses", stats.hits, stats.misses);
    }

    results
}

fn run(
    config: &str,
    decisions: usize,
    mut decide: impl FnMut(&GameState) -> (usize, usize),
    state: &GameState,
) -> BenchmarkResult {
    print!("  {} ... ", config);
    let mut total_ms = 0.0;
    let mut iterations = 0;
    let mut nodes = 0;

    for _ in 0..decisions {
        let start = Instant::now();
        let (i, n) = decide(state);
        total_ms += start.elapsed().as_secs_f64() * 1000.0;
        iterations += i;
        nodes += n;
    }

    let n = decisions as f64;
    println!("{:.3}ms", total_ms / n);
    BenchmarkResult {
        config: config.to_string(),
        avg_decision_ms: total_ms / n,
        avg_iterations: iterations as f64 / n,
        avg_nodes: nodes as f64 / n,
    }
}

fn main() {
    let mut results = benchmark_position(&opening(), "opening");
    results.extend(benchmark_position(&midgame(), "midgame"));

    println!("\n| Config | Avg decision | Iterations | Nodes |");
    println!("|---|---|---|---|");
    for result in &results {
        println!("{}", result.to_table_row());
    }
}
