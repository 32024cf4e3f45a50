//! Four-in-a-row agent - noisy best-first search
//!
//! This crate provides a bounded-rationality player:
//! - Pattern features (connected/unconnected twos, threes, fours, center)
//! - Optional memoizing feature cache
//! - Noisy heuristic evaluation with a continuation discount
//! - Arena search tree with minimax selection and pruning
//! - Best-first search with lapses, feature dropout and stochastic stopping
//!
//! ```no_run
//! use fourrow_agent::{AgentParams, BestFirstAgent};
//! use fourrow_core::GameState;
//!
//! let mut agent = BestFirstAgent::with_seed(AgentParams::default(), 7);
//! let action = agent.get_action(&GameState::default())?;
//! println!("play {}", action);
//! # Ok::<(), fourrow_core::Error>(())
//! ```

pub mod cache;
pub mod features;
pub mod heuristic;
pub mod params;
pub mod search;
pub mod tree;

// Re-exports for convenient access
pub use cache::{CacheStats, CachedExtractor};
pub use features::{FeatureExtractor, PatternExtractor};
pub use heuristic::Evaluator;
pub use params::{AgentParams, Feature, FeatureSet, N_PARAMS, PARAM_NAMES};
pub use search::{
    BestFirstAgent, ChoiceHistory, SearchConfig, SearchOutcome, SearchPolicy, StopReason,
    DEFAULT_SEED,
};
pub use tree::{NodeId, SearchNode, SearchTree};
