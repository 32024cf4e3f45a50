//! Best-first search loop
//!
//! One decision runs through four phases:
//! 1. Lapse check - with probability lmbda play a uniformly random move
//! 2. Feature dropout - resample the active feature set
//! 3. Growing - select a leaf by minimax descent, expand, backpropagate,
//!    then test the stop rules
//! 4. Done - return the root's minimax action
//!
//! Random draws are consumed in a fixed order: lapse, four dropout draws,
//! root noise, then per iteration the children's noise in enumeration order
//! followed by exactly one stop draw. The same seed therefore reproduces the
//! same decision.
//!
//! ## Architecture
//! - Level 1: BestFirstAgent (public entry points)
//! - Level 2: Search loop coordination
//! - Level 3: Stop rules

use std::collections::VecDeque;

use fourrow_core::{Action, Error, FourInARow, GameState, Result, Rules};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::features::{FeatureExtractor, PatternExtractor};
use crate::heuristic::Evaluator;
use crate::params::{AgentParams, FeatureSet};
use crate::tree::{NodeId, SearchTree};

/// Default seed, matching the CLI default
pub const DEFAULT_SEED: u64 = 42;

/// Consecutive identical root choices that end the search
pub const DEFAULT_DETERMINISM_WINDOW: usize = 50;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// How a decision is produced
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SearchPolicy {
    /// Stochastic best-first search
    #[default]
    BestFirst,
    /// One root expansion with every feature active, no lapse or stop draws
    Greedy,
}

/// Search limits and policy
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchConfig {
    pub determinism_window: usize,
    /// Hard ceiling on iterations; `None` leaves only the stochastic stop rules
    pub max_iterations: Option<usize>,
    pub policy: SearchPolicy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            determinism_window: DEFAULT_DETERMINISM_WINDOW,
            max_iterations: None,
            policy: SearchPolicy::BestFirst,
        }
    }
}

// ============================================================================
// SEARCH OUTCOME
// ============================================================================

/// Why the search stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// Lapsed before searching
    Lapse,
    /// Stop draw fell below gamma
    Random,
    /// Root choice unchanged for the whole determinism window
    Settled,
    /// Reached `max_iterations`
    IterationLimit,
    /// Greedy policy finished its single expansion
    Greedy,
}

/// Result of one decision
#[derive(Clone, Debug)]
pub struct SearchOutcome {
    pub action: Action,
    /// Grow iterations performed (0 after a lapse)
    pub iterations: usize,
    /// Noisy heuristic evaluations, root included
    pub evaluations: u64,
    pub nodes: usize,
    pub max_depth: usize,
    pub lapsed: bool,
    pub stop: StopReason,
    /// Features active for this decision
    pub features: FeatureSet,
    /// The final tree
    pub tree: SearchTree,
}

// ============================================================================
// CHOICE HISTORY (Level 3 - Determinism Stop)
// ============================================================================

/// Rolling window of root choices
#[derive(Clone, Debug)]
pub struct ChoiceHistory {
    window: usize,
    recent: VecDeque<Option<Action>>,
}

impl ChoiceHistory {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            recent: VecDeque::with_capacity(window),
        }
    }

    pub fn push(&mut self, choice: Option<Action>) {
        if self.window == 0 {
            return;
        }
        if self.recent.len() == self.window {
            self.recent.pop_front();
        }
        self.recent.push_back(choice);
    }

    /// Have the last `window` choices all been the same?
    pub fn is_settled(&self) -> bool {
        match self.recent.front() {
            Some(first) => {
                self.recent.len() == self.window && self.recent.iter().all(|c| c == first)
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }
}

// ============================================================================
// AGENT (Level 1 - Public API)
// ============================================================================

/// Bounded-rationality best-first search agent
pub struct BestFirstAgent<G = FourInARow, E = PatternExtractor> {
    rules: G,
    extractor: E,
    params: AgentParams,
    config: SearchConfig,
    seed: u64,
    rng: ChaCha8Rng,
}

impl BestFirstAgent {
    /// Standard 4x9 rules, direct pattern scan, seed 42
    pub fn new(params: AgentParams) -> Self {
        Self::with_seed(params, DEFAULT_SEED)
    }

    pub fn with_seed(params: AgentParams, seed: u64) -> Self {
        Self::with_parts(FourInARow::default(), PatternExtractor, params, seed)
    }
}

impl<G: Rules, E: FeatureExtractor> BestFirstAgent<G, E> {
    pub fn with_parts(rules: G, extractor: E, params: AgentParams, seed: u64) -> Self {
        let agent = Self {
            rules,
            extractor,
            params,
            config: SearchConfig::default(),
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        };
        agent.check_termination();
        agent
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self.check_termination();
        self
    }

    pub fn params(&self) -> &AgentParams {
        &self.params
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn rules(&self) -> &G {
        &self.rules
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Set parameters from an ordered list of ten values
    pub fn load_params(&mut self, values: &[f64]) -> Result<()> {
        self.params = AgentParams::from_slice(values)?;
        self.check_termination();
        Ok(())
    }

    pub fn set_params(&mut self, params: AgentParams) {
        self.params = params;
        self.check_termination();
    }

    /// Restart the random stream
    pub fn reseed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    /// Choose a move for the player to move in `state`
    pub fn get_action(&mut self, state: &GameState) -> Result<Action> {
        self.plan(state).map(|outcome| outcome.action)
    }

    /// Choose a move and report how the search went.
    ///
    /// Fails with [`Error::EmptyActionSet`] on a finished game, before any
    /// random draw is made.
    pub fn plan(&mut self, state: &GameState) -> Result<SearchOutcome> {
        let actions = self.rules.valid_actions(&state.grid);
        if actions.is_empty() {
            return Err(Error::EmptyActionSet);
        }

        let outcome = match self.config.policy {
            SearchPolicy::BestFirst => self.best_first(state, &actions)?,
            SearchPolicy::Greedy => self.greedy(state)?,
        };

        tracing::debug!(
            "{:?} plays {} after {} iterations ({} evaluations, {} nodes, depth {}, stop: {:?})",
            state.to_move,
            outcome.action,
            outcome.iterations,
            outcome.evaluations,
            outcome.nodes,
            outcome.max_depth,
            outcome.stop,
        );
        Ok(outcome)
    }

    /// Choose a move for each state in turn, returned as flat action indices
    pub fn respond(&mut self, states: &[GameState]) -> Result<Vec<usize>> {
        states
            .iter()
            .map(|state| {
                let action = self.get_action(state)?;
                Ok(state.grid.action_index(action))
            })
            .collect()
    }

    /// Like [`BestFirstAgent::respond`], one rayon task per state.
    ///
    /// Each state gets its own tree and a fresh stream seeded with
    /// `seed + index`, so the result does not depend on thread scheduling.
    #[cfg(feature = "parallel")]
    pub fn respond_parallel(&self, states: &[GameState]) -> Result<Vec<usize>>
    where
        G: Clone + Sync,
        E: Sync,
    {
        use rayon::prelude::*;

        states
            .par_iter()
            .enumerate()
            .map(|(index, state)| {
                let seed = self.seed.wrapping_add(index as u64);
                let mut agent =
                    BestFirstAgent::with_parts(self.rules.clone(), &self.extractor, self.params.clone(), seed)
                        .with_config(self.config.clone());
                let action = agent.get_action(state)?;
                Ok(state.grid.action_index(action))
            })
            .collect()
    }

    // ========================================================================
    // Level 2: Search Loop
    // ========================================================================

    fn best_first(&mut self, state: &GameState, actions: &[Action]) -> Result<SearchOutcome> {
        if self.rng.gen::<f64>() < self.params.lmbda {
            return self.lapse(state, actions);
        }

        let features = FeatureSet::sample(&mut self.rng, self.params.delta);
        let player = state.to_move;
        let mut evaluator = Evaluator::new(
            &self.params,
            features,
            &self.extractor,
            self.rules.center(),
            player,
        );

        let root_value = evaluator.evaluate(state, &mut self.rng);
        let mut tree = SearchTree::new(state.clone(), player, root_value);
        let mut history = ChoiceHistory::new(self.config.determinism_window);
        let mut iterations = 0;

        let stop = loop {
            iterations += 1;

            let leaf = tree.select_leaf();
            let rng = &mut self.rng;
            tree.expand(leaf, &self.rules, self.params.theta, |s| evaluator.evaluate(s, &mut *rng))?;
            tree.backpropagate(leaf);

            let choice = tree.best_action();
            history.push(choice);
            tracing::trace!(
                "iteration {}: expanded depth {}, root choice {:?}, root value {:.3}",
                iterations,
                tree.get(leaf).depth,
                choice,
                tree.get(NodeId::ROOT).value,
            );

            if let Some(reason) =
                should_stop(&mut self.rng, &self.params, &self.config, iterations, &history)
            {
                break reason;
            }
        };

        let action = tree.best_action().ok_or(Error::EmptyActionSet)?;
        Ok(SearchOutcome {
            action,
            iterations,
            evaluations: evaluator.evaluations(),
            nodes: tree.len(),
            max_depth: tree.max_depth(),
            lapsed: false,
            stop,
            features,
            tree,
        })
    }

    /// Uniform random move; the tree is the root plus the chosen child
    fn lapse(&mut self, state: &GameState, actions: &[Action]) -> Result<SearchOutcome> {
        let action = actions[self.rng.gen_range(0..actions.len())];
        let next = self.rules.transit(state, action)?;

        let mut tree = SearchTree::new(state.clone(), state.to_move, 0.0);
        tree.attach(NodeId::ROOT, action, next.state, 0.0);

        Ok(SearchOutcome {
            action,
            iterations: 0,
            evaluations: 0,
            nodes: tree.len(),
            max_depth: tree.max_depth(),
            lapsed: true,
            stop: StopReason::Lapse,
            features: FeatureSet::empty(),
            tree,
        })
    }

    /// One-ply heuristic choice over every legal move
    fn greedy(&mut self, state: &GameState) -> Result<SearchOutcome> {
        let features = FeatureSet::all();
        let mut evaluator = Evaluator::new(
            &self.params,
            features,
            &self.extractor,
            self.rules.center(),
            state.to_move,
        );

        let mut tree = SearchTree::new(state.clone(), state.to_move, 0.0);
        let rng = &mut self.rng;
        tree.expand(NodeId::ROOT, &self.rules, f64::INFINITY, |s| evaluator.evaluate(s, &mut *rng))?;
        tree.backpropagate(NodeId::ROOT);

        let action = tree.best_action().ok_or(Error::EmptyActionSet)?;
        Ok(SearchOutcome {
            action,
            iterations: 1,
            evaluations: evaluator.evaluations(),
            nodes: tree.len(),
            max_depth: tree.max_depth(),
            lapsed: false,
            stop: StopReason::Greedy,
            features,
            tree,
        })
    }

    fn check_termination(&self) {
        if self.params.gamma <= 0.0 && self.config.max_iterations.is_none() {
            tracing::warn!(
                "gamma = {}: search only ends once the root choice holds for {} iterations",
                self.params.gamma,
                self.config.determinism_window
            );
        }
    }
}

// ============================================================================
// STOP RULES (Level 3)
// ============================================================================

/// The stop draw is taken every iteration, even when another rule fires
fn should_stop(
    rng: &mut ChaCha8Rng,
    params: &AgentParams,
    config: &SearchConfig,
    iterations: usize,
    history: &ChoiceHistory,
) -> Option<StopReason> {
    let draw = rng.gen::<f64>();
    if draw < params.gamma {
        Some(StopReason::Random)
    } else if history.is_settled() {
        Some(StopReason::Settled)
    } else if matches!(config.max_iterations, Some(limit) if iterations >= limit) {
        Some(StopReason::IterationLimit)
    } else {
        None
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use fourrow_core::{Grid, Player};
    use rand_distr::StandardNormal;
    use std::cell::Cell as Counter;

    use crate::params::Feature;

    /// Pattern scan that counts its calls
    #[derive(Default)]
    struct Probe {
        calls: Counter<u32>,
    }

    impl FeatureExtractor for Probe {
        fn count(&self, feature: Feature, grid: &Grid, pieces: &[Action]) -> u32 {
            self.calls.set(self.calls.get() + 1);
            PatternExtractor.count(feature, grid, pieces)
        }
    }

    fn params(lmbda: f64, gamma: f64) -> AgentParams {
        AgentParams {
            lmbda,
            gamma,
            ..Default::default()
        }
    }

    /// Black to move with 0 0 0 on row 0; (0, 3) wins
    fn winning_position() -> GameState {
        let grid = Grid::from_key(
            "0 0 0 . . . . . .-1 1 . . . . . . .-1 . . . . . . . .-. . . . . . . . .",
        )
        .unwrap();
        GameState::new(grid, Player::Black)
    }

    #[test]
    fn test_choice_history_settles_after_window() {
        let mut history = ChoiceHistory::new(DEFAULT_DETERMINISM_WINDOW);
        for _ in 0..49 {
            history.push(Some(Action::new(1, 4)));
            assert!(!history.is_settled());
        }
        history.push(Some(Action::new(1, 4)));
        assert!(history.is_settled());
    }

    #[test]
    fn test_choice_history_one_change_breaks_streak() {
        let mut history = ChoiceHistory::new(DEFAULT_DETERMINISM_WINDOW);
        history.push(Some(Action::new(0, 0)));
        for _ in 0..49 {
            history.push(Some(Action::new(1, 4)));
        }
        assert_eq!(history.len(), 50);
        assert!(!history.is_settled());

        // the odd one out slides off the window
        history.push(Some(Action::new(1, 4)));
        assert!(history.is_settled());
    }

    #[test]
    fn test_choice_history_zero_window_never_settles() {
        let mut history = ChoiceHistory::new(0);
        history.push(None);
        assert!(history.is_empty());
        assert!(!history.is_settled());
    }

    #[test]
    fn test_terminal_root_is_rejected_without_draws() {
        let grid = Grid::from_key(
            "0 0 0 0 . . . . .-1 1 1 . . . . . .-. . . . . . . . .-. . . . . . . . .",
        )
        .unwrap();
        let mut agent = BestFirstAgent::with_seed(AgentParams::default(), 5);

        assert_eq!(
            agent.get_action(&GameState::new(grid, Player::White)),
            Err(Error::EmptyActionSet)
        );
        let mut fresh = ChaCha8Rng::seed_from_u64(5);
        assert_eq!(agent.rng.gen::<u64>(), fresh.gen::<u64>());
    }

    #[test]
    fn test_full_lapse_never_evaluates() {
        let probe = Probe::default();
        let mut agent =
            BestFirstAgent::with_parts(FourInARow::default(), &probe, params(1.0, 0.02), 1);
        let state = GameState::default();

        for _ in 0..20 {
            let outcome = agent.plan(&state).unwrap();
            assert!(outcome.lapsed);
            assert_eq!(outcome.stop, StopReason::Lapse);
            assert_eq!(outcome.evaluations, 0);
            assert_eq!(outcome.nodes, 2);
            assert_eq!(outcome.max_depth, 1);
            assert!(state.grid.contains(outcome.action));
        }
        assert_eq!(probe.calls.get(), 0);
    }

    #[test]
    fn test_empty_board_single_iteration() {
        let mut agent = BestFirstAgent::with_seed(params(0.0, 1.0), 42);
        let state = GameState::default();
        let outcome = agent.plan(&state).unwrap();

        assert!(!outcome.lapsed);
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.stop, StopReason::Random);
        // root plus 36 children
        assert_eq!(outcome.evaluations, 37);
        assert!(outcome.nodes >= 2);
        assert_eq!(outcome.max_depth, 1);
        assert!(FourInARow::default()
            .valid_actions(&state.grid)
            .contains(&outcome.action));
    }

    #[test]
    fn test_draw_order_is_pinned() {
        let p = AgentParams {
            lmbda: 0.0,
            gamma: 1.0,
            delta: 0.0,
            ..Default::default()
        };
        let rules = FourInARow::default();
        let state = winning_position();
        let mut agent = BestFirstAgent::with_seed(p.clone(), 9);
        let action = agent.get_action(&state).unwrap();

        // replay the same stream by hand
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let _lapse: f64 = rng.gen();
        for _ in Feature::ALL {
            let _dropout: f64 = rng.gen();
        }
        let ev = Evaluator::new(&p, FeatureSet::all(), &PatternExtractor, rules.center(), Player::Black);
        let _root: f64 = rng.sample(StandardNormal);

        let mut best: Option<(Action, f64)> = None;
        for a in rules.valid_actions(&state.grid) {
            let next = rules.transit(&state, a).unwrap();
            let noise: f64 = rng.sample(StandardNormal);
            let value = ev.score(&next.state) + noise;
            if best.map_or(true, |(_, v)| value > v) {
                best = Some((a, value));
            }
        }
        let _stop: f64 = rng.gen();

        assert_eq!(Some(action), best.map(|(a, _)| a));
        assert_eq!(agent.rng.gen::<u64>(), rng.gen::<u64>());
    }

    #[test]
    fn test_same_seed_same_decision() {
        let state = winning_position();
        let run = |seed| {
            let mut agent = BestFirstAgent::with_seed(params(0.0, 0.1), seed);
            let outcome = agent.plan(&state).unwrap();
            (outcome.action, outcome.iterations, outcome.nodes)
        };
        assert_eq!(run(17), run(17));
    }

    #[test]
    fn test_finds_winning_move() {
        let p = AgentParams {
            lmbda: 0.0,
            gamma: 0.2,
            delta: 0.0,
            w_c4: 1000.0,
            ..Default::default()
        };
        let mut agent = BestFirstAgent::with_seed(p, 3);
        assert_eq!(agent.get_action(&winning_position()).unwrap(), Action::new(0, 3));
    }

    #[test]
    fn test_iteration_limit() {
        let config = SearchConfig {
            max_iterations: Some(3),
            ..Default::default()
        };
        let mut agent = BestFirstAgent::with_seed(params(0.0, 0.0), 8).with_config(config);
        let outcome = agent.plan(&GameState::default()).unwrap();
        assert_eq!(outcome.iterations, 3);
        assert_eq!(outcome.stop, StopReason::IterationLimit);
    }

    #[test]
    fn test_short_determinism_window() {
        let config = SearchConfig {
            determinism_window: 1,
            ..Default::default()
        };
        let mut agent = BestFirstAgent::with_seed(params(0.0, 0.0), 8).with_config(config);
        let outcome = agent.plan(&GameState::default()).unwrap();
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.stop, StopReason::Settled);
    }

    #[test]
    fn test_greedy_policy() {
        let p = AgentParams {
            w_c4: 1000.0,
            ..Default::default()
        };
        let config = SearchConfig {
            policy: SearchPolicy::Greedy,
            ..Default::default()
        };
        let mut agent = BestFirstAgent::with_seed(p, 4).with_config(config);
        let state = winning_position();
        let outcome = agent.plan(&state).unwrap();

        assert_eq!(outcome.action, Action::new(0, 3));
        assert_eq!(outcome.stop, StopReason::Greedy);
        assert_eq!(outcome.features, FeatureSet::all());
        assert_eq!(outcome.evaluations as usize, state.grid.empty_cells().len());
        assert_eq!(outcome.max_depth, 1);
    }

    #[test]
    fn test_load_params() {
        let mut agent = BestFirstAgent::new(AgentParams::default());
        let values: Vec<f64> = (1..=10).map(|i| i as f64 / 10.0).collect();
        agent.load_params(&values).unwrap();
        assert_eq!(agent.params().to_vec(), values);
        assert!(agent.load_params(&values[..3]).is_err());
    }

    #[test]
    fn test_respond_returns_indices() {
        let rules = FourInARow::default();
        let start = GameState::default();
        let second = rules.transit(&start, Action::new(1, 4)).unwrap().state;
        let states = vec![start, second, winning_position()];

        let mut agent = BestFirstAgent::with_seed(params(0.0, 0.3), 11);
        let indices = agent.respond(&states).unwrap();
        assert_eq!(indices.len(), 3);
        for (state, &index) in states.iter().zip(&indices) {
            let action = state.grid.index_action(index).unwrap();
            assert!(rules.valid_actions(&state.grid).contains(&action));
        }
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_respond_parallel_matches_per_state_seeds() {
        let rules = FourInARow::default();
        let start = GameState::default();
        let second = rules.transit(&start, Action::new(0, 0)).unwrap().state;
        let states = vec![start, second];

        let agent = BestFirstAgent::with_seed(params(0.0, 0.3), 100);
        let parallel = agent.respond_parallel(&states).unwrap();

        for (index, state) in states.iter().enumerate() {
            let mut single = BestFirstAgent::with_seed(params(0.0, 0.3), 100 + index as u64);
            let action = single.get_action(state).unwrap();
            assert_eq!(parallel[index], state.grid.action_index(action));
        }
    }
}
