//! Noisy heuristic evaluation
//!
//! value = w_ce * center
//!       + sum over active features of w_f * (C_player * f_player - C_opponent * f_opponent)
//!       + N(0, 1)
//!
//! Values are always from the point of view of the search player, fixed when
//! the evaluator is built. The side to move in the evaluated state plays at
//! full weight, the other side is discounted by `c`.

use fourrow_core::{GameState, Player};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::features::{center_value, FeatureExtractor};
use crate::params::{AgentParams, FeatureSet};

/// Heuristic evaluator bound to one decision
pub struct Evaluator<'a, E: ?Sized> {
    params: &'a AgentParams,
    features: FeatureSet,
    extractor: &'a E,
    center: (f64, f64),
    player: Player,
    evaluations: u64,
}

impl<'a, E: FeatureExtractor + ?Sized> Evaluator<'a, E> {
    pub fn new(
        params: &'a AgentParams,
        features: FeatureSet,
        extractor: &'a E,
        center: (f64, f64),
        player: Player,
    ) -> Self {
        Self {
            params,
            features,
            extractor,
            center,
            player,
            evaluations: 0,
        }
    }

    pub fn player(&self) -> Player {
        self.player
    }

    pub fn features(&self) -> FeatureSet {
        self.features
    }

    /// Number of noisy evaluations performed so far
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Deterministic part of the evaluation
    pub fn score(&self, state: &GameState) -> f64 {
        let grid = &state.grid;
        let opponent = self.player.opponent();
        let player_pieces = grid.pieces(self.player);
        let opponent_pieces = grid.pieces(opponent);

        let discount_player = if state.to_move == self.player { 1.0 } else { self.params.c };
        let discount_opponent = if state.to_move == opponent { 1.0 } else { self.params.c };

        let mut value = self.params.w_ce * center_value(self.center, &player_pieces, &opponent_pieces);
        for feature in self.features.iter() {
            let own = self.extractor.count(feature, grid, &player_pieces) as f64;
            let theirs = self.extractor.count(feature, grid, &opponent_pieces) as f64;
            value += self.params.weight(feature) * (discount_player * own - discount_opponent * theirs);
        }
        value
    }

    /// Score plus one standard-normal draw
    pub fn evaluate<R: Rng>(&mut self, state: &GameState, rng: &mut R) -> f64 {
        let value = self.score(state);
        let noise: f64 = rng.sample(StandardNormal);
        self.evaluations += 1;
        value + noise
    }
}
