//! Game state and the rules interface

use crate::board::{Action, Cell, Grid, Player, DEFAULT_COLS, DEFAULT_ROWS};
use crate::error::Result;
use serde::{Deserialize, Serialize};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Pieces in a row needed to win
pub const DEFAULT_WIN_LENGTH: usize = 4;

/// Reward for the player completing a winning line
pub const WIN_REWARD: f64 = 1.0;

/// The four line axes, each scanned in one canonical direction
const AXES: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

// ============================================================================
// CORE TYPES
// ============================================================================

/// A position: the grid plus whose turn it is
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameState {
    pub grid: Grid,
    pub to_move: Player,
}

impl GameState {
    pub fn new(grid: Grid, to_move: Player) -> Self {
        Self { grid, to_move }
    }

    /// Empty board with black to move
    pub fn initial(rows: usize, cols: usize) -> Self {
        Self::new(Grid::new(rows, cols), Player::Black)
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::initial(DEFAULT_ROWS, DEFAULT_COLS)
    }
}

/// How a finished game ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Winner(Player),
    Draw,
}

/// Result of applying one action
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub state: GameState,
    pub reward: f64,
    pub done: bool,
    /// Set when `done` is true
    pub outcome: Option<Outcome>,
}

// ============================================================================
// RULES INTERFACE
// ============================================================================

/// Deterministic game rules consumed by the search
///
/// Implementations must never mutate their inputs: `transit` builds a new
/// grid for the successor state.
pub trait Rules {
    /// Legal actions in a fixed enumeration order; empty once the game is over
    fn valid_actions(&self, grid: &Grid) -> Vec<Action>;

    /// Apply an action for the player to move
    fn transit(&self, state: &GameState, action: Action) -> Result<Transition>;

    /// Reference point for the center-proximity feature, as (row, col)
    fn center(&self) -> (f64, f64);

    /// Fresh starting position
    fn initial_state(&self) -> GameState;
}

/// Standard four-in-a-row: place anywhere, first to connect four wins
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FourInARow {
    pub rows: usize,
    pub cols: usize,
    pub win_length: usize,
}

impl Default for FourInARow {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            win_length: DEFAULT_WIN_LENGTH,
        }
    }
}

impl FourInARow {
    pub fn new(rows: usize, cols: usize, win_length: usize) -> Self {
        Self {
            rows,
            cols,
            win_length,
        }
    }

    /// Does any player own a full line anywhere on the grid?
    pub fn has_winner(&self, grid: &Grid) -> bool {
        grid.pieces(Player::Black)
            .into_iter()
            .chain(grid.pieces(Player::White))
            .any(|action| self.wins_through(grid, action))
    }

    /// Does the piece at `action` sit on a line of `win_length`?
    pub fn wins_through(&self, grid: &Grid, action: Action) -> bool {
        let owner = grid.at(action);
        if owner == Cell::Empty {
            return false;
        }
        let (row, col) = (action.row as isize, action.col as isize);

        AXES.iter().any(|&(dr, dc)| {
            let run = |sign: isize| {
                (1..)
                    .take_while(|&k| grid.probe(row + sign * k * dr, col + sign * k * dc) == Some(owner))
                    .count()
            };
            1 + run(1) + run(-1) >= self.win_length
        })
    }
}

impl Rules for FourInARow {
    fn valid_actions(&self, grid: &Grid) -> Vec<Action> {
        if grid.is_full() || self.has_winner(grid) {
            return Vec::new();
        }
        grid.empty_cells()
    }

    fn transit(&self, state: &GameState, action: Action) -> Result<Transition> {
        let mover = state.to_move;
        let grid = state.grid.with_piece(action, mover)?;

        let outcome = if self.wins_through(&grid, action) {
            Some(Outcome::Winner(mover))
        } else if grid.is_full() {
            Some(Outcome::Draw)
        } else {
            None
        };
        let reward = match outcome {
            Some(Outcome::Winner(_)) => WIN_REWARD,
            _ => 0.0,
        };

        Ok(Transition {
            state: GameState::new(grid, mover.opponent()),
            reward,
            done: outcome.is_some(),
            outcome,
        })
    }

    fn center(&self) -> (f64, f64) {
        (
            (self.rows as f64 - 1.0) / 2.0,
            (self.cols as f64 - 1.0) / 2.0,
        )
    }

    fn initial_state(&self) -> GameState {
        GameState::initial(self.rows, self.cols)
    }
}

// ============================================================================
// TESTS
// ============================================================================
