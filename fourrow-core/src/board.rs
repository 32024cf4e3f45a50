//! Rectangular grid with copy-on-write placement

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default board height
pub const DEFAULT_ROWS: usize = 4;

/// Default board width
pub const DEFAULT_COLS: usize = 9;

// ============================================================================
// PLAYER / CELL / ACTION
// ============================================================================

/// Player color. Black always moves first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Player {
    Black = 0,
    White = 1,
}

impl Player {
    pub fn opponent(self) -> Self {
        match self {
            Player::Black => Player::White,
            Player::White => Player::Black,
        }
    }

    /// Numeric id (0 = black, 1 = white)
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Player::Black),
            1 => Some(Player::White),
            _ => None,
        }
    }
}

/// Content of a single board cell
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    Black,
    White,
}

impl Cell {
    /// The player occupying this cell, if any
    pub fn owner(self) -> Option<Player> {
        match self {
            Cell::Empty => None,
            Cell::Black => Some(Player::Black),
            Cell::White => Some(Player::White),
        }
    }

    fn symbol(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::Black => '0',
            Cell::White => '1',
        }
    }

    fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '.' => Some(Cell::Empty),
            '0' => Some(Cell::Black),
            '1' => Some(Cell::White),
            _ => None,
        }
    }
}

impl From<Player> for Cell {
    fn from(player: Player) -> Self {
        match player {
            Player::Black => Cell::Black,
            Player::White => Cell::White,
        }
    }
}

/// A placement: the (row, col) of the empty cell to fill
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Action {
    pub row: usize,
    pub col: usize,
}

impl Action {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

// ============================================================================
// GRID
// ============================================================================

/// Immutable-by-convention board. Placement returns a new grid.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grid {
    rows: usize,
    cols: usize,
    /// Row-major cells
    cells: Vec<Cell>,
}

impl Grid {
    /// Create an empty grid of the given shape
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![Cell::Empty; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Cell at an in-bounds action. Panics when off the board.
    pub fn at(&self, action: Action) -> Cell {
        self.cells[action.row * self.cols + action.col]
    }

    /// Cell at a signed coordinate; `None` when off the board
    pub fn probe(&self, row: isize, col: isize) -> Option<Cell> {
        if row < 0 || col < 0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(self.cells[row * self.cols + col])
    }

    pub fn contains(&self, action: Action) -> bool {
        action.row < self.rows && action.col < self.cols
    }

    /// Place a piece, returning the new grid. `self` is left untouched.
    pub fn with_piece(&self, action: Action, player: Player) -> Result<Grid> {
        if !self.contains(action) || self.at(action) != Cell::Empty {
            return Err(Error::InvalidAction {
                row: action.row,
                col: action.col,
            });
        }
        let mut next = self.clone();
        next.cells[action.row * self.cols + action.col] = Cell::from(player);
        Ok(next)
    }

    /// Coordinates of a player's pieces in row-major order
    pub fn pieces(&self, player: Player) -> Vec<Action> {
        let target = Cell::from(player);
        self.actions_where(|cell| cell == target)
    }

    /// Coordinates of all empty cells in row-major order
    pub fn empty_cells(&self) -> Vec<Action> {
        self.actions_where(|cell| cell == Cell::Empty)
    }

    fn actions_where(&self, keep: impl Fn(Cell) -> bool) -> Vec<Action> {
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &cell)| keep(cell))
            .map(|(i, _)| Action::new(i / self.cols, i % self.cols))
            .collect()
    }

    pub fn count(&self, player: Player) -> usize {
        let target = Cell::from(player);
        self.cells.iter().filter(|&&cell| cell == target).count()
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|&cell| cell != Cell::Empty)
    }

    /// Player to move judged from piece counts (black moves on equal counts)
    pub fn next_player(&self) -> Player {
        if self.count(Player::Black) > self.count(Player::White) {
            Player::White
        } else {
            Player::Black
        }
    }

    /// Flat index of an action (`row * cols + col`)
    pub fn action_index(&self, action: Action) -> usize {
        action.row * self.cols + action.col
    }

    /// Inverse of [`Grid::action_index`]
    pub fn index_action(&self, index: usize) -> Result<Action> {
        if index >= self.rows * self.cols {
            return Err(Error::InvalidIndex { index });
        }
        Ok(Action::new(index / self.cols, index % self.cols))
    }

    // ========================================================================
    // KEY CODEC
    // ========================================================================

    /// Serialize to a key: rows joined by `-`, cells separated by spaces
    ///
    /// `.` is empty, `0` is black, `1` is white, e.g. `". 0 .-. . 1 ."`.
    pub fn to_key(&self) -> String {
        self.cells
            .chunks(self.cols.max(1))
            .map(|row| {
                row.iter()
                    .map(|cell| cell.symbol().to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Parse a key produced by [`Grid::to_key`]
    pub fn from_key(key: &str) -> Result<Grid> {
        let invalid = |reason: String| Error::InvalidKey { reason };

        if key.trim().is_empty() {
            return Err(invalid("empty key".to_string()));
        }

        let mut cells = Vec::new();
        let mut cols = None;
        let mut rows = 0;
        for (r, row) in key.split('-').enumerate() {
            let mut width = 0;
            for token in row.split_whitespace() {
                let mut chars = token.chars();
                let cell = match (chars.next(), chars.next()) {
                    (Some(symbol), None) => Cell::from_symbol(symbol),
                    _ => None,
                }
                .ok_or_else(|| invalid(format!("unknown cell '{}' in row {}", token, r)))?;
                cells.push(cell);
                width += 1;
            }
            match cols {
                None if width == 0 => return Err(invalid(format!("row {} is empty", r))),
                None => cols = Some(width),
                Some(expected) if expected != width => {
                    return Err(invalid(format!(
                        "row {} has {} cells, expected {}",
                        r, width, expected
                    )))
                }
                Some(_) => {}
            }
            rows += 1;
        }

        Ok(Grid {
            rows,
            cols: cols.unwrap_or(0),
            cells,
        })
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(DEFAULT_ROWS, DEFAULT_COLS)
    }
}

impl FromStr for Grid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Grid::from_key(s)
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.cols.max(1)) {
            let line: String = row.iter().map(|cell| cell.symbol()).collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_piece_is_copy_on_write() {
        let grid = Grid::default();
        let next = grid.with_piece(Action::new(1, 4), Player::Black).unwrap();

        assert_eq!(grid.at(Action::new(1, 4)), Cell::Empty);
        assert_eq!(next.at(Action::new(1, 4)), Cell::Black);
    }

    #[test]
    fn test_with_piece_rejects_occupied_and_off_board() {
        let grid = Grid::default()
            .with_piece(Action::new(0, 0), Player::White)
            .unwrap();

        assert_eq!(
            grid.with_piece(Action::new(0, 0), Player::Black),
            Err(Error::InvalidAction { row: 0, col: 0 })
        );
        assert!(grid.with_piece(Action::new(4, 0), Player::Black).is_err());
        assert!(grid.with_piece(Action::new(0, 9), Player::Black).is_err());
    }

    #[test]
    fn test_probe_boundaries() {
        let grid = Grid::default();
        assert_eq!(grid.probe(0, 0), Some(Cell::Empty));
        assert_eq!(grid.probe(3, 8), Some(Cell::Empty));
        assert_eq!(grid.probe(-1, 0), None);
        assert_eq!(grid.probe(0, -1), None);
        assert_eq!(grid.probe(4, 0), None);
        assert_eq!(grid.probe(0, 9), None);
    }

    #[test]
    fn test_pieces_row_major() {
        let grid = Grid::default()
            .with_piece(Action::new(2, 1), Player::Black)
            .and_then(|g| g.with_piece(Action::new(0, 5), Player::Black))
            .and_then(|g| g.with_piece(Action::new(1, 1), Player::White))
            .unwrap();

        assert_eq!(
            grid.pieces(Player::Black),
            vec![Action::new(0, 5), Action::new(2, 1)]
        );
        assert_eq!(grid.pieces(Player::White), vec![Action::new(1, 1)]);
        assert_eq!(grid.empty_cells().len(), 33);
        assert_eq!(grid.next_player(), Player::White);
    }

    #[test]
    fn test_key_round_trip() {
        let grid = Grid::default()
            .with_piece(Action::new(0, 0), Player::Black)
            .and_then(|g| g.with_piece(Action::new(3, 8), Player::White))
            .and_then(|g| g.with_piece(Action::new(1, 4), Player::Black))
            .unwrap();

        let key = grid.to_key();
        assert_eq!(key.split('-').count(), 4);
        assert!(key.starts_with("0 . ."));
        assert_eq!(Grid::from_key(&key).unwrap(), grid);
        assert_eq!(key.parse::<Grid>().unwrap(), grid);
    }

    #[test]
    fn test_key_rejects_malformed() {
        assert!(Grid::from_key("").is_err());
        assert!(Grid::from_key(". . .-. .").is_err());
        assert!(Grid::from_key(". x .").is_err());
        assert!(Grid::from_key(". 00 .").is_err());
    }

    #[test]
    fn test_action_index_round_trip() {
        let grid = Grid::default();
        let action = Action::new(2, 7);
        let index = grid.action_index(action);
        assert_eq!(index, 25);
        assert_eq!(grid.index_action(index).unwrap(), action);
        assert_eq!(grid.index_action(36), Err(Error::InvalidIndex { index: 36 }));
    }
}
