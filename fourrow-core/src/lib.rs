//! Four-in-a-row core - board, rules and shared types
//!
//! This crate provides the pieces every other crate builds on:
//! - Grid of cells with copy-on-write placement
//! - Player, action and game state types
//! - The `Rules` interface and the standard 4x9 four-in-a-row rules
//! - Board key codec (used by feature caches)
//! - Shared error type

pub mod board;
pub mod error;
pub mod game;

// Re-exports for convenient access
pub use board::{Action, Cell, Grid, Player};
pub use error::{Error, Result};
pub use game::{FourInARow, GameState, Outcome, Rules, Transition};
