//! Small reference games implementing [`Position`](crate::game::Position).
//!
//! They drive the demo binary and the test suite; real games live with their
//! own rule engines outside this crate.

pub mod nim;
pub mod tictactoe;

pub use nim::{Nim, NimSolver};
pub use tictactoe::TicTacToe;
