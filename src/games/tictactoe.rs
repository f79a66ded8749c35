//! Tic-tac-toe on a 3x3 board.
//!
//! Cells are numbered 0..9 row by row. The first player plays `X`.

use std::fmt;

use crate::constants::{DRAW_PAYOFF, MAX_PAYOFF, MIN_PAYOFF};
use crate::game::{GameError, Player, Position};

const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// A tic-tac-toe position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TicTacToe {
    cells: [Option<Player>; 9],
    to_move: Player,
}

impl Default for TicTacToe {
    fn default() -> Self {
        Self::new()
    }
}

impl TicTacToe {
    /// Empty board, first player to move.
    pub fn new() -> Self {
        Self {
            cells: [None; 9],
            to_move: Player::First,
        }
    }

    /// Build a position by playing `moves` from the empty board.
    pub fn from_moves(moves: &[u8]) -> Result<Self, GameError> {
        moves.iter().try_fold(Self::new(), |pos, mv| pos.play(mv))
    }

    pub fn cell(&self, index: usize) -> Option<Player> {
        self.cells.get(index).copied().flatten()
    }

    /// Side with three in a row, if any.
    pub fn winner(&self) -> Option<Player> {
        LINES.iter().find_map(|&[a, b, c]| match self.cells[a] {
            Some(p) if self.cells[b] == Some(p) && self.cells[c] == Some(p) => Some(p),
            _ => None,
        })
    }

    fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }
}

impl Position for TicTacToe {
    type Move = u8;

    fn player_to_move(&self) -> Option<Player> {
        Some(self.to_move)
    }

    fn is_terminal(&self) -> bool {
        self.winner().is_some() || self.is_full()
    }

    fn payoff(&self, side: Player) -> Result<f64, GameError> {
        match self.winner() {
            Some(w) if w == side => Ok(MAX_PAYOFF),
            Some(_) => Ok(MIN_PAYOFF),
            None if self.is_full() => Ok(DRAW_PAYOFF),
            None => Err(GameError::NotTerminal),
        }
    }

    fn legal_moves(&self) -> Result<Vec<u8>, GameError> {
        if self.is_terminal() {
            return Ok(Vec::new());
        }
        Ok((0..9u8).filter(|&i| self.cells[i as usize].is_none()).collect())
    }

    fn random_move(&self, rng: &mut fastrand::Rng) -> Result<u8, GameError> {
        let empty = self.cells.iter().filter(|c| c.is_none()).count();
        if empty == 0 || self.winner().is_some() {
            return Err(GameError::NoLegalMoves);
        }
        let pick = rng.usize(..empty);
        let index = self
            .cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_none())
            .nth(pick)
            .map(|(i, _)| i as u8)
            .ok_or(GameError::NoLegalMoves)?;
        Ok(index)
    }

    fn play(&self, mv: &u8) -> Result<Self, GameError> {
        let index = *mv as usize;
        if index >= 9 {
            return Err(GameError::IllegalMove(format!("cell {mv} is off the board")));
        }
        if self.cells[index].is_some() {
            return Err(GameError::IllegalMove(format!("cell {mv} is occupied")));
        }
        if self.is_terminal() {
            return Err(GameError::IllegalMove("game is over".into()));
        }
        let mut next = *self;
        next.cells[index] = Some(self.to_move);
        next.to_move = self.to_move.opponent();
        Ok(next)
    }
}

impl fmt::Display for TicTacToe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..3 {
            for col in 0..3 {
                let c = match self.cells[row * 3 + col] {
                    Some(Player::First) => 'X',
                    Some(Player::Second) => 'O',
                    None => '.',
                };
                write!(f, "{c}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_win() {
        // X: 0 1 2, O: 3 4
        let pos = TicTacToe::from_moves(&[0, 3, 1, 4, 2]).unwrap();
        assert_eq!(pos.winner(), Some(Player::First));
        assert!(pos.is_terminal());
        assert_eq!(pos.payoff(Player::First), Ok(1.0));
        assert_eq!(pos.payoff(Player::Second), Ok(0.0));
        assert!(pos.legal_moves().unwrap().is_empty());
    }

    #[test]
    fn test_draw() {
        let pos = TicTacToe::from_moves(&[0, 1, 2, 4, 3, 5, 7, 6, 8]).unwrap();
        assert_eq!(pos.winner(), None);
        assert_eq!(pos.payoff(Player::First), Ok(0.5));
    }

    #[test]
    fn test_occupied_cell_rejected() {
        let pos = TicTacToe::from_moves(&[4]).unwrap();
        assert!(matches!(pos.play(&4), Err(GameError::IllegalMove(_))));
        assert!(matches!(pos.play(&9), Err(GameError::IllegalMove(_))));
    }

    #[test]
    fn test_payoff_before_end_is_an_error() {
        assert_eq!(TicTacToe::new().payoff(Player::First), Err(GameError::NotTerminal));
    }

    #[test]
    fn test_random_move_hits_empty_cell() {
        let pos = TicTacToe::from_moves(&[0, 1, 2, 3]).unwrap();
        let mut rng = fastrand::Rng::with_seed(11);
        for _ in 0..50 {
            let mv = pos.random_move(&mut rng).unwrap();
            assert!(pos.cell(mv as usize).is_none());
        }
    }

    #[test]
    fn test_display() {
        let pos = TicTacToe::from_moves(&[4, 0]).unwrap();
        assert_eq!(pos.to_string(), "O..\n.X.\n...\n");
    }
}
