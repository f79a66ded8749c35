//! Single-heap subtraction game with a perfect-play solver.
//!
//! Players alternately remove between 1 and `max_take` objects; whoever takes
//! the last object wins. The side to move loses exactly when the heap is a
//! multiple of `max_take + 1`.

use crate::constants::{MAX_PAYOFF, MIN_PAYOFF};
use crate::game::{GameError, Player, Position, Solution, Solver};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nim {
    heap: u32,
    max_take: u32,
    to_move: Player,
}

impl Nim {
    pub fn new(heap: u32, max_take: u32) -> Self {
        Self {
            heap,
            max_take: max_take.max(1),
            to_move: Player::First,
        }
    }

    pub fn heap(&self) -> u32 {
        self.heap
    }

    /// Winner under perfect play.
    fn winner(&self) -> Player {
        if self.heap.is_multiple_of(self.max_take + 1) {
            self.to_move.opponent()
        } else {
            self.to_move
        }
    }

    fn payoff_for(winner: Player, side: Player) -> f64 {
        if winner == side { MAX_PAYOFF } else { MIN_PAYOFF }
    }
}

impl Position for Nim {
    type Move = u32;

    fn player_to_move(&self) -> Option<Player> {
        Some(self.to_move)
    }

    fn is_terminal(&self) -> bool {
        self.heap == 0
    }

    fn payoff(&self, side: Player) -> Result<f64, GameError> {
        if !self.is_terminal() {
            return Err(GameError::NotTerminal);
        }
        // The previous mover took the last object.
        Ok(Self::payoff_for(self.to_move.opponent(), side))
    }

    fn legal_moves(&self) -> Result<Vec<u32>, GameError> {
        Ok((1..=self.max_take.min(self.heap)).collect())
    }

    fn play(&self, mv: &u32) -> Result<Self, GameError> {
        if *mv == 0 || *mv > self.max_take || *mv > self.heap {
            return Err(GameError::IllegalMove(format!(
                "cannot take {mv} from a heap of {}",
                self.heap
            )));
        }
        Ok(Self {
            heap: self.heap - mv,
            max_take: self.max_take,
            to_move: self.to_move.opponent(),
        })
    }
}

/// Closed-form solver for [`Nim`].
///
/// The winner finishes as fast as possible and the loser stalls by taking one
/// object at a time, so the proof depth is exact for both sides.
#[derive(Debug, Clone, Copy, Default)]
pub struct NimSolver;

impl Solver<Nim> for NimSolver {
    fn solve(&self, position: &Nim) -> Option<Solution<u32>> {
        if position.is_terminal() {
            return None;
        }
        let period = position.max_take + 1;
        let rest = position.heap % period;
        let rounds = position.heap / period;
        let winner = position.winner();
        let (depth, best_move) = if rest == 0 {
            (2 * rounds, 1)
        } else {
            (1 + 2 * rounds, rest)
        };
        Some(Solution {
            payoff: Nim::payoff_for(winner, Player::First),
            depth,
            best_move: Some(best_move),
        })
    }
}
