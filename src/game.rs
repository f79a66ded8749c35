//! The contract a game implements to be searched.
//!
//! The engine never looks inside a position. It asks whose turn it is, whether
//! the game is over, what the payoff is, which moves exist, and what the
//! successor of a move looks like. Positions are values: [`Position::play`]
//! returns a new position and leaves the receiver untouched, so every sampler
//! walks its own clone.

use std::fmt;

use thiserror::Error;

/// One of the two sides of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Player {
    /// Side 0. All payoffs in the tree are stored from this side's view.
    First,
    /// Side 1.
    Second,
}

impl Player {
    /// Numeric side index (0 or 1).
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Player::First => 0,
            Player::Second => 1,
        }
    }

    /// The other side.
    #[inline]
    pub fn opponent(self) -> Self {
        match self {
            Player::First => Player::Second,
            Player::Second => Player::First,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player {}", self.index())
    }
}

/// Errors reported by a [`Position`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// The move cannot be played from this position.
    #[error("illegal move: {0}")]
    IllegalMove(String),
    /// The game refuses to list its moves (move space too large).
    #[error("legal moves are not enumerable for this game")]
    NotEnumerable,
    /// A payoff was requested for a position that is still in play.
    #[error("payoff requested for a non-terminal position")]
    NotTerminal,
    /// A non-terminal position has no move to play.
    #[error("non-terminal position has no legal moves")]
    NoLegalMoves,
}

/// A full game state, as seen by the search.
pub trait Position: Clone + fmt::Debug + Send + Sync {
    /// A move from one position to the next.
    type Move: Clone + fmt::Debug + PartialEq + Send + Sync;

    /// Side to move, or `None` at a chance node nobody controls.
    fn player_to_move(&self) -> Option<Player>;

    /// Whether the game is over.
    fn is_terminal(&self) -> bool;

    /// Outcome for `side`, within `[MIN_PAYOFF, MAX_PAYOFF]`.
    ///
    /// Only valid for terminal positions; implementations return
    /// [`GameError::NotTerminal`] otherwise.
    fn payoff(&self, side: Player) -> Result<f64, GameError>;

    /// Every legal move, or [`GameError::NotEnumerable`] when the game
    /// cannot list them.
    fn legal_moves(&self) -> Result<Vec<Self::Move>, GameError>;

    /// A uniformly random legal move.
    ///
    /// The default draws from [`Position::legal_moves`]; games that refuse to
    /// enumerate should override it.
    fn random_move(&self, rng: &mut fastrand::Rng) -> Result<Self::Move, GameError> {
        let mut moves = self.legal_moves()?;
        if moves.is_empty() {
            return Err(GameError::NoLegalMoves);
        }
        let i = rng.usize(..moves.len());
        Ok(moves.swap_remove(i))
    }

    /// The position reached by playing `mv`.
    fn play(&self, mv: &Self::Move) -> Result<Self, GameError>;
}

/// A proven result returned by a [`Solver`].
#[derive(Debug, Clone, PartialEq)]
pub struct Solution<M> {
    /// Exact payoff for the first player under perfect play.
    pub payoff: f64,
    /// Plies until the game ends under perfect play.
    pub depth: u32,
    /// Move achieving the payoff, if the solver knows it.
    pub best_move: Option<M>,
}

/// An optional exact oracle for a game.
///
/// Returning `None` means "unknown", never "lost".
pub trait Solver<P: Position>: Send + Sync {
    /// Try to prove the value of `position`.
    fn solve(&self, position: &P) -> Option<Solution<P::Move>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Counter(u32);

    impl Position for Counter {
        type Move = u32;

        fn player_to_move(&self) -> Option<Player> {
            Some(Player::First)
        }

        fn is_terminal(&self) -> bool {
            self.0 >= 3
        }

        fn payoff(&self, _side: Player) -> Result<f64, GameError> {
            Err(GameError::NotTerminal)
        }

        fn legal_moves(&self) -> Result<Vec<u32>, GameError> {
            Ok(if self.is_terminal() { vec![] } else { vec![1, 2] })
        }

        fn play(&self, mv: &u32) -> Result<Self, GameError> {
            Ok(Counter(self.0 + mv))
        }
    }

    #[test]
    fn test_player_opponent_roundtrip() {
        assert_eq!(Player::First.opponent(), Player::Second);
        assert_eq!(Player::Second.opponent().opponent(), Player::Second);
        assert_eq!(Player::First.index(), 0);
        assert_eq!(Player::Second.index(), 1);
    }

    #[test]
    fn test_default_random_move_is_legal() {
        let pos = Counter(0);
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..20 {
            let mv = pos.random_move(&mut rng).unwrap();
            assert!(mv == 1 || mv == 2);
        }
    }

    #[test]
    fn test_default_random_move_without_moves() {
        let pos = Counter(5);
        let mut rng = fastrand::Rng::with_seed(7);
        assert_eq!(pos.random_move(&mut rng), Err(GameError::NoLegalMoves));
    }
}
