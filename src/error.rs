//! Error taxonomy of the search.
//!
//! Only configuration mistakes and broken game contracts are errors. Draws,
//! a solver declining to answer, or a deadline expiring are normal outcomes.

use thiserror::Error;

use crate::game::GameError;

/// Errors returned by [`MonteCarloPlayer::select_move`](crate::player::MonteCarloPlayer::select_move).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    /// The player configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A finished game was handed to the search.
    #[error("cannot select a move in a terminal position")]
    TerminalPosition,

    /// A non-terminal root offered no legal moves.
    #[error("non-terminal position {position} has no legal moves")]
    NoLegalMoves { position: String },

    /// The root position refused to enumerate its moves.
    #[error("root position {position} cannot enumerate its legal moves")]
    NotEnumerable { position: String },

    /// Rollouts need a solver or a random-move capability and neither exists.
    #[error("no rollout source: no solver configured and {position} cannot produce random moves")]
    NoRolloutSource { position: String },

    /// A move the game offered was rejected when played.
    #[error("move {mv} rejected by position {position}: {reason}")]
    IllegalMove {
        position: String,
        mv: String,
        reason: GameError,
    },

    /// A position or solver produced a payoff outside the declared range.
    #[error("payoff {value} is outside [0, 1]")]
    PayoffOutOfRange { value: f64 },

    /// The root is a chance node; nobody chooses a move there.
    #[error("cannot select a move at a chance node")]
    ChanceRoot,

    /// The position broke its contract in some other way.
    #[error("position {position} violated its contract: {reason}")]
    Contract { position: String, reason: GameError },

    /// A sampler thread panicked.
    #[error("sampler worker panicked")]
    WorkerPanicked,
}

impl SearchError {
    /// Wrap a [`GameError`] raised while playing `mv` from `position`.
    pub fn illegal_move<P: std::fmt::Debug, M: std::fmt::Debug>(
        position: &P,
        mv: &M,
        reason: GameError,
    ) -> Self {
        SearchError::IllegalMove {
            position: format!("{position:?}"),
            mv: format!("{mv:?}"),
            reason,
        }
    }

    /// Wrap a [`GameError`] raised by `position` outside of `play`.
    pub fn contract<P: std::fmt::Debug>(position: &P, reason: GameError) -> Self {
        SearchError::Contract {
            position: format!("{position:?}"),
            reason,
        }
    }
}
