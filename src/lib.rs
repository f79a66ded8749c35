//! Montecarlo: a game-agnostic concurrent Monte Carlo search engine.
//!
//! Any two-player game implementing [`Position`] can be searched. A
//! [`MonteCarloPlayer`] runs rollouts from the position, aggregates their
//! payoffs in a shared tree and returns the move with the best estimate.
//!
//! ## Modules
//!
//! - [`constants`] - Payoff range and engine defaults
//! - [`game`] - The position, move and solver contract
//! - [`node`] - Tree nodes and their statistics
//! - [`policy`] - Flat, UCB and UCT selection
//! - [`tree`] - Arena tree: reservation, expansion, backpropagation, proofs
//! - [`sampler`] - The worker loop and rollouts
//! - [`player`] - Budgeted move selection over a pool of samplers
//! - [`config`] - Player configuration
//! - [`games`] - Reference games used by the demo and tests
//!
//! ## Example
//!
//! ```
//! use montecarlo::games::TicTacToe;
//! use montecarlo::{MonteCarloPlayer, PlayerConfig};
//!
//! let config = PlayerConfig::uct(1).with_max_samples(Some(2_000)).with_seed(7);
//! let mut player = MonteCarloPlayer::new(config)?;
//!
//! let best = player.select_move(&TicTacToe::new())?;
//! assert!(best < 9);
//! println!("{}", player.report());
//! # Ok::<(), montecarlo::SearchError>(())
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod game;
pub mod games;
pub mod node;
pub mod player;
pub mod policy;
pub mod sampler;
pub mod tree;

pub use config::PlayerConfig;
pub use error::SearchError;
pub use game::{GameError, Player, Position, Solution, Solver};
pub use node::{NodeId, NodeStats};
pub use player::{MonteCarloPlayer, SearchReport};
pub use policy::SelectionPolicy;
pub use tree::{Descent, SearchTree};
