//! Engine defaults and payoff conventions.
//!
//! Every payoff handled by the engine lives in `[MIN_PAYOFF, MAX_PAYOFF]` and
//! is expressed for the first player. Run-time overrides go through
//! [`PlayerConfig`](crate::config::PlayerConfig).

// =============================================================================
// Payoff Range
// =============================================================================

/// Payoff of a lost game for the first player.
pub const MIN_PAYOFF: f64 = 0.0;

/// Payoff of a won game for the first player.
pub const MAX_PAYOFF: f64 = 1.0;

/// Payoff of a drawn game. Exact values decay toward this point.
pub const DRAW_PAYOFF: f64 = 0.5;

/// Per-level decay applied to proven values so shorter wins and longer losses
/// rank ahead of otherwise equal lines.
pub const EXACT_DECAY: f64 = 0.999;

// =============================================================================
// Sampling Parameters
// =============================================================================

/// Number of rollouts committed together by one sampler iteration.
pub const DEFAULT_BATCH_SIZE: u64 = 1;

/// Number of sampler workers sharing one tree.
pub const DEFAULT_WORKERS: usize = 1;

/// Sample ceiling used by the presets when no other budget is given.
pub const DEFAULT_MAX_SAMPLES: u64 = 10_000;

/// Exploration factor `c` in `sqrt(c * ln(N) / n)`.
pub const EXPLORATION: f64 = 2.0;

/// Tolerance used when matching solver payoffs against each other.
pub const PAYOFF_EPSILON: f64 = 1e-9;
