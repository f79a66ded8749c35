//! Player configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_SAMPLES, DEFAULT_WORKERS};
use crate::error::SearchError;
use crate::game::{Position, Solver};
use crate::policy::SelectionPolicy;

/// Configuration for a [`MonteCarloPlayer`](crate::player::MonteCarloPlayer).
pub struct PlayerConfig<P: Position> {
    /// Wall-clock budget per move. `None` means unlimited.
    pub time_limit: Option<Duration>,

    /// Root sample ceiling per move. `None` means unlimited.
    /// At least one of the two budgets must be set.
    pub max_samples: Option<u64>,

    /// Rollouts played and committed together per iteration.
    pub batch_size: u64,

    /// Sampler threads sharing the tree. 0 is treated as 1.
    pub workers: usize,

    /// Seed for the workers' generators. Worker `i` uses `seed + i`;
    /// without a seed each worker seeds from the thread-local generator.
    pub seed: Option<u64>,

    /// Whether proven child values are combined into proven parent values.
    pub propagate_exact: bool,

    /// Optional exact oracle for the game.
    pub solver: Option<Arc<dyn Solver<P>>>,

    /// How the tree is walked and grown.
    pub policy: SelectionPolicy,
}

impl<P: Position> Clone for PlayerConfig<P> {
    fn clone(&self) -> Self {
        Self {
            time_limit: self.time_limit,
            max_samples: self.max_samples,
            batch_size: self.batch_size,
            workers: self.workers,
            seed: self.seed,
            propagate_exact: self.propagate_exact,
            solver: self.solver.clone(),
            policy: self.policy,
        }
    }
}

impl<P: Position> fmt::Debug for PlayerConfig<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerConfig")
            .field("time_limit", &self.time_limit)
            .field("max_samples", &self.max_samples)
            .field("batch_size", &self.batch_size)
            .field("workers", &self.workers)
            .field("seed", &self.seed)
            .field("propagate_exact", &self.propagate_exact)
            .field("solver", &self.solver.is_some())
            .field("policy", &self.policy)
            .finish()
    }
}

impl<P: Position> Default for PlayerConfig<P> {
    fn default() -> Self {
        Self::uct(DEFAULT_BATCH_SIZE)
    }
}

impl<P: Position> PlayerConfig<P> {
    fn with_policy_defaults(policy: SelectionPolicy, propagate_exact: bool) -> Self {
        Self {
            time_limit: None,
            max_samples: Some(DEFAULT_MAX_SAMPLES),
            batch_size: DEFAULT_BATCH_SIZE,
            workers: DEFAULT_WORKERS,
            seed: None,
            propagate_exact,
            solver: None,
            policy,
        }
    }

    /// Even sampling of the root's moves. Cheap baseline player.
    pub fn flat() -> Self {
        Self::with_policy_defaults(SelectionPolicy::Flat, false)
    }

    /// UCB1 over the root's moves.
    pub fn ucb() -> Self {
        Self::with_policy_defaults(SelectionPolicy::Ucb, false)
    }

    /// Full tree search with exact-value propagation.
    pub fn uct(children_threshold: u64) -> Self {
        Self::with_policy_defaults(SelectionPolicy::Uct { children_threshold }, true)
    }

    /// Builder pattern: set the per-move time budget.
    pub fn with_time_limit(mut self, limit: Option<Duration>) -> Self {
        self.time_limit = limit;
        self
    }

    /// Builder pattern: set the per-move sample ceiling.
    pub fn with_max_samples(mut self, max: Option<u64>) -> Self {
        self.max_samples = max;
        self
    }

    /// Builder pattern: set the batch size.
    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Builder pattern: set the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Builder pattern: seed the workers' generators.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builder pattern: enable or disable exact-value propagation.
    pub fn with_exact_propagation(mut self, enabled: bool) -> Self {
        self.propagate_exact = enabled;
        self
    }

    /// Builder pattern: attach a solver.
    pub fn with_solver<S: Solver<P> + 'static>(mut self, solver: S) -> Self {
        self.solver = Some(Arc::new(solver));
        self
    }

    /// Builder pattern: set the selection policy.
    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Number of sampler threads actually started.
    pub fn effective_workers(&self) -> usize {
        self.workers.max(1)
    }

    /// Reject configurations the search cannot run with.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.batch_size == 0 {
            return Err(SearchError::Config("batch size must be positive".into()));
        }
        if let SelectionPolicy::Uct { children_threshold } = self.policy {
            if children_threshold < self.batch_size {
                return Err(SearchError::Config(format!(
                    "children threshold {children_threshold} is smaller than batch size {}",
                    self.batch_size
                )));
            }
        }
        if self.time_limit.is_none() && self.max_samples.is_none() {
            return Err(SearchError::Config(
                "either a time limit or a sample ceiling is required".into(),
            ));
        }
        Ok(())
    }
}
