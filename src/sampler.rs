//! Sampler worker loop and rollouts.
//!
//! A sampler repeats one iteration until the budget runs out, the root is
//! proven, or another worker raises the stop flag:
//! 1. walk from the root, reserving the batch on every node visited
//! 2. roll out `batch_size` games from the node where the walk stopped
//!    (or reuse its proven value)
//! 3. commit the summed payoff from that node back up to the root
//! 4. optionally push proven values toward the root
//!
//! Budget and stop checks happen once per iteration; rollouts always run to a
//! terminal position or a solver answer, so no preemption is needed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::error::SearchError;
use crate::game::{GameError, Player, Position, Solver};
use crate::node::NodeId;
use crate::tree::{Descent, SearchTree, check_payoff, decay};

/// Limits shared by every sampler of one search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Budget {
    /// Wall-clock instant after which no new iteration starts.
    pub deadline: Option<Instant>,
    /// Root sample count after which no new iteration starts.
    pub max_samples: Option<u64>,
}

impl Budget {
    /// Whether a new iteration may still start with `root_samples` reserved
    /// on the root.
    pub fn exhausted(&self, root_samples: u64) -> bool {
        if self.max_samples.is_some_and(|max| root_samples >= max) {
            return true;
        }
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// One worker's view of a shared search.
pub struct Sampler<'a, P: Position> {
    tree: &'a SearchTree<P::Move>,
    root: &'a P,
    solver: Option<&'a dyn Solver<P>>,
    budget: Budget,
    batch_size: u64,
    propagate_exact: bool,
    stop: &'a AtomicBool,
    rng: fastrand::Rng,
}

impl<'a, P: Position> Sampler<'a, P> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tree: &'a SearchTree<P::Move>,
        root: &'a P,
        solver: Option<&'a dyn Solver<P>>,
        budget: Budget,
        batch_size: u64,
        propagate_exact: bool,
        stop: &'a AtomicBool,
        rng: fastrand::Rng,
    ) -> Self {
        Self {
            tree,
            root,
            solver,
            budget,
            batch_size: batch_size.max(1),
            propagate_exact,
            stop,
            rng,
        }
    }

    /// Run iterations until the budget is spent or the root is proven.
    ///
    /// Returns the number of iterations completed. On error the stop flag is
    /// raised so the other workers quit too.
    pub fn run(&mut self) -> Result<u64, SearchError> {
        let mut iterations = 0;
        loop {
            if self.stop.load(Ordering::Relaxed) {
                break;
            }
            let root = self.tree.stats(NodeId::ROOT);
            if root.exact || self.budget.exhausted(root.total_samples) {
                break;
            }
            if let Err(e) = self.step() {
                self.stop.store(true, Ordering::Relaxed);
                return Err(e);
            }
            iterations += 1;
        }
        Ok(iterations)
    }

    /// One select / rollout / commit iteration.
    pub fn step(&mut self) -> Result<(), SearchError> {
        let batch = self.batch_size;
        let mut position = self.root.clone();
        let mut node = NodeId::ROOT;

        let aggregate = loop {
            match self.tree.reserve_and_descend(node, batch, &position, self.solver)? {
                Descent::Exact => break self.tree.stats(node).payoff * batch as f64,
                Descent::Leaf => break self.rollouts(node, &position)?,
                Descent::Expanded => match self.tree.select_child(node) {
                    Some(child) => {
                        position = self.advance(&position, child)?;
                        node = child;
                    }
                    None => break self.rollouts(node, &position)?,
                },
                Descent::Child(child) => {
                    position = self.advance(&position, child)?;
                    node = child;
                }
            }
        };

        self.tree.commit_samples(node, batch, aggregate);
        if self.propagate_exact {
            self.tree.propagate_exact(node);
        }
        Ok(())
    }

    /// Replay the move leading to `child` on `position`.
    fn advance(&self, position: &P, child: NodeId) -> Result<P, SearchError> {
        match self.tree.mv(child) {
            Some(mv) => position
                .play(&mv)
                .map_err(|e| SearchError::illegal_move(position, &mv, e)),
            None => Ok(position.clone()),
        }
    }

    /// Sum of `batch_size` rollout payoffs from `position`, the position of
    /// `node`. A solver proof at `node` is recorded and stands in for them.
    fn rollouts(&mut self, node: NodeId, position: &P) -> Result<f64, SearchError> {
        if let Some(solution) = self.solver.and_then(|s| s.solve(position)) {
            let value = decay(check_payoff(solution.payoff)?, solution.depth);
            self.tree.record_terminal_or_solved(node, value);
            return Ok(value * self.batch_size as f64);
        }
        let mut sum = 0.0;
        for _ in 0..self.batch_size {
            sum += self.rollout(position)?;
        }
        Ok(sum)
    }

    /// Play random moves from `position` to the end of the game, stopping
    /// early when the solver knows the result.
    fn rollout(&mut self, position: &P) -> Result<f64, SearchError> {
        let mut current = position.clone();
        loop {
            if current.is_terminal() {
                let payoff = current
                    .payoff(Player::First)
                    .map_err(|e| SearchError::contract(&current, e))?;
                return check_payoff(payoff);
            }
            if let Some(solution) = self.solver.and_then(|s| s.solve(&current)) {
                return check_payoff(solution.payoff);
            }
            let mv = match current.random_move(&mut self.rng) {
                Ok(mv) => mv,
                Err(GameError::NotEnumerable) => {
                    return Err(SearchError::NoRolloutSource {
                        position: format!("{current:?}"),
                    });
                }
                Err(e) => return Err(SearchError::contract(&current, e)),
            };
            current = current
                .play(&mv)
                .map_err(|e| SearchError::illegal_move(&current, &mv, e))?;
        }
    }
}
