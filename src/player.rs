//! Move selection: turns a budget into one chosen move.
//!
//! [`MonteCarloPlayer::select_move`] validates the root, answers directly
//! when there is a single move or the solver can replay a proof, and otherwise
//! runs the configured number of samplers over one shared tree before picking
//! the root child with the best payoff for the side to move.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::PlayerConfig;
use crate::constants::PAYOFF_EPSILON;
use crate::error::SearchError;
use crate::game::{GameError, Player, Position, Solution, Solver};
use crate::node::NodeId;
use crate::sampler::{Budget, Sampler};
use crate::tree::{SearchTree, check_payoff, decay};

/// Summary of one move selection, for logging.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchReport {
    /// The chosen move, formatted with `Debug`.
    pub chosen: String,
    /// Payoff of the chosen move for the first player. `None` when the move
    /// was forced and nothing was evaluated.
    pub payoff: Option<f64>,
    /// Whether `payoff` is proven.
    pub exact: bool,
    /// Resolved samples below the chosen move.
    pub resolved_samples: u64,
    /// Samples ever reserved below the chosen move.
    pub total_samples: u64,
    /// Samples reserved at the root.
    pub root_samples: u64,
    /// Sampler iterations summed over all workers.
    pub iterations: u64,
    /// Nodes in the tree when the search ended.
    pub nodes: usize,
    pub workers: usize,
    pub elapsed: Duration,
    /// Expected continuation, chosen move first.
    pub principal_variation: Vec<String>,
}

impl fmt::Display for SearchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "move {} ", self.chosen)?;
        match self.payoff {
            Some(payoff) => write!(f, "value {payoff:.3}{}", if self.exact { " exact" } else { "" })?,
            None => write!(f, "forced, not searched")?,
        }
        write!(
            f,
            " ({}/{} samples) root {} samples, {} iterations, {} nodes, {} workers, {:.1?}",
            self.resolved_samples,
            self.total_samples,
            self.root_samples,
            self.iterations,
            self.nodes,
            self.workers,
            self.elapsed,
        )?;
        if self.principal_variation.len() > 1 {
            write!(f, " pv {}", self.principal_variation.join(" "))?;
        }
        Ok(())
    }
}

/// A Monte Carlo player for one game type.
pub struct MonteCarloPlayer<P: Position> {
    config: PlayerConfig<P>,
    last_report: Option<SearchReport>,
}

impl<P: Position> MonteCarloPlayer<P> {
    /// Create a player; fails on an unusable configuration.
    pub fn new(config: PlayerConfig<P>) -> Result<Self, SearchError> {
        config.validate()?;
        Ok(Self {
            config,
            last_report: None,
        })
    }

    pub fn config(&self) -> &PlayerConfig<P> {
        &self.config
    }

    /// Choose a move for `position` and remember the report.
    pub fn select_move(&mut self, position: &P) -> Result<P::Move, SearchError> {
        let (mv, report) = self.search(position)?;
        debug!(%report, "move selected");
        self.last_report = Some(report);
        Ok(mv)
    }

    /// Human-readable summary of the last selection.
    pub fn report(&self) -> String {
        match &self.last_report {
            Some(report) => report.to_string(),
            None => "no move selected yet".to_string(),
        }
    }

    pub fn last_report(&self) -> Option<&SearchReport> {
        self.last_report.as_ref()
    }

    /// Choose a move for `position` without touching the stored report.
    ///
    /// The root's children are always created up front, whatever the policy's
    /// expansion threshold, since the choice is made among them.
    pub fn search(&self, position: &P) -> Result<(P::Move, SearchReport), SearchError> {
        let start = Instant::now();
        if position.is_terminal() {
            return Err(SearchError::TerminalPosition);
        }
        if position.player_to_move().is_none() {
            return Err(SearchError::ChanceRoot);
        }
        let legal = match position.legal_moves() {
            Ok(moves) => moves,
            Err(GameError::NotEnumerable) => {
                return Err(SearchError::NotEnumerable {
                    position: format!("{position:?}"),
                });
            }
            Err(e) => return Err(SearchError::contract(position, e)),
        };
        if legal.is_empty() {
            return Err(SearchError::NoLegalMoves {
                position: format!("{position:?}"),
            });
        }

        if let [only] = legal.as_slice() {
            let report = self.direct_report(only, None, start);
            return Ok((only.clone(), report));
        }

        let solver = self.config.solver.as_deref();
        if let Some(solver) = solver
            && let Some(solution) = solver.solve(position)
        {
            if let Some(mv) = proof_move(solver, position, &legal, &solution)? {
                let value = decay(check_payoff(solution.payoff)?, solution.depth);
                let report = self.direct_report(&mv, Some(value), start);
                return Ok((mv, report));
            }
            warn!(?position, "solver proof could not be replayed, sampling instead");
        }

        // The root was already put to the solver; an unconfirmed claim must not
        // mark it proven.
        let tree = SearchTree::new(self.config.policy, position, None)?;
        tree.expand(NodeId::ROOT, position, solver)?;
        let iterations = self.run_samplers(&tree, position, start)?;

        let chosen = tree.best_child(NodeId::ROOT).ok_or_else(|| SearchError::NoLegalMoves {
            position: format!("{position:?}"),
        })?;
        let mv = tree.mv(chosen).ok_or_else(|| SearchError::NoLegalMoves {
            position: format!("{position:?}"),
        })?;
        debug_assert!(legal.contains(&mv), "chosen move not among legal moves");

        let stats = tree.stats(chosen);
        let report = SearchReport {
            chosen: format!("{mv:?}"),
            payoff: Some(stats.payoff),
            exact: stats.exact,
            resolved_samples: stats.resolved_samples(),
            total_samples: stats.total_samples,
            root_samples: tree.stats(NodeId::ROOT).total_samples,
            iterations,
            nodes: tree.len(),
            workers: self.config.effective_workers(),
            elapsed: start.elapsed(),
            principal_variation: tree
                .principal_variation()
                .iter()
                .map(|m| format!("{m:?}"))
                .collect(),
        };
        Ok((mv, report))
    }

    /// Run every sampler to completion and return the total iteration count.
    fn run_samplers(
        &self,
        tree: &SearchTree<P::Move>,
        position: &P,
        start: Instant,
    ) -> Result<u64, SearchError> {
        let budget = Budget {
            deadline: self.config.time_limit.map(|limit| start + limit),
            max_samples: self.config.max_samples,
        };
        let solver = self.config.solver.as_deref();
        let stop = &AtomicBool::new(false);
        let workers = self.config.effective_workers();

        let sampler = |worker: usize| {
            let rng = match self.config.seed {
                Some(seed) => fastrand::Rng::with_seed(seed.wrapping_add(worker as u64)),
                None => fastrand::Rng::new(),
            };
            Sampler::new(
                tree,
                position,
                solver,
                budget,
                self.config.batch_size,
                self.config.propagate_exact,
                stop,
                rng,
            )
        };

        let results: Vec<Result<u64, SearchError>> = if workers == 1 {
            vec![sampler(0).run()]
        } else {
            thread::scope(|scope| {
                let handles: Vec<_> = (0..workers)
                    .map(|worker| {
                        let mut sampler = sampler(worker);
                        scope.spawn(move || sampler.run())
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| {
                        handle.join().unwrap_or_else(|_| {
                            stop.store(true, Ordering::Relaxed);
                            Err(SearchError::WorkerPanicked)
                        })
                    })
                    .collect()
            })
        };

        let mut iterations = 0;
        for result in results {
            iterations += result?;
        }
        Ok(iterations)
    }

    /// Report for a move chosen without sampling: forced (`payoff` is `None`)
    /// or proven by the solver.
    fn direct_report(&self, mv: &P::Move, payoff: Option<f64>, start: Instant) -> SearchReport {
        SearchReport {
            chosen: format!("{mv:?}"),
            payoff,
            exact: payoff.is_some(),
            resolved_samples: 0,
            total_samples: 0,
            root_samples: 0,
            iterations: 0,
            nodes: 0,
            workers: self.config.effective_workers(),
            elapsed: start.elapsed(),
            principal_variation: vec![format!("{mv:?}")],
        }
    }
}

/// Replay a solver proof one ply: the move whose successor carries the same
/// payoff one ply closer to the end.
fn proof_move<P: Position>(
    solver: &dyn Solver<P>,
    position: &P,
    legal: &[P::Move],
    solution: &Solution<P::Move>,
) -> Result<Option<P::Move>, SearchError> {
    if let Some(best) = &solution.best_move
        && legal.contains(best)
    {
        return Ok(Some(best.clone()));
    }
    for mv in legal {
        let child = position
            .play(mv)
            .map_err(|e| SearchError::illegal_move(position, mv, e))?;
        let (payoff, depth) = if child.is_terminal() {
            let payoff = child
                .payoff(Player::First)
                .map_err(|e| SearchError::contract(&child, e))?;
            (payoff, 0)
        } else {
            match solver.solve(&child) {
                Some(s) => (s.payoff, s.depth),
                None => continue,
            }
        };
        if (payoff - solution.payoff).abs() <= PAYOFF_EPSILON && depth + 1 == solution.depth {
            return Ok(Some(mv.clone()));
        }
    }
    Ok(None)
}
