//! Selection policies: which child to sample next and when to grow the tree.
//!
//! Three variants are supported:
//! - [`SelectionPolicy::Flat`] spreads samples evenly over the root's moves
//! - [`SelectionPolicy::Ucb`] applies UCB1 to the root's moves only
//! - [`SelectionPolicy::Uct`] applies UCB1 at every depth, growing children
//!   lazily once a node has enough resolved samples
//!
//! The UCB1 priority of a child is
//! `value_for_mover(child) + sqrt(EXPLORATION * ln(N) / child.total_samples)`
//! where `N` is the parent's total sample count. Unsampled children have
//! infinite priority so every move is tried once before exploitation.

use std::fmt;

use crate::constants::EXPLORATION;
use crate::game::Player;
use crate::node::{NodeId, NodeStats};

/// How a player walks and grows its search tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Equal share per root move, no deepening.
    Flat,
    /// UCB1 over the root's moves, no deepening.
    Ucb,
    /// UCB1 at every depth; a node grows children once it has
    /// `children_threshold` resolved samples.
    Uct { children_threshold: u64 },
}

impl SelectionPolicy {
    /// Whether a node at `depth` with `resolved` committed samples may create
    /// its children now.
    pub fn maybe_expand(&self, depth: u32, resolved: u64) -> bool {
        match *self {
            SelectionPolicy::Flat | SelectionPolicy::Ucb => depth == 0,
            SelectionPolicy::Uct { children_threshold } => resolved >= children_threshold,
        }
    }

    /// Pick the child to descend into.
    ///
    /// `mover` is the side choosing among `children`; `parent_total` is the
    /// parent's total sample count including reservations. Ties go to the
    /// child listed first.
    pub fn select_child(
        &self,
        mover: Option<Player>,
        parent_total: u64,
        children: &[(NodeId, NodeStats)],
    ) -> Option<NodeId> {
        match (self, mover) {
            (SelectionPolicy::Flat, _) | (_, None) => least_sampled(children),
            (SelectionPolicy::Ucb | SelectionPolicy::Uct { .. }, Some(mover)) => {
                most_urgent(mover, parent_total, children)
            }
        }
    }

    /// Whether the policy ever descends below the root's children.
    pub fn is_tree(&self) -> bool {
        matches!(self, SelectionPolicy::Uct { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            SelectionPolicy::Flat => "flat",
            SelectionPolicy::Ucb => "ucb",
            SelectionPolicy::Uct { .. } => "uct",
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionPolicy::Uct { children_threshold } => {
                write!(f, "uct(threshold={children_threshold})")
            }
            other => f.write_str(other.name()),
        }
    }
}

/// UCB1 priority of `child` for `mover`, given the precomputed
/// `EXPLORATION * ln(N)` term of its parent.
#[inline]
pub fn ucb_priority(child: &NodeStats, mover: Player, log_term: f64) -> f64 {
    if child.total_samples == 0 {
        return f64::INFINITY;
    }
    child.value_for(mover) + (log_term / child.total_samples as f64).sqrt()
}

/// Child with the highest UCB1 priority.
fn most_urgent(mover: Player, parent_total: u64, children: &[(NodeId, NodeStats)]) -> Option<NodeId> {
    let log_term = EXPLORATION * (parent_total.max(1) as f64).ln();
    let mut best: Option<(NodeId, f64)> = None;
    for (id, stats) in children {
        let priority = ucb_priority(stats, mover, log_term);
        match best {
            Some((_, p)) if priority <= p => {}
            _ => best = Some((*id, priority)),
        }
    }
    best.map(|(id, _)| id)
}

/// Child with the fewest samples, so every child gets an equal share.
fn least_sampled(children: &[(NodeId, NodeStats)]) -> Option<NodeId> {
    let mut best: Option<(NodeId, u64)> = None;
    for (id, stats) in children {
        match best {
            Some((_, n)) if stats.total_samples >= n => {}
            _ => best = Some((*id, stats.total_samples)),
        }
    }
    best.map(|(id, _)| id)
}
