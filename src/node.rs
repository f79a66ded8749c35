//! Search tree node representation.
//!
//! A node is one slot of the [`SearchTree`](crate::tree::SearchTree) arena.
//! Its statistics sit behind a per-node mutex; its child list is published
//! once, after every child slot exists, and is read without locking from then
//! on.

use std::ops::Range;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use crate::constants::{DRAW_PAYOFF, MAX_PAYOFF, MIN_PAYOFF};
use crate::game::Player;

/// Index into the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The root always occupies the first slot.
    pub const ROOT: NodeId = NodeId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A consistent copy of one node's statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeStats {
    /// Samples ever reserved on this node, resolved or not.
    pub total_samples: u64,
    /// Samples reserved by rollouts that have not committed yet.
    pub pending_samples: u64,
    /// Mean payoff for the first player over resolved samples, or the proven
    /// value once `exact` is set.
    pub payoff: f64,
    /// Whether `payoff` is proven.
    pub exact: bool,
}

impl NodeStats {
    fn new() -> Self {
        Self {
            total_samples: 0,
            pending_samples: 0,
            payoff: DRAW_PAYOFF,
            exact: false,
        }
    }

    /// Samples whose outcome has been committed.
    #[inline]
    pub fn resolved_samples(&self) -> u64 {
        self.total_samples - self.pending_samples
    }

    /// Whether `payoff` carries any information yet.
    #[inline]
    pub fn has_value(&self) -> bool {
        self.exact || self.resolved_samples() > 0
    }

    /// Payoff seen by `mover`, the side choosing this node from its parent.
    #[inline]
    pub fn value_for(&self, mover: Player) -> f64 {
        match mover {
            Player::First => self.payoff,
            Player::Second => MAX_PAYOFF + MIN_PAYOFF - self.payoff,
        }
    }
}

/// Mutable part of a node, guarded by the node's mutex.
#[derive(Debug)]
pub(crate) struct Slot {
    pub(crate) stats: NodeStats,
    /// Set by the one sampler that builds the child list.
    pub(crate) expanding: bool,
}

impl Slot {
    /// Reserve `n` samples for an in-flight rollout.
    #[inline]
    pub(crate) fn reserve(&mut self, n: u64) {
        self.stats.total_samples += n;
        self.stats.pending_samples += n;
    }

    /// Resolve `n` reserved samples whose payoffs sum to `aggregate`.
    ///
    /// Exact nodes keep their proven payoff and only release the reservation.
    pub(crate) fn commit(&mut self, n: u64, aggregate: f64) {
        debug_assert!(n <= self.stats.pending_samples, "commit exceeds reservation");
        let n = n.min(self.stats.pending_samples);
        if n == 0 {
            return;
        }
        self.stats.pending_samples -= n;
        if self.stats.exact {
            return;
        }
        let resolved = self.stats.resolved_samples() as f64;
        let mean = self.stats.payoff;
        let updated = mean + (aggregate - n as f64 * mean) / resolved;
        self.stats.payoff = updated.clamp(MIN_PAYOFF, MAX_PAYOFF);
    }

    /// Fix the payoff to a proven value. Returns `false` if already exact.
    pub(crate) fn mark_exact(&mut self, value: f64) -> bool {
        if self.stats.exact {
            debug_assert!(
                (self.stats.payoff - value).abs() < 1e-9,
                "node proven with two different values"
            );
            return false;
        }
        self.stats.payoff = value;
        self.stats.exact = true;
        true
    }
}

/// One vertex of the search tree.
#[derive(Debug)]
pub struct Node<M> {
    /// Move from the parent; `None` for the root.
    pub(crate) mv: Option<M>,
    /// Back-reference used by backpropagation only.
    pub(crate) parent: Option<NodeId>,
    pub(crate) depth: u32,
    pub(crate) player_to_move: Option<Player>,
    children: OnceLock<Range<u32>>,
    slot: Mutex<Slot>,
}

impl<M> Node<M> {
    pub(crate) fn new(
        mv: Option<M>,
        parent: Option<NodeId>,
        depth: u32,
        player_to_move: Option<Player>,
    ) -> Self {
        Self {
            mv,
            parent,
            depth,
            player_to_move,
            children: OnceLock::new(),
            slot: Mutex::new(Slot {
                stats: NodeStats::new(),
                expanding: false,
            }),
        }
    }

    /// Move that produced this node.
    pub fn mv(&self) -> Option<&M> {
        self.mv.as_ref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Distance from the root.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn player_to_move(&self) -> Option<Player> {
        self.player_to_move
    }

    /// Lock the node's statistics. A poisoned lock still holds consistent
    /// data because every update completes before the guard drops.
    #[inline]
    pub(crate) fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the statistics.
    pub fn stats(&self) -> NodeStats {
        self.lock().stats
    }

    /// Child ids, or `None` while the node is unexpanded.
    pub fn children(&self) -> Option<impl Iterator<Item = NodeId> + '_> {
        self.children.get().map(|r| r.clone().map(NodeId))
    }

    pub fn is_expanded(&self) -> bool {
        self.children.get().is_some()
    }

    /// Publish the child range. Only the expanding sampler calls this.
    pub(crate) fn publish_children(&self, range: Range<u32>) {
        let published = self.children.set(range).is_ok();
        debug_assert!(published, "children published twice");
    }
}
