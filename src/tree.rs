//! Shared search tree with arena allocation.
//!
//! All nodes live in one growable arena and refer to parents and children by
//! [`NodeId`]. Any number of samplers work on the tree at once:
//!
//! - statistics are updated under each node's own mutex, never a global one
//! - the arena is read-locked for every walk and write-locked only while a
//!   freshly built child list is appended
//! - a child list is published once, after all of its slots exist
//!
//! No thread ever waits on the arena while holding a node mutex, and no node
//! mutex is held while another is taken, so the locks cannot deadlock.

use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::trace;

use crate::constants::{DRAW_PAYOFF, EXACT_DECAY, MAX_PAYOFF, MIN_PAYOFF};
use crate::error::SearchError;
use crate::game::{GameError, Player, Position, Solver};
use crate::node::{Node, NodeId, NodeStats};
use crate::policy::SelectionPolicy;

/// Outcome of [`SearchTree::reserve_and_descend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Descent {
    /// No children exist and none will be created now: roll out from here.
    Leaf,
    /// The node is proven; no rollout is needed below it.
    Exact,
    /// This call created the node's children; select among them next.
    Expanded,
    /// Continue the walk into this child.
    Child(NodeId),
}

/// Pull a proven payoff `levels` steps toward a draw.
pub fn decay(value: f64, levels: u32) -> f64 {
    let levels = levels.min(i32::MAX as u32) as i32;
    DRAW_PAYOFF + (value - DRAW_PAYOFF) * EXACT_DECAY.powi(levels)
}

/// Reject payoffs outside the declared range (NaN included).
pub(crate) fn check_payoff(value: f64) -> Result<f64, SearchError> {
    if (MIN_PAYOFF..=MAX_PAYOFF).contains(&value) {
        Ok(value)
    } else {
        Err(SearchError::PayoffOutOfRange { value })
    }
}

/// The proven value of `position`, if it is terminal or the solver knows it.
pub(crate) fn proven_value<P: Position>(
    position: &P,
    solver: Option<&dyn Solver<P>>,
) -> Result<Option<f64>, SearchError> {
    if position.is_terminal() {
        let payoff = position
            .payoff(Player::First)
            .map_err(|e| SearchError::contract(position, e))?;
        return check_payoff(payoff).map(Some);
    }
    match solver.and_then(|s| s.solve(position)) {
        Some(solution) => Ok(Some(decay(check_payoff(solution.payoff)?, solution.depth))),
        None => Ok(None),
    }
}

/// Arena-backed search tree shared by all samplers of one search.
#[derive(Debug)]
pub struct SearchTree<M> {
    nodes: RwLock<Vec<Node<M>>>,
    policy: SelectionPolicy,
}

impl<M: Clone + fmt::Debug> SearchTree<M> {
    /// Create a tree holding only a root for `position`.
    ///
    /// A terminal or solved root is recorded exact right away.
    pub fn new<P>(
        policy: SelectionPolicy,
        position: &P,
        solver: Option<&dyn Solver<P>>,
    ) -> Result<Self, SearchError>
    where
        P: Position<Move = M>,
    {
        let tree = Self {
            nodes: RwLock::new(vec![Node::new(None, None, 0, position.player_to_move())]),
            policy,
        };
        if let Some(value) = proven_value(position, solver)? {
            tree.record_terminal_or_solved(NodeId::ROOT, value);
        }
        Ok(tree)
    }

    #[inline]
    fn read(&self) -> RwLockReadGuard<'_, Vec<Node<M>>> {
        self.nodes.read().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    fn write(&self) -> RwLockWriteGuard<'_, Vec<Node<M>>> {
        self.nodes.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn stats(&self, id: NodeId) -> NodeStats {
        self.read()[id.index()].stats()
    }

    pub fn is_exact(&self, id: NodeId) -> bool {
        self.stats(id).exact
    }

    /// Move leading to `id`, `None` for the root.
    pub fn mv(&self, id: NodeId) -> Option<M> {
        self.read()[id.index()].mv().cloned()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.read()[id.index()].parent()
    }

    pub fn depth(&self, id: NodeId) -> u32 {
        self.read()[id.index()].depth()
    }

    /// Children of `id`, or `None` while it is unexpanded.
    pub fn children(&self, id: NodeId) -> Option<Vec<NodeId>> {
        self.read()[id.index()].children().map(|c| c.collect())
    }

    /// Record a proven value for a terminal or solved node.
    ///
    /// Returns `false` if the node was already exact.
    pub fn record_terminal_or_solved(&self, id: NodeId, value: f64) -> bool {
        let changed = self.read()[id.index()].lock().mark_exact(value);
        if changed {
            trace!(node = id.0, value, "node proven");
        }
        changed
    }

    /// Reserve `n` samples on `id` and decide how the walk continues.
    ///
    /// `position` must be the position of `id`; it is only used when this call
    /// creates the children. Never blocks on rollout work.
    pub fn reserve_and_descend<P>(
        &self,
        id: NodeId,
        n: u64,
        position: &P,
        solver: Option<&dyn Solver<P>>,
    ) -> Result<Descent, SearchError>
    where
        P: Position<Move = M>,
    {
        {
            let nodes = self.read();
            let node = &nodes[id.index()];
            let mut slot = node.lock();
            slot.reserve(n);
            if slot.stats.exact {
                return Ok(Descent::Exact);
            }
            if node.is_expanded() {
                let total = slot.stats.total_samples;
                drop(slot);
                return Ok(self.pick(&nodes, node, total).map_or(Descent::Leaf, Descent::Child));
            }
            let resolved = slot.stats.resolved_samples();
            if slot.expanding || !self.policy.maybe_expand(node.depth(), resolved) {
                return Ok(Descent::Leaf);
            }
            slot.expanding = true;
        }
        if self.expand(id, position, solver)? {
            Ok(Descent::Expanded)
        } else {
            Ok(Descent::Leaf)
        }
    }

    /// Select the next child of an expanded node without reserving anything.
    pub fn select_child(&self, id: NodeId) -> Option<NodeId> {
        let nodes = self.read();
        let node = &nodes[id.index()];
        let total = node.stats().total_samples;
        self.pick(&nodes, node, total)
    }

    fn pick(&self, nodes: &[Node<M>], node: &Node<M>, total: u64) -> Option<NodeId> {
        let children: Vec<(NodeId, NodeStats)> = node
            .children()?
            .map(|c| (c, nodes[c.index()].stats()))
            .collect();
        self.policy.select_child(node.player_to_move(), total, &children)
    }

    /// Create one child per legal move of `position` below `id`.
    ///
    /// Returns `false` when the position refuses to enumerate its moves; the
    /// node then stays a leaf for good. Every child is checked for a terminal
    /// or solved value as it is built.
    pub fn expand<P>(
        &self,
        id: NodeId,
        position: &P,
        solver: Option<&dyn Solver<P>>,
    ) -> Result<bool, SearchError>
    where
        P: Position<Move = M>,
    {
        let moves = match position.legal_moves() {
            Ok(moves) => moves,
            Err(GameError::NotEnumerable) => return Ok(false),
            Err(e) => return Err(SearchError::contract(position, e)),
        };
        if moves.is_empty() {
            return Err(SearchError::NoLegalMoves {
                position: format!("{position:?}"),
            });
        }

        let mut built = Vec::with_capacity(moves.len());
        for mv in moves {
            let child = position
                .play(&mv)
                .map_err(|e| SearchError::illegal_move(position, &mv, e))?;
            let value = proven_value(&child, solver)?;
            built.push((mv, child.player_to_move(), value));
        }

        let mut nodes = self.write();
        let depth = nodes[id.index()].depth() + 1;
        let start = nodes.len() as u32;
        for (mv, player, value) in built {
            let child = Node::new(Some(mv), Some(id), depth, player);
            if let Some(value) = value {
                child.lock().mark_exact(value);
            }
            nodes.push(child);
        }
        let end = nodes.len() as u32;
        nodes[id.index()].publish_children(start..end);
        trace!(node = id.0, children = end - start, depth, "expanded");
        Ok(true)
    }

    /// Resolve `n` samples reserved on `id` and on every ancestor.
    ///
    /// `aggregate` is the sum of the `n` payoffs, not their mean. Each node is
    /// updated atomically; the chain runs leaf to root.
    pub fn commit_samples(&self, id: NodeId, n: u64, aggregate: f64) {
        let nodes = self.read();
        let mut current = Some(id);
        while let Some(id) = current {
            let node = &nodes[id.index()];
            node.lock().commit(n, aggregate);
            current = node.parent();
        }
    }

    /// Prove `id` from its children when all of them are proven.
    ///
    /// The side to move takes its best child (max for the first player, min
    /// for the second), decayed by one level. Chance nodes are never proven
    /// this way. Returns whether the node changed state.
    pub fn try_mark_exact_from_children(&self, id: NodeId) -> bool {
        let nodes = self.read();
        let node = &nodes[id.index()];
        let Some(mover) = node.player_to_move() else {
            return false;
        };
        let Some(children) = node.children() else {
            return false;
        };

        let mut best: Option<f64> = None;
        for child in children {
            let stats = nodes[child.index()].stats();
            if !stats.exact {
                return false;
            }
            best = Some(match (best, mover) {
                (None, _) => stats.payoff,
                (Some(b), Player::First) => b.max(stats.payoff),
                (Some(b), Player::Second) => b.min(stats.payoff),
            });
        }
        let Some(best) = best else {
            return false;
        };

        let value = decay(best, 1);
        let changed = node.lock().mark_exact(value);
        if changed {
            trace!(node = id.0, value, "node proven from children");
        }
        changed
    }

    /// Push proofs upward from `id` until a node stays unproven.
    pub fn propagate_exact(&self, id: NodeId) {
        let mut current = id;
        loop {
            if !self.is_exact(current) && !self.try_mark_exact_from_children(current) {
                break;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
    }

    /// Child of `id` with the best payoff for the side to move there.
    ///
    /// Children without any resolved sample are skipped unless none has one.
    /// Ties go to the child listed first.
    pub fn best_child(&self, id: NodeId) -> Option<NodeId> {
        let nodes = self.read();
        let node = &nodes[id.index()];
        let mover = node.player_to_move().unwrap_or(Player::First);
        let children: Vec<(NodeId, NodeStats)> = node
            .children()?
            .map(|c| (c, nodes[c.index()].stats()))
            .collect();

        let mut best: Option<(NodeId, f64)> = None;
        for (child, stats) in children.iter().filter(|(_, s)| s.has_value()) {
            let value = stats.value_for(mover);
            match best {
                Some((_, v)) if value <= v => {}
                _ => best = Some((*child, value)),
            }
        }
        best.map(|(id, _)| id)
            .or_else(|| children.first().map(|(id, _)| *id))
    }

    /// Moves along the best line from the root.
    pub fn principal_variation(&self) -> Vec<M> {
        let mut line = Vec::new();
        let mut current = NodeId::ROOT;
        while let Some(child) = self.best_child(current) {
            match self.mv(child) {
                Some(mv) => line.push(mv),
                None => break,
            }
            current = child;
        }
        line
    }
}
