//! Hand-built game trees for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use montecarlo::{GameError, Player, Position};

/// Description of a game tree, flattened by [`Scripted::new`].
pub enum Script {
    /// Terminal position with the first player's payoff.
    End(f64),
    /// `Player` chooses one of the labelled moves.
    Choice(Player, Vec<(&'static str, Script)>),
    /// Nobody chooses; any labelled move may follow.
    Chance(Vec<(&'static str, Script)>),
}

#[derive(Debug)]
struct Vertex {
    mover: Option<Player>,
    payoff: Option<f64>,
    moves: Vec<(&'static str, usize)>,
}

/// A position inside a scripted tree.
#[derive(Debug, Clone)]
pub struct Scripted {
    vertices: Arc<Vec<Vertex>>,
    at: usize,
}

impl Scripted {
    pub fn new(script: Script) -> Self {
        let mut vertices = Vec::new();
        flatten(script, &mut vertices);
        Self {
            vertices: Arc::new(vertices),
            at: 0,
        }
    }

    fn vertex(&self) -> &Vertex {
        &self.vertices[self.at]
    }

    /// Follow a sequence of labels from this position.
    pub fn after(&self, path: &[&'static str]) -> Self {
        path.iter()
            .try_fold(self.clone(), |pos, mv| pos.play(mv))
            .expect("scripted path must exist")
    }
}

fn flatten(script: Script, vertices: &mut Vec<Vertex>) -> usize {
    let index = vertices.len();
    let (mover, payoff, children) = match script {
        Script::End(payoff) => (None, Some(payoff), Vec::new()),
        Script::Choice(player, children) => (Some(player), None, children),
        Script::Chance(children) => (None, None, children),
    };
    vertices.push(Vertex {
        mover,
        payoff,
        moves: Vec::new(),
    });
    let mut moves = Vec::with_capacity(children.len());
    for (label, child) in children {
        let child_index = flatten(child, vertices);
        moves.push((label, child_index));
    }
    vertices[index].moves = moves;
    index
}

impl Position for Scripted {
    type Move = &'static str;

    fn player_to_move(&self) -> Option<Player> {
        self.vertex().mover
    }

    fn is_terminal(&self) -> bool {
        self.vertex().payoff.is_some()
    }

    fn payoff(&self, side: Player) -> Result<f64, GameError> {
        let first = self.vertex().payoff.ok_or(GameError::NotTerminal)?;
        Ok(match side {
            Player::First => first,
            Player::Second => 1.0 - first,
        })
    }

    fn legal_moves(&self) -> Result<Vec<&'static str>, GameError> {
        Ok(self.vertex().moves.iter().map(|(label, _)| *label).collect())
    }

    fn play(&self, mv: &&'static str) -> Result<Self, GameError> {
        let (_, next) = self
            .vertex()
            .moves
            .iter()
            .find(|(label, _)| label == mv)
            .ok_or_else(|| GameError::IllegalMove(mv.to_string()))?;
        Ok(Self {
            vertices: Arc::clone(&self.vertices),
            at: *next,
        })
    }
}

/// Shorthand for a first-player choice.
pub fn first(moves: Vec<(&'static str, Script)>) -> Script {
    Script::Choice(Player::First, moves)
}

/// Shorthand for a second-player choice.
pub fn second(moves: Vec<(&'static str, Script)>) -> Script {
    Script::Choice(Player::Second, moves)
}

/// Root → {A: forced loss two plies deep, B: forced win one ply deep}.
pub fn win_or_lose() -> Scripted {
    Scripted::new(first(vec![
        (
            "A",
            second(vec![
                ("A1", first(vec![("A1x", Script::End(0.0)), ("A1y", Script::End(0.0))])),
                ("A2", first(vec![("A2x", Script::End(0.0))])),
            ]),
        ),
        ("B", second(vec![("B1", Script::End(1.0)), ("B2", Script::End(1.0))])),
    ]))
}

/// Root → {trap: nine losing replies and one winning reply for the opponent,
/// safe: every reply draws}. Random rollouts rate the trap at 0.9 for the
/// first player; perfect play rates it 0.
pub fn trap_or_draw() -> Scripted {
    let mut trap: Vec<(&'static str, Script)> = vec![("refute", Script::End(0.0))];
    const BLUNDERS: [&str; 9] = ["t1", "t2", "t3", "t4", "t5", "t6", "t7", "t8", "t9"];
    for label in BLUNDERS {
        trap.push((label, Script::End(1.0)));
    }
    Scripted::new(first(vec![
        ("trap", second(trap)),
        (
            "safe",
            second(vec![("s1", Script::End(0.5)), ("s2", Script::End(0.5))]),
        ),
    ]))
}
