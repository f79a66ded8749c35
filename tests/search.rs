//! End-to-end searches over scripted trees and the bundled games.

mod common;

use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::Duration;

use common::{Script, Scripted, first, trap_or_draw, win_or_lose};
use montecarlo::games::{Nim, NimSolver, TicTacToe};
use montecarlo::sampler::{Budget, Sampler};
use montecarlo::tree::decay;
use montecarlo::{
    GameError, MonteCarloPlayer, NodeId, Player, PlayerConfig, Position, SearchError, SearchTree,
    SelectionPolicy, Solution, Solver,
};

/// Offers two moves but refuses to play either.
#[derive(Debug, Clone)]
struct Liar;

impl Position for Liar {
    type Move = u8;

    fn player_to_move(&self) -> Option<Player> {
        Some(Player::First)
    }

    fn is_terminal(&self) -> bool {
        false
    }

    fn payoff(&self, _side: Player) -> Result<f64, GameError> {
        Err(GameError::NotTerminal)
    }

    fn legal_moves(&self) -> Result<Vec<u8>, GameError> {
        Ok(vec![0, 1])
    }

    fn play(&self, mv: &u8) -> Result<Self, GameError> {
        Err(GameError::IllegalMove(format!("{mv} is never legal")))
    }
}

/// Moves exist but cannot be listed.
#[derive(Debug, Clone)]
struct Opaque;

impl Position for Opaque {
    type Move = u8;

    fn player_to_move(&self) -> Option<Player> {
        Some(Player::First)
    }

    fn is_terminal(&self) -> bool {
        false
    }

    fn payoff(&self, _side: Player) -> Result<f64, GameError> {
        Err(GameError::NotTerminal)
    }

    fn legal_moves(&self) -> Result<Vec<u8>, GameError> {
        Err(GameError::NotEnumerable)
    }

    fn random_move(&self, _rng: &mut fastrand::Rng) -> Result<u8, GameError> {
        Ok(0)
    }

    fn play(&self, _mv: &u8) -> Result<Self, GameError> {
        Ok(Opaque)
    }
}

/// Knows the value of a position but never names a move.
struct Moveless;

impl Solver<Nim> for Moveless {
    fn solve(&self, position: &Nim) -> Option<Solution<u32>> {
        NimSolver.solve(position).map(|s| Solution {
            best_move: None,
            ..s
        })
    }
}

/// Plays fine for three plies, then rejects every move it offers.
#[derive(Debug, Clone)]
struct Brittle(u8);

impl Position for Brittle {
    type Move = u8;

    fn player_to_move(&self) -> Option<Player> {
        Some(if self.0.is_multiple_of(2) { Player::First } else { Player::Second })
    }

    fn is_terminal(&self) -> bool {
        false
    }

    fn payoff(&self, _side: Player) -> Result<f64, GameError> {
        Err(GameError::NotTerminal)
    }

    fn legal_moves(&self) -> Result<Vec<u8>, GameError> {
        Ok(vec![0, 1])
    }

    fn play(&self, mv: &u8) -> Result<Self, GameError> {
        if self.0 >= 3 {
            return Err(GameError::IllegalMove(format!("{mv} after ply {}", self.0)));
        }
        Ok(Brittle(self.0 + 1))
    }
}

/// Perfect play, except at heaps above `horizon`.
struct Horizon {
    horizon: u32,
}

impl Solver<Nim> for Horizon {
    fn solve(&self, position: &Nim) -> Option<Solution<u32>> {
        if position.heap() > self.horizon {
            return None;
        }
        NimSolver.solve(position)
    }
}

/// Claims a win at heap 7 it cannot back up, and knows nothing else.
struct Bluff;

impl Solver<Nim> for Bluff {
    fn solve(&self, position: &Nim) -> Option<Solution<u32>> {
        (position.heap() == 7).then_some(Solution {
            payoff: 1.0,
            depth: 40,
            best_move: Some(9),
        })
    }
}

#[test]
fn test_single_legal_move_is_returned_without_sampling() {
    // X: 0 2 3 7, O: 1 4 5 6; only cell 8 is left.
    let pos = TicTacToe::from_moves(&[0, 1, 2, 4, 3, 5, 7, 6]).unwrap();
    assert!(!pos.is_terminal());

    let mut player = MonteCarloPlayer::new(PlayerConfig::uct(1).with_seed(1)).unwrap();
    assert_eq!(player.select_move(&pos), Ok(8));
    let report = player.last_report().unwrap();
    assert_eq!(report.root_samples, 0);
    assert_eq!(report.iterations, 0);
    assert_eq!(report.payoff, None);
    assert!(!report.exact);
    assert_eq!(report.workers, 1);
    assert!(player.report().contains("not searched"), "{}", player.report());
}

#[test]
fn test_terminal_position_is_rejected() {
    let pos = TicTacToe::from_moves(&[0, 3, 1, 4, 2]).unwrap();
    let mut player = MonteCarloPlayer::new(PlayerConfig::uct(1)).unwrap();
    assert_eq!(player.select_move(&pos), Err(SearchError::TerminalPosition));
    assert!(player.last_report().is_none());
}

#[test]
fn test_chance_root_is_rejected() {
    let pos = Scripted::new(Script::Chance(vec![
        ("heads", Script::End(1.0)),
        ("tails", Script::End(0.0)),
    ]));
    let mut player = MonteCarloPlayer::new(PlayerConfig::flat()).unwrap();
    assert_eq!(player.select_move(&pos), Err(SearchError::ChanceRoot));
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = PlayerConfig::<TicTacToe>::uct(1).with_batch_size(0);
    assert!(matches!(MonteCarloPlayer::new(config), Err(SearchError::Config(_))));

    let config = PlayerConfig::<TicTacToe>::flat().with_max_samples(None);
    assert!(matches!(MonteCarloPlayer::new(config), Err(SearchError::Config(_))));
}

#[test]
fn test_uct_finds_the_shallow_win() {
    let pos = win_or_lose();
    let config = PlayerConfig::uct(1)
        .with_max_samples(Some(50))
        .with_exact_propagation(true)
        .with_seed(3);
    let mut player = MonteCarloPlayer::new(config).unwrap();

    assert_eq!(player.select_move(&pos), Ok("B"));
    let report = player.last_report().unwrap();
    assert!(report.payoff.is_some_and(|v| v > 0.99), "{report}");
    assert!(report.root_samples <= 50);
}

#[test]
fn test_flat_falls_for_the_trap_that_uct_avoids() {
    let pos = trap_or_draw();

    // Random replies refute the trap only one time in ten.
    let config = PlayerConfig::flat().with_max_samples(Some(2_000)).with_seed(5);
    let mut flat = MonteCarloPlayer::new(config).unwrap();
    assert_eq!(flat.select_move(&pos), Ok("trap"));
    let report = flat.last_report().unwrap();
    assert!(!report.exact);
    assert!(report.payoff.is_some_and(|v| v > 0.8), "{report}");

    // One more ply of tree shows the refutation.
    let config = PlayerConfig::uct(1).with_max_samples(Some(2_000)).with_seed(5);
    let mut uct = MonteCarloPlayer::new(config).unwrap();
    assert_eq!(uct.select_move(&pos), Ok("safe"));
    let report = uct.last_report().unwrap();
    assert!(report.exact, "{report}");
    assert!(report.payoff.is_some_and(|v| (v - 0.5).abs() < 1e-9), "{report}");
}

#[test]
fn test_several_workers_take_the_immediate_win() {
    // X: 0 1, O: 3 4, X to move; 2 wins on the spot.
    let pos = TicTacToe::from_moves(&[0, 3, 1, 4]).unwrap();
    let config = PlayerConfig::uct(2)
        .with_batch_size(2)
        .with_workers(4)
        .with_max_samples(Some(4_000))
        .with_seed(9);
    let mut player = MonteCarloPlayer::new(config).unwrap();

    assert_eq!(player.select_move(&pos), Ok(2));
    assert_eq!(player.last_report().unwrap().workers, 4);
}

#[test]
fn test_time_limit_alone_bounds_the_search() {
    let config = PlayerConfig::uct(1)
        .with_max_samples(None)
        .with_time_limit(Some(Duration::from_millis(50)));
    let mut player = MonteCarloPlayer::new(config).unwrap();

    let mv = player.select_move(&TicTacToe::new()).unwrap();
    assert!(mv < 9);
    let report = player.last_report().unwrap();
    assert!(report.root_samples > 0);
    assert!(report.elapsed < Duration::from_secs(5));
}

#[test]
fn test_solver_answers_without_sampling() {
    let config = PlayerConfig::uct(1).with_solver(NimSolver);
    let mut player = MonteCarloPlayer::new(config).unwrap();

    assert_eq!(player.select_move(&Nim::new(7, 2)), Ok(1));
    let report = player.last_report().unwrap();
    assert!(report.exact);
    assert_eq!(report.root_samples, 0);
}

#[test]
fn test_solver_proof_is_replayed_when_it_names_no_move() {
    let config = PlayerConfig::uct(1).with_solver(Moveless);
    let mut player = MonteCarloPlayer::new(config).unwrap();

    // 7 = 2 * 3 + 1: taking one leaves the opponent a multiple of three.
    assert_eq!(player.select_move(&Nim::new(7, 2)), Ok(1));
    assert!(player.last_report().unwrap().exact);
}

#[test]
fn test_solver_silent_at_root_proves_children() {
    let config = PlayerConfig::uct(1).with_solver(Horizon { horizon: 6 });
    let mut player = MonteCarloPlayer::new(config).unwrap();

    assert_eq!(player.select_move(&Nim::new(7, 2)), Ok(1));
    let report = player.last_report().unwrap();
    assert!(report.exact, "{report}");
    assert!(report.root_samples > 0);
    // Heap 6 with the opponent to move: lost for them in four plies.
    assert!(report.payoff.is_some_and(|v| (v - decay(1.0, 4)).abs() < 1e-12), "{report}");
}

#[test]
fn test_solver_cuts_rollouts_short_below_its_horizon() {
    let config = PlayerConfig::uct(1)
        .with_max_samples(Some(5_000))
        .with_solver(Horizon { horizon: 6 })
        .with_seed(12);
    let mut player = MonteCarloPlayer::new(config).unwrap();

    // 10 = 3 * 3 + 1: taking one leaves the opponent a multiple of three.
    assert_eq!(player.select_move(&Nim::new(10, 2)), Ok(1));
    assert!(player.last_report().unwrap().root_samples > 0);
}

#[test]
fn test_unconfirmed_solver_claim_falls_back_to_sampling() {
    let config = PlayerConfig::uct(1)
        .with_max_samples(Some(500))
        .with_solver(Bluff)
        .with_seed(4);
    let mut player = MonteCarloPlayer::new(config).unwrap();

    let mv = player.select_move(&Nim::new(7, 2)).unwrap();
    assert!([1, 2].contains(&mv));
    let report = player.last_report().unwrap();
    assert!(report.root_samples > 0, "{report}");
    assert!(report.iterations > 0);
}

#[test]
fn test_unlistable_root_is_an_error() {
    let mut player = MonteCarloPlayer::new(PlayerConfig::flat()).unwrap();
    assert!(matches!(
        player.select_move(&Opaque),
        Err(SearchError::NotEnumerable { .. })
    ));
}

#[test]
fn test_refused_move_is_a_contract_error() {
    let mut player = MonteCarloPlayer::new(PlayerConfig::flat().with_seed(2)).unwrap();
    assert!(matches!(
        player.select_move(&Liar),
        Err(SearchError::IllegalMove { .. })
    ));
}

#[test]
fn test_refused_move_deep_in_a_rollout_stops_every_worker() {
    let config = PlayerConfig::uct(1)
        .with_workers(4)
        .with_max_samples(Some(100_000))
        .with_seed(8);
    let mut player = MonteCarloPlayer::new(config).unwrap();

    let err = player.select_move(&Brittle(0)).unwrap_err();
    let SearchError::IllegalMove { position, .. } = err else {
        panic!("expected an illegal move, got {err:?}");
    };
    assert_eq!(position, "Brittle(3)");
    assert!(player.last_report().is_none());
}

#[test]
fn test_concurrent_commits_match_sequential_totals() {
    let pos = Scripted::new(first(vec![("a", Script::End(1.0)), ("b", Script::End(0.0))]));
    const THREADS: u64 = 4;
    const ROUNDS: u64 = 250;
    let value = |t: u64, i: u64| ((t * ROUNDS + i) % 7) as f64 / 6.0;

    let tree = SearchTree::new(SelectionPolicy::Ucb, &pos, None).unwrap();
    tree.expand(NodeId::ROOT, &pos, None).unwrap();
    thread::scope(|scope| {
        for t in 0..THREADS {
            let tree = &tree;
            let pos = &pos;
            scope.spawn(move || {
                for i in 0..ROUNDS {
                    tree.reserve_and_descend(NodeId::ROOT, 1, pos, None).unwrap();
                    tree.commit_samples(NodeId::ROOT, 1, value(t, i));
                }
            });
        }
    });

    let expected: f64 = (0..THREADS)
        .flat_map(|t| (0..ROUNDS).map(move |i| value(t, i)))
        .sum::<f64>()
        / (THREADS * ROUNDS) as f64;
    let root = tree.stats(NodeId::ROOT);
    assert_eq!(root.total_samples, THREADS * ROUNDS);
    assert_eq!(root.pending_samples, 0);
    assert!((root.payoff - expected).abs() < 1e-9);
}

#[test]
fn test_shared_tree_stays_consistent_across_workers() {
    let pos = win_or_lose();
    const WORKERS: u64 = 4;
    const MAX: u64 = 400;
    let tree = SearchTree::new(SelectionPolicy::Uct { children_threshold: 1 }, &pos, None).unwrap();
    tree.expand(NodeId::ROOT, &pos, None).unwrap();
    let stop = AtomicBool::new(false);
    let budget = Budget {
        deadline: None,
        max_samples: Some(MAX),
    };

    thread::scope(|scope| {
        for worker in 0..WORKERS {
            let (tree, pos, stop) = (&tree, &pos, &stop);
            scope.spawn(move || {
                let rng = fastrand::Rng::with_seed(worker);
                Sampler::new(tree, pos, None, budget, 1, true, stop, rng)
                    .run()
                    .unwrap()
            });
        }
    });

    let root = tree.stats(NodeId::ROOT);
    assert!(root.total_samples <= MAX + WORKERS);
    for i in 0..tree.len() as u32 {
        let id = NodeId(i);
        let stats = tree.stats(id);
        assert_eq!(stats.pending_samples, 0, "node {i}");
        assert!((0.0..=1.0).contains(&stats.payoff), "node {i}");
        if let Some(children) = tree.children(id) {
            let below: u64 = children.iter().map(|&c| tree.stats(c).total_samples).sum();
            assert!(below <= stats.total_samples, "node {i}");
        }
    }
    let best = tree.best_child(NodeId::ROOT).unwrap();
    assert_eq!(tree.mv(best), Some("B"));
}
