//! Montecarlo: demo front end for the search engine.
//!
//! ## Usage
//!
//! - `montecarlo` - Engine against engine at tic-tac-toe
//! - `montecarlo demo --policy flat` - Same, with the given player settings
//! - `montecarlo nim --heap 21 --take 3` - Solver-assisted subtraction game

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use montecarlo::constants::DEFAULT_BATCH_SIZE;
use montecarlo::games::{Nim, NimSolver, TicTacToe};
use montecarlo::{MonteCarloPlayer, PlayerConfig, Position, SelectionPolicy};

/// Montecarlo: a game-agnostic Monte Carlo search engine
#[derive(Parser)]
#[command(name = "montecarlo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Default log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play tic-tac-toe, engine against engine
    Demo(SearchArgs),
    /// Play a subtraction game with the perfect-play solver attached
    Nim {
        /// Objects on the heap
        #[arg(long, default_value_t = 21)]
        heap: u32,
        /// Most objects taken per move
        #[arg(long, default_value_t = 3)]
        take: u32,
        #[command(flatten)]
        search: SearchArgs,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Flat,
    Ucb,
    Uct,
}

#[derive(Args, Clone)]
struct SearchArgs {
    /// Sample ceiling per move
    #[arg(long, default_value_t = 20_000)]
    samples: u64,
    /// Time limit per move in milliseconds
    #[arg(long)]
    time_ms: Option<u64>,
    /// Sampler threads
    #[arg(long, default_value_t = 1)]
    workers: usize,
    /// Rollouts per committed batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch: u64,
    /// Selection policy
    #[arg(long, value_enum, default_value_t = PolicyArg::Uct)]
    policy: PolicyArg,
    /// Resolved samples before a UCT node grows children
    #[arg(long)]
    threshold: Option<u64>,
    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
}

impl Default for SearchArgs {
    fn default() -> Self {
        Self {
            samples: 20_000,
            time_ms: None,
            workers: 1,
            batch: DEFAULT_BATCH_SIZE,
            policy: PolicyArg::Uct,
            threshold: None,
            seed: None,
        }
    }
}

impl SearchArgs {
    fn config<P: Position>(&self) -> PlayerConfig<P> {
        let policy = match self.policy {
            PolicyArg::Flat => SelectionPolicy::Flat,
            PolicyArg::Ucb => SelectionPolicy::Ucb,
            PolicyArg::Uct => SelectionPolicy::Uct {
                children_threshold: self.threshold.unwrap_or(self.batch),
            },
        };
        let mut config = PlayerConfig::default()
            .with_policy(policy)
            .with_exact_propagation(policy.is_tree())
            .with_max_samples(Some(self.samples))
            .with_time_limit(self.time_ms.map(Duration::from_millis))
            .with_batch_size(self.batch)
            .with_workers(self.workers);
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        config
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Some(Commands::Demo(search)) => run_demo(&search),
        Some(Commands::Nim { heap, take, search }) => run_nim(heap, take, &search),
        None => run_demo(&SearchArgs::default()),
    }
}

fn run_demo(search: &SearchArgs) -> Result<()> {
    let mut player = MonteCarloPlayer::new(search.config::<TicTacToe>()).context("invalid player settings")?;
    let mut pos = TicTacToe::new();

    while !pos.is_terminal() {
        let mv = player.select_move(&pos).context("move selection failed")?;
        info!(report = %player.report(), "{:?} plays {mv}", pos.player_to_move());
        pos = pos.play(&mv).context("engine chose an illegal move")?;
        println!("{pos}");
    }

    match pos.winner() {
        Some(winner) => println!("{winner} wins"),
        None => println!("draw"),
    }
    Ok(())
}

fn run_nim(heap: u32, take: u32, search: &SearchArgs) -> Result<()> {
    let config = search.config::<Nim>().with_solver(NimSolver);
    let mut player = MonteCarloPlayer::new(config).context("invalid player settings")?;
    let mut pos = Nim::new(heap, take);

    while !pos.is_terminal() {
        let mv = player.select_move(&pos).context("move selection failed")?;
        println!("{:?} takes {mv}, heap {} -> {}", pos.player_to_move(), pos.heap(), pos.heap() - mv);
        info!(report = %player.report());
        pos = pos.play(&mv).context("engine chose an illegal move")?;
    }
    Ok(())
}
