use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use strum::IntoEnumIterator;

use math_arena::engine::game_loop::{GameLoop, FIXED_TIMESTEP};
use math_arena::engine::rng::GameRng;
use math_arena::game::presenter::LogPresenter;
use math_arena::game::problems::OperationKind;
use math_arena::game::relay::{LogRelay, OpponentUpdate};
use math_arena::game::stats::{JsonStatsStore, MemoryStats, StatsSnapshot};
use math_arena::{CombatError, CombatLoop, GameConfig, GameMode, Phase};

/// Sleep between frames so the loop doesn't spin a core
const FRAME_SLEEP: Duration = Duration::from_millis(5);

#[derive(Debug, Parser)]
#[command(name = "math-arena", version, about = "Answer arithmetic problems to fight")]
struct Args {
    /// Game mode: solo, timed or multiplayer
    #[arg(long, default_value_t = GameMode::Solo)]
    mode: GameMode,

    /// Seed for problems and animations (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where stats are saved
    #[arg(long, default_value = "math-arena-stats.json")]
    stats_file: PathBuf,

    /// Multiplayer room to join
    #[arg(long)]
    room: Option<String>,
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();
    info!("Starting Math Arena...");

    let config = match &args.config {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => GameConfig::default(),
    };
    let seed = args.seed.unwrap_or_else(|| GameRng::from_entropy().seed());
    info!("Seed {}", seed);

    let mut combat = build_combat(&args, config, seed);
    combat.set_mode(args.mode);
    if let Some(room) = &args.room {
        combat.join_room(room);
    }

    info!("Enter starts a match, type an answer and press enter to attack");
    info!("Other commands: solo, timed, multiplayer, stats, reset-stats, quit");

    let lines = spawn_stdin_reader();
    let mut game_loop = GameLoop::new();

    'running: loop {
        loop {
            match lines.try_recv() {
                Ok(line) => {
                    if !handle_line(&mut combat, &mut game_loop, line.trim()) {
                        break 'running;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    info!("Input closed");
                    break 'running;
                }
            }
        }

        for _ in 0..game_loop.begin_frame() {
            let elapsed = combat.update(FIXED_TIMESTEP);
            if let Some(err) = elapsed.error {
                report(&err);
            }
        }

        thread::sleep(FRAME_SLEEP);
    }

    info!(
        "Shutting down after {:.1}s, {} frames ({} updates)",
        game_loop.elapsed().as_secs_f32(),
        game_loop.frame_count(),
        game_loop.update_count()
    );
    Ok(())
}

fn build_combat(args: &Args, config: GameConfig, seed: u64) -> CombatLoop {
    let combat = CombatLoop::new(config, seed)
        .with_hud(LogPresenter::new("hud"))
        .with_hero_frames(LogPresenter::new("hero"))
        .with_opponent_frames(LogPresenter::new("opponent"));

    let combat = match JsonStatsStore::open(&args.stats_file) {
        Ok(store) => {
            info!("Stats file {}", store.path().display());
            combat.with_stats(store)
        }
        Err(err) => {
            warn!(
                "Stats file {} unusable ({}), stats kept in memory",
                args.stats_file.display(),
                err
            );
            combat.with_stats(MemoryStats::new())
        }
    };

    if needs_relay(args) {
        combat.with_relay(LogRelay)
    } else {
        combat
    }
}

/// Updates only leave once a room is joined, whatever the starting mode
fn needs_relay(args: &Args) -> bool {
    args.room.is_some()
}

/// Read stdin lines on their own thread so the game loop never blocks
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Handle one input line, returns false to quit
///
/// The stats screen pauses the game loop until it is closed.
fn handle_line(combat: &mut CombatLoop, game_loop: &mut GameLoop, line: &str) -> bool {
    match line {
        "quit" | "exit" => return false,
        "stats" => {
            if game_loop.is_paused() {
                combat.close_stats();
                game_loop.resume();
                info!("Stats closed");
            } else {
                game_loop.pause();
                print_stats(&combat.open_stats());
            }
        }
        "reset-stats" => combat.reset_stats(),
        // Opponent updates can be pasted in as JSON lines
        _ if line.starts_with('{') => match OpponentUpdate::from_json_line(line) {
            Ok(update) => combat.receive_opponent(update),
            Err(err) => warn!("Bad opponent update: {}", err),
        },
        _ => {
            if let Ok(mode) = line.parse::<GameMode>() {
                combat.set_mode(mode);
            } else if combat.phase() != Phase::InTurn && line.is_empty() {
                if let Err(err) = combat.start() {
                    report(&err);
                }
            } else if let Err(err) = combat.submit_answer(line) {
                report(&err);
            }
        }
    }
    true
}

fn report(err: &CombatError) {
    match err {
        CombatError::InvalidInput(_) => info!("{}", err),
        CombatError::IllegalTransition(_) | CombatError::UnknownAnimation(_) => debug!("{}", err),
        CombatError::GeneratorFailure(_) => warn!("{}", err),
    }
}

fn print_stats(stats: &StatsSnapshot) {
    info!("--- Stats (type `stats` again to close) ---");
    for mode in GameMode::iter() {
        info!(
            "{:<12} high score {:>4}   best streak {:>4}",
            mode.to_string(),
            stats.high_score(mode),
            stats.max_streak(mode)
        );
    }
    for kind in OperationKind::iter() {
        let op = stats.operation(kind);
        info!(
            "{:<14} solved {:>5}   level {:>3}",
            kind.to_string(),
            op.count,
            op.level
        );
    }
}
