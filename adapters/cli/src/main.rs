#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that demos the grid and board game cores.
//!
//! Each subcommand drives a game the same way an interactive host would:
//! inputs become commands, `apply` mutates the state and reports events,
//! and systems answer events with further commands. Frames are rendered
//! from query snapshots only.

mod config;
mod transcript;

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use game_space_snake::{
    apply as apply_grid, query as grid_query, Command as GridCommand, Event as GridEvent,
    GameOverReason, GridConfig, GridGame, GridPhase, GridPos, PlacementRule,
};
use game_space_system_opponent::{Config as OpponentConfig, HardStyle, Opponent};
use game_space_tictactoe::{
    apply as apply_board, evaluate, query as board_query, BoardConfig, BoardGame, BoardPhase,
    CellIndex, Command as BoardCommand, DifficultyTier, Event as BoardEvent, GameOutcome, Player,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::transcript::GameTranscript;

/// Number of items the multi-slot demo keeps on the board.
const MULTI_FOOD_TARGET: usize = 3;

#[derive(Parser)]
#[command(name = "game-space")]
#[command(version, about = "Terminal demos for the grid and board game cores")]
struct Cli {
    #[command(subcommand)]
    command: DemoCommand,
}

#[derive(Subcommand)]
enum DemoCommand {
    /// Runs a seeded autopilot snake session and prints ASCII frames.
    Snake(SnakeArgs),
    /// Plays a scripted human against the computer opponent.
    Tictactoe(TictactoeArgs),
    /// Decodes a share code and replays it on a fresh board.
    Replay(ReplayArgs),
}

#[derive(Args)]
struct SnakeArgs {
    /// Playfield side length in cells.
    #[arg(long)]
    grid_size: Option<u32>,

    /// Seed for the route tie-break and food placement rng.
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum number of clock ticks to simulate.
    #[arg(long, default_value_t = 120)]
    ticks: u32,

    /// Food placement rule: single, multi or auto.
    #[arg(long)]
    placement: Option<String>,

    /// Optional TOML file with demo settings.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct TictactoeArgs {
    /// Difficulty tier: easy, hard or impossible.
    #[arg(long, value_parser = DifficultyTier::from_str, default_value = "hard")]
    difficulty: DifficultyTier,

    /// Hard-tier rule set: center-then-random or random-after-block.
    #[arg(long, value_parser = HardStyle::from_str, default_value = "center-then-random")]
    hard_style: HardStyle,

    /// Seed for the opponent's tie-break rng.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Scripted human cells (0-8) played in order; a greedy scripted human
    /// takes over once the list runs out.
    #[arg(long, value_delimiter = ',')]
    moves: Vec<u8>,
}

#[derive(Args)]
struct ReplayArgs {
    /// Share code produced by the tictactoe demo.
    transcript: String,
}

/// Entry point for the game-space command-line demos.
fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        DemoCommand::Snake(args) => run_snake(args),
        DemoCommand::Tictactoe(args) => run_tictactoe(args),
        DemoCommand::Replay(args) => run_replay(args),
    }
}

fn run_snake(args: SnakeArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => config::load_grid_config(path)?,
        None => GridConfig::default(),
    };
    if let Some(size) = args.grid_size {
        config::apply_grid_size(&mut config, size)?;
    }
    if let Some(seed) = args.seed {
        config.rng_seed = seed;
    }
    if let Some(name) = args.placement.as_deref() {
        let max_points = match config.placement {
            PlacementRule::MultiSlot { max_points } => max_points,
            _ => config::DEFAULT_MULTI_MAX_POINTS,
        };
        config.placement = config::parse_placement(name, max_points)?;
    }

    let side = config.grid_size.get();
    let seed = config.rng_seed;
    let placement = config.placement;
    let mut game = GridGame::new(config);
    // The placer draws from its own stream so demo placements never
    // disturb the game's route tie-breaks.
    let mut placer = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));
    let mut events = Vec::new();

    log::info!(
        "snake demo: {side}x{side} grid, seed {seed}, up to {} ticks",
        args.ticks
    );

    for _ in 0..args.ticks {
        top_up_food(&mut game, placement, &mut placer, &mut events);
        let dt = grid_query::step_interval(&game);
        apply_grid(&mut game, GridCommand::Tick { dt }, &mut events);
        log_grid_events(&events);
        events.clear();

        let snapshot = grid_query::snapshot(&game);
        println!("{}", render_grid(&snapshot));
        println!("score {:>3}  length {:>3}", snapshot.score, snapshot.snake.len());
        println!();
        if matches!(snapshot.phase, GridPhase::GameOver { .. }) {
            break;
        }
    }

    let snapshot = grid_query::snapshot(&game);
    println!("final score: {}", snapshot.score);
    match snapshot.phase {
        GridPhase::GameOver { reason } => println!("game over: {}", reason_name(reason)),
        _ => println!("stopped after {} ticks", args.ticks),
    }
    Ok(())
}

fn run_tictactoe(args: TictactoeArgs) -> Result<()> {
    for cell in &args.moves {
        if *cell >= 9 {
            bail!("scripted move {cell} is outside the board (0-8)");
        }
    }

    let config = BoardConfig {
        initial_difficulty: args.difficulty,
        ..BoardConfig::default()
    };
    let thinking_delay = config.thinking_delay;
    let mut game = BoardGame::new(config);
    let mut opponent = Opponent::new(OpponentConfig::new(args.seed, args.hard_style));

    log::info!(
        "board demo: {} difficulty ({}), seed {}",
        args.difficulty,
        args.hard_style,
        args.seed
    );

    let mut scripted = args.moves.into_iter();
    let mut events = Vec::new();
    let mut commands = Vec::new();
    let mut played: Vec<u8> = Vec::new();

    loop {
        match board_query::phase(&game) {
            BoardPhase::HumanTurn => {
                let view = board_query::board_view(&game);
                let cell = match scripted.next() {
                    Some(raw) => CellIndex::new(raw),
                    None => greedy_board_move(view.cells()),
                };
                apply_board(&mut game, BoardCommand::PlaceHumanMark { cell }, &mut events);
            }
            BoardPhase::ComputerThinking => {
                apply_board(
                    &mut game,
                    BoardCommand::Tick { dt: thinking_delay },
                    &mut events,
                );
                opponent.handle(&events, &board_query::board_view(&game), &mut commands);
                for command in commands.drain(..) {
                    apply_board(&mut game, command, &mut events);
                }
            }
            BoardPhase::Finished => break,
        }
        record_marks(&events, &mut played);
        events.clear();

        println!("{}", render_board(&board_query::snapshot(&game)));
        println!("{}", board_query::status_line(&game));
        println!();
    }

    let transcript = GameTranscript {
        difficulty: board_query::difficulty(&game),
        moves: played,
    };
    println!("share code: {}", transcript.encode());
    Ok(())
}

fn run_replay(args: ReplayArgs) -> Result<()> {
    let transcript =
        GameTranscript::decode(&args.transcript).context("could not decode the share code")?;
    log::info!(
        "replaying {} moves at {} difficulty",
        transcript.moves.len(),
        transcript.difficulty
    );

    let config = BoardConfig {
        initial_difficulty: transcript.difficulty,
        ..BoardConfig::default()
    };
    let thinking_delay = config.thinking_delay;
    let mut game = BoardGame::new(config);
    let mut events = Vec::new();

    for (index, raw) in transcript.moves.iter().copied().enumerate() {
        // Decoding already bounds-checked every cell.
        let cell = CellIndex::new(raw);
        if index % 2 == 0 {
            apply_board(&mut game, BoardCommand::PlaceHumanMark { cell }, &mut events);
        } else {
            apply_board(
                &mut game,
                BoardCommand::Tick { dt: thinking_delay },
                &mut events,
            );
            apply_board(&mut game, BoardCommand::PlayComputerMark { cell }, &mut events);
        }
        let rejection = events
            .iter()
            .find(|event| matches!(event, BoardEvent::MoveRejected { .. }));
        if let Some(BoardEvent::MoveRejected { reason, .. }) = rejection {
            bail!("move {index} (cell {raw}) is illegal in this replay: {reason:?}");
        }
        events.clear();
    }

    println!("{}", render_board(&board_query::snapshot(&game)));
    println!("{}", board_query::status_line(&game));
    Ok(())
}

/// Keeps the demo supplied with food through the same placement path a
/// player's clicks would take.
fn top_up_food(
    game: &mut GridGame,
    placement: PlacementRule,
    rng: &mut ChaCha8Rng,
    events: &mut Vec<GridEvent>,
) {
    let target = match placement {
        PlacementRule::SingleSlot => 1,
        PlacementRule::MultiSlot { .. } => MULTI_FOOD_TARGET,
        // The game respawns by itself and refuses placements.
        PlacementRule::AutoRespawn => return,
    };
    loop {
        let snapshot = grid_query::snapshot(game);
        if matches!(snapshot.phase, GridPhase::GameOver { .. }) || snapshot.foods.len() >= target {
            return;
        }
        let Some(cell) = random_free_cell(&snapshot, rng) else {
            return;
        };
        apply_grid(game, GridCommand::PlaceFood { cell }, events);
    }
}

fn random_free_cell(snapshot: &grid_query::GridSnapshot, rng: &mut ChaCha8Rng) -> Option<GridPos> {
    let side = snapshot.grid_size.get();
    let mut free = Vec::new();
    for y in 0..side {
        for x in 0..side {
            let cell = GridPos::new(x, y);
            let on_snake = snapshot.snake.contains(&cell);
            let on_food = snapshot.foods.iter().any(|food| food.position() == cell);
            if !on_snake && !on_food {
                free.push(cell);
            }
        }
    }
    if free.is_empty() {
        None
    } else {
        Some(free[rng.gen_range(0..free.len())])
    }
}

fn log_grid_events(events: &[GridEvent]) {
    for event in events {
        match event {
            GridEvent::FoodPlaced { food } => log::debug!(
                "food worth {} placed at ({}, {})",
                food.points(),
                food.position().x(),
                food.position().y()
            ),
            GridEvent::FoodEaten { food, score } => log::info!(
                "ate {} points at ({}, {}); score {score}",
                food.points(),
                food.position().x(),
                food.position().y()
            ),
            GridEvent::FoodRejected { cell, reason } => log::warn!(
                "placement at ({}, {}) refused: {reason:?}",
                cell.x(),
                cell.y()
            ),
            GridEvent::RouteUnreachable => {
                log::warn!("no food is reachable; the run ends on the next step");
            }
            GridEvent::GameEnded { reason, score } => {
                log::info!("run ended ({}) with score {score}", reason_name(*reason));
            }
            _ => {}
        }
    }
}

fn record_marks(events: &[BoardEvent], played: &mut Vec<u8>) {
    for event in events {
        match event {
            BoardEvent::MarkPlaced { cell, player } => {
                log::debug!("{player:?} claimed cell {}", cell.get());
                played.push(cell.get());
            }
            BoardEvent::MoveRejected {
                cell,
                player,
                reason,
            } => {
                log::warn!("{player:?} refused at cell {}: {reason:?}", cell.get());
            }
            BoardEvent::GameEnded { outcome } => log::info!("game ended: {outcome:?}"),
            _ => {}
        }
    }
}

/// Scripted stand-in for the human: wins if able, blocks otherwise, takes
/// the first empty cell as a fallback.
fn greedy_board_move(cells: &[Option<Player>; 9]) -> CellIndex {
    for player in [Player::Human, Player::Computer] {
        for cell in CellIndex::ALL {
            if cells[usize::from(cell.get())].is_some() {
                continue;
            }
            let mut scratch = *cells;
            scratch[usize::from(cell.get())] = Some(player);
            let won = GameOutcome::Won { player };
            if evaluate(&scratch) == won {
                return cell;
            }
        }
    }
    CellIndex::ALL
        .into_iter()
        .find(|cell| cells[usize::from(cell.get())].is_none())
        .expect("the board hands the turn out only while a cell is free")
}

fn render_grid(snapshot: &grid_query::GridSnapshot) -> String {
    let side = snapshot.grid_size.get() as usize;
    let mut rows = vec![vec!['.'; side]; side];
    for food in &snapshot.foods {
        let digit = char::from_digit(food.points().min(9), 10).unwrap_or('*');
        rows[food.position().y() as usize][food.position().x() as usize] = digit;
    }
    for (index, segment) in snapshot.snake.iter().enumerate() {
        let glyph = if index == 0 { 'O' } else { 'o' };
        rows[segment.y() as usize][segment.x() as usize] = glyph;
    }
    let lines: Vec<String> = rows
        .into_iter()
        .map(|row| row.into_iter().collect())
        .collect();
    lines.join("\n")
}

fn render_board(snapshot: &board_query::BoardSnapshot) -> String {
    let glyphs: Vec<char> = snapshot.cells.iter().map(|cell| mark_glyph(*cell)).collect();
    let mut lines = Vec::with_capacity(5);
    for row in 0..3 {
        let base = row * 3;
        lines.push(format!(
            " {} | {} | {} ",
            glyphs[base],
            glyphs[base + 1],
            glyphs[base + 2]
        ));
        if row < 2 {
            lines.push("---+---+---".to_owned());
        }
    }
    lines.join("\n")
}

fn mark_glyph(cell: Option<Player>) -> char {
    match cell {
        Some(Player::Human) => 'X',
        Some(Player::Computer) => 'O',
        None => '.',
    }
}

fn reason_name(reason: GameOverReason) -> &'static str {
    match reason {
        GameOverReason::Wall => "wall",
        GameOverReason::SelfCollision => "self",
        GameOverReason::NoPath => "no-path",
    }
}
