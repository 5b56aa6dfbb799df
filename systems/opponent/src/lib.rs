#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Decision system that picks the computer's reply on the 3x3 board.
//!
//! The board emits [`Event::ComputerMoveDue`] when its thinking delay
//! elapses; this system answers with [`Command::PlayComputerMark`]. Each
//! tier selects from a priority bucket and breaks ties with a seeded rng so
//! replays are reproducible.

use std::fmt;
use std::str::FromStr;

use game_space_tictactoe::{
    evaluate, query::BoardView, BoardPhase, CellIndex, Command, DifficultyTier, Event, GameOutcome,
    Player,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const CENTER: CellIndex = CellIndex::new(4);
const CORNERS: [CellIndex; 4] = [
    CellIndex::new(0),
    CellIndex::new(2),
    CellIndex::new(6),
    CellIndex::new(8),
];
const SIDES: [CellIndex; 4] = [
    CellIndex::new(1),
    CellIndex::new(3),
    CellIndex::new(5),
    CellIndex::new(7),
];
const OPPOSITE_CORNERS: [(CellIndex, CellIndex); 4] = [
    (CellIndex::new(0), CellIndex::new(8)),
    (CellIndex::new(2), CellIndex::new(6)),
    (CellIndex::new(6), CellIndex::new(2)),
    (CellIndex::new(8), CellIndex::new(0)),
];

/// Which of the two observed hard-tier rule sets the computer follows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HardStyle {
    /// Takes the center once wins and blocks are exhausted, then plays
    /// randomly.
    #[default]
    CenterThenRandom,
    /// Goes straight to a random reply after the block check.
    RandomAfterBlock,
}

impl fmt::Display for HardStyle {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CenterThenRandom => "center-then-random",
            Self::RandomAfterBlock => "random-after-block",
        };
        formatter.write_str(name)
    }
}

impl FromStr for HardStyle {
    type Err = ParseHardStyleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "center" | "center-then-random" => Ok(Self::CenterThenRandom),
            "random" | "random-after-block" => Ok(Self::RandomAfterBlock),
            _ => Err(ParseHardStyleError),
        }
    }
}

/// Error returned when a hard-style name is not recognised.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseHardStyleError;

impl fmt::Display for ParseHardStyleError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("unknown hard style, expected center-then-random or random-after-block")
    }
}

impl std::error::Error for ParseHardStyleError {}

/// Configuration parameters required to construct the opponent system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: u64,
    hard_style: HardStyle,
}

impl Config {
    /// Creates a new configuration using the provided tie-break seed and
    /// hard-tier style.
    #[must_use]
    pub const fn new(rng_seed: u64, hard_style: HardStyle) -> Self {
        Self {
            rng_seed,
            hard_style,
        }
    }
}

/// System that answers a due thinking delay with the computer's mark.
#[derive(Debug)]
pub struct Opponent {
    rng: ChaCha8Rng,
    hard_style: HardStyle,
}

impl Opponent {
    /// Creates a new opponent system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            hard_style: config.hard_style,
        }
    }

    /// Consumes events and the current board view to emit the computer's
    /// reply once its thinking delay has elapsed.
    pub fn handle(&mut self, events: &[Event], view: &BoardView, out: &mut Vec<Command>) {
        for event in events {
            if !matches!(event, Event::ComputerMoveDue) {
                continue;
            }
            if view.phase() != BoardPhase::ComputerThinking {
                // A reset later in the same batch already took the turn back.
                continue;
            }
            let cell = choose_move(view.cells(), view.difficulty(), self.hard_style, &mut self.rng);
            out.push(Command::PlayComputerMark { cell });
        }
    }
}

/// Picks one reply uniformly from the tier's tie bucket.
///
/// # Panics
///
/// Panics when `cells` has no empty cell; callers check the game is still
/// in progress first.
#[must_use]
pub fn choose_move<R: Rng>(
    cells: &[Option<Player>; 9],
    tier: DifficultyTier,
    hard_style: HardStyle,
    rng: &mut R,
) -> CellIndex {
    let moves = best_moves(cells, tier, hard_style);
    moves[rng.gen_range(0..moves.len())]
}

/// All cells the tier considers equally good replies, in board order.
///
/// # Panics
///
/// Panics when `cells` has no empty cell; callers check the game is still
/// in progress first.
#[must_use]
pub fn best_moves(
    cells: &[Option<Player>; 9],
    tier: DifficultyTier,
    hard_style: HardStyle,
) -> Vec<CellIndex> {
    assert!(
        cells.iter().any(Option::is_none),
        "the decision engine needs at least one empty cell"
    );
    match tier {
        DifficultyTier::Easy => empty_cells(cells),
        DifficultyTier::Hard => hard_moves(cells, hard_style),
        DifficultyTier::Impossible => impossible_moves(cells),
    }
}

fn hard_moves(cells: &[Option<Player>; 9], style: HardStyle) -> Vec<CellIndex> {
    if let Some(forced) = forced_moves(cells) {
        return forced;
    }
    if style == HardStyle::CenterThenRandom && is_empty(cells, CENTER) {
        return vec![CENTER];
    }
    empty_cells(cells)
}

/// Priority replies with a full-game safety net: any preferred cell that
/// would hand the human a forced win is dropped in favour of the cells the
/// solver rates as holding the draw. The raw priority list alone loses to
/// the double-corner attack.
fn impossible_moves(cells: &[Option<Player>; 9]) -> Vec<CellIndex> {
    let preferred = preferred_moves(cells);
    let safe: Vec<CellIndex> = empty_cells(cells)
        .into_iter()
        .filter(|cell| move_value(cells, *cell, Player::Computer) >= 0)
        .collect();
    if safe.is_empty() {
        // Already lost against best play; keep the priority reply.
        return preferred;
    }
    let guarded: Vec<CellIndex> = preferred
        .iter()
        .copied()
        .filter(|cell| safe.contains(cell))
        .collect();
    if guarded.is_empty() {
        safe
    } else {
        guarded
    }
}

/// Win-then-block-then-center-then-opposite-corner-then-corner-then-side,
/// first non-empty bucket.
fn preferred_moves(cells: &[Option<Player>; 9]) -> Vec<CellIndex> {
    if let Some(forced) = forced_moves(cells) {
        return forced;
    }
    if is_empty(cells, CENTER) {
        return vec![CENTER];
    }
    let opposite = opposite_corner_moves(cells);
    if !opposite.is_empty() {
        return opposite;
    }
    let corners: Vec<CellIndex> = CORNERS
        .into_iter()
        .filter(|cell| is_empty(cells, *cell))
        .collect();
    if !corners.is_empty() {
        return corners;
    }
    let sides: Vec<CellIndex> = SIDES
        .into_iter()
        .filter(|cell| is_empty(cells, *cell))
        .collect();
    if !sides.is_empty() {
        return sides;
    }
    empty_cells(cells)
}

/// Immediate wins if any exist, otherwise blocks of the human's immediate
/// wins, otherwise `None`.
fn forced_moves(cells: &[Option<Player>; 9]) -> Option<Vec<CellIndex>> {
    let wins = winning_moves(cells, Player::Computer);
    if !wins.is_empty() {
        return Some(wins);
    }
    let blocks = winning_moves(cells, Player::Human);
    if !blocks.is_empty() {
        return Some(blocks);
    }
    None
}

fn winning_moves(cells: &[Option<Player>; 9], player: Player) -> Vec<CellIndex> {
    empty_cells(cells)
        .into_iter()
        .filter(|cell| {
            let mut scratch = *cells;
            scratch[usize::from(cell.get())] = Some(player);
            evaluate(&scratch) == GameOutcome::Won { player }
        })
        .collect()
}

fn opposite_corner_moves(cells: &[Option<Player>; 9]) -> Vec<CellIndex> {
    OPPOSITE_CORNERS
        .into_iter()
        .filter(|(held, reply)| {
            cells[usize::from(held.get())] == Some(Player::Human) && is_empty(cells, *reply)
        })
        .map(|(_, reply)| reply)
        .collect()
}

fn empty_cells(cells: &[Option<Player>; 9]) -> Vec<CellIndex> {
    CellIndex::ALL
        .into_iter()
        .filter(|cell| is_empty(cells, *cell))
        .collect()
}

fn is_empty(cells: &[Option<Player>; 9], cell: CellIndex) -> bool {
    cells[usize::from(cell.get())].is_none()
}

/// Value for `mover` of claiming `cell`, assuming best play afterwards.
fn move_value(cells: &[Option<Player>; 9], cell: CellIndex, mover: Player) -> i8 {
    let mut scratch = *cells;
    scratch[usize::from(cell.get())] = Some(mover);
    match evaluate(&scratch) {
        GameOutcome::Won { .. } => 1,
        GameOutcome::Draw => 0,
        GameOutcome::InProgress => -solve(&mut scratch, mover.other()),
    }
}

/// Negamax value of the position for `to_move`: 1 win, 0 draw, -1 loss.
fn solve(cells: &mut [Option<Player>; 9], to_move: Player) -> i8 {
    match evaluate(cells) {
        GameOutcome::Won { player } if player == to_move => return 1,
        GameOutcome::Won { .. } => return -1,
        GameOutcome::Draw => return 0,
        GameOutcome::InProgress => {}
    }
    let mut best = -1;
    for cell in CellIndex::ALL {
        let slot = usize::from(cell.get());
        if cells[slot].is_some() {
            continue;
        }
        cells[slot] = Some(to_move);
        let value = -solve(cells, to_move.other());
        cells[slot] = None;
        if value > best {
            best = value;
        }
        if best == 1 {
            break;
        }
    }
    best
}
