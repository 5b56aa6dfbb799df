#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative state for the 3x3 board game against the computer.
//!
//! The board is advanced exclusively through [`apply`]. The human always
//! moves first; a human mark starts the computer's thinking delay on the
//! embedded timer queue, and when a `Tick` command moves the clock past the
//! deadline the board emits [`Event::ComputerMoveDue`]. Picking the reply
//! cell is not this crate's job: a decision system reacts to the event and
//! answers with [`Command::PlayComputerMark`]. Invalid moves are refused
//! with [`Event::MoveRejected`] rather than errors, mirroring clicks that
//! simply do nothing.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use game_space_core::{TimerQueue, TimerToken};
use serde::{Deserialize, Serialize};

/// A mark owner; the human plays first in every game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Player {
    /// The person clicking cells.
    Human,
    /// The scripted opponent.
    Computer,
}

impl Player {
    /// The other mark owner.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Human => Self::Computer,
            Self::Computer => Self::Human,
        }
    }
}

/// Index of one of the nine cells, row-major from the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellIndex(u8);

impl CellIndex {
    /// Every cell in row-major order.
    pub const ALL: [CellIndex; 9] = [
        CellIndex(0),
        CellIndex(1),
        CellIndex(2),
        CellIndex(3),
        CellIndex(4),
        CellIndex(5),
        CellIndex(6),
        CellIndex(7),
        CellIndex(8),
    ];

    /// Creates the index for cell `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index` is not in `0..9`; adapters validate raw input
    /// before constructing an index.
    #[must_use]
    pub const fn new(index: u8) -> Self {
        assert!(index < 9, "cell index out of range");
        Self(index)
    }

    /// Raw index in `0..9`.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

/// How strong the computer plays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DifficultyTier {
    /// Uniformly random replies.
    Easy,
    /// Wins and blocks, otherwise plays loosely.
    Hard,
    /// Full priority play; never beaten.
    Impossible,
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Easy => "easy",
            Self::Hard => "hard",
            Self::Impossible => "impossible",
        };
        formatter.write_str(name)
    }
}

impl FromStr for DifficultyTier {
    type Err = ParseDifficultyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "hard" => Ok(Self::Hard),
            "impossible" => Ok(Self::Impossible),
            _ => Err(ParseDifficultyError),
        }
    }
}

/// Error returned when a difficulty name is not recognised.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseDifficultyError;

impl fmt::Display for ParseDifficultyError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("unknown difficulty, expected easy, hard or impossible")
    }
}

impl std::error::Error for ParseDifficultyError {}

/// Result of evaluating a board position.
///
/// Always derived from the cells, never stored alongside them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOutcome {
    /// Empty cells remain and nobody holds a line.
    InProgress,
    /// A full line of one player's marks is on the board.
    Won {
        /// Who holds the line.
        player: Player,
    },
    /// The board is full with no line held.
    Draw,
}

/// Turn machine of a board game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoardPhase {
    /// Waiting for a human mark.
    HumanTurn,
    /// The thinking delay is running (or its reply is due); human input is
    /// refused.
    ComputerThinking,
    /// Terminal. Only a reset or difficulty change restarts play.
    Finished,
}

/// Why a mark was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveRejection {
    /// The cell already holds a mark.
    CellOccupied,
    /// It is not that player's turn (for the computer this includes the
    /// thinking delay still running).
    NotYourTurn,
    /// The game already finished.
    GameFinished,
}

/// Build-time configuration for a board game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Pause between a human mark and the computer's reply becoming due.
    pub thinking_delay: Duration,
    /// Tier the first game is played at.
    pub initial_difficulty: DifficultyTier,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            thinking_delay: Duration::from_millis(700),
            initial_difficulty: DifficultyTier::Hard,
        }
    }
}

/// Commands accepted by [`apply`].
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Claims a cell for the human and starts the thinking delay.
    PlaceHumanMark {
        /// Clicked cell.
        cell: CellIndex,
    },
    /// Claims a cell for the computer. Valid only once the thinking delay
    /// has elapsed.
    PlayComputerMark {
        /// Chosen cell.
        cell: CellIndex,
    },
    /// Switches tiers and restarts the game.
    SetDifficulty {
        /// Tier for the next game.
        tier: DifficultyTier,
    },
    /// Advances the game clock; an elapsed thinking delay emits
    /// [`Event::ComputerMoveDue`].
    Tick {
        /// Time elapsed since the previous tick.
        dt: Duration,
    },
    /// Clears the board and returns the turn to the human.
    Reset,
}

/// Events emitted by [`apply`] in the order the changes happened.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// The game clock advanced.
    TimeAdvanced {
        /// Time added to the clock.
        dt: Duration,
    },
    /// A mark landed on the board.
    MarkPlaced {
        /// Claimed cell.
        cell: CellIndex,
        /// New owner of the cell.
        player: Player,
    },
    /// A mark was refused.
    MoveRejected {
        /// Requested cell.
        cell: CellIndex,
        /// Who requested it.
        player: Player,
        /// Why it was refused.
        reason: MoveRejection,
    },
    /// The thinking delay started running.
    ThinkingStarted {
        /// How long the computer pretends to think.
        delay: Duration,
    },
    /// The thinking delay elapsed; a decision system should reply with
    /// [`Command::PlayComputerMark`].
    ComputerMoveDue,
    /// The game reached a terminal outcome.
    GameEnded {
        /// Final outcome, never [`GameOutcome::InProgress`].
        outcome: GameOutcome,
    },
    /// The board was cleared.
    BoardReset {
        /// Tier the next game is played at.
        difficulty: DifficultyTier,
    },
}

/// Authoritative board game state.
///
/// All mutation goes through [`apply`]; reads go through [`query`].
#[derive(Debug)]
pub struct BoardGame {
    config: BoardConfig,
    cells: [Option<Player>; 9],
    phase: BoardPhase,
    difficulty: DifficultyTier,
    timers: TimerQueue,
    thinking_timer: Option<TimerToken>,
}

impl BoardGame {
    /// Creates an empty board waiting for the first human mark.
    #[must_use]
    pub fn new(config: BoardConfig) -> Self {
        let difficulty = config.initial_difficulty;
        Self {
            config,
            cells: [None; 9],
            phase: BoardPhase::HumanTurn,
            difficulty,
            timers: TimerQueue::new(),
            thinking_timer: None,
        }
    }

    fn place_human_mark(&mut self, cell: CellIndex, out_events: &mut Vec<Event>) {
        let rejection = match self.phase {
            BoardPhase::Finished => Some(MoveRejection::GameFinished),
            BoardPhase::ComputerThinking => Some(MoveRejection::NotYourTurn),
            BoardPhase::HumanTurn if self.cell(cell).is_some() => {
                Some(MoveRejection::CellOccupied)
            }
            BoardPhase::HumanTurn => None,
        };
        if let Some(reason) = rejection {
            out_events.push(Event::MoveRejected {
                cell,
                player: Player::Human,
                reason,
            });
            return;
        }

        self.set_cell(cell, Player::Human);
        out_events.push(Event::MarkPlaced {
            cell,
            player: Player::Human,
        });

        match evaluate(&self.cells) {
            GameOutcome::InProgress => {
                self.phase = BoardPhase::ComputerThinking;
                let delay = self.config.thinking_delay;
                self.thinking_timer = Some(self.timers.schedule(delay));
                out_events.push(Event::ThinkingStarted { delay });
            }
            outcome => self.finish(outcome, out_events),
        }
    }

    fn play_computer_mark(&mut self, cell: CellIndex, out_events: &mut Vec<Event>) {
        let rejection = if self.phase == BoardPhase::Finished {
            Some(MoveRejection::GameFinished)
        } else if self.phase != BoardPhase::ComputerThinking || self.thinking_timer.is_some() {
            // Replies before the delay elapsed are out of turn.
            Some(MoveRejection::NotYourTurn)
        } else if self.cell(cell).is_some() {
            Some(MoveRejection::CellOccupied)
        } else {
            None
        };
        if let Some(reason) = rejection {
            out_events.push(Event::MoveRejected {
                cell,
                player: Player::Computer,
                reason,
            });
            return;
        }

        self.set_cell(cell, Player::Computer);
        out_events.push(Event::MarkPlaced {
            cell,
            player: Player::Computer,
        });

        match evaluate(&self.cells) {
            GameOutcome::InProgress => self.phase = BoardPhase::HumanTurn,
            outcome => self.finish(outcome, out_events),
        }
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        out_events.push(Event::TimeAdvanced { dt });
        let mut fired = Vec::new();
        self.timers.advance(dt, &mut fired);
        for token in fired {
            if self.thinking_timer == Some(token) {
                debug_assert!(
                    self.phase == BoardPhase::ComputerThinking,
                    "the thinking timer only runs during the computer's turn"
                );
                self.thinking_timer = None;
                out_events.push(Event::ComputerMoveDue);
            }
        }
    }

    fn set_difficulty(&mut self, tier: DifficultyTier, out_events: &mut Vec<Event>) {
        self.difficulty = tier;
        self.restart(out_events);
    }

    fn reset(&mut self, out_events: &mut Vec<Event>) {
        self.restart(out_events);
    }

    /// Clears the board and hands the turn back to the human. A running
    /// thinking delay is cancelled so no stale reply fires later.
    fn restart(&mut self, out_events: &mut Vec<Event>) {
        if let Some(token) = self.thinking_timer.take() {
            let _ = self.timers.cancel(token);
        }
        self.cells = [None; 9];
        self.phase = BoardPhase::HumanTurn;
        out_events.push(Event::BoardReset {
            difficulty: self.difficulty,
        });
    }

    fn finish(&mut self, outcome: GameOutcome, out_events: &mut Vec<Event>) {
        debug_assert!(outcome != GameOutcome::InProgress, "terminal outcomes only");
        self.phase = BoardPhase::Finished;
        out_events.push(Event::GameEnded { outcome });
    }

    fn cell(&self, cell: CellIndex) -> Option<Player> {
        self.cells[usize::from(cell.get())]
    }

    fn set_cell(&mut self, cell: CellIndex, player: Player) {
        debug_assert!(self.cell(cell).is_none(), "cell claimed twice");
        self.cells[usize::from(cell.get())] = Some(player);
    }
}

/// Applies `command` to `game`, appending resulting events to `out_events`.
pub fn apply(game: &mut BoardGame, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::PlaceHumanMark { cell } => game.place_human_mark(cell, out_events),
        Command::PlayComputerMark { cell } => game.play_computer_mark(cell, out_events),
        Command::SetDifficulty { tier } => game.set_difficulty(tier, out_events),
        Command::Tick { dt } => game.tick(dt, out_events),
        Command::Reset => game.reset(out_events),
    }
}

const WINNING_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Evaluates a position: a held line wins, a full board draws, anything
/// else is still in progress.
///
/// Pure and total; decision systems call it on hypothetical boards.
#[must_use]
pub fn evaluate(cells: &[Option<Player>; 9]) -> GameOutcome {
    for line in WINNING_LINES {
        if let Some(player) = cells[line[0]] {
            if cells[line[1]] == Some(player) && cells[line[2]] == Some(player) {
                return GameOutcome::Won { player };
            }
        }
    }
    if cells.iter().all(Option::is_some) {
        return GameOutcome::Draw;
    }
    GameOutcome::InProgress
}

/// Read-only views over a [`BoardGame`].
pub mod query {
    use serde::{Deserialize, Serialize};

    use super::{evaluate, BoardGame, BoardPhase, CellIndex, DifficultyTier, GameOutcome, Player};

    /// Position and turn information for decision systems.
    #[derive(Clone, Debug)]
    pub struct BoardView {
        cells: [Option<Player>; 9],
        phase: BoardPhase,
        difficulty: DifficultyTier,
        outcome: GameOutcome,
    }

    impl BoardView {
        /// The nine cells in row-major order.
        #[must_use]
        pub fn cells(&self) -> &[Option<Player>; 9] {
            &self.cells
        }

        /// Owner of `cell`, if any.
        #[must_use]
        pub fn cell(&self, cell: CellIndex) -> Option<Player> {
            self.cells[usize::from(cell.get())]
        }

        /// Current turn machine phase.
        #[must_use]
        pub fn phase(&self) -> BoardPhase {
            self.phase
        }

        /// Tier the game is played at.
        #[must_use]
        pub fn difficulty(&self) -> DifficultyTier {
            self.difficulty
        }

        /// Outcome derived from the cells.
        #[must_use]
        pub fn outcome(&self) -> GameOutcome {
            self.outcome
        }
    }

    /// Captures the position for a decision system.
    #[must_use]
    pub fn board_view(game: &BoardGame) -> BoardView {
        BoardView {
            cells: game.cells,
            phase: game.phase,
            difficulty: game.difficulty,
            outcome: evaluate(&game.cells),
        }
    }

    /// Render-ready snapshot of a board game.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct BoardSnapshot {
        /// The nine cells in row-major order.
        pub cells: [Option<Player>; 9],
        /// Current turn machine phase.
        pub phase: BoardPhase,
        /// Tier the game is played at.
        pub difficulty: DifficultyTier,
        /// Outcome derived from the cells.
        pub outcome: GameOutcome,
        /// Status line shown above the board.
        pub status: String,
    }

    /// Captures everything a renderer needs in one copy.
    #[must_use]
    pub fn snapshot(game: &BoardGame) -> BoardSnapshot {
        BoardSnapshot {
            cells: game.cells,
            phase: game.phase,
            difficulty: game.difficulty,
            outcome: evaluate(&game.cells),
            status: status_line(game).to_owned(),
        }
    }

    /// The status line shown above the board.
    #[must_use]
    pub fn status_line(game: &BoardGame) -> &'static str {
        match game.phase {
            BoardPhase::HumanTurn => "Your turn!",
            BoardPhase::ComputerThinking => "PC is thinking...",
            BoardPhase::Finished => match evaluate(&game.cells) {
                GameOutcome::Won {
                    player: Player::Human,
                } => "You Win!",
                GameOutcome::Won {
                    player: Player::Computer,
                } => "PC Wins!",
                _ => "It's a Draw!",
            },
        }
    }

    /// Current turn machine phase.
    #[must_use]
    pub fn phase(game: &BoardGame) -> BoardPhase {
        game.phase
    }

    /// Outcome derived from the current cells.
    #[must_use]
    pub fn outcome(game: &BoardGame) -> GameOutcome {
        evaluate(&game.cells)
    }

    /// Tier the game is played at.
    #[must_use]
    pub fn difficulty(game: &BoardGame) -> DifficultyTier {
        game.difficulty
    }
}
