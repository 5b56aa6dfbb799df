#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative state for the autopilot grid snake.
//!
//! The game is advanced exclusively through [`apply`], which consumes
//! [`Command`] values and appends [`Event`] records describing every
//! observable change. Steps are never taken eagerly: each advance is
//! scheduled on the embedded timer queue and fires when a `Tick` command
//! moves the clock past the deadline, so hosts own the passage of time.
//! Rendering layers read the game through [`query`] snapshots and never
//! hold references into live state.

use std::collections::VecDeque;
use std::time::Duration;

use game_space_core::{TimerQueue, TimerToken};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

pub mod routing;

/// Cell coordinates on the playfield, `(0, 0)` at the top-left corner.
///
/// `x` grows rightwards and `y` grows downwards, matching the row order
/// renderers draw in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridPos {
    x: u32,
    y: u32,
}

impl GridPos {
    /// Creates the position at column `x`, row `y`.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Column of the position.
    #[must_use]
    pub const fn x(self) -> u32 {
        self.x
    }

    /// Row of the position.
    #[must_use]
    pub const fn y(self) -> u32 {
        self.y
    }

    /// Taxicab distance to `other`.
    #[must_use]
    pub fn manhattan_distance(self, other: GridPos) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

/// Side length of the square playfield, in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize(u32);

impl GridSize {
    /// Creates a playfield bound of `side` cells per edge.
    #[must_use]
    pub const fn new(side: u32) -> Self {
        Self(side)
    }

    /// Cells per edge.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Whether `cell` lies on the playfield.
    #[must_use]
    pub const fn contains(self, cell: GridPos) -> bool {
        cell.x() < self.0 && cell.y() < self.0
    }

    /// Total number of cells on the playfield.
    #[must_use]
    pub fn cell_count(self) -> usize {
        let side = self.0 as usize;
        side.saturating_mul(side)
    }
}

/// Cardinal heading for manual steering and head orientation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Towards row zero.
    Up,
    /// Towards the highest row.
    Down,
    /// Towards column zero.
    Left,
    /// Towards the highest column.
    Right,
}

impl Direction {
    /// The heading pointing the opposite way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Cell one step along this heading, or `None` when the step would
    /// leave the playfield.
    #[must_use]
    pub fn step_from(self, cell: GridPos, size: GridSize) -> Option<GridPos> {
        let bound = size.get();
        let stepped = match self {
            Self::Up => GridPos::new(cell.x(), cell.y().checked_sub(1)?),
            Self::Down => {
                let y = cell.y().checked_add(1)?;
                if y >= bound {
                    return None;
                }
                GridPos::new(cell.x(), y)
            }
            Self::Left => GridPos::new(cell.x().checked_sub(1)?, cell.y()),
            Self::Right => {
                let x = cell.x().checked_add(1)?;
                if x >= bound {
                    return None;
                }
                GridPos::new(x, cell.y())
            }
        };
        Some(stepped)
    }
}

/// One food item on the grid.
///
/// Items are tracked individually so several can coexist under
/// [`PlacementRule::MultiSlot`]; eating removes exactly the item whose cell
/// the head entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodItem {
    position: GridPos,
    points: u32,
}

impl FoodItem {
    /// Creates a food item worth `points` at `position`.
    #[must_use]
    pub(crate) fn new(position: GridPos, points: u32) -> Self {
        debug_assert!(points >= 1, "food must be worth at least one point");
        Self { position, points }
    }

    /// Cell the item occupies.
    #[must_use]
    pub const fn position(self) -> GridPos {
        self.position
    }

    /// Score and growth awarded when eaten.
    #[must_use]
    pub const fn points(self) -> u32 {
        self.points
    }
}

/// Why a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameOverReason {
    /// The head stepped off the playfield.
    Wall,
    /// The head entered a cell occupied by the body.
    SelfCollision,
    /// No food item was reachable from the head.
    NoPath,
}

/// Why a food placement request was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementError {
    /// The clicked cell lies outside the playfield.
    OutOfBounds,
    /// The clicked cell is covered by the snake.
    OnSnake,
    /// The clicked cell already holds a food item.
    OnFood,
    /// The single food slot is taken until the current item is eaten.
    SlotOccupied,
    /// The run already ended; only a reset restarts play.
    GameOver,
    /// The active placement rule spawns food by itself and takes no clicks.
    InputDisabled,
}

/// How food enters the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementRule {
    /// Click-to-place with a single slot; the next click is accepted once
    /// the current item is eaten. Items are worth one point.
    SingleSlot,
    /// Click-to-place without a slot limit.
    MultiSlot {
        /// Highest point value a placed item can roll; each item is worth
        /// a uniform draw from `1..=max_points`.
        max_points: u32,
    },
    /// A single item respawns on a random free cell after every meal.
    /// Clicks are refused.
    AutoRespawn,
}

/// Who decides where the snake goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMode {
    /// A shortest-path route to the nearest food drives every step;
    /// steering commands are ignored.
    Autopilot,
    /// The player's heading drives every step; no routes are computed.
    Manual,
}

/// Lifecycle phase of a grid game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridPhase {
    /// No food to chase and no step scheduled; the snake is parked.
    Idle,
    /// A step is scheduled and the snake is not digesting.
    Routing,
    /// A step is scheduled while growth from a meal is still materializing.
    Eating,
    /// Terminal. Commands other than `Reset` are refused or ignored.
    GameOver {
        /// What ended the run.
        reason: GameOverReason,
    },
}

/// Build-time configuration for a grid game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Cells per playfield edge.
    pub grid_size: GridSize,
    /// Starting body, head first. Segments must be distinct, in bounds and
    /// chained edge-to-edge.
    pub initial_snake: Vec<GridPos>,
    /// Heading reported (and steered against) before the first advance.
    pub initial_heading: Direction,
    /// Step interval at score zero.
    pub base_step_interval: Duration,
    /// How much each scored point shortens the step interval.
    pub speedup_per_point: Duration,
    /// Floor the step interval never drops below.
    pub min_step_interval: Duration,
    /// Who decides where the snake goes.
    pub control: ControlMode,
    /// How food enters the grid.
    pub placement: PlacementRule,
    /// Seed for food rolls and route tie-breaks; replays with the same seed
    /// and command script reproduce a run exactly.
    pub rng_seed: u64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            grid_size: GridSize::new(20),
            initial_snake: vec![GridPos::new(10, 10)],
            initial_heading: Direction::Right,
            base_step_interval: Duration::from_millis(200),
            speedup_per_point: Duration::from_millis(5),
            min_step_interval: Duration::from_millis(50),
            control: ControlMode::Autopilot,
            placement: PlacementRule::SingleSlot,
            rng_seed: 0,
        }
    }
}

/// Commands accepted by [`apply`].
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the game clock. Steps whose deadline passes are taken
    /// before the call returns.
    Tick {
        /// Time elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests a food item at the clicked cell.
    PlaceFood {
        /// Clicked cell.
        cell: GridPos,
    },
    /// Queues a heading change for the next step. Only honoured under
    /// [`ControlMode::Manual`].
    Steer {
        /// Requested heading.
        direction: Direction,
    },
    /// Restores the configured initial state and cancels any scheduled
    /// step. The random stream keeps its position.
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
    /// A food item entered the grid, by click or by respawn.
    FoodPlaced {
        /// The new item.
        food: FoodItem,
    },
    /// A placement request was refused.
    FoodRejected {
        /// Clicked cell.
        cell: GridPos,
        /// Why the request was refused.
        reason: PlacementError,
    },
    /// The head moved one cell.
    SnakeAdvanced {
        /// Cell the head left.
        from: GridPos,
        /// Cell the head entered.
        to: GridPos,
    },
    /// The head entered a food cell.
    FoodEaten {
        /// The consumed item.
        food: FoodItem,
        /// Score after the meal.
        score: u32,
    },
    /// A fresh route to the chosen food was cached.
    RouteUpdated {
        /// Food cell the route ends on.
        target: GridPos,
        /// Steps from head to target.
        length: usize,
    },
    /// No food item is reachable from the head. The run ends on the next
    /// scheduled step.
    RouteUnreachable,
    /// The run ended.
    GameEnded {
        /// What ended the run.
        reason: GameOverReason,
        /// Final score.
        score: u32,
    },
    /// The game returned to its configured initial state.
    GameReset,
}

/// Authoritative grid game state.
///
/// All mutation goes through [`apply`]; reads go through [`query`].
#[derive(Debug)]
pub struct GridGame {
    config: GridConfig,
    snake: VecDeque<GridPos>,
    heading: Direction,
    pending_heading: Option<Direction>,
    foods: Vec<FoodItem>,
    route: VecDeque<GridPos>,
    unreachable: bool,
    pending_growth: u32,
    score: u32,
    phase: GridPhase,
    occupancy: OccupancyGrid,
    timers: TimerQueue,
    step_timer: Option<TimerToken>,
    rng: ChaCha8Rng,
}

impl GridGame {
    /// Creates a game in its configured initial state.
    ///
    /// Under [`PlacementRule::AutoRespawn`] the first food item is drawn
    /// immediately and stepping starts; otherwise the game waits in
    /// [`GridPhase::Idle`] for the first placement (manual games step
    /// right away regardless).
    ///
    /// # Panics
    ///
    /// Panics when the configuration is malformed: an empty or disconnected
    /// initial body, segments out of bounds or duplicated, a degenerate
    /// playfield, or a zero `max_points`.
    #[must_use]
    pub fn new(config: GridConfig) -> Self {
        assert!(config.grid_size.get() >= 1, "playfield must have at least one cell");
        assert!(!config.initial_snake.is_empty(), "initial snake must have a head");
        for segment in &config.initial_snake {
            assert!(
                config.grid_size.contains(*segment),
                "initial snake segment out of bounds"
            );
        }
        for (index, segment) in config.initial_snake.iter().enumerate() {
            assert!(
                !config.initial_snake[..index].contains(segment),
                "initial snake segments must be distinct"
            );
        }
        for window in config.initial_snake.windows(2) {
            assert!(
                window[0].manhattan_distance(window[1]) == 1,
                "initial snake segments must chain edge-to-edge"
            );
        }
        if let PlacementRule::MultiSlot { max_points } = config.placement {
            assert!(max_points >= 1, "max_points must be at least one");
        }

        let rng = ChaCha8Rng::seed_from_u64(config.rng_seed);
        let occupancy = OccupancyGrid::new(config.grid_size);
        let mut game = Self {
            snake: VecDeque::new(),
            heading: config.initial_heading,
            pending_heading: None,
            foods: Vec::new(),
            route: VecDeque::new(),
            unreachable: false,
            pending_growth: 0,
            score: 0,
            phase: GridPhase::Idle,
            occupancy,
            timers: TimerQueue::new(),
            step_timer: None,
            rng,
            config,
        };
        game.restart(&mut Vec::new());
        game
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        out_events.push(Event::TimeAdvanced { dt });
        let mut fired = Vec::new();
        self.timers.advance(dt, &mut fired);
        for token in fired {
            if self.step_timer == Some(token) {
                self.step_timer = None;
                self.step(out_events);
            }
        }
    }

    /// Takes one scheduled step: advance, eat, die or park.
    fn step(&mut self, out_events: &mut Vec<Event>) {
        debug_assert!(
            matches!(self.phase, GridPhase::Routing | GridPhase::Eating),
            "steps only fire while the snake is live"
        );

        if self.unreachable {
            self.end_game(GameOverReason::NoPath, out_events);
            return;
        }

        let Some(&head) = self.snake.front() else {
            return;
        };

        let next = match self.config.control {
            ControlMode::Autopilot => match self.route.pop_front() {
                Some(cell) => cell,
                None => {
                    // Nothing left to chase; park until the next placement.
                    self.phase = GridPhase::Idle;
                    return;
                }
            },
            ControlMode::Manual => {
                if let Some(direction) = self.pending_heading.take() {
                    self.heading = direction;
                }
                match self.heading.step_from(head, self.config.grid_size) {
                    Some(cell) => cell,
                    None => {
                        self.end_game(GameOverReason::Wall, out_events);
                        return;
                    }
                }
            }
        };

        let eaten = self.food_at(next);
        let will_grow = eaten.is_some() || self.pending_growth > 0;

        // The tail cell is enterable on ticks where the tail moves away.
        let vacating_tail = !will_grow && self.snake.back() == Some(&next);
        if self.occupancy.is_occupied(next) && !vacating_tail {
            self.end_game(GameOverReason::SelfCollision, out_events);
            return;
        }

        if !will_grow {
            if let Some(tail) = self.snake.pop_back() {
                self.occupancy.vacate(tail);
            }
        }
        self.snake.push_front(next);
        self.occupancy.occupy(next);
        out_events.push(Event::SnakeAdvanced { from: head, to: next });
        if let Some(direction) = direction_between(head, next) {
            self.heading = direction;
        }

        let mut foods_changed = false;
        if let Some(food) = eaten {
            self.score = self.score.saturating_add(food.points());
            self.pending_growth = self.pending_growth.saturating_add(food.points());
            self.remove_food(food.position());
            foods_changed = true;
            out_events.push(Event::FoodEaten {
                food,
                score: self.score,
            });
            if self.config.placement == PlacementRule::AutoRespawn {
                self.respawn_food(out_events);
            }
        }
        if will_grow {
            // Keeping the tail in place materialized one growth unit.
            self.pending_growth = self.pending_growth.saturating_sub(1);
        }

        if foods_changed && self.config.control == ControlMode::Autopilot {
            self.recompute_route(out_events);
        }

        if self.config.control == ControlMode::Autopilot && self.foods.is_empty() {
            self.phase = GridPhase::Idle;
            return;
        }
        self.phase = if self.pending_growth > 0 {
            GridPhase::Eating
        } else {
            GridPhase::Routing
        };
        self.schedule_step();
    }

    fn place_food(&mut self, cell: GridPos, out_events: &mut Vec<Event>) {
        if let Some(reason) = self.placement_rejection(cell) {
            out_events.push(Event::FoodRejected { cell, reason });
            return;
        }

        let points = match self.config.placement {
            PlacementRule::SingleSlot | PlacementRule::AutoRespawn => 1,
            PlacementRule::MultiSlot { max_points } => self.rng.gen_range(1..=max_points),
        };
        let food = FoodItem::new(cell, points);
        self.foods.push(food);
        out_events.push(Event::FoodPlaced { food });

        if self.config.control == ControlMode::Autopilot {
            self.recompute_route(out_events);
        }
        if self.phase == GridPhase::Idle {
            self.phase = if self.pending_growth > 0 {
                GridPhase::Eating
            } else {
                GridPhase::Routing
            };
            self.schedule_step();
        }
    }

    fn placement_rejection(&self, cell: GridPos) -> Option<PlacementError> {
        if matches!(self.phase, GridPhase::GameOver { .. }) {
            return Some(PlacementError::GameOver);
        }
        if !self.config.grid_size.contains(cell) {
            return Some(PlacementError::OutOfBounds);
        }
        if self.config.placement == PlacementRule::AutoRespawn {
            return Some(PlacementError::InputDisabled);
        }
        if matches!(self.config.placement, PlacementRule::SingleSlot) && !self.foods.is_empty() {
            return Some(PlacementError::SlotOccupied);
        }
        if self.occupancy.is_occupied(cell) {
            return Some(PlacementError::OnSnake);
        }
        if self.food_at(cell).is_some() {
            return Some(PlacementError::OnFood);
        }
        None
    }

    fn steer(&mut self, direction: Direction) {
        if self.config.control != ControlMode::Manual {
            return;
        }
        if matches!(self.phase, GridPhase::GameOver { .. }) {
            return;
        }
        if direction == self.heading.opposite() {
            // Reversing into the neck is never honoured.
            return;
        }
        self.pending_heading = Some(direction);
    }

    fn reset(&mut self, out_events: &mut Vec<Event>) {
        self.timers.clear();
        self.step_timer = None;
        out_events.push(Event::GameReset);
        self.restart(out_events);
    }

    /// Rebuilds the configured initial state. Timers must already be clear.
    fn restart(&mut self, out_events: &mut Vec<Event>) {
        debug_assert!(self.step_timer.is_none(), "restart with a step scheduled");

        self.snake.clear();
        self.occupancy.clear();
        let initial = self.config.initial_snake.clone();
        for segment in initial {
            self.snake.push_back(segment);
            self.occupancy.occupy(segment);
        }
        self.heading = self.config.initial_heading;
        self.pending_heading = None;
        self.foods.clear();
        self.route.clear();
        self.unreachable = false;
        self.pending_growth = 0;
        self.score = 0;

        if self.config.placement == PlacementRule::AutoRespawn {
            self.respawn_food(out_events);
        }
        if self.config.control == ControlMode::Autopilot {
            self.recompute_route(out_events);
        }

        if self.config.control == ControlMode::Manual || !self.foods.is_empty() {
            self.phase = GridPhase::Routing;
            self.schedule_step();
        } else {
            self.phase = GridPhase::Idle;
        }
    }

    /// Replaces the cached route after any change to the food set.
    fn recompute_route(&mut self, out_events: &mut Vec<Event>) {
        debug_assert!(
            self.config.control == ControlMode::Autopilot,
            "routes are an autopilot concern"
        );
        self.route.clear();
        self.unreachable = false;
        if self.foods.is_empty() {
            return;
        }

        let body: Vec<GridPos> = self.snake.iter().copied().collect();
        match routing::find_route(&body, &self.foods, self.config.grid_size, &mut self.rng) {
            Some(route) => {
                out_events.push(Event::RouteUpdated {
                    target: route.target(),
                    length: route.cells().len(),
                });
                self.route = route.into_cells().into();
            }
            None => {
                self.unreachable = true;
                out_events.push(Event::RouteUnreachable);
            }
        }
    }

    fn respawn_food(&mut self, out_events: &mut Vec<Event>) {
        let Some(cell) = self.random_free_cell() else {
            return;
        };
        let food = FoodItem::new(cell, 1);
        self.foods.push(food);
        out_events.push(Event::FoodPlaced { food });
    }

    fn random_free_cell(&mut self) -> Option<GridPos> {
        let bound = self.config.grid_size.get();
        let mut free = Vec::new();
        for y in 0..bound {
            for x in 0..bound {
                let cell = GridPos::new(x, y);
                if !self.occupancy.is_occupied(cell) && self.food_at(cell).is_none() {
                    free.push(cell);
                }
            }
        }
        if free.is_empty() {
            return None;
        }
        Some(free[self.rng.gen_range(0..free.len())])
    }

    fn food_at(&self, cell: GridPos) -> Option<FoodItem> {
        self.foods.iter().copied().find(|food| food.position() == cell)
    }

    fn remove_food(&mut self, cell: GridPos) {
        self.foods.retain(|food| food.position() != cell);
    }

    /// Step interval at the current score, clamped to the configured floor.
    fn current_interval(&self) -> Duration {
        let speedup = self
            .config
            .speedup_per_point
            .checked_mul(self.score)
            .unwrap_or(Duration::MAX);
        self.config
            .base_step_interval
            .saturating_sub(speedup)
            .max(self.config.min_step_interval)
    }

    fn schedule_step(&mut self) {
        debug_assert!(self.step_timer.is_none(), "at most one step outstanding");
        self.step_timer = Some(self.timers.schedule(self.current_interval()));
    }

    fn end_game(&mut self, reason: GameOverReason, out_events: &mut Vec<Event>) {
        if let Some(token) = self.step_timer.take() {
            let _ = self.timers.cancel(token);
        }
        self.route.clear();
        self.pending_heading = None;
        self.phase = GridPhase::GameOver { reason };
        out_events.push(Event::GameEnded {
            reason,
            score: self.score,
        });
    }
}

/// Applies `command` to `game`, appending resulting events to `out_events`.
///
/// Command handling is deterministic: the same starting configuration and
/// command script always produce the same events and the same final state.
pub fn apply(game: &mut GridGame, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => game.tick(dt, out_events),
        Command::PlaceFood { cell } => game.place_food(cell, out_events),
        Command::Steer { direction } => game.steer(direction),
        Command::Reset => game.reset(out_events),
    }
}

/// Read-only views over a [`GridGame`].
pub mod query {
    use std::time::Duration;

    use serde::{Deserialize, Serialize};

    use super::{Direction, FoodItem, GridGame, GridPhase, GridPos, GridSize};

    /// Render-ready snapshot of a grid game.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct GridSnapshot {
        /// Playfield bound the snapshot was taken from.
        pub grid_size: GridSize,
        /// Snake segments, head first.
        pub snake: Vec<GridPos>,
        /// Food on the grid, in placement order.
        pub foods: Vec<FoodItem>,
        /// Remaining route cells the autopilot will visit, in order.
        pub route: Vec<GridPos>,
        /// Lifecycle phase at snapshot time.
        pub phase: GridPhase,
        /// Points scored so far.
        pub score: u32,
        /// Heading of the last advance, or the configured initial heading.
        pub heading: Direction,
        /// Growth still owed from eaten food.
        pub pending_growth: u32,
    }

    /// Captures everything a renderer needs in one copy.
    #[must_use]
    pub fn snapshot(game: &GridGame) -> GridSnapshot {
        GridSnapshot {
            grid_size: game.config.grid_size,
            snake: game.snake.iter().copied().collect(),
            foods: game.foods.clone(),
            route: game.route.iter().copied().collect(),
            phase: game.phase,
            score: game.score,
            heading: game.heading,
            pending_growth: game.pending_growth,
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(game: &GridGame) -> GridPhase {
        game.phase
    }

    /// Points scored so far.
    #[must_use]
    pub fn score(game: &GridGame) -> u32 {
        game.score
    }

    /// Playfield bound.
    #[must_use]
    pub fn grid_size(game: &GridGame) -> GridSize {
        game.config.grid_size
    }

    /// Number of body segments, head included.
    #[must_use]
    pub fn snake_length(game: &GridGame) -> usize {
        game.snake.len()
    }

    /// Step interval at the current score.
    ///
    /// This is the delay the next step is (or would be) scheduled with.
    #[must_use]
    pub fn step_interval(game: &GridGame) -> Duration {
        game.current_interval()
    }

    /// Whether a step is currently scheduled on the timer queue.
    #[must_use]
    pub fn step_scheduled(game: &GridGame) -> bool {
        game.step_timer.is_some()
    }
}

/// Dense boolean grid tracking which cells the body covers.
#[derive(Debug)]
struct OccupancyGrid {
    size: GridSize,
    cells: Vec<bool>,
}

impl OccupancyGrid {
    fn new(size: GridSize) -> Self {
        Self {
            size,
            cells: vec![false; size.cell_count()],
        }
    }

    fn clear(&mut self) {
        self.cells.fill(false);
    }

    fn occupy(&mut self, cell: GridPos) {
        if let Some(index) = self.index(cell) {
            debug_assert!(!self.cells[index], "cell occupied twice");
            self.cells[index] = true;
        }
    }

    fn vacate(&mut self, cell: GridPos) {
        if let Some(index) = self.index(cell) {
            debug_assert!(self.cells[index], "vacating an empty cell");
            self.cells[index] = false;
        }
    }

    fn is_occupied(&self, cell: GridPos) -> bool {
        self.index(cell).map_or(false, |index| self.cells[index])
    }

    fn index(&self, cell: GridPos) -> Option<usize> {
        if !self.size.contains(cell) {
            return None;
        }
        let x = usize::try_from(cell.x()).ok()?;
        let y = usize::try_from(cell.y()).ok()?;
        let width = usize::try_from(self.size.get()).ok()?;
        y.checked_mul(width)?.checked_add(x)
    }
}

/// Heading that moves `from` onto `to`, when the cells are edge-adjacent.
fn direction_between(from: GridPos, to: GridPos) -> Option<Direction> {
    if from.x() == to.x() {
        if to.y().checked_add(1) == Some(from.y()) {
            return Some(Direction::Up);
        }
        if from.y().checked_add(1) == Some(to.y()) {
            return Some(Direction::Down);
        }
    } else if from.y() == to.y() {
        if to.x().checked_add(1) == Some(from.x()) {
            return Some(Direction::Left);
        }
        if from.x().checked_add(1) == Some(to.x()) {
            return Some(Direction::Right);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "initial snake must have a head")]
    fn empty_initial_snake_is_refused() {
        let _ = GridGame::new(GridConfig {
            initial_snake: Vec::new(),
            ..GridConfig::default()
        });
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn out_of_bounds_initial_snake_is_refused() {
        let _ = GridGame::new(GridConfig {
            grid_size: GridSize::new(5),
            initial_snake: vec![GridPos::new(5, 0)],
            ..GridConfig::default()
        });
    }

    #[test]
    #[should_panic(expected = "distinct")]
    fn duplicated_initial_segments_are_refused() {
        let _ = GridGame::new(GridConfig {
            initial_snake: vec![GridPos::new(3, 3), GridPos::new(3, 4), GridPos::new(3, 3)],
            ..GridConfig::default()
        });
    }

    #[test]
    #[should_panic(expected = "chain edge-to-edge")]
    fn disconnected_initial_segments_are_refused() {
        let _ = GridGame::new(GridConfig {
            initial_snake: vec![GridPos::new(3, 3), GridPos::new(5, 3)],
            ..GridConfig::default()
        });
    }

    #[test]
    #[should_panic(expected = "at least one cell")]
    fn degenerate_playfield_is_refused() {
        let _ = GridGame::new(GridConfig {
            grid_size: GridSize::new(0),
            initial_snake: vec![GridPos::new(0, 0)],
            ..GridConfig::default()
        });
    }

    #[test]
    #[should_panic(expected = "max_points")]
    fn zero_point_roll_ceiling_is_refused() {
        let _ = GridGame::new(GridConfig {
            placement: PlacementRule::MultiSlot { max_points: 0 },
            ..GridConfig::default()
        });
    }

    #[test]
    fn autopilot_game_starts_parked() {
        let game = GridGame::new(GridConfig::default());

        assert_eq!(query::phase(&game), GridPhase::Idle);
        assert!(!query::step_scheduled(&game));
        assert_eq!(query::snake_length(&game), 1);
        assert_eq!(query::score(&game), 0);
    }

    #[test]
    fn placing_food_schedules_the_first_step() {
        let mut game = GridGame::new(GridConfig::default());
        let mut events = Vec::new();

        apply(
            &mut game,
            Command::PlaceFood {
                cell: GridPos::new(12, 10),
            },
            &mut events,
        );

        assert_eq!(query::phase(&game), GridPhase::Routing);
        assert!(query::step_scheduled(&game));
        assert!(events.contains(&Event::FoodPlaced {
            food: FoodItem::new(GridPos::new(12, 10), 1),
        }));
        assert!(events.contains(&Event::RouteUpdated {
            target: GridPos::new(12, 10),
            length: 2,
        }));
    }

    #[test]
    fn clicking_the_snake_is_rejected() {
        let mut game = GridGame::new(GridConfig::default());
        let mut events = Vec::new();

        apply(
            &mut game,
            Command::PlaceFood {
                cell: GridPos::new(10, 10),
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![Event::FoodRejected {
                cell: GridPos::new(10, 10),
                reason: PlacementError::OnSnake,
            }]
        );
        assert_eq!(query::phase(&game), GridPhase::Idle);
    }

    #[test]
    fn clicking_off_the_playfield_is_rejected() {
        let mut game = GridGame::new(GridConfig::default());
        let mut events = Vec::new();

        apply(
            &mut game,
            Command::PlaceFood {
                cell: GridPos::new(20, 3),
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![Event::FoodRejected {
                cell: GridPos::new(20, 3),
                reason: PlacementError::OutOfBounds,
            }]
        );
    }

    #[test]
    fn single_slot_refuses_a_second_item() {
        let mut game = GridGame::new(GridConfig::default());
        let mut events = Vec::new();

        apply(
            &mut game,
            Command::PlaceFood {
                cell: GridPos::new(12, 10),
            },
            &mut events,
        );
        events.clear();
        apply(
            &mut game,
            Command::PlaceFood {
                cell: GridPos::new(4, 4),
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![Event::FoodRejected {
                cell: GridPos::new(4, 4),
                reason: PlacementError::SlotOccupied,
            }]
        );
    }

    #[test]
    fn multi_slot_accepts_several_items() {
        let mut game = GridGame::new(GridConfig {
            placement: PlacementRule::MultiSlot { max_points: 3 },
            ..GridConfig::default()
        });
        let mut events = Vec::new();

        apply(
            &mut game,
            Command::PlaceFood {
                cell: GridPos::new(12, 10),
            },
            &mut events,
        );
        apply(
            &mut game,
            Command::PlaceFood {
                cell: GridPos::new(4, 4),
            },
            &mut events,
        );

        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::FoodRejected { .. })));
        assert_eq!(query::snapshot(&game).foods.len(), 2);
    }

    #[test]
    fn auto_respawn_refuses_clicks() {
        let mut game = GridGame::new(GridConfig {
            placement: PlacementRule::AutoRespawn,
            ..GridConfig::default()
        });
        let mut events = Vec::new();

        apply(
            &mut game,
            Command::PlaceFood {
                cell: GridPos::new(2, 2),
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![Event::FoodRejected {
                cell: GridPos::new(2, 2),
                reason: PlacementError::InputDisabled,
            }]
        );
    }

    #[test]
    fn auto_respawn_spawns_the_first_item_off_the_snake() {
        let game = GridGame::new(GridConfig {
            placement: PlacementRule::AutoRespawn,
            ..GridConfig::default()
        });

        let snapshot = query::snapshot(&game);
        assert_eq!(snapshot.foods.len(), 1);
        assert!(!snapshot.snake.contains(&snapshot.foods[0].position()));
        assert_eq!(snapshot.phase, GridPhase::Routing);
    }

    #[test]
    fn steering_is_ignored_on_autopilot() {
        let mut game = GridGame::new(GridConfig::default());
        let mut events = Vec::new();

        apply(
            &mut game,
            Command::PlaceFood {
                cell: GridPos::new(12, 10),
            },
            &mut events,
        );
        apply(
            &mut game,
            Command::Steer {
                direction: Direction::Up,
            },
            &mut events,
        );
        let dt = query::step_interval(&game);
        apply(&mut game, Command::Tick { dt }, &mut events);

        // The route to (12, 10) runs right; steering must not bend it.
        assert!(events.contains(&Event::SnakeAdvanced {
            from: GridPos::new(10, 10),
            to: GridPos::new(11, 10),
        }));
    }

    #[test]
    fn direction_between_reports_adjacent_headings() {
        let center = GridPos::new(4, 4);

        assert_eq!(
            direction_between(center, GridPos::new(4, 3)),
            Some(Direction::Up)
        );
        assert_eq!(
            direction_between(center, GridPos::new(4, 5)),
            Some(Direction::Down)
        );
        assert_eq!(
            direction_between(center, GridPos::new(3, 4)),
            Some(Direction::Left)
        );
        assert_eq!(
            direction_between(center, GridPos::new(5, 4)),
            Some(Direction::Right)
        );
        assert_eq!(direction_between(center, GridPos::new(6, 4)), None);
        assert_eq!(direction_between(center, center), None);
    }

    #[test]
    fn step_from_stops_at_the_playfield_edge() {
        let size = GridSize::new(3);

        assert_eq!(
            Direction::Up.step_from(GridPos::new(1, 0), size),
            None
        );
        assert_eq!(
            Direction::Left.step_from(GridPos::new(0, 1), size),
            None
        );
        assert_eq!(
            Direction::Down.step_from(GridPos::new(1, 2), size),
            None
        );
        assert_eq!(
            Direction::Right.step_from(GridPos::new(2, 1), size),
            None
        );
        assert_eq!(
            Direction::Right.step_from(GridPos::new(1, 1), size),
            Some(GridPos::new(2, 1))
        );
    }

    #[test]
    fn occupancy_tracks_occupied_cells() {
        let mut grid = OccupancyGrid::new(GridSize::new(4));
        let cell = GridPos::new(2, 3);

        assert!(!grid.is_occupied(cell));
        grid.occupy(cell);
        assert!(grid.is_occupied(cell));
        grid.vacate(cell);
        assert!(!grid.is_occupied(cell));
        assert!(!grid.is_occupied(GridPos::new(9, 9)));
    }

    #[test]
    fn snapshots_round_trip_through_bincode() {
        let mut game = GridGame::new(GridConfig::default());
        let mut events = Vec::new();
        apply(
            &mut game,
            Command::PlaceFood {
                cell: GridPos::new(12, 10),
            },
            &mut events,
        );

        assert_round_trip(&query::snapshot(&game));
        assert_round_trip(&GridPos::new(7, 3));
        assert_round_trip(&FoodItem::new(GridPos::new(1, 2), 3));
        assert_round_trip(&Direction::Left);
        assert_round_trip(&GridPhase::GameOver {
            reason: GameOverReason::NoPath,
        });
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: serde::Serialize + serde::de::DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let decoded: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&decoded, value);
    }
}
