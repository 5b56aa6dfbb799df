//! Replaying the same command script against the same seed must reproduce
//! a run exactly, event for event.

use game_space_snake::{
    apply, query, Command, Direction, Event, GridConfig, GridGame, GridPos, GridSize,
    PlacementRule,
};

#[test]
fn identical_seeds_replay_identically() {
    let first = replay(11);
    let second = replay(11);

    assert_eq!(first.events, second.events);
    assert_eq!(first.final_snapshot, second.final_snapshot);
}

#[test]
fn the_score_matches_the_meal_log() {
    let outcome = replay(23);

    // Only meals after the reset count towards the final score.
    let last_reset = outcome
        .events
        .iter()
        .rposition(|event| *event == Event::GameReset)
        .expect("the script resets once");
    let eaten: u32 = outcome.events[last_reset..]
        .iter()
        .filter_map(|event| match event {
            Event::FoodEaten { food, .. } => Some(food.points()),
            _ => None,
        })
        .sum();

    assert_eq!(outcome.final_snapshot.score, eaten);
}

#[test]
fn body_length_accounts_for_every_meal() {
    let outcome = replay(5);

    let snapshot = &outcome.final_snapshot;
    let last_reset = outcome
        .events
        .iter()
        .rposition(|event| *event == Event::GameReset)
        .expect("the script resets once");
    let eaten: u32 = outcome.events[last_reset..]
        .iter()
        .filter_map(|event| match event {
            Event::FoodEaten { food, .. } => Some(food.points()),
            _ => None,
        })
        .sum();

    assert_eq!(
        snapshot.snake.len() + usize::try_from(snapshot.pending_growth).unwrap(),
        1 + usize::try_from(eaten).unwrap()
    );
}

struct ReplayOutcome {
    events: Vec<Event>,
    final_snapshot: query::GridSnapshot,
}

/// Drives a scripted multi-food run: two equally near foods force the
/// seeded tie-break, a reset interrupts play, then a fresh chase finishes.
fn replay(seed: u64) -> ReplayOutcome {
    let mut game = GridGame::new(GridConfig {
        grid_size: GridSize::new(10),
        initial_snake: vec![GridPos::new(5, 5)],
        placement: PlacementRule::MultiSlot { max_points: 3 },
        rng_seed: seed,
        ..GridConfig::default()
    });
    let mut events = Vec::new();

    for command in scripted_commands() {
        apply(&mut game, command, &mut events);
    }
    for _ in 0..6 {
        tick_once(&mut game, &mut events);
    }
    apply(&mut game, Command::Reset, &mut events);
    apply(
        &mut game,
        Command::PlaceFood {
            cell: GridPos::new(2, 2),
        },
        &mut events,
    );
    for _ in 0..10 {
        tick_once(&mut game, &mut events);
    }

    ReplayOutcome {
        events,
        final_snapshot: query::snapshot(&game),
    }
}

fn scripted_commands() -> Vec<Command> {
    vec![
        // (3, 5) and (7, 5) are the same distance from the head; the route
        // winner is a seeded draw.
        Command::PlaceFood {
            cell: GridPos::new(7, 5),
        },
        Command::PlaceFood {
            cell: GridPos::new(3, 5),
        },
        // Ignored on autopilot, but part of the script on purpose.
        Command::Steer {
            direction: Direction::Up,
        },
    ]
}

fn tick_once(game: &mut GridGame, events: &mut Vec<Event>) {
    let dt = query::step_interval(game);
    apply(game, Command::Tick { dt }, events);
}
