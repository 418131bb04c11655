#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Monster director that decides when the level's monster appears and moves.
//!
//! The level itself knows how the monster steps; the director owns timing.
//! It waits for the level's spawn delay, throttles movement to a fixed
//! interval and tracks which behaviour the monster is showing. When lights
//! flicker is enabled, every step may also dim the lights for a moment,
//! more likely the closer the monster is.

use std::time::Duration;

use maze_hunt_core::{GameConfig, Tile};
use maze_hunt_world::Level;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Longest a single flicker lasts.
pub const MAX_FLICKER: Duration = Duration::from_millis(500);
/// Squared distance discounted before the falloff applies; steps within it
/// always flicker.
const FLICKER_REACH: f64 = 10.0;
/// Exponent flattening how fast the flicker chance falls with distance.
const FLICKER_FALLOFF: f64 = 0.6;

/// Configuration parameters required to construct the director.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    spawn_delay: Option<Duration>,
    movement_interval: Duration,
    catch_ends_round: bool,
    flicker_lights: bool,
    rng_seed: u64,
}

impl Config {
    /// Creates a configuration from explicit timings.
    ///
    /// A `spawn_delay` of `None` keeps the monster away for good.
    #[must_use]
    pub const fn new(
        spawn_delay: Option<Duration>,
        movement_interval: Duration,
        catch_ends_round: bool,
        rng_seed: u64,
    ) -> Self {
        Self {
            spawn_delay,
            movement_interval,
            catch_ends_round,
            flicker_lights: false,
            rng_seed,
        }
    }

    /// Enables or disables light flickers on monster steps.
    #[must_use]
    pub const fn with_flicker_lights(mut self, flicker_lights: bool) -> Self {
        self.flicker_lights = flicker_lights;
        self
    }

    /// Derives the timings for `level` from the game configuration.
    #[must_use]
    pub fn for_level(config: &GameConfig, level: &Level, rng_seed: u64) -> Self {
        Self::new(
            config.monster_spawn_delay(level.monster_wait()),
            config.monster_movement_interval(),
            config.enable_monster_killing,
            rng_seed,
        )
        .with_flicker_lights(config.monster_flicker_lights)
    }
}

/// Behaviour the monster is currently showing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonsterState {
    /// The monster has not appeared yet, or was removed from the grid.
    Unspawned,
    /// No line of sight to the player; the monster roams at random.
    Wandering,
    /// The monster sees the player and closes in along the shared axis.
    Pursuing,
    /// The monster reached the player's tile.
    CaughtPlayer,
}

/// Notable outcomes of a director tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonsterEvent {
    /// The monster appeared on its start tile.
    Spawned {
        /// Tile the monster spawned on.
        tile: Tile,
    },
    /// The monster moved between two tiles.
    Moved {
        /// Tile the monster left.
        from: Tile,
        /// Tile the monster entered.
        to: Tile,
    },
    /// The monster shares the player's tile.
    CaughtPlayer {
        /// Tile where the catch happened.
        tile: Tile,
    },
    /// The lights started flickering.
    LightsFlickered {
        /// How long the lights stay dimmed.
        duration: Duration,
    },
}

/// Timing state machine driving [`Level::move_monster`].
#[derive(Debug)]
pub struct MonsterDirector {
    spawn_delay: Option<Duration>,
    movement_interval: Duration,
    catch_ends_round: bool,
    flicker_lights: bool,
    since_last_move: Duration,
    flicker_remaining: Duration,
    state: MonsterState,
    rng: ChaCha8Rng,
}

impl MonsterDirector {
    /// Creates a director in the [`MonsterState::Unspawned`] state.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            spawn_delay: config.spawn_delay,
            movement_interval: config.movement_interval,
            catch_ends_round: config.catch_ends_round,
            flicker_lights: config.flicker_lights,
            since_last_move: Duration::ZERO,
            flicker_remaining: Duration::ZERO,
            state: MonsterState::Unspawned,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Current behaviour of the monster.
    #[must_use]
    pub const fn state(&self) -> MonsterState {
        self.state
    }

    /// Time accumulated towards the next movement tick.
    #[must_use]
    pub const fn since_last_move(&self) -> Duration {
        self.since_last_move
    }

    /// Whether the lights are currently dimmed by a flicker.
    #[must_use]
    pub fn lights_flickering(&self) -> bool {
        !self.flicker_remaining.is_zero()
    }

    /// Time left on the current flicker.
    #[must_use]
    pub const fn flicker_remaining(&self) -> Duration {
        self.flicker_remaining
    }

    /// Advances the director by `dt`.
    ///
    /// `level_time` is how long the round has been running; the monster is
    /// held back until it exceeds the spawn delay. Once it has, the monster
    /// steps whenever more than the movement interval has accumulated since
    /// its last step. The wandering and pursuing states follow the line of
    /// sight seen at the start of each step, with no memory between steps.
    ///
    /// A monster removed from the grid after a catch, by a shot or an
    /// escape, lets the director carry on towards a respawn.
    pub fn handle(
        &mut self,
        level: &mut Level,
        level_time: Duration,
        dt: Duration,
        out: &mut Vec<MonsterEvent>,
    ) {
        self.flicker_remaining = self.flicker_remaining.saturating_sub(dt);
        if level.monster_coords().is_none() {
            self.state = MonsterState::Unspawned;
        }
        if self.state == MonsterState::CaughtPlayer && self.catch_ends_round {
            return;
        }

        self.since_last_move = self.since_last_move.saturating_add(dt);
        let Some(spawn_delay) = self.spawn_delay else {
            return;
        };
        if level.monster_start().is_none()
            || level_time <= spawn_delay
            || self.since_last_move <= self.movement_interval
        {
            return;
        }
        self.since_last_move = Duration::ZERO;

        let before = level.monster_coords();
        let pursuing = level.monster_line_of_sight();
        let caught = level.move_monster(true, &mut self.rng);
        let Some(after) = level.monster_coords() else {
            return;
        };

        match before {
            None => out.push(MonsterEvent::Spawned { tile: after }),
            Some(from) if from != after => out.push(MonsterEvent::Moved { from, to: after }),
            Some(_) => {}
        }

        self.state = if caught {
            out.push(MonsterEvent::CaughtPlayer { tile: after });
            MonsterState::CaughtPlayer
        } else if pursuing || (before.is_none() && level.monster_line_of_sight()) {
            MonsterState::Pursuing
        } else {
            MonsterState::Wandering
        };

        if self.flicker_lights && self.flicker_remaining.is_zero() {
            let offset = after.center() - level.player_coords();
            if let Some(duration) = roll_flicker(&mut self.rng, offset.length_squared()) {
                self.flicker_remaining = duration;
                out.push(MonsterEvent::LightsFlickered { duration });
            }
        }
    }

    /// Returns the director to its initial state for a fresh round.
    ///
    /// The random stream carries on so replayed rounds do not repeat.
    pub fn reset(&mut self) {
        self.since_last_move = Duration::ZERO;
        self.flicker_remaining = Duration::ZERO;
        self.state = MonsterState::Unspawned;
    }
}

/// Rolls whether a step at `distance_squared` from the player flickers the
/// lights and, if so, for how long.
fn roll_flicker<R: Rng + ?Sized>(rng: &mut R, distance_squared: f64) -> Option<Duration> {
    let falloff = (distance_squared - FLICKER_REACH).max(1.0);
    if rng.gen::<f64>() < falloff.powf(-FLICKER_FALLOFF) {
        Some(MAX_FLICKER.mul_f64(rng.gen::<f64>()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_hunt_core::{DVec2, TextureId};
    use maze_hunt_world::LevelData;

    fn hall(monster_wait: Option<f64>) -> Level {
        Level::from_data(LevelData {
            dimensions: [8, 8],
            wall_map: vec![vec![None; 8]; 8],
            collision_map: None,
            start_point: Tile::new(5, 5),
            end_point: Tile::new(0, 0),
            exit_keys: Vec::new(),
            key_sensors: Vec::new(),
            guns: Vec::new(),
            decorations: Vec::new(),
            monster_start: Some(Tile::new(5, 2)),
            monster_wait,
            edge_wall_texture: TextureId::new(0),
        })
        .expect("valid level")
    }

    fn director(spawn_delay: Option<Duration>) -> MonsterDirector {
        MonsterDirector::new(Config::new(
            spawn_delay,
            Duration::from_millis(500),
            true,
            7,
        ))
    }

    #[test]
    fn waits_for_the_spawn_delay() {
        let mut level = hall(Some(10.0));
        let mut director = director(Some(Duration::from_secs(10)));
        let mut events = Vec::new();

        director.handle(&mut level, Duration::from_secs(10), Duration::from_secs(1), &mut events);

        assert!(events.is_empty());
        assert_eq!(level.monster_coords(), None);
        assert_eq!(director.state(), MonsterState::Unspawned);

        director.handle(&mut level, Duration::from_secs(11), Duration::from_secs(1), &mut events);

        assert_eq!(
            events,
            vec![MonsterEvent::Spawned {
                tile: Tile::new(5, 2)
            }]
        );
        assert_eq!(director.state(), MonsterState::Pursuing);
    }

    #[test]
    fn disabled_monster_never_spawns() {
        let mut level = hall(Some(0.0));
        let mut director = director(None);
        let mut events = Vec::new();

        for second in 1..20 {
            director.handle(
                &mut level,
                Duration::from_secs(second),
                Duration::from_secs(1),
                &mut events,
            );
        }

        assert!(events.is_empty());
        assert_eq!(level.monster_coords(), None);
    }

    #[test]
    fn movement_is_throttled() {
        let mut level = hall(Some(0.0));
        let mut director = director(Some(Duration::ZERO));
        let mut events = Vec::new();
        let step = Duration::from_millis(200);
        let mut level_time = Duration::from_secs(1);

        for _ in 0..3 {
            director.handle(&mut level, level_time, step, &mut events);
            level_time += step;
        }
        assert_eq!(events.len(), 1, "spawned after 600ms accumulated");
        assert_eq!(director.since_last_move(), Duration::ZERO);

        for _ in 0..2 {
            director.handle(&mut level, level_time, step, &mut events);
            level_time += step;
        }
        assert_eq!(events.len(), 1);

        director.handle(&mut level, level_time, step, &mut events);
        assert_eq!(
            events[1],
            MonsterEvent::Moved {
                from: Tile::new(5, 2),
                to: Tile::new(5, 3)
            }
        );
    }

    #[test]
    fn catch_ends_the_round() {
        let mut level = hall(Some(0.0));
        let _ = level.set_player_position(DVec2::new(5.5, 3.5));
        let mut director = director(Some(Duration::ZERO));
        let mut events = Vec::new();
        let tick = Duration::from_secs(1);

        director.handle(&mut level, tick, tick, &mut events);
        director.handle(&mut level, tick * 2, tick, &mut events);

        assert_eq!(director.state(), MonsterState::CaughtPlayer);
        assert_eq!(
            events.last(),
            Some(&MonsterEvent::CaughtPlayer {
                tile: Tile::new(5, 3)
            })
        );

        let before = events.len();
        director.handle(&mut level, tick * 3, tick, &mut events);
        assert_eq!(events.len(), before);
    }

    fn flickering(seed: u64) -> MonsterDirector {
        MonsterDirector::new(
            Config::new(Some(Duration::ZERO), Duration::from_millis(500), true, seed)
                .with_flicker_lights(true),
        )
    }

    #[test]
    fn nearby_steps_flicker_the_lights() {
        let tick = Duration::from_secs(1);
        let mut level = hall(Some(0.0));
        let mut director = flickering(11);
        let mut events = Vec::new();

        director.handle(&mut level, tick, tick, &mut events);

        let Some(&MonsterEvent::LightsFlickered { duration }) = events.last() else {
            panic!("a step three tiles away always flickers: {events:?}");
        };
        assert!(duration < MAX_FLICKER);
        assert_eq!(director.flicker_remaining(), duration);

        let mut replay = flickering(11);
        let mut replayed = Vec::new();
        replay.handle(&mut hall(Some(0.0)), tick, tick, &mut replayed);
        assert_eq!(replayed, events);

        director.handle(&mut level, tick, MAX_FLICKER, &mut events);
        assert!(!director.lights_flickering());
    }

    #[test]
    fn flicker_is_off_unless_enabled() {
        let tick = Duration::from_secs(1);
        let mut level = hall(Some(0.0));
        let mut director = director(Some(Duration::ZERO));
        let mut events = Vec::new();

        director.handle(&mut level, tick, tick, &mut events);
        director.handle(&mut level, tick * 2, tick, &mut events);

        assert!(events
            .iter()
            .all(|event| !matches!(event, MonsterEvent::LightsFlickered { .. })));
        assert!(!director.lights_flickering());
    }

    #[test]
    fn distant_steps_rarely_flicker() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let near = (0..200)
            .filter(|_| roll_flicker(&mut rng, 4.0).is_some())
            .count();
        let far = (0..200)
            .filter(|_| roll_flicker(&mut rng, 400.0).is_some())
            .count();

        assert_eq!(near, 200);
        assert!(far < 60, "far monster flickered {far} times");
    }

    #[test]
    fn monster_removed_after_a_catch_respawns() {
        let tick = Duration::from_secs(1);
        let mut level = hall(Some(0.0));
        let _ = level.set_player_position(DVec2::new(5.5, 2.5));
        let mut director = director(Some(Duration::ZERO));
        let mut events = Vec::new();

        director.handle(&mut level, tick, tick, &mut events);
        assert_eq!(director.state(), MonsterState::CaughtPlayer);

        level.despawn_monster();
        let _ = level.set_player_position(DVec2::new(0.5, 7.5));
        director.handle(&mut level, tick * 2, tick, &mut events);

        assert_eq!(level.monster_coords(), Some(Tile::new(5, 2)));
        assert_ne!(director.state(), MonsterState::CaughtPlayer);
    }

    #[test]
    fn despawned_monster_returns_to_unspawned() {
        let mut level = hall(Some(0.0));
        let mut director = director(Some(Duration::ZERO));
        let mut events = Vec::new();
        let tick = Duration::from_secs(1);

        director.handle(&mut level, tick, tick, &mut events);
        level.despawn_monster();
        director.handle(&mut level, tick, Duration::ZERO, &mut events);

        assert_eq!(director.state(), MonsterState::Unspawned);
    }
}
