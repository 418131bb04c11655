#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-level round state layered over the authoritative [`Level`].
//!
//! A [`LevelSession`] owns one level together with everything a round
//! accumulates around it: the time and move scores, the compass, the key
//! sensor reveal, gun ownership, the player-placed wall lifecycle and the
//! monster director. Each level gets its own session, so switching levels
//! never mixes up timers.
//!
//! A monster catch does not end the round outright. The player is held in
//! place and must press the escape key enough times before the level's
//! escape time runs out; that time is shared by every catch in the round.

mod compass;

pub use compass::Compass;

use std::{collections::BTreeSet, time::Duration};

use maze_hunt_core::{seconds, DVec2, GameConfig, LevelEvent, SpriteKind, Tile};
use maze_hunt_system_monster::{
    Config as DirectorConfig, MonsterDirector, MonsterEvent, MonsterState,
};
use maze_hunt_system_raycast::hit_scan;
use maze_hunt_world::{HighScores, Level, MoveOptions};

/// Outcome of pulling the trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShotOutcome {
    /// No gun is carried, the monster holds the player or the round is over.
    NoGun,
    /// The shot hit nothing that can be hurt.
    Missed,
    /// The monster was hit and removed from the grid.
    HitMonster,
}

/// Outcome of pressing the escape key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EscapeProgress {
    /// The monster is not holding the player.
    NotCaught,
    /// Still held; `remaining` more presses are needed.
    Struggling {
        /// Presses left before breaking free.
        remaining: u32,
    },
    /// The player broke free and the monster was driven off the grid.
    Escaped,
}

/// One round on one level.
#[derive(Debug)]
pub struct LevelSession {
    level: Level,
    options: MoveOptions,
    monster_kills: bool,
    presses_to_escape: u32,
    time_to_escape: Duration,
    spot_timeout: Duration,
    key_sensor_time: Duration,
    player_wall_time: Duration,
    player_wall_cooldown: Duration,
    director: MonsterDirector,
    compass: Compass,
    time_score: Duration,
    move_score: f64,
    has_started: bool,
    has_gun: bool,
    key_sensor_remaining: Duration,
    wall_cooldown_remaining: Duration,
    wall_placed_at: Option<Duration>,
    escape_presses: Option<u32>,
    escape_remaining: Duration,
    since_spotted: Duration,
}

impl LevelSession {
    /// Starts a fresh round on `level`; `rng_seed` drives the monster.
    #[must_use]
    pub fn new(level: Level, config: &GameConfig, rng_seed: u64) -> Self {
        let director = MonsterDirector::new(DirectorConfig::for_level(config, &level, rng_seed));
        Self {
            level,
            options: MoveOptions {
                has_gun: false,
                collect_items: true,
                collision: config.enable_collision,
                monster_kills: false,
            },
            monster_kills: config.enable_monster_killing,
            presses_to_escape: config.monster_presses_to_escape,
            time_to_escape: seconds(config.monster_time_to_escape),
            spot_timeout: seconds(config.monster_spot_timeout),
            key_sensor_time: seconds(config.key_sensor_time),
            player_wall_time: seconds(config.player_wall_time),
            player_wall_cooldown: seconds(config.player_wall_cooldown),
            director,
            compass: Compass::new(config),
            time_score: Duration::ZERO,
            move_score: 0.0,
            has_started: false,
            has_gun: false,
            key_sensor_remaining: Duration::ZERO,
            wall_cooldown_remaining: Duration::ZERO,
            wall_placed_at: None,
            escape_presses: None,
            escape_remaining: seconds(config.monster_time_to_escape),
            since_spotted: seconds(config.monster_spot_timeout),
        }
    }

    /// Level being played.
    #[must_use]
    pub const fn level(&self) -> &Level {
        &self.level
    }

    /// Time played since the player first moved.
    #[must_use]
    pub const fn time_score(&self) -> Duration {
        self.time_score
    }

    /// Distance walked, in tiles.
    #[must_use]
    pub const fn move_score(&self) -> f64 {
        self.move_score
    }

    /// Whether the player has tried to move since the round began.
    #[must_use]
    pub const fn has_started(&self) -> bool {
        self.has_started
    }

    /// Whether the player carries a loaded gun.
    #[must_use]
    pub const fn has_gun(&self) -> bool {
        self.has_gun
    }

    /// Whether keys are currently revealed by a key sensor.
    #[must_use]
    pub fn keys_revealed(&self) -> bool {
        !self.key_sensor_remaining.is_zero()
    }

    /// Time before another wall may be placed.
    #[must_use]
    pub const fn wall_cooldown(&self) -> Duration {
        self.wall_cooldown_remaining
    }

    /// How far the standing player wall is through its lifetime, from 0 to 1.
    #[must_use]
    pub fn player_wall_wear(&self) -> Option<f64> {
        let placed_at = self.wall_placed_at?;
        if self.player_wall_time.is_zero() {
            return Some(1.0);
        }
        let age = self.time_score.saturating_sub(placed_at);
        Some((age.as_secs_f64() / self.player_wall_time.as_secs_f64()).min(1.0))
    }

    /// The compass.
    #[must_use]
    pub const fn compass(&self) -> &Compass {
        &self.compass
    }

    /// Unit vector from the player towards the monster while the compass
    /// can be used.
    #[must_use]
    pub fn compass_bearing(&self) -> Option<DVec2> {
        if !self.compass.is_usable() {
            return None;
        }
        let monster = self.level.monster_coords()?;
        (monster.center() - self.level.player_coords()).try_normalize()
    }

    /// Current monster behaviour.
    #[must_use]
    pub const fn monster_state(&self) -> MonsterState {
        self.director.state()
    }

    /// Whether the lights are dimmed by a monster flicker.
    #[must_use]
    pub fn lights_flickering(&self) -> bool {
        self.director.lights_flickering()
    }

    /// Whether the monster is holding the player.
    #[must_use]
    pub const fn is_escaping(&self) -> bool {
        self.escape_presses.is_some()
    }

    /// Escape presses made since the current catch.
    #[must_use]
    pub const fn escape_presses(&self) -> Option<u32> {
        self.escape_presses
    }

    /// Escape time left for the rest of the round.
    #[must_use]
    pub const fn escape_time_remaining(&self) -> Duration {
        self.escape_remaining
    }

    /// Moves the player by `delta`, applying pickups to the session.
    ///
    /// Any attempt to move starts the round clock, even one that is
    /// blocked. A player held by the monster cannot move.
    pub fn move_player(&mut self, delta: DVec2) -> BTreeSet<LevelEvent> {
        if self.level.won() || self.level.killed() || self.is_escaping() {
            return BTreeSet::new();
        }
        self.has_started = true;

        let before = self.level.player_coords();
        let options = MoveOptions {
            has_gun: self.has_gun,
            ..self.options
        };
        let events = self.level.move_player(delta, options);
        self.move_score += before.distance(self.level.player_coords());

        if events.contains(&LevelEvent::PickedUpKeySensor) {
            self.key_sensor_remaining = self.key_sensor_time;
        }
        if events.contains(&LevelEvent::PickedUpGun) {
            self.has_gun = true;
        }
        if events.contains(&LevelEvent::MonsterCaught) {
            self.caught();
        }
        events
    }

    /// Counts one press of the escape key while the monster holds the
    /// player. Enough presses free the player and remove the monster, which
    /// later respawns at its start tile.
    pub fn press_escape(&mut self) -> EscapeProgress {
        let Some(presses) = self.escape_presses else {
            return EscapeProgress::NotCaught;
        };
        let presses = presses.saturating_add(1);
        if presses >= self.presses_to_escape {
            self.escape_presses = None;
            self.level.despawn_monster();
            return EscapeProgress::Escaped;
        }
        self.escape_presses = Some(presses);
        EscapeProgress::Struggling {
            remaining: self.presses_to_escape - presses,
        }
    }

    /// Reports that the monster was drawn on screen.
    ///
    /// Returns `true` for a fresh sighting, one that follows at least the
    /// spot timeout with the monster out of view.
    pub fn spot_monster(&mut self) -> bool {
        if self.level.monster_coords().is_none() {
            return false;
        }
        let fresh = self.since_spotted >= self.spot_timeout;
        self.since_spotted = Duration::ZERO;
        fresh
    }

    /// Records the round's scores in `scores` under `index` once the level
    /// is won. Returns whether a record was beaten.
    pub fn record_win(&self, scores: &mut HighScores, index: usize) -> bool {
        self.level.won() && scores.record(index, self.time_score, self.move_score)
    }

    /// Raises the player wall on the tile in front of the player.
    ///
    /// `facing` is rounded to the nearest grid offset. Only one wall may
    /// stand at a time, none may be placed during the cooldown that follows
    /// a wall breaking, and the round must have started.
    pub fn place_wall(&mut self, facing: DVec2) -> bool {
        if self.wall_placed_at.is_some()
            || !self.wall_cooldown_remaining.is_zero()
            || !self.has_started
        {
            return false;
        }
        let Some(target) = offset_tile(self.level.player_grid_coords(), facing.round()) else {
            return false;
        };
        if !self.level.place_player_wall(target) {
            return false;
        }
        self.wall_placed_at = Some(self.time_score);
        true
    }

    /// Fires the gun along `facing`, removing the monster if the shot
    /// reaches it before a wall.
    ///
    /// The single shot is spent whether or not it hits.
    pub fn fire_gun(&mut self, facing: DVec2) -> ShotOutcome {
        if !self.has_gun || self.is_escaping() || self.level.won() || self.level.killed() {
            return ShotOutcome::NoGun;
        }
        self.has_gun = false;

        let hit = hit_scan(&self.level, self.level.player_coords(), facing, &[], |sprite| {
            sprite.kind == SpriteKind::Monster
        });
        if hit.is_some() {
            self.level.despawn_monster();
            ShotOutcome::HitMonster
        } else {
            ShotOutcome::Missed
        }
    }

    /// Toggles a flag on the tile, ignoring tiles outside the grid.
    pub fn toggle_flag(&mut self, tile: Tile) -> bool {
        self.level.toggle_flag(tile).unwrap_or(false)
    }

    /// Advances every timer by `dt`.
    ///
    /// Nothing runs until the player has started moving, nor after the
    /// round was won or lost. While the monster holds the player it stays
    /// put and the escape time drains; the player dies when it runs out.
    pub fn tick(&mut self, dt: Duration, compass_shown: bool, out: &mut Vec<MonsterEvent>) {
        if !self.has_started || self.level.won() || self.level.killed() {
            return;
        }
        self.time_score = self.time_score.saturating_add(dt);
        self.key_sensor_remaining = self.key_sensor_remaining.saturating_sub(dt);
        self.wall_cooldown_remaining = self.wall_cooldown_remaining.saturating_sub(dt);
        self.since_spotted = self.since_spotted.saturating_add(dt).min(self.spot_timeout);

        if let Some(placed_at) = self.wall_placed_at {
            if self.time_score >= placed_at.saturating_add(self.player_wall_time) {
                let _ = self.level.remove_player_wall();
                self.wall_placed_at = None;
                self.wall_cooldown_remaining = self.player_wall_cooldown;
            }
        }

        let monster_present = self.level.monster_coords().is_some();
        self.compass.update(compass_shown, monster_present, dt);

        if self.is_escaping() {
            self.escape_remaining = self.escape_remaining.saturating_sub(dt);
            if self.escape_remaining.is_zero() {
                self.escape_presses = None;
                self.level.mark_killed();
            }
            return;
        }

        let first = out.len();
        self.director.handle(&mut self.level, self.time_score, dt, out);
        let caught = out[first..]
            .iter()
            .any(|event| matches!(event, MonsterEvent::CaughtPlayer { .. }));
        if caught {
            self.caught();
        }
    }

    fn caught(&mut self) {
        if self.monster_kills && self.escape_presses.is_none() {
            self.escape_presses = Some(0);
        }
    }

    /// Restarts the round: the level, the monster and every timer.
    pub fn reset(&mut self) {
        self.level.reset();
        self.director.reset();
        self.compass.reset();
        self.time_score = Duration::ZERO;
        self.move_score = 0.0;
        self.has_started = false;
        self.has_gun = false;
        self.key_sensor_remaining = Duration::ZERO;
        self.wall_cooldown_remaining = Duration::ZERO;
        self.wall_placed_at = None;
        self.escape_presses = None;
        self.escape_remaining = self.time_to_escape;
        self.since_spotted = self.spot_timeout;
    }
}

fn offset_tile(tile: Tile, offset: DVec2) -> Option<Tile> {
    let column = i64::from(tile.column()) + offset.x as i64;
    let row = i64::from(tile.row()) + offset.y as i64;
    Some(Tile::new(
        u32::try_from(column).ok()?,
        u32::try_from(row).ok()?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_hunt_core::TextureId;
    use maze_hunt_world::LevelData;

    fn data() -> LevelData {
        LevelData {
            dimensions: [6, 6],
            wall_map: vec![vec![None; 6]; 6],
            collision_map: None,
            start_point: Tile::new(1, 1),
            end_point: Tile::new(5, 5),
            exit_keys: vec![Tile::new(2, 1)],
            key_sensors: vec![Tile::new(1, 2)],
            guns: vec![Tile::new(1, 3)],
            decorations: Vec::new(),
            monster_start: Some(Tile::new(1, 5)),
            monster_wait: Some(0.0),
            edge_wall_texture: TextureId::new(0),
        }
    }

    fn session() -> LevelSession {
        let level = Level::from_data(data()).expect("valid level");
        LevelSession::new(level, &GameConfig::default(), 3)
    }

    #[test]
    fn clock_waits_for_the_first_move() {
        let mut session = session();
        let mut events = Vec::new();

        session.tick(Duration::from_secs(5), false, &mut events);
        assert_eq!(session.time_score(), Duration::ZERO);

        let _ = session.move_player(DVec2::new(0.5, 0.0));
        session.tick(Duration::from_secs(1), false, &mut events);

        assert!(session.has_started());
        assert_eq!(session.time_score(), Duration::from_secs(1));
        assert!((session.move_score() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn key_sensor_reveals_keys_for_a_while() {
        let mut session = session();
        let mut events = Vec::new();

        let picked = session.move_player(DVec2::new(0.0, 1.0));
        assert!(picked.contains(&LevelEvent::PickedUpKeySensor));
        assert!(session.keys_revealed());

        session.tick(Duration::from_secs(9), false, &mut events);
        assert!(session.keys_revealed());
        session.tick(Duration::from_secs(1), false, &mut events);
        assert!(!session.keys_revealed());
    }

    #[test]
    fn player_wall_breaks_then_cools_down() {
        let mut session = session();
        let mut events = Vec::new();
        let east = DVec2::new(1.0, 0.0);

        assert!(!session.place_wall(east), "round has not started");
        let _ = session.move_player(DVec2::ZERO);
        assert!(session.place_wall(east));
        assert_eq!(session.level().player_wall(), Some(Tile::new(2, 1)));
        assert!(!session.place_wall(DVec2::new(0.0, -1.0)));

        session.tick(Duration::from_secs(15), false, &mut events);
        assert_eq!(session.level().player_wall(), None);
        assert_eq!(session.wall_cooldown(), Duration::from_secs(20));
        assert!(!session.place_wall(east));

        session.tick(Duration::from_secs(20), false, &mut events);
        assert!(session.place_wall(DVec2::new(0.0, -0.9)));
        assert_eq!(session.level().player_wall(), Some(Tile::new(1, 0)));
    }

    #[test]
    fn gun_shot_removes_the_monster_once() {
        let mut session = session();
        let mut events = Vec::new();

        assert_eq!(session.fire_gun(DVec2::new(0.0, 1.0)), ShotOutcome::NoGun);
        let _ = session.move_player(DVec2::new(0.0, 1.0));
        let picked = session.move_player(DVec2::new(0.0, 1.0));
        assert!(picked.contains(&LevelEvent::PickedUpGun));
        assert!(session.has_gun());

        session.tick(Duration::from_secs(1), false, &mut events);
        assert!(events.contains(&MonsterEvent::Spawned {
            tile: Tile::new(1, 5)
        }));

        assert_eq!(session.fire_gun(DVec2::new(0.0, 1.0)), ShotOutcome::HitMonster);
        assert_eq!(session.level().monster_coords(), None);
        assert!(!session.has_gun());
        assert_eq!(session.fire_gun(DVec2::new(0.0, 1.0)), ShotOutcome::NoGun);
    }

    #[test]
    fn compass_points_at_the_monster() {
        let mut session = session();
        let mut events = Vec::new();
        assert_eq!(session.compass_bearing(), None);

        let _ = session.move_player(DVec2::ZERO);
        session.tick(Duration::from_secs(1), true, &mut events);

        let bearing = session.compass_bearing().expect("monster spawned");
        assert!((bearing - DVec2::new(0.0, 1.0)).length() < 1e-9);
    }

    /// A session whose monster catches the player on the second tick.
    fn caught_session() -> LevelSession {
        let mut data = data();
        data.monster_start = Some(Tile::new(1, 2));
        data.key_sensors.clear();
        let level = Level::from_data(data).expect("valid level");
        let mut session = LevelSession::new(level, &GameConfig::default(), 3);
        let mut events = Vec::new();

        let _ = session.move_player(DVec2::ZERO);
        session.tick(Duration::from_secs(1), false, &mut events);
        session.tick(Duration::from_secs(1), false, &mut events);
        assert!(events.contains(&MonsterEvent::CaughtPlayer {
            tile: Tile::new(1, 1)
        }));
        session
    }

    #[test]
    fn caught_player_dies_when_escape_time_runs_out() {
        let mut session = caught_session();
        let mut events = Vec::new();

        assert!(session.is_escaping());
        assert!(!session.level().killed());
        assert!(session.move_player(DVec2::new(1.0, 0.0)).is_empty());
        assert_eq!(session.level().player_grid_coords(), Tile::new(1, 1));

        session.tick(Duration::from_secs(4), false, &mut events);
        assert!(!session.level().killed());
        session.tick(Duration::from_secs(1), false, &mut events);

        assert!(session.level().killed());
        assert!(!session.is_escaping());
        assert_eq!(session.press_escape(), EscapeProgress::NotCaught);

        session.reset();
        assert!(!session.level().killed());
        assert!(!session.has_started());
        assert_eq!(session.escape_time_remaining(), Duration::from_secs(5));
        assert_eq!(session.monster_state(), MonsterState::Unspawned);
    }

    #[test]
    fn mashing_escape_frees_the_player() {
        let mut session = caught_session();
        let mut events = Vec::new();

        for remaining in (1..10).rev() {
            assert_eq!(
                session.press_escape(),
                EscapeProgress::Struggling { remaining }
            );
        }
        assert_eq!(session.press_escape(), EscapeProgress::Escaped);

        assert!(!session.is_escaping());
        assert_eq!(session.level().monster_coords(), None);
        let _ = session.move_player(DVec2::new(1.0, 0.0));
        assert_eq!(session.level().player_grid_coords(), Tile::new(2, 1));

        session.tick(Duration::from_secs(1), false, &mut events);
        assert_eq!(session.level().monster_coords(), Some(Tile::new(1, 2)));
        assert!(!session.level().killed());
    }

    #[test]
    fn catches_while_held_do_not_restart_the_struggle() {
        let mut session = caught_session();
        let mut events = Vec::new();

        for _ in 0..3 {
            let _ = session.press_escape();
        }
        session.tick(Duration::from_secs(1), false, &mut events);
        let _ = session.move_player(DVec2::ZERO);
        session.tick(Duration::from_secs(1), false, &mut events);

        assert!(events.is_empty(), "the monster waits while holding the player");
        assert_eq!(session.escape_presses(), Some(3));
        assert_eq!(session.escape_time_remaining(), Duration::from_secs(3));
    }

    #[test]
    fn escape_time_is_shared_by_every_catch() {
        let mut session = caught_session();
        let mut events = Vec::new();

        session.tick(Duration::from_secs(3), false, &mut events);
        for _ in 0..10 {
            let _ = session.press_escape();
        }
        assert_eq!(session.escape_time_remaining(), Duration::from_secs(2));

        // The monster respawns next to the player and catches them again.
        session.tick(Duration::from_secs(1), false, &mut events);
        session.tick(Duration::from_secs(1), false, &mut events);
        assert!(session.is_escaping());
        session.tick(Duration::from_secs(2), false, &mut events);

        assert!(session.level().killed());
    }

    #[test]
    fn harmless_monster_never_holds_the_player() {
        let mut data = data();
        data.monster_start = Some(Tile::new(1, 2));
        data.key_sensors.clear();
        let level = Level::from_data(data).expect("valid level");
        let config = GameConfig {
            enable_monster_killing: false,
            ..GameConfig::default()
        };
        let mut session = LevelSession::new(level, &config, 3);
        let mut events = Vec::new();

        let _ = session.move_player(DVec2::ZERO);
        for _ in 0..4 {
            session.tick(Duration::from_secs(1), false, &mut events);
        }

        assert!(!session.is_escaping());
        assert!(!session.level().killed());
    }

    #[test]
    fn fresh_sightings_need_the_monster_out_of_view() {
        let mut session = session();
        let mut events = Vec::new();
        assert!(!session.spot_monster(), "no monster yet");

        let _ = session.move_player(DVec2::ZERO);
        session.tick(Duration::from_secs(1), false, &mut events);
        assert!(session.spot_monster());
        assert!(!session.spot_monster());

        session.tick(Duration::from_secs(9), false, &mut events);
        assert!(!session.spot_monster());
        session.tick(Duration::from_secs(10), false, &mut events);
        assert!(session.spot_monster());
    }

    #[test]
    fn nearby_monster_flickers_the_lights() {
        let mut data = data();
        data.monster_start = Some(Tile::new(2, 2));
        let level = Level::from_data(data).expect("valid level");
        let mut session = LevelSession::new(level, &GameConfig::default(), 3);
        let mut events = Vec::new();

        let _ = session.move_player(DVec2::ZERO);
        session.tick(Duration::from_secs(1), false, &mut events);

        let flickered = events
            .iter()
            .any(|event| matches!(event, MonsterEvent::LightsFlickered { .. }));
        assert!(flickered, "a monster one diagonal away always flickers");
        assert!(session.lights_flickering());
    }

    #[test]
    fn winning_records_high_scores() {
        let mut data = data();
        data.end_point = Tile::new(3, 1);
        data.monster_start = None;
        let level = Level::from_data(data).expect("valid level");
        let mut session = LevelSession::new(level, &GameConfig::default(), 3);
        let mut scores = HighScores::new(2);
        let mut events = Vec::new();

        assert!(!session.record_win(&mut scores, 1), "level not won yet");
        let _ = session.move_player(DVec2::new(1.0, 0.0));
        session.tick(Duration::from_secs(2), false, &mut events);
        let _ = session.move_player(DVec2::new(1.0, 0.0));
        assert!(session.level().won());

        assert!(session.record_win(&mut scores, 1));
        assert!(!session.record_win(&mut scores, 1));
        assert_eq!(scores.level(1).time, Some(2.0));
        assert_eq!(scores.level(1).moves, Some(2.0));
    }
}
