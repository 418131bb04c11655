#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative level state for Maze Hunt.
//!
//! A [`Level`] owns the tile grid together with every piece of mutable
//! state a round needs: the player's continuous position, the live pickup
//! sets, player flags, the player-placed wall and the monster. Geometry is
//! validated once when the level is built from [`LevelData`]; afterwards
//! movement that cannot happen is a silent no-op rather than an error.

mod data;
mod scores;

pub use data::{
    load_levels, parse_levels, save_levels, DecorationData, LevelData, LevelFileError,
};
pub use scores::{load_high_scores, save_high_scores, HighScore, HighScores};

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    time::Duration,
};

use maze_hunt_core::{
    DVec2, DecorationId, Direction, GridTile, LevelEvent, TextureId, Tile, TileFlags, WallTile,
};
use rand::{seq::SliceRandom, Rng};

/// Named level features that must occupy an open, in-bounds tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feature {
    /// Where the player begins the level.
    StartPoint,
    /// Where the player exits the level.
    EndPoint,
    /// Where the monster spawns.
    MonsterStart,
    /// An exit key.
    Key,
    /// A key sensor pickup.
    KeySensor,
    /// A gun pickup.
    Gun,
    /// A decoration sprite.
    Decoration,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StartPoint => "start point",
            Self::EndPoint => "end point",
            Self::MonsterStart => "monster start",
            Self::Key => "key",
            Self::KeySensor => "key sensor",
            Self::Gun => "gun",
            Self::Decoration => "decoration",
        };
        f.write_str(name)
    }
}

/// Reasons a level description cannot be turned into a playable [`Level`].
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// One of the dimensions is zero.
    #[error("level dimensions must be at least 1x1, got {columns}x{rows}")]
    EmptyGrid {
        /// Declared column count.
        columns: u32,
        /// Declared row count.
        rows: u32,
    },
    /// The wall map does not match the declared dimensions.
    #[error("wall map must be {columns}x{rows} tiles")]
    WallMapShape {
        /// Declared column count.
        columns: u32,
        /// Declared row count.
        rows: u32,
    },
    /// The collision map does not match the declared dimensions.
    #[error("collision map must be {columns}x{rows} tiles")]
    CollisionMapShape {
        /// Declared column count.
        columns: u32,
        /// Declared row count.
        rows: u32,
    },
    /// A feature lies outside the grid.
    #[error("out of bounds {feature} coordinates {tile}")]
    OutOfBounds {
        /// Feature that was misplaced.
        feature: Feature,
        /// Offending coordinates.
        tile: Tile,
    },
    /// A feature lies on a wall tile.
    #[error("{feature} cannot be inside wall at {tile}")]
    InsideWall {
        /// Feature that was misplaced.
        feature: Feature,
        /// Offending coordinates.
        tile: Tile,
    },
    /// The monster wait is negative or not a number.
    #[error("monster wait must be a non-negative number of seconds, got {0}")]
    InvalidMonsterWait(f64),
}

/// Error returned when a tile query falls outside the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("tile {tile} lies outside the {columns}x{rows} grid")]
pub struct OutOfBounds {
    /// Tile that was queried.
    pub tile: Tile,
    /// Number of columns in the grid.
    pub columns: u32,
    /// Number of rows in the grid.
    pub rows: u32,
}

/// Switches that shape a single player movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveOptions {
    /// The player already carries a gun, so guns are left in place.
    pub has_gun: bool,
    /// Pickups on the destination tile are collected.
    pub collect_items: bool,
    /// Tiles flagged `player_collide` reject the move.
    pub collision: bool,
    /// Walking into the monster ends the round.
    pub monster_kills: bool,
}

impl Default for MoveOptions {
    fn default() -> Self {
        Self {
            has_gun: false,
            collect_items: true,
            collision: true,
            monster_kills: true,
        }
    }
}

/// A single playable maze level.
#[derive(Clone, Debug, PartialEq)]
pub struct Level {
    columns: u32,
    rows: u32,
    tiles: Vec<GridTile>,
    start_point: Tile,
    end_point: Tile,
    original_exit_keys: BTreeSet<Tile>,
    exit_keys: BTreeSet<Tile>,
    original_key_sensors: BTreeSet<Tile>,
    key_sensors: BTreeSet<Tile>,
    original_guns: BTreeSet<Tile>,
    guns: BTreeSet<Tile>,
    decorations: BTreeMap<Tile, DecorationId>,
    edge_wall_texture: TextureId,
    monster_start: Option<Tile>,
    monster_wait: Option<Duration>,
    player_coords: DVec2,
    player_tile: Tile,
    player_flags: BTreeSet<Tile>,
    player_wall: Option<Tile>,
    monster_coords: Option<Tile>,
    last_monster_tile: Option<Tile>,
    won: bool,
    killed: bool,
}

impl Level {
    /// Number of columns in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Reports whether the tile lies inside the grid.
    #[must_use]
    pub const fn is_in_bounds(&self, tile: Tile) -> bool {
        tile.column() < self.columns && tile.row() < self.rows
    }

    /// Reports whether a continuous point lies inside `[0, W) x [0, H)`.
    #[must_use]
    pub fn contains_point(&self, point: DVec2) -> bool {
        point.x >= 0.0
            && point.y >= 0.0
            && point.x < f64::from(self.columns)
            && point.y < f64::from(self.rows)
    }

    /// Tile containing the point when the point lies inside the grid.
    #[must_use]
    pub fn tile_at(&self, point: DVec2) -> Option<Tile> {
        if self.contains_point(point) {
            Tile::containing(point)
        } else {
            None
        }
    }

    /// Full tile record, if the tile lies inside the grid.
    #[must_use]
    pub fn grid_tile(&self, tile: Tile) -> Option<&GridTile> {
        self.index(tile).and_then(|index| self.tiles.get(index))
    }

    /// Wall geometry of the tile.
    pub fn tile(&self, tile: Tile) -> Result<WallTile, OutOfBounds> {
        self.grid_tile(tile)
            .map(|grid_tile| grid_tile.wall)
            .ok_or_else(|| self.out_of_bounds(tile))
    }

    /// Collision and presence flags of the tile.
    pub fn flags(&self, tile: Tile) -> Result<TileFlags, OutOfBounds> {
        self.grid_tile(tile)
            .map(|grid_tile| grid_tile.flags)
            .ok_or_else(|| self.out_of_bounds(tile))
    }

    /// Tile where the player starts.
    #[must_use]
    pub const fn start_point(&self) -> Tile {
        self.start_point
    }

    /// Tile the player must reach once every key is collected.
    #[must_use]
    pub const fn end_point(&self) -> Tile {
        self.end_point
    }

    /// Keys that have not been collected yet.
    #[must_use]
    pub const fn exit_keys(&self) -> &BTreeSet<Tile> {
        &self.exit_keys
    }

    /// Every key the level was designed with.
    #[must_use]
    pub const fn original_exit_keys(&self) -> &BTreeSet<Tile> {
        &self.original_exit_keys
    }

    /// Key sensors that have not been collected yet.
    #[must_use]
    pub const fn key_sensors(&self) -> &BTreeSet<Tile> {
        &self.key_sensors
    }

    /// Every key sensor the level was designed with.
    #[must_use]
    pub const fn original_key_sensors(&self) -> &BTreeSet<Tile> {
        &self.original_key_sensors
    }

    /// Guns that have not been collected yet.
    #[must_use]
    pub const fn guns(&self) -> &BTreeSet<Tile> {
        &self.guns
    }

    /// Every gun the level was designed with.
    #[must_use]
    pub const fn original_guns(&self) -> &BTreeSet<Tile> {
        &self.original_guns
    }

    /// Decoration sprites keyed by tile.
    #[must_use]
    pub const fn decorations(&self) -> &BTreeMap<Tile, DecorationId> {
        &self.decorations
    }

    /// Texture used when the maze edge is drawn as a wall.
    #[must_use]
    pub const fn edge_wall_texture(&self) -> TextureId {
        self.edge_wall_texture
    }

    /// Tile the monster spawns on, if the level has a monster.
    #[must_use]
    pub const fn monster_start(&self) -> Option<Tile> {
        self.monster_start
    }

    /// Level time that must elapse before the monster spawns.
    #[must_use]
    pub const fn monster_wait(&self) -> Option<Duration> {
        self.monster_wait
    }

    /// Continuous position of the player measured in tiles.
    #[must_use]
    pub const fn player_coords(&self) -> DVec2 {
        self.player_coords
    }

    /// Tile currently occupied by the player.
    #[must_use]
    pub const fn player_grid_coords(&self) -> Tile {
        self.player_tile
    }

    /// Tiles the player has marked with a flag.
    #[must_use]
    pub const fn player_flags(&self) -> &BTreeSet<Tile> {
        &self.player_flags
    }

    /// Tile blocked by the player-placed wall, if one stands.
    #[must_use]
    pub const fn player_wall(&self) -> Option<Tile> {
        self.player_wall
    }

    /// Tile occupied by the monster once it has spawned.
    #[must_use]
    pub const fn monster_coords(&self) -> Option<Tile> {
        self.monster_coords
    }

    /// Tile the monster left on its most recent move.
    #[must_use]
    pub const fn last_monster_tile(&self) -> Option<Tile> {
        self.last_monster_tile
    }

    /// Whether the player has reached the exit with every key.
    #[must_use]
    pub const fn won(&self) -> bool {
        self.won
    }

    /// Whether the monster has caught the player.
    #[must_use]
    pub const fn killed(&self) -> bool {
        self.killed
    }

    /// Moves the player by `delta`, collecting pickups and resolving the
    /// win and capture checks on the destination tile.
    ///
    /// Moves that would leave the grid, or enter a `player_collide` tile
    /// while collision is enabled, leave the level untouched.
    pub fn move_player(&mut self, delta: DVec2, options: MoveOptions) -> BTreeSet<LevelEvent> {
        let mut events = BTreeSet::new();
        if self.won || self.killed {
            return events;
        }

        let target = self.player_coords + delta;
        let Some(tile) = self.tile_at(target) else {
            return events;
        };
        if options.collision && self.player_blocked(tile) {
            return events;
        }

        self.player_coords = target;
        self.player_tile = tile;

        if options.collect_items {
            events.extend(self.collect_items(tile, options.has_gun));
        }
        if self.monster_coords == Some(tile) {
            let _ = events.insert(LevelEvent::MonsterCaught);
            if options.monster_kills {
                self.killed = true;
            }
        }
        if !self.killed && tile == self.end_point && self.exit_keys.is_empty() {
            self.won = true;
        }
        events
    }

    /// Collects every live pickup on the tile. Guns stay put when the
    /// collector already carries one.
    pub fn collect_items(&mut self, tile: Tile, has_gun: bool) -> BTreeSet<LevelEvent> {
        let mut events = BTreeSet::new();
        if self.exit_keys.remove(&tile) {
            let _ = events.insert(LevelEvent::PickedUpKey);
            let _ = events.insert(LevelEvent::Pickup);
        }
        if self.key_sensors.remove(&tile) {
            let _ = events.insert(LevelEvent::PickedUpKeySensor);
            let _ = events.insert(LevelEvent::Pickup);
        }
        if !has_gun && self.guns.remove(&tile) {
            let _ = events.insert(LevelEvent::PickedUpGun);
            let _ = events.insert(LevelEvent::Pickup);
        }
        events
    }

    /// Teleports the player to `point` without collision or pickups.
    ///
    /// Returns `false` and leaves the player in place when the point lies
    /// outside the grid.
    pub fn set_player_position(&mut self, point: DVec2) -> bool {
        match self.tile_at(point) {
            Some(tile) => {
                self.player_coords = point;
                self.player_tile = tile;
                true
            }
            None => false,
        }
    }

    /// Advances the monster by one tick and reports whether it now shares
    /// the player's tile.
    ///
    /// An unspawned monster only appears, at its start tile, when
    /// `force_spawn` is set. A spawned monster with line of sight takes one
    /// step toward the player; otherwise it tries the four cardinal
    /// neighbours in a random order and takes the first one it may enter,
    /// refusing to step straight back onto the tile it just left.
    pub fn move_monster<R: Rng + ?Sized>(&mut self, force_spawn: bool, rng: &mut R) -> bool {
        let Some(spawn) = self.monster_start else {
            return false;
        };
        let Some(current) = self.monster_coords else {
            if !force_spawn {
                return false;
            }
            self.monster_coords = Some(spawn);
            self.last_monster_tile = None;
            return self.monster_on_player();
        };

        let next = if self.monster_line_of_sight() {
            Some(step_toward(current, self.player_tile))
        } else {
            self.wander_target(current, rng)
        };

        match next {
            Some(tile) if tile != current => {
                self.last_monster_tile = Some(current);
                self.monster_coords = Some(tile);
            }
            // A cornered monster forgets where it came from so it can
            // backtrack on the next tick.
            _ => self.last_monster_tile = None,
        }
        self.monster_on_player()
    }

    /// Whether the monster and player share a row or column with no
    /// `monster_collide` tile strictly between them.
    #[must_use]
    pub fn monster_line_of_sight(&self) -> bool {
        let Some(monster) = self.monster_coords else {
            return false;
        };
        let player = self.player_tile;

        if monster.column() == player.column() {
            let (low, high) = ordered(monster.row(), player.row());
            (low + 1..high).all(|row| !self.monster_blocked(Tile::new(monster.column(), row)))
        } else if monster.row() == player.row() {
            let (low, high) = ordered(monster.column(), player.column());
            (low + 1..high).all(|column| !self.monster_blocked(Tile::new(column, monster.row())))
        } else {
            false
        }
    }

    /// Removes the monster from the grid. It respawns at its start tile the
    /// next time it is force-spawned.
    pub fn despawn_monster(&mut self) {
        self.monster_coords = None;
        self.last_monster_tile = None;
    }

    /// Marks the player as caught by the monster.
    pub fn mark_killed(&mut self) {
        self.killed = true;
    }

    /// Places or removes a flag on the tile and reports whether the tile is
    /// now flagged.
    pub fn toggle_flag(&mut self, tile: Tile) -> Result<bool, OutOfBounds> {
        if !self.is_in_bounds(tile) {
            return Err(self.out_of_bounds(tile));
        }
        if self.player_flags.remove(&tile) {
            Ok(false)
        } else {
            let _ = self.player_flags.insert(tile);
            Ok(true)
        }
    }

    /// Raises a temporary wall on an empty tile.
    ///
    /// The tile must be in bounds, carry no geometry or flags, and be free
    /// of both the player and the monster. Only one player wall may stand at
    /// a time.
    pub fn place_player_wall(&mut self, tile: Tile) -> bool {
        if self.player_wall.is_some()
            || tile == self.player_tile
            || self.monster_coords == Some(tile)
        {
            return false;
        }
        let Some(index) = self.index(tile) else {
            return false;
        };
        let Some(grid_tile) = self.tiles.get_mut(index) else {
            return false;
        };
        if grid_tile.wall.is_wall() || grid_tile.flags != TileFlags::CLEAR {
            return false;
        }
        grid_tile.flags = TileFlags::SOLID;
        self.player_wall = Some(tile);
        true
    }

    /// Tears down the player-placed wall, returning the tile it stood on.
    pub fn remove_player_wall(&mut self) -> Option<Tile> {
        let tile = self.player_wall.take()?;
        if let Some(grid_tile) = self.index(tile).and_then(|index| self.tiles.get_mut(index)) {
            grid_tile.flags = TileFlags::CLEAR;
        }
        Some(tile)
    }

    /// Restores every live field to its designed state. Grid geometry is
    /// left untouched.
    pub fn reset(&mut self) {
        let _ = self.remove_player_wall();
        self.exit_keys = self.original_exit_keys.clone();
        self.key_sensors = self.original_key_sensors.clone();
        self.guns = self.original_guns.clone();
        self.player_coords = self.start_point.center();
        self.player_tile = self.start_point;
        self.player_flags.clear();
        self.monster_coords = None;
        self.last_monster_tile = None;
        self.won = false;
        self.killed = false;
    }

    fn index(&self, tile: Tile) -> Option<usize> {
        if !self.is_in_bounds(tile) {
            return None;
        }
        let row = usize::try_from(tile.row()).ok()?;
        let column = usize::try_from(tile.column()).ok()?;
        let columns = usize::try_from(self.columns).ok()?;
        Some(row * columns + column)
    }

    fn out_of_bounds(&self, tile: Tile) -> OutOfBounds {
        OutOfBounds {
            tile,
            columns: self.columns,
            rows: self.rows,
        }
    }

    fn player_blocked(&self, tile: Tile) -> bool {
        self.grid_tile(tile)
            .map_or(true, |grid_tile| grid_tile.flags.player_collide)
    }

    fn monster_blocked(&self, tile: Tile) -> bool {
        self.grid_tile(tile)
            .map_or(true, |grid_tile| grid_tile.flags.monster_collide)
    }

    fn monster_on_player(&self) -> bool {
        self.monster_coords == Some(self.player_tile)
    }

    fn wander_target<R: Rng + ?Sized>(&self, current: Tile, rng: &mut R) -> Option<Tile> {
        let mut directions = Direction::ALL;
        directions.shuffle(rng);
        directions
            .into_iter()
            .filter_map(|direction| current.step(direction))
            .find(|&candidate| {
                !self.monster_blocked(candidate) && Some(candidate) != self.last_monster_tile
            })
    }
}

impl fmt::Display for Level {
    /// Renders the grid two characters per tile: `██` walls, `PP` the
    /// player, `MM` the monster, `KK` keys, `SS` the start and `EE` the end.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.rows {
            if row > 0 {
                writeln!(f)?;
            }
            for column in 0..self.columns {
                let tile = Tile::new(column, row);
                let glyph = if tile == self.player_tile {
                    "PP"
                } else if self.monster_coords == Some(tile) {
                    "MM"
                } else if self.exit_keys.contains(&tile) {
                    "KK"
                } else if tile == self.start_point {
                    "SS"
                } else if tile == self.end_point {
                    "EE"
                } else if self.grid_tile(tile).is_some_and(GridTile::blocks_sight) {
                    "██"
                } else {
                    "  "
                };
                f.write_str(glyph)?;
            }
        }
        Ok(())
    }
}

fn ordered(a: u32, b: u32) -> (u32, u32) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn step_toward(from: Tile, to: Tile) -> Tile {
    if from.column() == to.column() {
        match from.row().cmp(&to.row()) {
            std::cmp::Ordering::Less => Tile::new(from.column(), from.row() + 1),
            std::cmp::Ordering::Greater => Tile::new(from.column(), from.row() - 1),
            std::cmp::Ordering::Equal => from,
        }
    } else if from.column() < to.column() {
        Tile::new(from.column() + 1, from.row())
    } else {
        Tile::new(from.column() - 1, from.row())
    }
}
