#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Maze Hunt engine.
//!
//! This crate defines the vocabulary that connects the authoritative level
//! state, the pure systems (raycasting, path finding, monster direction and
//! level sessions), the wire protocol and the adapters. Tiles are addressed
//! with [`Tile`], continuous positions are [`glam::DVec2`] values measured in
//! tiles, and every tile of the grid is a [`GridTile`] pairing wall geometry
//! with independent collision flags.

use std::{fmt, time::Duration};

pub use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Location of a single grid tile expressed as column and row coordinates.
///
/// Serialized as a compact `[column, row]` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct Tile {
    column: u32,
    row: u32,
}

impl Tile {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the tile (the `x` axis).
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the tile (the `y` axis).
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Tile containing the provided continuous point, if the point is not
    /// negative on either axis.
    #[must_use]
    pub fn containing(point: DVec2) -> Option<Self> {
        if !point.is_finite() || point.x < 0.0 || point.y < 0.0 {
            return None;
        }
        let floored = point.floor();
        if floored.x > f64::from(u32::MAX) || floored.y > f64::from(u32::MAX) {
            return None;
        }
        Some(Self::new(floored.x as u32, floored.y as u32))
    }

    /// Centre of the tile in continuous coordinates.
    #[must_use]
    pub fn center(self) -> DVec2 {
        DVec2::new(f64::from(self.column) + 0.5, f64::from(self.row) + 0.5)
    }

    /// Neighbouring tile one step in the provided direction.
    ///
    /// Returns `None` when the step would leave the non-negative quadrant;
    /// upper bounds are the caller's concern.
    #[must_use]
    pub fn step(self, direction: Direction) -> Option<Self> {
        match direction {
            Direction::North => self.row.checked_sub(1).map(|row| Self::new(self.column, row)),
            Direction::East => self
                .column
                .checked_add(1)
                .map(|column| Self::new(column, self.row)),
            Direction::South => self.row.checked_add(1).map(|row| Self::new(self.column, row)),
            Direction::West => self
                .column
                .checked_sub(1)
                .map(|column| Self::new(column, self.row)),
        }
    }

    /// Computes the Manhattan distance between two tiles.
    #[must_use]
    pub fn manhattan_distance(self, other: Tile) -> u32 {
        self.column.abs_diff(other.column) + self.row.abs_diff(other.row)
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

impl From<[u32; 2]> for Tile {
    fn from(value: [u32; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

impl From<Tile> for [u32; 2] {
    fn from(value: Tile) -> Self {
        [value.column, value.row]
    }
}

/// Cardinal directions on the grid. Also names the face of a wall tile that
/// a ray struck.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Toward decreasing row indices.
    North,
    /// Toward increasing column indices.
    East,
    /// Toward increasing row indices.
    South,
    /// Toward decreasing column indices.
    West,
}

impl Direction {
    /// All four cardinal directions in clockwise order starting north.
    pub const ALL: [Self; 4] = [Self::North, Self::East, Self::South, Self::West];

    /// Direction pointing the opposite way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }

    /// Whether this direction lies on the horizontal (column) axis.
    #[must_use]
    pub const fn is_east_west(self) -> bool {
        matches!(self, Self::East | Self::West)
    }
}

/// Identifier of a wall texture.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TextureId(u32);

impl TextureId {
    /// Creates a new texture identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a decoration sprite.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecorationId(u32);

impl DecorationId {
    /// Creates a new decoration identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Textures applied to each face of a wall tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WallTextures {
    /// Texture of the face looking toward decreasing rows.
    pub north: TextureId,
    /// Texture of the face looking toward increasing rows.
    pub south: TextureId,
    /// Texture of the face looking toward increasing columns.
    pub east: TextureId,
    /// Texture of the face looking toward decreasing columns.
    pub west: TextureId,
}

impl WallTextures {
    /// Uses the same texture on all four faces.
    #[must_use]
    pub const fn uniform(texture: TextureId) -> Self {
        Self {
            north: texture,
            south: texture,
            east: texture,
            west: texture,
        }
    }

    /// Texture applied to the provided face.
    #[must_use]
    pub const fn face(&self, side: Direction) -> TextureId {
        match side {
            Direction::North => self.north,
            Direction::South => self.south,
            Direction::East => self.east,
            Direction::West => self.west,
        }
    }

    /// Faces in `[north, south, east, west]` order, as stored in level files.
    #[must_use]
    pub const fn to_array(&self) -> [TextureId; 4] {
        [self.north, self.south, self.east, self.west]
    }
}

impl From<[TextureId; 4]> for WallTextures {
    fn from(value: [TextureId; 4]) -> Self {
        Self {
            north: value[0],
            south: value[1],
            east: value[2],
            west: value[3],
        }
    }
}

/// Permanent geometry of a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WallTile {
    /// No wall geometry.
    Open,
    /// Solid wall rendered with a texture per face.
    Wall {
        /// Textures for each face of the wall.
        textures: WallTextures,
    },
}

impl WallTile {
    /// Reports whether the tile carries permanent wall geometry.
    #[must_use]
    pub const fn is_wall(&self) -> bool {
        matches!(self, Self::Wall { .. })
    }
}

/// Attributes attached to every tile independently of its wall geometry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TileFlags {
    /// Something solid occupies the tile and stops rays, such as a
    /// player-placed temporary wall.
    ///
    /// Decorations never set it: [`GridTile::blocks_sight`] stops rays at
    /// any present tile, and decorations are billboards that rays must pass
    /// so the walls behind them still draw.
    pub presence: bool,
    /// The player cannot enter the tile.
    pub player_collide: bool,
    /// The monster cannot enter or see through the tile.
    pub monster_collide: bool,
}

impl TileFlags {
    /// Flags of an unobstructed tile.
    pub const CLEAR: Self = Self {
        presence: false,
        player_collide: false,
        monster_collide: false,
    };

    /// Flags of a tile that is fully solid.
    pub const SOLID: Self = Self {
        presence: true,
        player_collide: true,
        monster_collide: true,
    };
}

/// A single tile of the grid: geometry plus collision flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridTile {
    /// Permanent wall geometry.
    pub wall: WallTile,
    /// Independent presence and collision attributes.
    pub flags: TileFlags,
}

impl GridTile {
    /// An open tile with no collision.
    #[must_use]
    pub const fn open() -> Self {
        Self {
            wall: WallTile::Open,
            flags: TileFlags::CLEAR,
        }
    }

    /// A fully solid wall tile using the provided textures.
    #[must_use]
    pub const fn wall(textures: WallTextures) -> Self {
        Self {
            wall: WallTile::Wall { textures },
            flags: TileFlags::SOLID,
        }
    }

    /// Whether a ray travelling through the tile stops here.
    #[must_use]
    pub const fn blocks_sight(&self) -> bool {
        self.wall.is_wall() || self.flags.presence
    }
}

/// Events emitted by the level while the player moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LevelEvent {
    /// Emitted alongside every specific pickup event.
    Pickup,
    /// The player collected an exit key.
    PickedUpKey,
    /// The player collected a key sensor.
    PickedUpKeySensor,
    /// The player collected a gun.
    PickedUpGun,
    /// The player walked into the monster.
    MonsterCaught,
}

/// Kinds of billboard sprites the raycaster reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpriteKind {
    /// Exit point while keys remain uncollected.
    EndPoint,
    /// Exit point once every key has been collected.
    EndPointActive,
    /// An uncollected exit key.
    Key,
    /// The monster.
    Monster,
    /// The level's start point.
    StartPoint,
    /// A flag placed by the player.
    Flag,
    /// An uncollected key sensor.
    KeySensor,
    /// The monster's spawn point.
    MonsterSpawn,
    /// An uncollected gun.
    Gun,
    /// A level decoration.
    Decoration(DecorationId),
    /// Another networked player.
    OtherPlayer,
}

/// Typed configuration knobs consumed by the engine.
///
/// Durations are expressed in seconds. Every field has a default, so a
/// partially specified source only overrides what it names.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Width of the 3D viewport in pixels.
    pub viewport_width: u32,
    /// Height of the 3D viewport in pixels.
    pub viewport_height: u32,
    /// Number of rays cast per frame; defaults to the viewport width.
    pub display_columns: Option<u32>,
    /// Field of view expressed as the camera plane length times 100.
    pub display_fov: u32,
    /// Whether the maze edge is drawn as a wall instead of the horizon.
    pub draw_maze_edge_as_wall: bool,
    /// Turn speed in radians per second.
    pub turn_speed: f64,
    /// Move speed in tiles per second.
    pub move_speed: f64,
    /// Multiplier applied while running.
    pub run_multiplier: f64,
    /// Multiplier applied while crawling.
    pub crawl_multiplier: f64,
    /// Whether the monster spawns at all.
    pub monster_enabled: bool,
    /// Overrides every level's monster wait when set.
    pub monster_start_override: Option<f64>,
    /// Seconds between monster movements.
    pub monster_movement_wait: f64,
    /// Whether lights flicker as the monster approaches.
    pub monster_flicker_lights: bool,
    /// Seconds the monster must stay out of view before seeing it again
    /// counts as a fresh sighting.
    pub monster_spot_timeout: f64,
    /// Seconds per level the player may spend struggling free of the monster.
    pub monster_time_to_escape: f64,
    /// Key presses needed to break free once caught.
    pub monster_presses_to_escape: u32,
    /// Seconds the compass can be used before burning out.
    pub compass_time: f64,
    /// Recharge time multiplier while not burned out.
    pub compass_charge_norm_multiplier: f64,
    /// Recharge time multiplier once burned out.
    pub compass_charge_burn_multiplier: f64,
    /// Seconds after putting the compass away before it recharges.
    pub compass_charge_delay: f64,
    /// Seconds keys stay revealed after collecting a key sensor.
    pub key_sensor_time: f64,
    /// Seconds before a player-placed wall breaks.
    pub player_wall_time: f64,
    /// Seconds after a wall breaks before another can be placed.
    pub player_wall_cooldown: f64,
    /// Frames per second cap.
    pub frame_rate_limit: u32,
    /// Width of every texture in pixels.
    pub texture_width: u32,
    /// Height of every texture in pixels.
    pub texture_height: u32,
    /// Whether the player collides with walls.
    pub enable_collision: bool,
    /// Whether the monster can kill the player.
    pub enable_monster_killing: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            viewport_width: 500,
            viewport_height: 500,
            display_columns: None,
            display_fov: 50,
            draw_maze_edge_as_wall: true,
            turn_speed: 2.5,
            move_speed: 4.0,
            run_multiplier: 2.0,
            crawl_multiplier: 0.5,
            monster_enabled: true,
            monster_start_override: None,
            monster_movement_wait: 0.5,
            monster_flicker_lights: true,
            monster_spot_timeout: 10.0,
            monster_time_to_escape: 5.0,
            monster_presses_to_escape: 10,
            compass_time: 10.0,
            compass_charge_norm_multiplier: 0.5,
            compass_charge_burn_multiplier: 1.0,
            compass_charge_delay: 1.5,
            key_sensor_time: 10.0,
            player_wall_time: 15.0,
            player_wall_cooldown: 20.0,
            frame_rate_limit: 75,
            texture_width: 128,
            texture_height: 128,
            enable_collision: true,
            enable_monster_killing: true,
        }
    }
}

impl GameConfig {
    /// Number of rays cast per frame.
    #[must_use]
    pub fn display_columns(&self) -> u32 {
        self.display_columns.unwrap_or(self.viewport_width).max(1)
    }

    /// Length of the camera plane relative to a unit facing vector.
    #[must_use]
    pub fn camera_plane_length(&self) -> f64 {
        f64::from(self.display_fov) / 100.0
    }

    /// Interval between monster movements.
    #[must_use]
    pub fn monster_movement_interval(&self) -> Duration {
        seconds(self.monster_movement_wait)
    }

    /// Delay before the monster spawns given the level's own wait, honouring
    /// the global override. `None` means the monster never spawns.
    #[must_use]
    pub fn monster_spawn_delay(&self, level_wait: Option<Duration>) -> Option<Duration> {
        if !self.monster_enabled {
            return None;
        }
        let level_wait = level_wait?;
        Some(
            self.monster_start_override
                .map_or(level_wait, seconds),
        )
    }
}

/// Converts a number of seconds into a [`Duration`], clamping negative and
/// non-finite values to zero and saturating values too large to represent.
#[must_use]
pub fn seconds(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}
