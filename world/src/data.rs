//! Serialized level descriptions and level file I/O.

use std::{
    collections::BTreeSet,
    fs, io,
    path::{Path, PathBuf},
};

use maze_hunt_core::{
    seconds, DecorationId, GridTile, TextureId, Tile, TileFlags, WallTextures, WallTile,
};
use serde::{Deserialize, Serialize};

use crate::{Feature, Level, ValidationError};

/// On-disk description of a single level.
///
/// Tiles are `[x, y]` pairs. Each wall map entry is either `null` for an
/// open tile or the `[north, south, east, west]` texture ids of a wall.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelData {
    /// Grid size as `[columns, rows]`.
    pub dimensions: [u32; 2],
    /// Row-major wall layout.
    pub wall_map: Vec<Vec<Option<[TextureId; 4]>>>,
    /// Optional `[player_collide, monster_collide]` overrides per tile.
    /// Without it, wall tiles collide for both and open tiles for neither.
    #[serde(default)]
    pub collision_map: Option<Vec<Vec<[bool; 2]>>>,
    /// Where the player starts.
    pub start_point: Tile,
    /// Where the player exits.
    pub end_point: Tile,
    /// Keys required to open the exit.
    #[serde(default)]
    pub exit_keys: Vec<Tile>,
    /// Key sensor pickups.
    #[serde(default)]
    pub key_sensors: Vec<Tile>,
    /// Gun pickups.
    #[serde(default)]
    pub guns: Vec<Tile>,
    /// Decoration sprites.
    #[serde(default)]
    pub decorations: Vec<DecorationData>,
    /// Monster spawn tile; levels without one have no monster.
    #[serde(default)]
    pub monster_start: Option<Tile>,
    /// Seconds of level time before the monster spawns.
    #[serde(default)]
    pub monster_wait: Option<f64>,
    /// Texture used when the maze edge is drawn as a wall.
    #[serde(default)]
    pub edge_wall_texture: TextureId,
}

/// A decoration placed on a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecorationData {
    /// Tile holding the decoration.
    pub tile: Tile,
    /// Sprite drawn for the decoration.
    pub decoration: DecorationId,
}

/// Errors raised while reading or writing level and high score files.
#[derive(Debug, thiserror::Error)]
pub enum LevelFileError {
    /// The file could not be read or written.
    #[error("failed to access {}", .path.display())]
    Io {
        /// Path that was accessed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The file contents are not valid JSON of the expected shape.
    #[error("malformed JSON contents")]
    Parse(#[from] serde_json::Error),
    /// A level in the file failed validation.
    #[error("level {index} is invalid")]
    Validation {
        /// Zero-based position of the level in the file.
        index: usize,
        /// Validation failure.
        #[source]
        source: ValidationError,
    },
}

impl Level {
    /// Validates a level description and builds the playable level.
    pub fn from_data(data: LevelData) -> Result<Self, ValidationError> {
        let [columns, rows] = data.dimensions;
        if columns == 0 || rows == 0 {
            return Err(ValidationError::EmptyGrid { columns, rows });
        }
        if !has_shape(&data.wall_map, columns, rows) {
            return Err(ValidationError::WallMapShape { columns, rows });
        }
        if let Some(collision_map) = &data.collision_map {
            if !has_shape(collision_map, columns, rows) {
                return Err(ValidationError::CollisionMapShape { columns, rows });
            }
        }

        let mut tiles = Vec::with_capacity(data.wall_map.len() * columns as usize);
        for (y, row) in data.wall_map.iter().enumerate() {
            let collision_row = data.collision_map.as_ref().and_then(|map| map.get(y));
            for (x, faces) in row.iter().enumerate() {
                let wall = match faces {
                    Some(faces) => WallTile::Wall {
                        textures: WallTextures::from(*faces),
                    },
                    None => WallTile::Open,
                };
                let [player_collide, monster_collide] = collision_row
                    .and_then(|collisions| collisions.get(x))
                    .copied()
                    .unwrap_or([wall.is_wall(); 2]);
                tiles.push(GridTile {
                    wall,
                    flags: TileFlags {
                        presence: wall.is_wall(),
                        player_collide,
                        monster_collide,
                    },
                });
            }
        }

        let check = |feature: Feature, tile: Tile| -> Result<(), ValidationError> {
            if tile.column() >= columns || tile.row() >= rows {
                return Err(ValidationError::OutOfBounds { feature, tile });
            }
            let index = tile.row() as usize * columns as usize + tile.column() as usize;
            if tiles.get(index).is_some_and(|grid_tile| grid_tile.wall.is_wall()) {
                return Err(ValidationError::InsideWall { feature, tile });
            }
            Ok(())
        };

        check(Feature::StartPoint, data.start_point)?;
        check(Feature::EndPoint, data.end_point)?;
        if let Some(monster_start) = data.monster_start {
            check(Feature::MonsterStart, monster_start)?;
        }
        for &key in &data.exit_keys {
            check(Feature::Key, key)?;
        }
        for &sensor in &data.key_sensors {
            check(Feature::KeySensor, sensor)?;
        }
        for &gun in &data.guns {
            check(Feature::Gun, gun)?;
        }
        for decoration in &data.decorations {
            check(Feature::Decoration, decoration.tile)?;
        }
        if let Some(wait) = data.monster_wait {
            if !wait.is_finite() || wait < 0.0 {
                return Err(ValidationError::InvalidMonsterWait(wait));
            }
        }

        let exit_keys: BTreeSet<Tile> = data.exit_keys.into_iter().collect();
        let key_sensors: BTreeSet<Tile> = data.key_sensors.into_iter().collect();
        let guns: BTreeSet<Tile> = data.guns.into_iter().collect();

        Ok(Self {
            columns,
            rows,
            tiles,
            start_point: data.start_point,
            end_point: data.end_point,
            original_exit_keys: exit_keys.clone(),
            exit_keys,
            original_key_sensors: key_sensors.clone(),
            key_sensors,
            original_guns: guns.clone(),
            guns,
            decorations: data
                .decorations
                .into_iter()
                .map(|decoration| (decoration.tile, decoration.decoration))
                .collect(),
            edge_wall_texture: data.edge_wall_texture,
            monster_start: data.monster_start,
            monster_wait: data.monster_wait.map(seconds),
            player_coords: data.start_point.center(),
            player_tile: data.start_point,
            player_flags: BTreeSet::new(),
            player_wall: None,
            monster_coords: None,
            last_monster_tile: None,
            won: false,
            killed: false,
        })
    }

    /// Captures the designed state of the level. Live progress and the
    /// player-placed wall are not part of the description.
    #[must_use]
    pub fn to_data(&self) -> LevelData {
        let mut wall_map = Vec::with_capacity(self.rows as usize);
        let mut collision_map = Vec::with_capacity(self.rows as usize);
        for row in 0..self.rows {
            let mut walls = Vec::with_capacity(self.columns as usize);
            let mut collisions = Vec::with_capacity(self.columns as usize);
            for column in 0..self.columns {
                let tile = Tile::new(column, row);
                let grid_tile = self.grid_tile(tile).copied().unwrap_or_else(GridTile::open);
                walls.push(match grid_tile.wall {
                    WallTile::Wall { textures } => Some(textures.to_array()),
                    WallTile::Open => None,
                });
                collisions.push(if self.player_wall == Some(tile) {
                    [false, false]
                } else {
                    [grid_tile.flags.player_collide, grid_tile.flags.monster_collide]
                });
            }
            wall_map.push(walls);
            collision_map.push(collisions);
        }

        LevelData {
            dimensions: [self.columns, self.rows],
            wall_map,
            collision_map: Some(collision_map),
            start_point: self.start_point,
            end_point: self.end_point,
            exit_keys: self.original_exit_keys.iter().copied().collect(),
            key_sensors: self.original_key_sensors.iter().copied().collect(),
            guns: self.original_guns.iter().copied().collect(),
            decorations: self
                .decorations
                .iter()
                .map(|(&tile, &decoration)| DecorationData { tile, decoration })
                .collect(),
            monster_start: self.monster_start,
            monster_wait: self.monster_wait.map(|wait| wait.as_secs_f64()),
            edge_wall_texture: self.edge_wall_texture,
        }
    }
}

/// Reads and validates every level stored in a JSON level file.
pub fn load_levels(path: &Path) -> Result<Vec<Level>, LevelFileError> {
    let contents = fs::read_to_string(path).map_err(|source| LevelFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_levels(&contents)
}

/// Parses and validates a JSON level list.
pub fn parse_levels(contents: &str) -> Result<Vec<Level>, LevelFileError> {
    let records: Vec<LevelData> = serde_json::from_str(contents)?;
    records
        .into_iter()
        .enumerate()
        .map(|(index, data)| {
            Level::from_data(data).map_err(|source| LevelFileError::Validation { index, source })
        })
        .collect()
}

/// Writes the designed state of every level to a JSON level file.
pub fn save_levels(path: &Path, levels: &[Level]) -> Result<(), LevelFileError> {
    let records: Vec<LevelData> = levels.iter().map(Level::to_data).collect();
    let json = serde_json::to_string_pretty(&records)?;
    fs::write(path, json).map_err(|source| LevelFileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn has_shape<T>(map: &[Vec<T>], columns: u32, rows: u32) -> bool {
    map.len() == rows as usize && map.iter().all(|row| row.len() == columns as usize)
}
