#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure raycasting system that traces rays through a level's grid.
//!
//! Rays are traced with a digital differential analyser: the ray hops from
//! one grid line to the next, always crossing whichever axis is closer, and
//! stops at the first tile that blocks sight. Sprites on the tiles it passes
//! through are collected along the way. Distances are returned both as the
//! perpendicular component used to size wall columns and as the squared
//! Euclidean distance used for depth sorting.

mod projection;

pub use projection::{
    cast_columns, draw_order, project_sprite, Camera, Column, DrawItem, Frame, SpriteProjection,
    Viewport,
};

use maze_hunt_core::{DVec2, Direction, GridTile, SpriteKind, TextureId, Tile, WallTile};
use maze_hunt_world::Level;

/// Replaces exact zero direction components to keep step sizes finite.
const ZERO_DIRECTION_NUDGE: f64 = 1e-30;

/// What a ray struck.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WallSurface {
    /// Permanent wall geometry.
    Wall(TextureId),
    /// A tile that blocks sight without wall geometry, such as a
    /// player-placed wall.
    Solid,
    /// The edge of the maze, drawn as a wall.
    MazeEdge(TextureId),
}

/// Wall intersection of a single ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// Tile that was hit. Maze edge hits report the last tile inside the
    /// grid.
    pub tile: Tile,
    /// Face of the tile the ray entered through.
    pub side: Direction,
    /// Distance along the facing axis, free of fish-eye distortion.
    pub perpendicular_distance: f64,
    /// Point where the ray met the wall.
    pub hit_point: DVec2,
    /// Squared Euclidean distance from the origin to `hit_point`.
    pub euclidean_squared: f64,
    /// Direction the ray travelled in.
    pub direction: DVec2,
    /// Surface that was struck.
    pub surface: WallSurface,
}

impl RayHit {
    /// Height of the wall column on a viewport of the given height.
    #[must_use]
    pub fn column_height(&self, viewport_height: u32) -> f64 {
        f64::from(viewport_height) / self.perpendicular_distance.max(f64::MIN_POSITIVE)
    }

    /// Texture column to sample for this hit. Faces are mirrored so that
    /// textures read the same way from every side.
    #[must_use]
    pub fn texture_x(&self, texture_width: u32) -> u32 {
        let along_wall = if self.side.is_east_west() {
            self.hit_point.y.rem_euclid(1.0)
        } else {
            self.hit_point.x.rem_euclid(1.0)
        };
        let column = ((along_wall * f64::from(texture_width)) as u32).min(texture_width.saturating_sub(1));
        let mirrored = if self.side.is_east_west() {
            self.direction.x < 0.0
        } else {
            self.direction.y > 0.0
        };
        if mirrored {
            texture_width.saturating_sub(column + 1)
        } else {
            column
        }
    }
}

/// A sprite a ray passed over before hitting a wall.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpriteHit {
    /// What the sprite depicts.
    pub kind: SpriteKind,
    /// Tile the sprite stands on.
    pub tile: Tile,
    /// Where the sprite is drawn.
    pub point: DVec2,
    /// Squared Euclidean distance from the ray origin.
    pub euclidean_squared: f64,
    /// Index into the other-player slice for [`SpriteKind::OtherPlayer`].
    pub player_index: Option<usize>,
}

/// Result of tracing one ray.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RayCast {
    /// Wall that stopped the ray, or `None` when it left the maze and the
    /// edge is not drawn as a wall.
    pub hit: Option<RayHit>,
    /// Sprites passed over, nearest first.
    pub sprites: Vec<SpriteHit>,
}

/// Traces a ray from `origin` in `direction` until it hits a tile that
/// blocks sight.
///
/// `others` lists the positions of other players; they are reported as
/// [`SpriteKind::OtherPlayer`] sprites carrying their index in the slice.
/// When the ray crosses the edge of the grid it either stops with a
/// [`WallSurface::MazeEdge`] hit (`edge_is_wall`) or reports no hit.
#[must_use]
pub fn cast(
    level: &Level,
    origin: DVec2,
    direction: DVec2,
    edge_is_wall: bool,
    others: &[DVec2],
) -> RayCast {
    let direction = DVec2::new(nudge(direction.x), nudge(direction.y));
    let step_size = DVec2::new((1.0 / direction.x).abs(), (1.0 / direction.y).abs());

    let mut cell = [origin.x.floor() as i64, origin.y.floor() as i64];
    let step = [
        if direction.x < 0.0 { -1 } else { 1 },
        if direction.y < 0.0 { -1 } else { 1 },
    ];
    let mut ray_length = [
        if direction.x < 0.0 {
            (origin.x - cell[0] as f64) * step_size.x
        } else {
            (cell[0] as f64 + 1.0 - origin.x) * step_size.x
        },
        if direction.y < 0.0 {
            (origin.y - cell[1] as f64) * step_size.y
        } else {
            (cell[1] as f64 + 1.0 - origin.y) * step_size.y
        },
    ];

    let mut sprites = Vec::new();
    let mut distance = 0.0;
    let mut stepped_y = false;
    let mut last_inside = None;
    let mut first_check = true;

    let surface = loop {
        if !first_check {
            if ray_length[0] < ray_length[1] {
                cell[0] += step[0];
                distance = ray_length[0];
                ray_length[0] += step_size.x;
                stepped_y = false;
            } else {
                cell[1] += step[1];
                distance = ray_length[1];
                ray_length[1] += step_size.y;
                stepped_y = true;
            }
        }
        first_check = false;

        let Some((tile, grid_tile)) = tile_in_level(level, cell) else {
            if edge_is_wall {
                break WallSurface::MazeEdge(level.edge_wall_texture());
            }
            return RayCast { hit: None, sprites };
        };
        if grid_tile.blocks_sight() {
            break match grid_tile.wall {
                WallTile::Wall { textures } => WallSurface::Wall(textures.face(side_of(stepped_y, step))),
                WallTile::Open => WallSurface::Solid,
            };
        }
        last_inside = Some(tile);
        collect_sprites(level, origin, tile, others, &mut sprites);
    };

    let perpendicular_distance = if stepped_y {
        ray_length[1] - step_size.y
    } else {
        ray_length[0] - step_size.x
    };
    let hit_point = origin + direction * distance;
    let tile = match surface {
        WallSurface::MazeEdge(_) => last_inside.unwrap_or_else(|| clamp_to_level(level, cell)),
        WallSurface::Wall(_) | WallSurface::Solid => clamp_to_level(level, cell),
    };

    RayCast {
        hit: Some(RayHit {
            tile,
            side: side_of(stepped_y, step),
            perpendicular_distance,
            hit_point,
            euclidean_squared: origin.distance_squared(hit_point),
            direction,
            surface,
        }),
        sprites,
    }
}

/// Casts a single ray and returns the nearest sprite accepted by `target`.
///
/// The maze edge never stops a shot early; walls do.
pub fn hit_scan<F>(
    level: &Level,
    origin: DVec2,
    direction: DVec2,
    others: &[DVec2],
    mut target: F,
) -> Option<SpriteHit>
where
    F: FnMut(&SpriteHit) -> bool,
{
    let mut sprites = cast(level, origin, direction, false, others).sprites;
    sprites.sort_by(|a, b| a.euclidean_squared.total_cmp(&b.euclidean_squared));
    sprites.into_iter().find(|sprite| target(sprite))
}

fn nudge(component: f64) -> f64 {
    if component == 0.0 {
        ZERO_DIRECTION_NUDGE
    } else {
        component
    }
}

fn side_of(stepped_y: bool, step: [i64; 2]) -> Direction {
    match (stepped_y, step[0] < 0, step[1] < 0) {
        (false, true, _) => Direction::East,
        (false, false, _) => Direction::West,
        (true, _, true) => Direction::South,
        (true, _, false) => Direction::North,
    }
}

fn tile_in_level(level: &Level, cell: [i64; 2]) -> Option<(Tile, GridTile)> {
    let column = u32::try_from(cell[0]).ok()?;
    let row = u32::try_from(cell[1]).ok()?;
    let tile = Tile::new(column, row);
    level.grid_tile(tile).map(|grid_tile| (tile, *grid_tile))
}

fn clamp_to_level(level: &Level, cell: [i64; 2]) -> Tile {
    let column = cell[0].clamp(0, i64::from(level.columns().saturating_sub(1)));
    let row = cell[1].clamp(0, i64::from(level.rows().saturating_sub(1)));
    Tile::new(
        u32::try_from(column).unwrap_or_default(),
        u32::try_from(row).unwrap_or_default(),
    )
}

fn collect_sprites(
    level: &Level,
    origin: DVec2,
    tile: Tile,
    others: &[DVec2],
    out: &mut Vec<SpriteHit>,
) {
    let centre = tile.center();
    let at_centre = |kind| SpriteHit {
        kind,
        tile,
        point: centre,
        euclidean_squared: origin.distance_squared(centre),
        player_index: None,
    };

    let fixture = if level.exit_keys().contains(&tile) {
        Some(SpriteKind::Key)
    } else if level.key_sensors().contains(&tile) {
        Some(SpriteKind::KeySensor)
    } else if level.guns().contains(&tile) {
        Some(SpriteKind::Gun)
    } else if let Some(&decoration) = level.decorations().get(&tile) {
        Some(SpriteKind::Decoration(decoration))
    } else if level.end_point() == tile {
        Some(if level.exit_keys().is_empty() {
            SpriteKind::EndPointActive
        } else {
            SpriteKind::EndPoint
        })
    } else if level.monster_start() == Some(tile) {
        Some(SpriteKind::MonsterSpawn)
    } else if level.start_point() == tile {
        Some(SpriteKind::StartPoint)
    } else {
        None
    };
    out.extend(fixture.map(at_centre));

    if level.monster_coords() == Some(tile) {
        out.push(at_centre(SpriteKind::Monster));
    }
    if level.player_flags().contains(&tile) {
        out.push(at_centre(SpriteKind::Flag));
    }
    for (index, &position) in others.iter().enumerate() {
        if Tile::containing(position) == Some(tile) {
            out.push(SpriteHit {
                kind: SpriteKind::OtherPlayer,
                tile,
                point: position,
                euclidean_squared: origin.distance_squared(position),
                player_index: Some(index),
            });
        }
    }
}
