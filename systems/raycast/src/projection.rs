//! Camera fan-out, sprite projection and painter ordering.

use std::collections::BTreeSet;

use maze_hunt_core::{DVec2, SpriteKind, Tile};
use maze_hunt_world::Level;

use crate::{cast, RayHit, SpriteHit};

/// Viewer position plus the facing and camera plane vectors.
///
/// The camera plane is perpendicular to the facing vector; its length
/// relative to the facing vector sets the field of view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// Viewer position in tiles.
    pub position: DVec2,
    /// Unit vector the viewer looks along.
    pub facing: DVec2,
    /// Vector from the screen centre to its right edge.
    pub plane: DVec2,
}

impl Camera {
    /// Builds a camera whose plane points to the viewer's right.
    #[must_use]
    pub fn new(position: DVec2, facing: DVec2, plane_length: f64) -> Self {
        Self {
            position,
            facing,
            plane: facing.perp() * plane_length,
        }
    }

    /// Direction of the ray for screen column `index` out of `column_count`.
    #[must_use]
    pub fn ray_direction(&self, index: usize, column_count: usize) -> DVec2 {
        let camera_x = 2.0 * index as f64 / column_count.max(1) as f64 - 1.0;
        self.facing + self.plane * camera_x
    }
}

/// Pixel size of the 3D view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// One screen column of a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Column {
    /// Position of the column from the left of the screen.
    pub index: usize,
    /// Wall seen through the column, `None` for the horizon.
    pub hit: Option<RayHit>,
}

impl Column {
    /// Sort key for painter ordering; the horizon is infinitely far.
    #[must_use]
    pub fn depth(&self) -> f64 {
        self.hit.map_or(f64::INFINITY, |hit| hit.euclidean_squared)
    }
}

/// Every wall column and visible sprite of one rendered frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    /// Wall columns, left to right.
    pub columns: Vec<Column>,
    /// Visible sprites, each reported once.
    pub sprites: Vec<SpriteHit>,
}

/// Casts one ray per screen column and gathers the sprites they pass.
#[must_use]
pub fn cast_columns(
    level: &Level,
    camera: &Camera,
    column_count: usize,
    edge_is_wall: bool,
    others: &[DVec2],
) -> Frame {
    let mut frame = Frame {
        columns: Vec::with_capacity(column_count),
        sprites: Vec::new(),
    };
    let mut seen: BTreeSet<(SpriteKind, Tile, Option<usize>)> = BTreeSet::new();

    for index in 0..column_count {
        let direction = camera.ray_direction(index, column_count);
        let ray = cast(level, camera.position, direction, edge_is_wall, others);
        frame.columns.push(Column {
            index,
            hit: ray.hit,
        });
        for sprite in ray.sprites {
            if seen.insert((sprite.kind, sprite.tile, sprite.player_index)) {
                frame.sprites.push(sprite);
            }
        }
    }
    frame
}

/// Screen placement of a billboard sprite.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpriteProjection {
    /// Horizontal centre of the sprite in pixels.
    pub screen_x: f64,
    /// Drawn width in pixels.
    pub width: f64,
    /// Drawn height in pixels.
    pub height: f64,
    /// Distance in front of the camera plane.
    pub depth: f64,
}

/// Projects a world point onto the screen by inverting the camera matrix.
///
/// Returns `None` for points behind the viewer and for sprites that would
/// land more than half a texture width beyond either screen edge.
#[must_use]
pub fn project_sprite(
    point: DVec2,
    camera: &Camera,
    viewport: Viewport,
    texture_width: u32,
) -> Option<SpriteProjection> {
    let relative = point - camera.position;
    let (facing, plane) = (camera.facing, camera.plane);
    let determinant = plane.x * facing.y - facing.x * plane.y;
    if determinant == 0.0 {
        return None;
    }
    let inverse = 1.0 / determinant;
    let transform_x = nonzero(inverse * (facing.y * relative.x - facing.x * relative.y));
    let transform_y = nonzero(inverse * (-plane.y * relative.x + plane.x * relative.y));
    if transform_y < 0.0 {
        return None;
    }

    let width = f64::from(viewport.width);
    let screen_x = (width / 2.0) * (1.0 + transform_x / transform_y);
    let margin = f64::from(texture_width / 2);
    if screen_x > width + margin || screen_x < -margin {
        return None;
    }

    Some(SpriteProjection {
        screen_x,
        width: (width / transform_y).abs(),
        height: (f64::from(viewport.height) / transform_y).abs(),
        depth: transform_y,
    })
}

fn nonzero(value: f64) -> f64 {
    if value == 0.0 {
        1e-5
    } else {
        value
    }
}

/// Item to draw, indexing into a [`Frame`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawItem {
    /// Index into [`Frame::columns`].
    Column(usize),
    /// Index into [`Frame::sprites`].
    Sprite(usize),
}

/// Orders every column and sprite of the frame farthest first, so that
/// nearer geometry is drawn over farther geometry.
#[must_use]
pub fn draw_order(frame: &Frame) -> Vec<DrawItem> {
    let mut items: Vec<(f64, DrawItem)> = frame
        .columns
        .iter()
        .enumerate()
        .map(|(index, column)| (column.depth(), DrawItem::Column(index)))
        .chain(
            frame
                .sprites
                .iter()
                .enumerate()
                .map(|(index, sprite)| (sprite.euclidean_squared, DrawItem::Sprite(index))),
        )
        .collect();
    items.sort_by(|a, b| b.0.total_cmp(&a.0));
    items.into_iter().map(|(_, item)| item).collect()
}
