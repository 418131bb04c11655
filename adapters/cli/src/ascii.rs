//! Text rendering of a raycast frame.

use maze_hunt_core::{Direction, SpriteKind};
use maze_hunt_system_raycast::{
    cast_columns, draw_order, project_sprite, Camera, DrawItem, Viewport, WallSurface,
};
use maze_hunt_world::Level;

const CEILING: char = ' ';
const FLOOR: char = '.';
/// Sprites nearer than this would cover the whole screen.
const NEAREST_SPRITE: f64 = 0.5;

/// Renders what the camera sees as `viewport.height` lines of
/// `viewport.width` characters, drawing far geometry before near.
pub(crate) fn render_frame(
    level: &Level,
    camera: &Camera,
    viewport: Viewport,
    edge_is_wall: bool,
) -> String {
    let (width, height) = (viewport.width as usize, viewport.height as usize);
    let mut canvas: Vec<Vec<char>> = (0..height)
        .map(|row| {
            let glyph = if row < height / 2 { CEILING } else { FLOOR };
            vec![glyph; width]
        })
        .collect();

    let frame = cast_columns(level, camera, width, edge_is_wall, &[]);
    let middle = f64::from(viewport.height) / 2.0;
    for item in draw_order(&frame) {
        match item {
            DrawItem::Column(index) => {
                let Some(hit) = frame.columns.get(index).and_then(|column| column.hit) else {
                    continue;
                };
                let half = hit.column_height(viewport.height) / 2.0;
                let glyph = wall_glyph(hit.surface, hit.side);
                let rows = span(middle - half, middle + half, height);
                paint(&mut canvas, index..index + 1, rows, glyph);
            }
            DrawItem::Sprite(index) => {
                let Some(sprite) = frame.sprites.get(index) else {
                    continue;
                };
                let Some(projection) = project_sprite(sprite.point, camera, viewport, 0)
                    .filter(|projection| projection.depth >= NEAREST_SPRITE)
                else {
                    continue;
                };
                // Billboards fill the middle half of their projected box.
                let (half_width, half_height) = (projection.width / 4.0, projection.height / 4.0);
                paint(
                    &mut canvas,
                    span(
                        projection.screen_x - half_width,
                        projection.screen_x + half_width,
                        width,
                    ),
                    span(middle - half_height, middle + half_height, height),
                    sprite_glyph(sprite.kind),
                );
            }
        }
    }

    canvas
        .into_iter()
        .map(|row| row.into_iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

fn span(start: f64, end: f64, limit: usize) -> std::ops::Range<usize> {
    let clamp = |value: f64| value.round().clamp(0.0, limit as f64) as usize;
    let (start, end) = (clamp(start), clamp(end));
    start..end.max(start)
}

fn paint(
    canvas: &mut [Vec<char>],
    columns: std::ops::Range<usize>,
    rows: std::ops::Range<usize>,
    glyph: char,
) {
    for row in canvas.iter_mut().take(rows.end).skip(rows.start) {
        for cell in row.iter_mut().take(columns.end).skip(columns.start) {
            *cell = glyph;
        }
    }
}

const fn wall_glyph(surface: WallSurface, side: Direction) -> char {
    match surface {
        WallSurface::MazeEdge(_) => '%',
        WallSurface::Solid => '@',
        WallSurface::Wall(_) if side.is_east_west() => '#',
        WallSurface::Wall(_) => '=',
    }
}

const fn sprite_glyph(kind: SpriteKind) -> char {
    match kind {
        SpriteKind::EndPoint | SpriteKind::EndPointActive => 'E',
        SpriteKind::Key => 'K',
        SpriteKind::Monster => 'M',
        SpriteKind::StartPoint => 'S',
        SpriteKind::Flag => 'F',
        SpriteKind::KeySensor => '?',
        SpriteKind::MonsterSpawn => 'm',
        SpriteKind::Gun => 'G',
        SpriteKind::Decoration(_) => '*',
        SpriteKind::OtherPlayer => 'P',
    }
}
