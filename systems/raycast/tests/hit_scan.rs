use maze_hunt_core::{DVec2, DecorationId, SpriteKind, TextureId, Tile};
use maze_hunt_system_raycast::{cast, cast_columns, hit_scan, Camera, WallSurface};
use maze_hunt_world::{DecorationData, Level, LevelData};

const WALL: Option<[TextureId; 4]> = Some([TextureId::new(1); 4]);

/// A 7x3 room split by a wall at column 4 on the middle row.
fn range() -> Level {
    let mut wall_map = vec![vec![None; 7]; 3];
    wall_map[1][4] = WALL;
    Level::from_data(LevelData {
        dimensions: [7, 3],
        wall_map,
        collision_map: None,
        start_point: Tile::new(0, 1),
        end_point: Tile::new(6, 0),
        exit_keys: vec![Tile::new(2, 2)],
        key_sensors: Vec::new(),
        guns: Vec::new(),
        decorations: Vec::new(),
        monster_start: None,
        monster_wait: None,
        edge_wall_texture: TextureId::new(9),
    })
    .expect("valid level")
}

fn is_player(sprite: &maze_hunt_system_raycast::SpriteHit) -> bool {
    sprite.kind == SpriteKind::OtherPlayer
}

#[test]
fn shots_hit_the_nearest_player_first() {
    let level = range();
    let players = [DVec2::new(3.5, 1.5), DVec2::new(2.5, 1.5)];

    let hit = hit_scan(&level, DVec2::new(0.5, 1.5), DVec2::X, &players, is_player)
        .expect("a player is in the line of fire");

    assert_eq!(hit.player_index, Some(1));
    assert_eq!(hit.tile, Tile::new(2, 1));
}

#[test]
fn walls_shield_players_behind_them() {
    let level = range();
    let players = [DVec2::new(5.5, 1.5)];

    assert_eq!(
        hit_scan(&level, DVec2::new(0.5, 1.5), DVec2::X, &players, is_player),
        None
    );
    let ray = cast(&level, DVec2::new(0.5, 1.5), DVec2::X, true, &players);
    let wall = ray.hit.expect("the wall stops the ray");
    assert_eq!(wall.tile, Tile::new(4, 1));
    assert_eq!(wall.surface, WallSurface::Wall(TextureId::new(1)));
    assert!((wall.perpendicular_distance - 3.5).abs() < 1e-9);
}

#[test]
fn shots_fly_past_the_maze_edge() {
    let level = range();
    let players = [DVec2::new(6.5, 0.5)];

    let hit = hit_scan(&level, DVec2::new(0.5, 0.5), DVec2::X, &players, is_player);
    assert_eq!(hit.map(|sprite| sprite.tile), Some(Tile::new(6, 0)));

    let ray = cast(&level, DVec2::new(0.5, 0.5), DVec2::X, true, &[]);
    let edge = ray.hit.expect("edge counts as a wall");
    assert_eq!(edge.surface, WallSurface::MazeEdge(TextureId::new(9)));
    assert_eq!(edge.tile, Tile::new(6, 0));
}

#[test]
fn a_frame_sees_the_key_once() {
    let level = range();
    let camera = Camera::new(DVec2::new(0.5, 2.5), DVec2::X, 0.66);

    let frame = cast_columns(&level, &camera, 40, true, &[]);

    assert_eq!(frame.columns.len(), 40);
    let keys = frame
        .sprites
        .iter()
        .filter(|sprite| sprite.kind == SpriteKind::Key)
        .count();
    assert_eq!(keys, 1);
}

#[test]
fn rays_pass_decorations() {
    let mut data = range().to_data();
    data.decorations.push(DecorationData {
        tile: Tile::new(2, 1),
        decoration: DecorationId::new(3),
    });
    let level = Level::from_data(data).expect("valid level");

    let ray = cast(&level, DVec2::new(0.5, 1.5), DVec2::X, true, &[]);

    assert_eq!(ray.hit.map(|wall| wall.tile), Some(Tile::new(4, 1)));
    assert!(ray
        .sprites
        .iter()
        .any(|sprite| sprite.kind == SpriteKind::Decoration(DecorationId::new(3))));
}
