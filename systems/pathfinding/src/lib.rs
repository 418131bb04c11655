#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Exhaustive path enumeration used to reveal maze solutions.
//!
//! The search walks every simple path (no tile visited twice) from a start
//! tile over the four cardinal neighbours and records each one that ends on
//! a target. The number of such paths grows exponentially with the number
//! of loops in the maze, so callers are expected to go through
//! [`PathCache`] or to [`precalculate`] solutions ahead of time.

use std::collections::{BTreeMap, BTreeSet};

use maze_hunt_core::{Direction, Tile, WallTile};
use maze_hunt_world::Level;
use serde::{Deserialize, Serialize};

/// Ordered tiles from the start tile to a target tile, both inclusive.
pub type Path = Vec<Tile>;

/// Tiles the player is currently heading for: the remaining keys, or the
/// exit once every key has been collected.
#[must_use]
pub fn active_targets(level: &Level) -> BTreeSet<Tile> {
    if level.exit_keys().is_empty() {
        BTreeSet::from([level.end_point()])
    } else {
        level.exit_keys().clone()
    }
}

/// Every key the level was designed with plus the exit.
#[must_use]
pub fn all_targets(level: &Level) -> BTreeSet<Tile> {
    let mut targets = level.original_exit_keys().clone();
    let _ = targets.insert(level.end_point());
    targets
}

/// Enumerates the paths from the player's tile to the active targets,
/// shortest first.
#[must_use]
pub fn find_paths(level: &Level) -> Vec<Path> {
    search_paths(level, level.player_grid_coords(), &active_targets(level))
}

/// Enumerates every simple path from `start` that ends on one of `targets`,
/// sorted by ascending length.
///
/// Wall tiles are never entered; player-placed walls and collision flags are
/// ignored. Paths keep extending past a target, so a path to a far key may
/// run through a nearer one. A start tile that is itself a target yields the
/// single-tile path. Paths of equal length keep their discovery order.
#[must_use]
pub fn search_paths(level: &Level, start: Tile, targets: &BTreeSet<Tile>) -> Vec<Path> {
    let mut found = Vec::new();
    if !is_walkable(level, start) {
        return found;
    }

    let mut path = vec![start];
    let mut on_path = BTreeSet::from([start]);
    let mut next_direction = vec![0_usize];
    if targets.contains(&start) {
        found.push(path.clone());
    }

    loop {
        let (Some(&tile), Some(cursor)) = (path.last(), next_direction.last_mut()) else {
            break;
        };
        let Some(&direction) = Direction::ALL.get(*cursor) else {
            let _ = path.pop();
            let _ = next_direction.pop();
            let _ = on_path.remove(&tile);
            continue;
        };
        *cursor += 1;

        let Some(neighbour) = tile.step(direction) else {
            continue;
        };
        if on_path.contains(&neighbour) || !is_walkable(level, neighbour) {
            continue;
        }

        path.push(neighbour);
        next_direction.push(0);
        let _ = on_path.insert(neighbour);
        if targets.contains(&neighbour) {
            found.push(path.clone());
        }
    }

    found.sort_by_key(Vec::len);
    found
}

fn is_walkable(level: &Level, tile: Tile) -> bool {
    matches!(level.tile(tile), Ok(WallTile::Open))
}

/// Memoised path searches keyed by start tile and target set.
///
/// Keying on the target set means collecting a key never serves paths that
/// were computed for a different set of goals.
#[derive(Clone, Debug, Default)]
pub struct PathCache {
    entries: BTreeMap<(Tile, BTreeSet<Tile>), Vec<Path>>,
}

impl PathCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths from the player's tile to the active targets, searching only
    /// on the first request for that combination.
    pub fn paths(&mut self, level: &Level) -> &[Path] {
        self.paths_from(level, level.player_grid_coords(), active_targets(level))
    }

    /// Paths from `start` to `targets`, searching on a cache miss.
    pub fn paths_from(&mut self, level: &Level, start: Tile, targets: BTreeSet<Tile>) -> &[Path] {
        self.entries
            .entry((start, targets))
            .or_insert_with_key(|(start, targets)| search_paths(level, *start, targets))
    }

    /// Cached paths for the combination, if it was searched before.
    #[must_use]
    pub fn get(&self, start: Tile, targets: &BTreeSet<Tile>) -> Option<&[Path]> {
        self.entries
            .get(&(start, targets.clone()))
            .map(Vec::as_slice)
    }

    /// Seeds the cache with precalculated solutions for `targets`.
    pub fn extend(&mut self, targets: &BTreeSet<Tile>, solutions: Vec<TileSolutions>) {
        for solution in solutions {
            let _ = self
                .entries
                .insert((solution.tile, targets.clone()), solution.paths);
        }
    }

    /// Number of cached searches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every cached search, e.g. after the level geometry changed.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Precalculated paths starting on one tile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSolutions {
    /// Start tile of every path.
    pub tile: Tile,
    /// Paths to any of the level's targets, shortest first.
    pub paths: Vec<Path>,
}

/// Searches from every open tile of the level towards [`all_targets`].
///
/// Tiles are visited row by row. The result can be fed to
/// [`PathCache::extend`] together with the same target set.
#[must_use]
pub fn precalculate(level: &Level) -> Vec<TileSolutions> {
    let targets = all_targets(level);
    (0..level.rows())
        .flat_map(|row| (0..level.columns()).map(move |column| Tile::new(column, row)))
        .filter(|tile| is_walkable(level, *tile))
        .map(|tile| TileSolutions {
            tile,
            paths: search_paths(level, tile, &targets),
        })
        .collect()
}
