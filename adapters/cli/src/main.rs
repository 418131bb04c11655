#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line tools for inspecting Maze Hunt levels.

mod ascii;

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use maze_hunt_core::{DVec2, Tile};
use maze_hunt_system_pathfinding::{active_targets, precalculate, search_paths, TileSolutions};
use maze_hunt_system_raycast::{Camera, Viewport};
use maze_hunt_world::{load_high_scores, load_levels, Level};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(author, version, about = "Maze Hunt level tools", long_about = None)]
struct Cli {
    /// Level file to read.
    #[arg(short = 'p', long, global = true, default_value = "levels/maze_levels.json")]
    levels: PathBuf,

    /// TOML config file; defaults apply when it does not exist.
    #[arg(
        short,
        long,
        global = true,
        default_value_os_t = maze_hunt_config::default_config_path()
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Prints a level as a text grid.
    Show {
        /// Zero-based level index.
        #[arg(short, long, default_value_t = 0)]
        level: usize,
    },
    /// Lists the routes from a tile to the level's current targets.
    Solve {
        /// Zero-based level index.
        #[arg(short, long, default_value_t = 0)]
        level: usize,
        /// Start tile as `x,y`; the level's start point by default.
        #[arg(long, value_parser = parse_tile)]
        from: Option<Tile>,
        /// Number of routes to print, shortest first.
        #[arg(long, default_value_t = 1)]
        show: usize,
    },
    /// Computes the routes from every open tile of every level as JSON.
    Precalculate {
        /// File to write; standard output when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Renders the first-person view from a tile as text.
    Frame {
        /// Zero-based level index.
        #[arg(short, long, default_value_t = 0)]
        level: usize,
        /// Viewer tile as `x,y`; the level's start point by default.
        #[arg(long, value_parser = parse_tile)]
        at: Option<Tile>,
        /// Direction the viewer faces.
        #[arg(long, value_enum, default_value_t = Heading::East)]
        facing: Heading,
        /// Characters per line.
        #[arg(long, default_value_t = 80)]
        width: u32,
        /// Number of lines.
        #[arg(long, default_value_t = 24)]
        height: u32,
    },
    /// Prints the effective configuration as TOML.
    Config,
    /// Prints the best time and distance recorded for every level.
    Scores {
        /// High score file to read.
        #[arg(long, default_value = "highscores.json")]
        file: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Heading {
    North,
    East,
    South,
    West,
}

impl Heading {
    const fn vector(self) -> DVec2 {
        match self {
            Self::North => DVec2::new(0.0, -1.0),
            Self::East => DVec2::new(1.0, 0.0),
            Self::South => DVec2::new(0.0, 1.0),
            Self::West => DVec2::new(-1.0, 0.0),
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = maze_hunt_config::load_config(&cli.config)?;

    match cli.command {
        Command::Show { level } => {
            let level = select_level(&cli.levels, level)?;
            println!("{level}");
        }
        Command::Solve { level, from, show } => {
            let level = select_level(&cli.levels, level)?;
            let start = from.unwrap_or_else(|| level.start_point());
            let paths = search_paths(&level, start, &active_targets(&level));
            let Some(shortest) = paths.first() else {
                bail!("no route from {start} to any target");
            };
            println!(
                "{} routes from {start}; shortest is {} moves",
                paths.len(),
                shortest.len().saturating_sub(1)
            );
            for path in paths.iter().take(show) {
                let tiles: Vec<String> = path.iter().map(Tile::to_string).collect();
                println!("{}", tiles.join(" "));
            }
        }
        Command::Precalculate { output } => {
            let levels = load_levels(&cli.levels)
                .with_context(|| format!("failed to load {}", cli.levels.display()))?;
            let solutions: Vec<Vec<TileSolutions>> = levels
                .iter()
                .enumerate()
                .map(|(index, level)| {
                    let solutions = precalculate(level);
                    info!(level = index, tiles = solutions.len(), "precalculated level");
                    solutions
                })
                .collect();
            let json = serde_json::to_string(&solutions).context("failed to encode solutions")?;
            match output {
                Some(path) => fs::write(&path, json)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => println!("{json}"),
            }
        }
        Command::Frame {
            level,
            at,
            facing,
            width,
            height,
        } => {
            if width == 0 || height == 0 {
                bail!("frame must not be empty, got {width}x{height}");
            }
            let level = select_level(&cli.levels, level)?;
            let position = at.unwrap_or_else(|| level.start_point()).center();
            if !level.contains_point(position) {
                bail!("viewer position {position} is outside the level");
            }
            let camera = Camera::new(position, facing.vector(), config.camera_plane_length());
            let viewport = Viewport { width, height };
            println!(
                "{}",
                ascii::render_frame(&level, &camera, viewport, config.draw_maze_edge_as_wall)
            );
        }
        Command::Config => {
            print!("{}", maze_hunt_config::render_config(&config)?);
        }
        Command::Scores { file } => {
            let levels = load_levels(&cli.levels)
                .with_context(|| format!("failed to load {}", cli.levels.display()))?;
            let scores = load_high_scores(&file, levels.len())
                .with_context(|| format!("failed to load {}", file.display()))?;
            for index in 0..scores.len() {
                let best = scores.level(index);
                match (best.time, best.moves) {
                    (Some(time), Some(moves)) => {
                        println!("level {index}: {time:.2}s, {moves:.1} tiles");
                    }
                    _ => println!("level {index}: not completed"),
                }
            }
        }
    }
    Ok(())
}

fn select_level(path: &Path, index: usize) -> Result<Level> {
    let mut levels =
        load_levels(path).with_context(|| format!("failed to load {}", path.display()))?;
    if index >= levels.len() {
        bail!(
            "level {index} requested but {} holds {} levels",
            path.display(),
            levels.len()
        );
    }
    Ok(levels.swap_remove(index))
}

fn parse_tile(value: &str) -> Result<Tile, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got `{value}`"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<u32>()
            .map_err(|error| format!("invalid coordinate `{part}`: {error}"))
    };
    Ok(Tile::new(parse(x)?, parse(y)?))
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("maze_hunt=info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiles_parse_from_pairs() {
        assert_eq!(parse_tile("3, 4"), Ok(Tile::new(3, 4)));
        assert!(parse_tile("3").is_err());
        assert!(parse_tile("-1,2").is_err());
    }

    #[test]
    fn config_defaults_to_the_working_directory() {
        let cli = Cli::try_parse_from(["maze-hunt", "config"]).expect("parses");
        assert_eq!(cli.config, maze_hunt_config::default_config_path());

        let cli = Cli::try_parse_from(["maze-hunt", "show", "--config", "other.toml"])
            .expect("parses");
        assert_eq!(cli.config, PathBuf::from("other.toml"));
    }

    #[test]
    fn arguments_are_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
