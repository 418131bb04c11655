#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line entry point for the Maze Hunt multiplayer server.

use std::{net::UdpSocket, path::PathBuf, sync::atomic::AtomicBool, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use maze_hunt_core::seconds;
use maze_hunt_server::{serve, GameServer, ServerConfig};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const READ_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Parser)]
#[command(author, version, about = "Maze Hunt multiplayer server", long_about = None)]
struct Args {
    /// Level file to serve from.
    #[arg(short = 'p', long, default_value = "levels/maze_levels.json")]
    level_json_path: PathBuf,

    /// UDP port to listen on.
    #[arg(short = 't', long, default_value_t = 13375)]
    port: u16,

    /// Zero-based index of the level to play.
    #[arg(short, long, default_value_t = 0)]
    level: u8,

    /// Play co-op against the monster instead of deathmatch.
    #[arg(long)]
    coop: bool,

    /// TOML file with monster timing overrides; defaults apply when it does
    /// not exist.
    #[arg(short, long, default_value_os_t = maze_hunt_config::default_config_path())]
    config: PathBuf,

    /// Seconds a player must wait between deathmatch shots.
    #[arg(long, default_value_t = 0.4)]
    fire_cooldown: f64,

    /// Seconds of silence after which a player is evicted.
    #[arg(long, default_value_t = 30.0)]
    idle_timeout: f64,

    /// Number of player skins handed out round robin.
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u8).range(1..))]
    skins: u8,

    /// Seed for player keys and the monster; random when omitted.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut levels = maze_hunt_world::load_levels(&args.level_json_path)?;
    let index = usize::from(args.level);
    anyhow::ensure!(
        index < levels.len(),
        "level {} requested but {} holds {} levels",
        args.level,
        args.level_json_path.display(),
        levels.len()
    );
    let level = levels.swap_remove(index);

    let game = maze_hunt_config::load_config(&args.config)?;
    let config = ServerConfig {
        level_index: args.level,
        coop: args.coop,
        fire_cooldown: seconds(args.fire_cooldown),
        idle_timeout: seconds(args.idle_timeout),
        skin_count: args.skins,
        game,
    };
    let seed = args.seed.unwrap_or_else(rand::random);

    let socket = UdpSocket::bind(("0.0.0.0", args.port))
        .with_context(|| format!("failed to bind UDP port {}", args.port))?;
    socket
        .set_read_timeout(Some(READ_TIMEOUT))
        .context("failed to set socket read timeout")?;
    info!(
        port = args.port,
        level = args.level,
        coop = args.coop,
        "server listening"
    );

    let mut server = GameServer::new(level, config, seed);
    let running = AtomicBool::new(true);
    serve(&socket, &mut server, &running)
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("maze_hunt=info"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_to_the_working_directory() {
        let args = Args::try_parse_from(["maze-hunt-server"]).expect("parses");

        assert_eq!(args.config, maze_hunt_config::default_config_path());
        assert_eq!(args.port, 13375);
    }

    #[test]
    fn arguments_are_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
