#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Loads the engine's [`GameConfig`] from a TOML file.
//!
//! Every key is optional. A missing file yields the defaults; a file that
//! exists but cannot be read, parsed or validated is an error.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use maze_hunt_core::GameConfig;

/// Returns the default config path relative to the working directory.
#[must_use]
pub fn default_config_path() -> PathBuf {
    PathBuf::from("config.toml")
}

/// Reads the configuration at `path`, falling back to the defaults when the
/// file does not exist.
pub fn load_config(path: impl AsRef<Path>) -> Result<GameConfig> {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(contents) => parse_config(&contents)
            .with_context(|| format!("invalid config file {}", path.display())),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(GameConfig::default()),
        Err(error) => Err(error)
            .with_context(|| format!("failed to read config file {}", path.display())),
    }
}

/// Parses and validates TOML configuration contents.
pub fn parse_config(contents: &str) -> Result<GameConfig> {
    let config: GameConfig =
        toml::from_str(contents).context("failed to parse config toml contents")?;
    validate(&config)?;
    Ok(config)
}

/// Renders the configuration as TOML, e.g. to write out the defaults.
pub fn render_config(config: &GameConfig) -> Result<String> {
    toml::to_string_pretty(config).context("failed to render config as toml")
}

fn validate(config: &GameConfig) -> Result<()> {
    if config.viewport_width == 0 || config.viewport_height == 0 {
        bail!(
            "viewport must not be empty, got {}x{}",
            config.viewport_width,
            config.viewport_height
        );
    }
    if config.texture_width == 0 || config.texture_height == 0 {
        bail!(
            "textures must not be empty, got {}x{}",
            config.texture_width,
            config.texture_height
        );
    }
    if config.display_columns == Some(0) {
        bail!("display_columns must be at least 1");
    }
    if config.display_fov == 0 {
        bail!("display_fov must be at least 1");
    }
    if config.frame_rate_limit == 0 {
        bail!("frame_rate_limit must be at least 1");
    }
    if config.monster_presses_to_escape == 0 {
        bail!("monster_presses_to_escape must be at least 1");
    }

    let non_negative = [
        ("turn_speed", config.turn_speed),
        ("move_speed", config.move_speed),
        ("run_multiplier", config.run_multiplier),
        ("crawl_multiplier", config.crawl_multiplier),
        ("monster_movement_wait", config.monster_movement_wait),
        ("monster_spot_timeout", config.monster_spot_timeout),
        ("monster_time_to_escape", config.monster_time_to_escape),
        ("compass_time", config.compass_time),
        ("compass_charge_delay", config.compass_charge_delay),
        ("key_sensor_time", config.key_sensor_time),
        ("player_wall_time", config.player_wall_time),
        ("player_wall_cooldown", config.player_wall_cooldown),
    ];
    for (name, value) in non_negative {
        if !value.is_finite() || value < 0.0 {
            bail!("{name} must be a non-negative number, got {value}");
        }
    }

    let positive = [
        (
            "compass_charge_norm_multiplier",
            config.compass_charge_norm_multiplier,
        ),
        (
            "compass_charge_burn_multiplier",
            config.compass_charge_burn_multiplier,
        ),
    ];
    for (name, value) in positive {
        if !value.is_finite() || value <= 0.0 {
            bail!("{name} must be a positive number, got {value}");
        }
    }

    if let Some(wait) = config.monster_start_override {
        if !wait.is_finite() || wait < 0.0 {
            bail!("monster_start_override must be a non-negative number, got {wait}");
        }
    }
    Ok(())
}
