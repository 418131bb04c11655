#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative multiplayer server for Maze Hunt.
//!
//! [`GameServer`] holds every joined player and the one shared level, and
//! turns each decoded datagram into at most one reply. It never touches a
//! socket itself; [`serve`] drives it from a blocking UDP loop so that
//! exactly one request is processed at a time.

mod net;

pub use net::serve;

use std::{collections::BTreeMap, time::Duration};

use maze_hunt_core::{DVec2, GameConfig, SpriteKind, Tile};
use maze_hunt_protocol::{
    CoopStatus, Coords, DeathmatchStatus, JoinReply, NetPlayer, PlayerKey, PlayerName,
    PrivatePlayer, ProtocolError, Request, ShotResult, MAX_PLAYERS, SHOTS_UNTIL_DEAD,
};
use maze_hunt_system_monster::{Config as DirectorConfig, MonsterDirector};
use maze_hunt_system_raycast::hit_scan;
use maze_hunt_world::Level;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

/// Failures handling a single request. The server keeps running after any
/// of them.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The datagram could not be decoded.
    #[error("malformed datagram: {0}")]
    Protocol(#[from] ProtocolError),
    /// The request carried a key no joined player holds.
    #[error("unknown player key {0:?}")]
    UnknownPlayer(PlayerKey),
}

/// Match settings.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Index of the served level, reported to joining players.
    pub level_index: u8,
    /// Co-op against the monster instead of deathmatch.
    pub coop: bool,
    /// Minimum time between two deathmatch shots of one player.
    pub fire_cooldown: Duration,
    /// Players not heard from for this long are evicted.
    pub idle_timeout: Duration,
    /// Number of player skins handed out round robin.
    pub skin_count: u8,
    /// Monster timing and toggles.
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            level_index: 0,
            coop: false,
            fire_cooldown: Duration::from_millis(400),
            idle_timeout: Duration::from_secs(30),
            skin_count: 4,
            game: GameConfig::default(),
        }
    }
}

#[derive(Clone, Debug)]
struct ServerPlayer {
    record: PrivatePlayer,
    last_fire: Option<Duration>,
    last_seen: Duration,
}

/// Shared match state.
///
/// Every `now` argument is the time elapsed since the server started.
#[derive(Debug)]
pub struct GameServer {
    level: Level,
    config: ServerConfig,
    players: BTreeMap<PlayerKey, ServerPlayer>,
    director: MonsterDirector,
    last_tick: Duration,
    rng: ChaCha8Rng,
}

impl GameServer {
    /// Creates a server for `level`; `rng_seed` drives player keys and the
    /// monster.
    #[must_use]
    pub fn new(level: Level, config: ServerConfig, rng_seed: u64) -> Self {
        let director = MonsterDirector::new(DirectorConfig::new(
            config.game.monster_spawn_delay(level.monster_wait()),
            config.game.monster_movement_interval(),
            false,
            rng_seed,
        ));
        Self {
            level,
            config,
            players: BTreeMap::new(),
            director,
            last_tick: Duration::ZERO,
            rng: ChaCha8Rng::seed_from_u64(rng_seed.wrapping_add(1)),
        }
    }

    /// The shared level.
    #[must_use]
    pub const fn level(&self) -> &Level {
        &self.level
    }

    /// Number of joined players.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Private record of a joined player.
    #[must_use]
    pub fn player(&self, key: &PlayerKey) -> Option<&PrivatePlayer> {
        self.players.get(key).map(|player| &player.record)
    }

    /// Handles one datagram and returns the reply to send, if any.
    pub fn handle(
        &mut self,
        datagram: &[u8],
        now: Duration,
    ) -> Result<Option<Vec<u8>>, RequestError> {
        match Request::decode(datagram)? {
            Request::Join { name } => Ok(self.join(name, now).map(|reply| reply.encode())),
            Request::Ping { key, position } => self.ping(key, position, now).map(Some),
            Request::Fire {
                key,
                origin,
                facing,
            } => self
                .fire(key, origin, facing, now)
                .map(|result| Some(result.encode())),
            Request::Respawn { key } => self.respawn(key, now).map(|()| None),
            Request::Leave { key } => self.leave(key).map(|()| None),
        }
    }

    /// Removes players not heard from within the idle timeout and returns
    /// their keys.
    pub fn evict_idle(&mut self, now: Duration) -> Vec<PlayerKey> {
        let timeout = self.config.idle_timeout;
        let idle: Vec<PlayerKey> = self
            .players
            .iter()
            .filter(|(_, player)| now.saturating_sub(player.last_seen) > timeout)
            .map(|(key, _)| *key)
            .collect();
        for key in &idle {
            let _ = self.players.remove(key);
        }
        idle
    }

    fn join(&mut self, name: PlayerName, now: Duration) -> Option<JoinReply> {
        if self.players.len() >= MAX_PLAYERS {
            warn!(%name, "rejected join as the server is full");
            return None;
        }
        let key = self.fresh_key();
        let skin = (self.players.len() % usize::from(self.config.skin_count.max(1))) as u8;
        info!(%name, skin, "player joined");

        let record = PrivatePlayer {
            player: NetPlayer {
                name,
                coords: Coords::from_point(self.level.start_point().center()),
                skin,
                kills: 0,
                deaths: 0,
            },
            hits_remaining: SHOTS_UNTIL_DEAD,
            last_killer_skin: 0,
        };
        let _ = self.players.insert(
            key,
            ServerPlayer {
                record,
                last_fire: None,
                last_seen: now,
            },
        );
        Some(JoinReply {
            key,
            level: self.config.level_index,
            coop: self.config.coop,
        })
    }

    fn fresh_key(&mut self) -> PlayerKey {
        loop {
            let mut bytes = [0; maze_hunt_protocol::PLAYER_KEY_LEN];
            self.rng.fill_bytes(&mut bytes);
            let key = PlayerKey::new(bytes);
            if key != PlayerKey::UNASSIGNED && !self.players.contains_key(&key) {
                return key;
            }
        }
    }

    fn ping(
        &mut self,
        key: PlayerKey,
        position: Coords,
        now: Duration,
    ) -> Result<Vec<u8>, RequestError> {
        self.player_mut(key)?.last_seen = now;
        self.tick_monster(key, now);

        let player = self.player_mut(key)?;
        let alive = player.record.is_alive();
        if alive {
            player.record.player.coords = position;
        }
        if self.config.coop && alive {
            if let Some(tile) = position.grid_pos() {
                let _ = self.level.collect_items(tile, false);
            }
        }

        let others = self.others(key);
        let record = self.record(key)?;
        let reply = if self.config.coop {
            CoopStatus {
                alive: record.is_alive(),
                monster: self.level.monster_coords().map(Coords::from_tile),
                players: others,
                pickups: self.collected_pickups(),
            }
            .encode()
        } else {
            DeathmatchStatus {
                hits_remaining: record.hits_remaining,
                last_killer_skin: record.last_killer_skin,
                kills: record.player.kills,
                deaths: record.player.deaths,
                players: others,
            }
            .encode()
        };
        Ok(reply)
    }

    fn tick_monster(&mut self, caller: PlayerKey, now: Duration) {
        let dt = now.saturating_sub(self.last_tick);
        self.last_tick = now;

        if let Some(player) = self.players.get(&caller) {
            if player.record.is_alive() {
                let _ = self
                    .level
                    .set_player_position(player.record.player.coords.to_point());
            }
        }
        let mut events = Vec::new();
        self.director.handle(&mut self.level, now, dt, &mut events);

        let Some(monster) = self.level.monster_coords() else {
            return;
        };
        for player in self.players.values_mut() {
            if player.record.is_alive() && player.record.player.grid_pos() == Some(monster) {
                debug!(name = %player.record.player.name, "monster caught player");
                player.record.hits_remaining = 0;
            }
        }
    }

    fn fire(
        &mut self,
        key: PlayerKey,
        origin: Coords,
        facing: Coords,
        now: Duration,
    ) -> Result<ShotResult, RequestError> {
        let cooldown = self.config.fire_cooldown;
        let coop = self.config.coop;
        let shooter = self.player_mut(key)?;
        shooter.last_seen = now;
        if !shooter.record.is_alive() {
            return Ok(ShotResult::Denied);
        }
        if !coop {
            if let Some(last) = shooter.last_fire {
                if now.saturating_sub(last) < cooldown {
                    return Ok(ShotResult::Denied);
                }
            }
            shooter.last_fire = Some(now);
        }
        let shooter_skin = shooter.record.player.skin;
        let (origin, facing) = (origin.to_point(), facing.to_point());

        if coop {
            let hit = hit_scan(&self.level, origin, facing, &[], |sprite| {
                sprite.kind == SpriteKind::Monster
            });
            return Ok(if hit.is_some() {
                self.level.despawn_monster();
                ShotResult::Killed
            } else {
                ShotResult::Missed
            });
        }

        let targets: Vec<(PlayerKey, DVec2)> = self
            .players
            .iter()
            .filter(|(other, player)| **other != key && player.record.is_alive())
            .map(|(other, player)| (*other, player.record.player.coords.to_point()))
            .collect();
        let points: Vec<DVec2> = targets.iter().map(|(_, point)| *point).collect();
        let hit = hit_scan(&self.level, origin, facing, &points, |sprite| {
            sprite.kind == SpriteKind::OtherPlayer
        });
        let Some(victim_key) = hit
            .and_then(|sprite| sprite.player_index)
            .and_then(|index| targets.get(index))
            .map(|(victim, _)| *victim)
        else {
            return Ok(ShotResult::Missed);
        };

        let victim = self.player_mut(victim_key)?;
        victim.record.hits_remaining = victim.record.hits_remaining.saturating_sub(1);
        if victim.record.is_alive() {
            return Ok(ShotResult::HitNoKill);
        }
        victim.record.player.deaths = victim.record.player.deaths.saturating_add(1);
        victim.record.last_killer_skin = shooter_skin;
        victim.record.player.coords = Coords::OFF_MAP;
        info!(victim = %victim.record.player.name, "player killed");

        let shooter = self.player_mut(key)?;
        shooter.record.player.kills = shooter.record.player.kills.saturating_add(1);
        Ok(ShotResult::Killed)
    }

    fn respawn(&mut self, key: PlayerKey, now: Duration) -> Result<(), RequestError> {
        let start = Coords::from_point(self.level.start_point().center());
        let player = self.player_mut(key)?;
        player.last_seen = now;
        if player.record.is_alive() {
            debug!(name = %player.record.player.name, "ignored respawn of living player");
            return Ok(());
        }
        player.record.hits_remaining = SHOTS_UNTIL_DEAD;
        player.record.player.coords = start;
        Ok(())
    }

    fn leave(&mut self, key: PlayerKey) -> Result<(), RequestError> {
        let player = self
            .players
            .remove(&key)
            .ok_or(RequestError::UnknownPlayer(key))?;
        info!(name = %player.record.player.name, "player left");
        Ok(())
    }

    fn record(&self, key: PlayerKey) -> Result<&PrivatePlayer, RequestError> {
        self.player(&key).ok_or(RequestError::UnknownPlayer(key))
    }

    fn player_mut(&mut self, key: PlayerKey) -> Result<&mut ServerPlayer, RequestError> {
        self.players
            .get_mut(&key)
            .ok_or(RequestError::UnknownPlayer(key))
    }

    fn others(&self, key: PlayerKey) -> Vec<NetPlayer> {
        self.players
            .iter()
            .filter(|(other, _)| **other != key)
            .map(|(_, player)| player.record.to_public())
            .collect()
    }

    fn collected_pickups(&self) -> Vec<Tile> {
        let level = &self.level;
        let mut collected: Vec<Tile> = level
            .original_exit_keys()
            .difference(level.exit_keys())
            .chain(level.original_key_sensors().difference(level.key_sensors()))
            .chain(level.original_guns().difference(level.guns()))
            .copied()
            .collect();
        collected.sort_unstable();
        collected
    }
}
