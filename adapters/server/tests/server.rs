use std::time::Duration;

use maze_hunt_core::{DVec2, TextureId, Tile};
use maze_hunt_protocol::{
    CoopStatus, Coords, DeathmatchStatus, JoinReply, PlayerKey, PlayerName, ProtocolError,
    Request, ShotResult, MAX_PLAYERS, SHOTS_UNTIL_DEAD,
};
use maze_hunt_server::{GameServer, RequestError, ServerConfig};
use maze_hunt_world::{Level, LevelData};

fn arena(monster_start: Option<Tile>, exit_keys: Vec<Tile>) -> Level {
    Level::from_data(LevelData {
        dimensions: [10, 3],
        wall_map: vec![vec![None; 10]; 3],
        collision_map: None,
        start_point: Tile::new(0, 1),
        end_point: Tile::new(9, 1),
        exit_keys,
        key_sensors: Vec::new(),
        guns: Vec::new(),
        decorations: Vec::new(),
        monster_start,
        monster_wait: monster_start.map(|_| 0.0),
        edge_wall_texture: TextureId::new(0),
    })
    .expect("valid level")
}

fn deathmatch() -> GameServer {
    GameServer::new(arena(None, Vec::new()), ServerConfig::default(), 11)
}

fn coop(level: Level) -> GameServer {
    let config = ServerConfig {
        coop: true,
        ..ServerConfig::default()
    };
    GameServer::new(level, config, 11)
}

fn secs(value: f64) -> Duration {
    Duration::from_secs_f64(value)
}

fn join(server: &mut GameServer, name: &str, now: Duration) -> JoinReply {
    let request = Request::Join {
        name: PlayerName::new(name),
    };
    let reply = server
        .handle(&request.encode(), now)
        .expect("join handled")
        .expect("join answered");
    JoinReply::decode(&reply).expect("join reply")
}

fn ping(server: &mut GameServer, key: PlayerKey, x: f64, y: f64, now: Duration) -> Vec<u8> {
    let request = Request::Ping {
        key,
        position: Coords::from_point(DVec2::new(x, y)),
    };
    server
        .handle(&request.encode(), now)
        .expect("ping handled")
        .expect("ping answered")
}

fn fire_east(server: &mut GameServer, key: PlayerKey, now: Duration) -> ShotResult {
    let request = Request::Fire {
        key,
        origin: Coords::from_point(DVec2::new(0.5, 1.5)),
        facing: Coords::from_point(DVec2::new(1.0, 0.0)),
    };
    let reply = server
        .handle(&request.encode(), now)
        .expect("fire handled")
        .expect("fire answered");
    ShotResult::decode(&reply).expect("shot result")
}

#[test]
fn joins_hand_out_keys_and_round_robin_skins() {
    let mut server = deathmatch();

    let first = join(&mut server, "alice", Duration::ZERO);
    let second = join(&mut server, "bob", Duration::ZERO);

    assert_ne!(first.key, second.key);
    assert_ne!(first.key, PlayerKey::UNASSIGNED);
    assert_eq!(first.level, 0);
    assert!(!first.coop);
    let alice = server.player(&first.key).expect("alice joined");
    assert_eq!(alice.player.skin, 0);
    assert_eq!(alice.hits_remaining, SHOTS_UNTIL_DEAD);
    assert_eq!(alice.player.coords, Coords::from_point(DVec2::new(0.5, 1.5)));
    assert_eq!(server.player(&second.key).expect("bob joined").player.skin, 1);
}

#[test]
fn second_shot_within_cooldown_is_denied() {
    let mut server = deathmatch();
    let shooter = join(&mut server, "alice", Duration::ZERO).key;

    assert_eq!(fire_east(&mut server, shooter, secs(1.0)), ShotResult::Missed);
    assert_eq!(fire_east(&mut server, shooter, secs(1.1)), ShotResult::Denied);
    assert_eq!(fire_east(&mut server, shooter, secs(1.5)), ShotResult::Missed);
}

#[test]
fn join_beyond_capacity_gets_no_reply() {
    let mut server = deathmatch();
    for index in 0..MAX_PLAYERS {
        let _ = join(&mut server, &format!("player {index}"), Duration::ZERO);
    }

    let request = Request::Join {
        name: PlayerName::new("late"),
    };
    let reply = server
        .handle(&request.encode(), Duration::ZERO)
        .expect("join handled");

    assert_eq!(reply, None);
    assert_eq!(server.player_count(), MAX_PLAYERS);
}

#[test]
fn ten_hits_kill_and_respawn_restores() {
    let mut server = deathmatch();
    let shooter = join(&mut server, "alice", Duration::ZERO).key;
    let victim = join(&mut server, "bob", Duration::ZERO).key;
    let _ = ping(&mut server, victim, 5.5, 1.5, Duration::ZERO);

    for shot in 0..u32::from(SHOTS_UNTIL_DEAD) - 1 {
        let now = Duration::from_secs(u64::from(shot) + 1);
        assert_eq!(fire_east(&mut server, shooter, now), ShotResult::HitNoKill);
    }
    assert_eq!(fire_east(&mut server, shooter, secs(20.0)), ShotResult::Killed);

    let dead = server.player(&victim).expect("victim");
    assert_eq!(dead.hits_remaining, 0);
    assert_eq!(dead.player.deaths, 1);
    assert_eq!(dead.player.coords, Coords::OFF_MAP);
    assert_eq!(server.player(&shooter).expect("shooter").player.kills, 1);

    let status = DeathmatchStatus::decode(&ping(&mut server, victim, 5.5, 1.5, secs(21.0)))
        .expect("status");
    assert_eq!(status.hits_remaining, 0);
    assert_eq!(status.deaths, 1);
    assert_eq!(status.players.len(), 1);
    assert_eq!(status.players[0].kills, 1);
    assert_eq!(
        server.player(&victim).expect("victim").player.coords,
        Coords::OFF_MAP
    );

    assert_eq!(fire_east(&mut server, shooter, secs(22.0)), ShotResult::Missed);
    assert_eq!(fire_east(&mut server, victim, secs(22.0)), ShotResult::Denied);

    let respawn = Request::Respawn { key: victim };
    assert_eq!(server.handle(&respawn.encode(), secs(23.0)).expect("respawn"), None);
    let alive = server.player(&victim).expect("victim");
    assert_eq!(alive.hits_remaining, SHOTS_UNTIL_DEAD);
    assert_eq!(alive.player.coords, Coords::from_point(DVec2::new(0.5, 1.5)));
}

#[test]
fn coop_monster_catches_and_can_be_shot() {
    let mut server = coop(arena(Some(Tile::new(5, 1)), Vec::new()));
    let key = join(&mut server, "alice", Duration::ZERO).key;

    let status = CoopStatus::decode(&ping(&mut server, key, 0.5, 1.5, secs(1.0))).expect("status");
    assert!(status.alive);
    assert_eq!(status.monster, Some(Coords::from_tile(Tile::new(5, 1))));

    let _ = ping(&mut server, key, 5.5, 1.5, secs(2.0));
    let status = CoopStatus::decode(&ping(&mut server, key, 5.5, 1.5, secs(3.0))).expect("status");
    assert!(!status.alive);
    assert_eq!(server.player(&key).expect("alice").hits_remaining, 0);

    let buddy = join(&mut server, "bob", secs(3.0)).key;
    assert_eq!(fire_east(&mut server, buddy, secs(3.0)), ShotResult::Killed);
    assert_eq!(server.level().monster_coords(), None);
}

#[test]
fn coop_reports_collected_pickups() {
    let mut server = coop(arena(None, vec![Tile::new(2, 1), Tile::new(7, 0)]));
    let key = join(&mut server, "alice", Duration::ZERO).key;

    let _ = ping(&mut server, key, 2.5, 1.5, secs(1.0));
    let status = CoopStatus::decode(&ping(&mut server, key, 3.5, 1.5, secs(2.0))).expect("status");

    assert_eq!(status.pickups, vec![Tile::new(2, 1)]);
    assert_eq!(status.monster, None);
}

#[test]
fn idle_players_are_evicted() {
    let mut server = deathmatch();
    let quiet = join(&mut server, "quiet", Duration::ZERO).key;
    let chatty = join(&mut server, "chatty", Duration::ZERO).key;
    let _ = ping(&mut server, chatty, 0.5, 1.5, secs(20.0));

    let evicted = server.evict_idle(secs(31.0));

    assert_eq!(evicted, vec![quiet]);
    assert_eq!(server.player_count(), 1);
    assert!(server.player(&chatty).is_some());
}

#[test]
fn bad_requests_are_errors_not_panics() {
    let mut server = deathmatch();

    assert!(matches!(
        server.handle(&[], Duration::ZERO),
        Err(RequestError::Protocol(ProtocolError::Empty))
    ));
    assert!(matches!(
        server.handle(&[9], Duration::ZERO),
        Err(RequestError::Protocol(ProtocolError::UnknownOpCode(9)))
    ));

    let stranger = PlayerKey::new([7; 32]);
    let request = Request::Ping {
        key: stranger,
        position: Coords::default(),
    };
    assert!(matches!(
        server.handle(&request.encode(), Duration::ZERO),
        Err(RequestError::UnknownPlayer(key)) if key == stranger
    ));

    let leave = Request::Leave { key: stranger };
    assert!(server.handle(&leave.encode(), Duration::ZERO).is_err());
}
