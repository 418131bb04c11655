//! Requests sent by clients and the replies the server returns.

use maze_hunt_core::Tile;

use crate::{
    codec::{Coords, NetPlayer, PlayerKey, PlayerName, Reader},
    ProtocolError, PLAYER_KEY_LEN,
};

/// First byte of every request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Report position and fetch the shared state.
    Ping = 0,
    /// Ask for a player key.
    Join = 1,
    /// Fire a hit-scan shot; the payload is the origin then the facing.
    Fire = 2,
    /// Come back to life after dying.
    Respawn = 3,
    /// Give the player slot back.
    Leave = 4,
}

impl TryFrom<u8> for OpCode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Ping),
            1 => Ok(Self::Join),
            2 => Ok(Self::Fire),
            3 => Ok(Self::Respawn),
            4 => Ok(Self::Leave),
            other => Err(ProtocolError::UnknownOpCode(other)),
        }
    }
}

/// A decoded client request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    /// Position report that doubles as a state poll.
    Ping {
        /// Sender's key.
        key: PlayerKey,
        /// Sender's current position.
        position: Coords,
    },
    /// Join request. Travels with an all-zero key.
    Join {
        /// Name the player wants to be shown with.
        name: PlayerName,
    },
    /// Hit-scan shot.
    ///
    /// On the wire the key is followed by `origin` and then `facing`, each
    /// as a pair of big-endian `i32` hundredths: 49 bytes in all.
    Fire {
        /// Sender's key.
        key: PlayerKey,
        /// Where the shot starts.
        origin: Coords,
        /// Direction the shot travels.
        facing: Coords,
    },
    /// Respawn request; ignored while the sender is alive.
    Respawn {
        /// Sender's key.
        key: PlayerKey,
    },
    /// Leave notification. Fire and forget.
    Leave {
        /// Sender's key.
        key: PlayerKey,
    },
}

impl Request {
    /// Op code identifying the request.
    #[must_use]
    pub const fn op_code(&self) -> OpCode {
        match self {
            Self::Ping { .. } => OpCode::Ping,
            Self::Join { .. } => OpCode::Join,
            Self::Fire { .. } => OpCode::Fire,
            Self::Respawn { .. } => OpCode::Respawn,
            Self::Leave { .. } => OpCode::Leave,
        }
    }

    /// Key of a joined sender. Join requests carry none.
    #[must_use]
    pub const fn key(&self) -> Option<PlayerKey> {
        match self {
            Self::Ping { key, .. }
            | Self::Fire { key, .. }
            | Self::Respawn { key }
            | Self::Leave { key } => Some(*key),
            Self::Join { .. } => None,
        }
    }

    /// Encodes the request as a datagram.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + PLAYER_KEY_LEN + 2 * Coords::ENCODED_LEN);
        out.push(self.op_code() as u8);
        let key = self.key().unwrap_or(PlayerKey::UNASSIGNED);
        out.extend_from_slice(key.as_bytes());
        match self {
            Self::Ping { position, .. } => position.encode(&mut out),
            Self::Join { name } => name.encode(&mut out),
            Self::Fire { origin, facing, .. } => {
                origin.encode(&mut out);
                facing.encode(&mut out);
            }
            Self::Respawn { .. } | Self::Leave { .. } => {}
        }
        out
    }

    /// Decodes a datagram received from a client.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let (&op, rest) = bytes.split_first().ok_or(ProtocolError::Empty)?;
        let op_code = OpCode::try_from(op)?;
        let mut reader = Reader::new(rest);
        let key = PlayerKey::decode(&mut reader)?;

        Ok(match op_code {
            OpCode::Ping => Self::Ping {
                key,
                position: Coords::decode(&mut reader)?,
            },
            OpCode::Join => Self::Join {
                name: PlayerName::decode(&mut reader)?,
            },
            OpCode::Fire => Self::Fire {
                key,
                origin: Coords::decode(&mut reader)?,
                facing: Coords::decode(&mut reader)?,
            },
            OpCode::Respawn => Self::Respawn { key },
            OpCode::Leave => Self::Leave { key },
        })
    }
}

/// Reply to a successful join.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JoinReply {
    /// Key to send with every further request.
    pub key: PlayerKey,
    /// Index of the level the server hosts.
    pub level: u8,
    /// Whether the server runs co-op instead of deathmatch.
    pub coop: bool,
}

impl JoinReply {
    /// Encoded width in bytes.
    pub const ENCODED_LEN: usize = PLAYER_KEY_LEN + 2;

    /// Encodes the reply as a datagram.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::ENCODED_LEN);
        out.extend_from_slice(self.key.as_bytes());
        out.push(self.level);
        out.push(u8::from(self.coop));
        out
    }

    /// Decodes a join reply datagram.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = Reader::new(bytes);
        Ok(Self {
            key: PlayerKey::decode(&mut reader)?,
            level: reader.u8("level")?,
            coop: reader.u8("coop flag")? != 0,
        })
    }
}

/// Outcome of a fire request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ShotResult {
    /// The shooter is dead or still cooling down.
    Denied = 0,
    /// Nothing was hit.
    Missed = 1,
    /// A target was hit and survived.
    HitNoKill = 2,
    /// A target was hit and died.
    Killed = 3,
}

impl ShotResult {
    /// Encodes the result as a single-byte datagram.
    #[must_use]
    pub fn encode(self) -> Vec<u8> {
        vec![self as u8]
    }

    /// Decodes a fire reply datagram.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let byte = Reader::new(bytes).u8("shot result")?;
        Self::try_from(byte)
    }
}

impl TryFrom<u8> for ShotResult {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Denied),
            1 => Ok(Self::Missed),
            2 => Ok(Self::HitNoKill),
            3 => Ok(Self::Killed),
            other => Err(ProtocolError::UnknownShotResult(other)),
        }
    }
}

/// Ping reply of a deathmatch server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeathmatchStatus {
    /// Hits the caller can still take.
    pub hits_remaining: u8,
    /// Skin of whoever last killed the caller.
    pub last_killer_skin: u8,
    /// Caller's kill count.
    pub kills: u16,
    /// Caller's death count.
    pub deaths: u16,
    /// Every other player.
    pub players: Vec<NetPlayer>,
}

impl DeathmatchStatus {
    /// Encodes the reply as a datagram.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let players = capped(&self.players);
        let mut out = Vec::with_capacity(7 + players.len() * NetPlayer::ENCODED_LEN);
        out.push(self.hits_remaining);
        out.push(self.last_killer_skin);
        out.extend_from_slice(&self.kills.to_be_bytes());
        out.extend_from_slice(&self.deaths.to_be_bytes());
        encode_players(players, &mut out);
        out
    }

    /// Decodes a deathmatch ping reply.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = Reader::new(bytes);
        Ok(Self {
            hits_remaining: reader.u8("hits remaining")?,
            last_killer_skin: reader.u8("last killer skin")?,
            kills: reader.u16("kills")?,
            deaths: reader.u16("deaths")?,
            players: decode_players(&mut reader)?,
        })
    }
}

/// Ping reply of a co-op server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoopStatus {
    /// Whether the caller is alive.
    pub alive: bool,
    /// The shared monster's position, if it has spawned.
    pub monster: Option<Coords>,
    /// Every other player.
    pub players: Vec<NetPlayer>,
    /// Tiles whose pickups have been collected by anyone.
    pub pickups: Vec<Tile>,
}

impl CoopStatus {
    /// Encodes the reply as a datagram.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let players = capped(&self.players);
        let mut out = Vec::with_capacity(
            10 + players.len() * NetPlayer::ENCODED_LEN + self.pickups.len() * Coords::ENCODED_LEN,
        );
        out.push(u8::from(self.alive));
        self.monster.unwrap_or(Coords::OFF_MAP).encode(&mut out);
        encode_players(players, &mut out);
        for &tile in &self.pickups {
            Coords::from_tile(tile).encode(&mut out);
        }
        out
    }

    /// Decodes a co-op ping reply.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = Reader::new(bytes);
        let alive = reader.u8("alive flag")? != 0;
        let monster = Coords::decode(&mut reader)?;
        let players = decode_players(&mut reader)?;
        let mut pickups = Vec::with_capacity(reader.remaining() / Coords::ENCODED_LEN);
        while reader.remaining() > 0 {
            if let Some(tile) = Coords::decode(&mut reader)?.grid_pos() {
                pickups.push(tile);
            }
        }
        Ok(Self {
            alive,
            monster: monster.grid_pos().map(|_| monster),
            players,
            pickups,
        })
    }
}

fn capped(players: &[NetPlayer]) -> &[NetPlayer] {
    &players[..players.len().min(usize::from(u8::MAX))]
}

fn encode_players(players: &[NetPlayer], out: &mut Vec<u8>) {
    out.push(u8::try_from(players.len()).unwrap_or(u8::MAX));
    for player in players {
        player.encode(out);
    }
}

fn decode_players(reader: &mut Reader<'_>) -> Result<Vec<NetPlayer>, ProtocolError> {
    let count = reader.u8("player count")?;
    (0..count).map(|_| NetPlayer::decode(reader)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_hunt_core::DVec2;

    fn key(byte: u8) -> PlayerKey {
        PlayerKey::new([byte; PLAYER_KEY_LEN])
    }

    fn coords(x: f64, y: f64) -> Coords {
        Coords::from_point(DVec2::new(x, y))
    }

    fn player(name: &str, x: f64, y: f64) -> NetPlayer {
        NetPlayer {
            name: PlayerName::new(name),
            coords: coords(x, y),
            skin: 2,
            kills: 1,
            deaths: 0,
        }
    }

    #[test]
    fn requests_survive_the_wire() {
        let requests = [
            Request::Ping {
                key: key(1),
                position: coords(1.25, 7.5),
            },
            Request::Join {
                name: PlayerName::new("Grace"),
            },
            Request::Fire {
                key: key(3),
                origin: coords(2.5, 2.5),
                facing: coords(0.0, -1.0),
            },
            Request::Respawn { key: key(4) },
            Request::Leave { key: key(5) },
        ];

        for request in requests {
            assert_eq!(Request::decode(&request.encode()), Ok(request));
        }
    }

    #[test]
    fn fire_payload_is_origin_then_facing() {
        let bytes = Request::Fire {
            key: key(9),
            origin: coords(1.0, 0.0),
            facing: coords(0.0, 1.0),
        }
        .encode();

        assert_eq!(bytes.len(), 1 + PLAYER_KEY_LEN + 16);
        assert_eq!(bytes[0], 2);
        assert_eq!(&bytes[33..37], &100_i32.to_be_bytes());
        assert_eq!(&bytes[45..49], &100_i32.to_be_bytes());
    }

    #[test]
    fn join_requests_carry_an_unassigned_key() {
        let bytes = Request::Join {
            name: PlayerName::new("Ada"),
        }
        .encode();

        assert_eq!(bytes.len(), 1 + PLAYER_KEY_LEN + 24);
        assert!(bytes[1..=PLAYER_KEY_LEN].iter().all(|&byte| byte == 0));
        assert_eq!(&bytes[33..36], b"Ada");
    }

    #[test]
    fn malformed_requests_are_rejected() {
        assert_eq!(Request::decode(&[]), Err(ProtocolError::Empty));
        assert_eq!(
            Request::decode(&[7; 40]),
            Err(ProtocolError::UnknownOpCode(7))
        );

        let mut ping = Request::Ping {
            key: key(1),
            position: coords(1.0, 1.0),
        }
        .encode();
        let _ = ping.pop();
        assert!(matches!(
            Request::decode(&ping),
            Err(ProtocolError::Truncated {
                field: "coords y",
                ..
            })
        ));
    }

    #[test]
    fn join_reply_layout() {
        let reply = JoinReply {
            key: key(0x5a),
            level: 2,
            coop: true,
        };
        let bytes = reply.encode();

        assert_eq!(bytes.len(), JoinReply::ENCODED_LEN);
        assert_eq!(&bytes[32..], &[2, 1]);
        assert_eq!(JoinReply::decode(&bytes), Ok(reply));
    }

    #[test]
    fn shot_results_are_single_bytes() {
        assert_eq!(ShotResult::Denied.encode(), vec![0]);
        assert_eq!(ShotResult::Killed.encode(), vec![3]);
        assert_eq!(ShotResult::decode(&[2]), Ok(ShotResult::HitNoKill));
        assert_eq!(
            ShotResult::decode(&[9]),
            Err(ProtocolError::UnknownShotResult(9))
        );
    }

    #[test]
    fn deathmatch_status_lists_other_players() {
        let status = DeathmatchStatus {
            hits_remaining: 10,
            last_killer_skin: 3,
            kills: 513,
            deaths: 4,
            players: vec![player("Ada", 1.5, 1.5), player("Grace", 3.25, 8.0)],
        };
        let bytes = status.encode();

        assert_eq!(bytes.len(), 7 + 2 * NetPlayer::ENCODED_LEN);
        assert_eq!(&bytes[..7], &[10, 3, 2, 1, 0, 4, 2]);
        assert_eq!(DeathmatchStatus::decode(&bytes), Ok(status));
    }

    #[test]
    fn coop_status_marks_missing_monster_off_map() {
        let status = CoopStatus {
            alive: true,
            monster: None,
            players: vec![player("Ada", 4.5, 0.5)],
            pickups: vec![Tile::new(3, 4), Tile::new(0, 9)],
        };
        let bytes = status.encode();

        assert_eq!(bytes.len(), 1 + 8 + 1 + NetPlayer::ENCODED_LEN + 16);
        assert_eq!(&bytes[1..5], &(-100_i32).to_be_bytes());
        assert_eq!(CoopStatus::decode(&bytes), Ok(status));
    }

    #[test]
    fn coop_status_rejects_partial_pickups() {
        let mut bytes = CoopStatus {
            alive: false,
            monster: Some(coords(2.0, 3.0)),
            players: Vec::new(),
            pickups: vec![Tile::new(1, 1)],
        }
        .encode();
        bytes.truncate(bytes.len() - 3);

        assert!(matches!(
            CoopStatus::decode(&bytes),
            Err(ProtocolError::Truncated { .. })
        ));
    }
}
