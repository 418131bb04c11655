//! Fixed-width records shared by requests and replies.

use std::fmt;

use maze_hunt_core::{DVec2, Tile};

use crate::{ProtocolError, NAME_LEN, PLAYER_KEY_LEN};

/// Cursor over a received datagram.
#[derive(Debug)]
pub(crate) struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    pub(crate) const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub(crate) const fn remaining(&self) -> usize {
        self.bytes.len()
    }

    pub(crate) fn take(
        &mut self,
        field: &'static str,
        expected: usize,
    ) -> Result<&'a [u8], ProtocolError> {
        if self.bytes.len() < expected {
            return Err(ProtocolError::Truncated {
                field,
                expected,
                remaining: self.bytes.len(),
            });
        }
        let (head, tail) = self.bytes.split_at(expected);
        self.bytes = tail;
        Ok(head)
    }

    pub(crate) fn array<const N: usize>(
        &mut self,
        field: &'static str,
    ) -> Result<[u8; N], ProtocolError> {
        let mut out = [0; N];
        out.copy_from_slice(self.take(field, N)?);
        Ok(out)
    }

    pub(crate) fn u8(&mut self, field: &'static str) -> Result<u8, ProtocolError> {
        Ok(self.array::<1>(field)?[0])
    }

    pub(crate) fn u16(&mut self, field: &'static str) -> Result<u16, ProtocolError> {
        Ok(u16::from_be_bytes(self.array(field)?))
    }

    pub(crate) fn i32(&mut self, field: &'static str) -> Result<i32, ProtocolError> {
        Ok(i32::from_be_bytes(self.array(field)?))
    }
}

/// A position quantized to hundredths of a tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Coords {
    x_hundredths: i32,
    y_hundredths: i32,
}

impl Coords {
    /// Encoded width in bytes.
    pub const ENCODED_LEN: usize = 8;

    /// Position used for dead players and absent monsters.
    pub const OFF_MAP: Self = Self {
        x_hundredths: -100,
        y_hundredths: -100,
    };

    /// Quantizes a point, rounding each axis to two decimal places.
    /// Values beyond the `i32` range saturate.
    #[must_use]
    pub fn from_point(point: DVec2) -> Self {
        Self {
            x_hundredths: quantize(point.x),
            y_hundredths: quantize(point.y),
        }
    }

    /// Coordinates of a tile's top-left corner.
    #[must_use]
    pub fn from_tile(tile: Tile) -> Self {
        Self::from_point(DVec2::new(
            f64::from(tile.column()),
            f64::from(tile.row()),
        ))
    }

    /// The quantized point.
    #[must_use]
    pub fn to_point(self) -> DVec2 {
        DVec2::new(
            f64::from(self.x_hundredths) / 100.0,
            f64::from(self.y_hundredths) / 100.0,
        )
    }

    /// Tile containing the point, or `None` when either axis is negative.
    #[must_use]
    pub fn grid_pos(self) -> Option<Tile> {
        Tile::containing(self.to_point())
    }

    pub(crate) fn encode(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.x_hundredths.to_be_bytes());
        out.extend_from_slice(&self.y_hundredths.to_be_bytes());
    }

    pub(crate) fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            x_hundredths: reader.i32("coords x")?,
            y_hundredths: reader.i32("coords y")?,
        })
    }
}

fn quantize(value: f64) -> i32 {
    // Float to int casts saturate and map NaN to zero.
    (value * 100.0).round() as i32
}

/// Private key the server hands out on join.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerKey([u8; PLAYER_KEY_LEN]);

impl PlayerKey {
    /// Key sent by clients that have not joined yet.
    pub const UNASSIGNED: Self = Self([0; PLAYER_KEY_LEN]);

    /// Wraps raw key bytes.
    #[must_use]
    pub const fn new(bytes: [u8; PLAYER_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; PLAYER_KEY_LEN] {
        &self.0
    }

    pub(crate) fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        reader.array("player key").map(Self)
    }
}

impl fmt::Debug for PlayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only a prefix: the full key is a credential.
        write!(f, "PlayerKey(")?;
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "..)")
    }
}

/// A printable ASCII player name of at most 24 bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PlayerName(String);

impl PlayerName {
    /// Builds a name, dropping characters that are not printable ASCII and
    /// truncating to 24 bytes.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(
            name.chars()
                .filter(|c| c.is_ascii_graphic() || *c == ' ')
                .take(NAME_LEN)
                .collect(),
        )
    }

    /// The name as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) {
        let mut padded = [0; NAME_LEN];
        for (slot, byte) in padded.iter_mut().zip(self.0.bytes()) {
            *slot = byte;
        }
        out.extend_from_slice(&padded);
    }

    pub(crate) fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        let raw: [u8; NAME_LEN] = reader.array("player name")?;
        // Padding may sit on either side of the name.
        let text: String = raw
            .iter()
            .filter(|&&byte| byte != 0)
            .map(|&byte| char::from(byte))
            .collect();
        Ok(Self::new(&text))
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Publicly visible player record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetPlayer {
    /// Display name.
    pub name: PlayerName,
    /// Last reported position.
    pub coords: Coords,
    /// Index of the player's sprite skin.
    pub skin: u8,
    /// Players this player has killed.
    pub kills: u16,
    /// Times this player has died.
    pub deaths: u16,
}

impl NetPlayer {
    /// Encoded width in bytes.
    pub const ENCODED_LEN: usize = NAME_LEN + Coords::ENCODED_LEN + 1 + 2 + 2;

    /// Tile the player stands on, `None` while off the map.
    #[must_use]
    pub fn grid_pos(&self) -> Option<Tile> {
        self.coords.grid_pos()
    }

    /// Appends the wire form of the record.
    pub fn encode(&self, out: &mut Vec<u8>) {
        self.name.encode(out);
        self.coords.encode(out);
        out.push(self.skin);
        out.extend_from_slice(&self.kills.to_be_bytes());
        out.extend_from_slice(&self.deaths.to_be_bytes());
    }

    pub(crate) fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            name: PlayerName::decode(reader)?,
            coords: Coords::decode(reader)?,
            skin: reader.u8("skin")?,
            kills: reader.u16("kills")?,
            deaths: reader.u16("deaths")?,
        })
    }
}

/// Player record including the fields only the server and the owning
/// player see.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrivatePlayer {
    /// Public part of the record.
    pub player: NetPlayer,
    /// Hits left before dying; zero while dead.
    pub hits_remaining: u8,
    /// Skin of whoever last killed this player.
    pub last_killer_skin: u8,
}

impl PrivatePlayer {
    /// Encoded width in bytes.
    pub const ENCODED_LEN: usize = NetPlayer::ENCODED_LEN + 2;

    /// Public record shared with other players.
    #[must_use]
    pub fn to_public(&self) -> NetPlayer {
        self.player.clone()
    }

    /// Whether the player can still take hits.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.hits_remaining > 0
    }

    /// Appends the wire form of the record.
    pub fn encode(&self, out: &mut Vec<u8>) {
        self.player.encode(out);
        out.push(self.hits_remaining);
        out.push(self.last_killer_skin);
    }

    /// Decodes a record from exactly [`Self::ENCODED_LEN`] leading bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = Reader::new(bytes);
        Ok(Self {
            player: NetPlayer::decode(&mut reader)?,
            hits_remaining: reader.u8("hits remaining")?,
            last_killer_skin: reader.u8("last killer skin")?,
        })
    }
}
