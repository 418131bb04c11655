#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Binary wire protocol spoken between Maze Hunt clients and the
//! multiplayer server.
//!
//! Every integer is big-endian and every record has a fixed width. A request
//! is a one-byte op code, the sender's 32-byte player key and an op-specific
//! payload. Positions travel as [`Coords`], fixed-point values carrying two
//! decimal places.

mod codec;
mod messages;

pub use codec::{Coords, NetPlayer, PlayerKey, PlayerName, PrivatePlayer};
pub use messages::{CoopStatus, DeathmatchStatus, JoinReply, OpCode, Request, ShotResult};

/// Length of the private key identifying a joined player.
pub const PLAYER_KEY_LEN: usize = 32;

/// Length of the zero-padded ASCII player name.
pub const NAME_LEN: usize = 24;

/// Maximum number of players a server accepts.
pub const MAX_PLAYERS: usize = 255;

/// Hits a player can take before dying.
pub const SHOTS_UNTIL_DEAD: u8 = 10;

/// Failures decoding a datagram.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The datagram carried no bytes at all.
    #[error("datagram is empty")]
    Empty,
    /// The op code is not part of the protocol.
    #[error("unknown op code {0}")]
    UnknownOpCode(u8),
    /// The shot result byte is not part of the protocol.
    #[error("unknown shot result {0}")]
    UnknownShotResult(u8),
    /// The datagram ended before a field was complete.
    #[error("{field} needs {expected} bytes but only {remaining} remain")]
    Truncated {
        /// Field being decoded.
        field: &'static str,
        /// Bytes the field occupies.
        expected: usize,
        /// Bytes left in the datagram.
        remaining: usize,
    },
}
