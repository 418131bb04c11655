#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Client side of the Maze Hunt UDP protocol.
//!
//! Every request that expects a reply waits a bounded time for it and is
//! resent a fixed number of times, each wait a little longer than the
//! last. Respawn and leave are sent once and never acknowledged.

use std::{
    io,
    net::{SocketAddr, ToSocketAddrs, UdpSocket},
    time::{Duration, Instant},
};

use maze_hunt_core::DVec2;
use maze_hunt_protocol::{
    CoopStatus, Coords, DeathmatchStatus, JoinReply, PlayerKey, PlayerName, ProtocolError,
    Request, ShotResult,
};
use tracing::debug;

/// Failures talking to the server.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The socket could not be created or used.
    #[error("socket error: {0}")]
    Io(#[from] io::Error),
    /// The server address did not resolve.
    #[error("could not resolve server address {0}")]
    Unresolved(String),
    /// No valid reply arrived within the retry budget.
    #[error("no reply from {server} after {attempts} attempts")]
    Timeout {
        /// Address the requests went to.
        server: SocketAddr,
        /// Number of times the request was sent.
        attempts: u32,
    },
    /// Only undecodable replies arrived within the retry budget.
    #[error("malformed reply: {0}")]
    Protocol(#[from] ProtocolError),
    /// The request needs a key but the client has not joined.
    #[error("not joined to a server")]
    NotJoined,
}

/// How long to wait for replies and how often to resend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Times a request is sent before giving up. At least one send happens.
    pub attempts: u32,
    /// Wait after the first send.
    pub timeout: Duration,
    /// Extra wait added for every further send.
    pub backoff: Duration,
}

impl RetryPolicy {
    fn wait_for(&self, attempt: u32) -> Duration {
        self.timeout.saturating_add(self.backoff.saturating_mul(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            timeout: Duration::from_millis(100),
            backoff: Duration::from_millis(50),
        }
    }
}

/// A connection to one server.
#[derive(Debug)]
pub struct NetClient {
    socket: UdpSocket,
    server: SocketAddr,
    policy: RetryPolicy,
    key: Option<PlayerKey>,
}

impl NetClient {
    /// Opens a socket on an ephemeral port for talking to `server`.
    pub fn connect(server: impl ToSocketAddrs + std::fmt::Debug) -> Result<Self, ClientError> {
        let label = format!("{server:?}");
        let server = server
            .to_socket_addrs()
            .map_err(|_| ClientError::Unresolved(label.clone()))?
            .next()
            .ok_or(ClientError::Unresolved(label))?;
        let bind = if server.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        Ok(Self {
            socket: UdpSocket::bind(bind)?,
            server,
            policy: RetryPolicy::default(),
            key: None,
        })
    }

    /// Replaces the retry policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Address of the server.
    #[must_use]
    pub const fn server(&self) -> SocketAddr {
        self.server
    }

    /// Key handed out by the server, once joined.
    #[must_use]
    pub const fn key(&self) -> Option<PlayerKey> {
        self.key
    }

    /// Joins the server under `name` and remembers the assigned key.
    ///
    /// A full server never answers, so this ends in
    /// [`ClientError::Timeout`].
    pub fn join(&mut self, name: &str) -> Result<JoinReply, ClientError> {
        let request = Request::Join {
            name: PlayerName::new(name),
        };
        let reply = self.exchange(&request, |bytes| {
            exact_len(bytes, JoinReply::ENCODED_LEN, "join reply")?;
            JoinReply::decode(bytes)
        })?;
        self.key = Some(reply.key);
        Ok(reply)
    }

    /// Reports `position` to a deathmatch server and returns the match
    /// state.
    pub fn ping(&self, position: DVec2) -> Result<DeathmatchStatus, ClientError> {
        let request = Request::Ping {
            key: self.joined_key()?,
            position: Coords::from_point(position),
        };
        self.exchange(&request, DeathmatchStatus::decode)
    }

    /// Reports `position` to a co-op server and returns the match state.
    pub fn ping_coop(&self, position: DVec2) -> Result<CoopStatus, ClientError> {
        let request = Request::Ping {
            key: self.joined_key()?,
            position: Coords::from_point(position),
        };
        self.exchange(&request, CoopStatus::decode)
    }

    /// Fires from `origin` along `facing`.
    pub fn fire(&self, origin: DVec2, facing: DVec2) -> Result<ShotResult, ClientError> {
        let request = Request::Fire {
            key: self.joined_key()?,
            origin: Coords::from_point(origin),
            facing: Coords::from_point(facing),
        };
        self.exchange(&request, |bytes| {
            exact_len(bytes, 1, "shot result")?;
            ShotResult::decode(bytes)
        })
    }

    /// Asks to be respawned. The server ignores it while the player lives.
    pub fn respawn(&self) -> Result<(), ClientError> {
        let request = Request::Respawn {
            key: self.joined_key()?,
        };
        self.send(&request)
    }

    /// Tells the server the player is gone and forgets the key.
    pub fn leave(&mut self) -> Result<(), ClientError> {
        let request = Request::Leave {
            key: self.joined_key()?,
        };
        self.send(&request)?;
        self.key = None;
        Ok(())
    }

    fn joined_key(&self) -> Result<PlayerKey, ClientError> {
        self.key.ok_or(ClientError::NotJoined)
    }

    fn send(&self, request: &Request) -> Result<(), ClientError> {
        let _ = self.socket.send_to(&request.encode(), self.server)?;
        Ok(())
    }

    fn exchange<T>(
        &self,
        request: &Request,
        decode: impl Fn(&[u8]) -> Result<T, ProtocolError>,
    ) -> Result<T, ClientError> {
        let datagram = request.encode();
        let mut buffer = [0; 16384];
        let mut last_error = None;

        for attempt in 0..self.policy.attempts.max(1) {
            if attempt > 0 {
                debug!(op = ?request.op_code(), attempt, "resending request");
            }
            let _ = self.socket.send_to(&datagram, self.server)?;
            let deadline = Instant::now() + self.policy.wait_for(attempt);

            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                self.socket.set_read_timeout(Some(remaining))?;
                let (length, from) = match self.socket.recv_from(&mut buffer) {
                    Ok(received) => received,
                    Err(error)
                        if matches!(
                            error.kind(),
                            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                        ) =>
                    {
                        break
                    }
                    Err(error) => return Err(error.into()),
                };
                if from != self.server {
                    continue;
                }
                match decode(buffer.get(..length).unwrap_or_default()) {
                    Ok(reply) => return Ok(reply),
                    // Most likely a late reply to an earlier request.
                    Err(error) => last_error = Some(error),
                }
            }
        }

        Err(last_error.map_or(
            ClientError::Timeout {
                server: self.server,
                attempts: self.policy.attempts.max(1),
            },
            ClientError::Protocol,
        ))
    }
}

fn exact_len(bytes: &[u8], expected: usize, field: &'static str) -> Result<(), ProtocolError> {
    if bytes.len() == expected {
        Ok(())
    } else {
        Err(ProtocolError::Truncated {
            field,
            expected,
            remaining: bytes.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waits_grow_linearly() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.wait_for(0), Duration::from_millis(100));
        assert_eq!(policy.wait_for(2), Duration::from_millis(200));
    }

    #[test]
    fn keyed_requests_need_a_join() {
        let client = NetClient::connect("127.0.0.1:9").expect("socket");

        assert!(matches!(
            client.ping(DVec2::ZERO),
            Err(ClientError::NotJoined)
        ));
        assert!(matches!(client.respawn(), Err(ClientError::NotJoined)));
    }

    #[test]
    fn replies_of_the_wrong_size_are_rejected() {
        assert!(exact_len(&[1], 1, "shot result").is_ok());
        assert!(matches!(
            exact_len(&[1, 2], 1, "shot result"),
            Err(ProtocolError::Truncated { remaining: 2, .. })
        ));
    }
}
