use std::{
    io,
    net::UdpSocket,
    sync::atomic::{AtomicBool, Ordering},
    time::Instant,
};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::GameServer;

const MAX_DATAGRAM: usize = 4096;

/// Serves requests on `socket` until `running` is cleared.
///
/// Datagrams are handled one at a time in receipt order. A request that
/// fails is logged and dropped. The socket should carry a read timeout so
/// that idle players are evicted and `running` is rechecked while no
/// traffic arrives.
pub fn serve(socket: &UdpSocket, server: &mut GameServer, running: &AtomicBool) -> Result<()> {
    let clock = Instant::now();
    let mut buffer = [0; MAX_DATAGRAM];

    while running.load(Ordering::Relaxed) {
        match socket.recv_from(&mut buffer) {
            Ok((length, addr)) => {
                let datagram = buffer.get(..length).unwrap_or_default();
                match server.handle(datagram, clock.elapsed()) {
                    Ok(Some(reply)) => {
                        if let Err(error) = socket.send_to(&reply, addr) {
                            warn!(%addr, %error, "failed to send reply");
                        }
                    }
                    Ok(None) => debug!(%addr, "request needs no reply"),
                    Err(error) => warn!(%addr, %error, "dropped request"),
                }
            }
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) => {}
            Err(error) => return Err(error).context("failed to receive datagram"),
        }

        for key in server.evict_idle(clock.elapsed()) {
            info!(?key, "evicted idle player");
        }
    }
    Ok(())
}
