//! UDP transport: `send_udp` with a full-payload-sent guarantee and
//! `recv_udp` with a per-call timeout, mirroring the teacher's
//! `io_with_timeout` helper but specialised to a single datagram socket.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{net::SocketAddr, time::Duration};

use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::debug;

use crate::wire::udp::PDU_UDP_LEN;

#[derive(Debug, Error)]
pub enum SendError {
    #[error("udp send failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum RecvError {
    #[error("udp recv failed: {0}")]
    Io(std::io::Error),
}

/// Wraps a bound `UdpSocket` and exposes the send/recv primitives the
/// subscription and liveness engines need. Each caller configures its own
/// timeout per call, since the subscription ladder and the liveness loop use
/// different values (spec §4.2).
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Binds an ephemeral UDP socket on `0.0.0.0:0`, matching the
    /// "ephemeral source port, binds to 0" requirement for the controller's
    /// outbound UDP endpoint.
    pub async fn bind_ephemeral() -> std::io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Sends the full packet to `dest`, retrying the unsent remainder if the
    /// kernel only accepted a prefix of the datagram. UDP `send_to` normally
    /// either sends the whole datagram or errors, but the retry loop matches
    /// the reference behaviour's defensive stance of not assuming the whole
    /// payload always lands in one call.
    pub async fn send_udp(&self, packet: &[u8], dest: SocketAddr) -> Result<(), SendError> {
        let mut sent = 0usize;
        while sent < packet.len() {
            let n = self.socket.send_to(&packet[sent..], dest).await?;
            if n == 0 {
                return Err(SendError::Io(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "udp send_to wrote zero bytes",
                )));
            }
            sent += n;
        }
        Ok(())
    }

    /// Performs a single `recv_from` of exactly `PDU_UDP_LEN` bytes with the
    /// given timeout. Returns `Ok(None)` on timeout; any other I/O error is
    /// fatal.
    pub async fn recv_udp(
        &self,
        timeout: Duration,
    ) -> Result<Option<(Vec<u8>, SocketAddr)>, RecvError> {
        let mut buf = [0u8; PDU_UDP_LEN];
        match tokio::time::timeout(timeout, self.socket.recv_from(&mut buf)).await {
            Ok(Ok((n, addr))) => {
                debug!(bytes = n, %addr, "recv_udp");
                Ok(Some((buf[..n].to_vec(), addr)))
            },
            Ok(Err(e)) => Err(RecvError::Io(e)),
            Err(_elapsed) => Ok(None),
        }
    }
}
