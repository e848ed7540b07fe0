//! TCP transport: one connection per request/response exchange.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{net::SocketAddr, time::Duration};

use thiserror::Error;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

use crate::wire::tcp::PDU_TCP_LEN;

#[derive(Debug, Error)]
pub enum TcpError {
    #[error("tcp bind to port {port} failed: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("tcp io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Listens for one request/response exchange at a time, as required by
/// spec §4.3: each accepted connection services exactly one exchange before
/// being closed.
pub struct TcpListenerHandle {
    listener: TcpListener,
}

impl TcpListenerHandle {
    pub async fn listen(local_port: u16) -> Result<Self, TcpError> {
        let listener = TcpListener::bind(("0.0.0.0", local_port))
            .await
            .map_err(|source| TcpError::Bind {
                port: local_port,
                source,
            })?;
        Ok(Self { listener })
    }

    pub async fn accept_one(&self) -> Result<(TcpStream, SocketAddr), TcpError> {
        let (stream, addr) = self.listener.accept().await?;
        Ok((stream, addr))
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// Reads exactly `PDU_TCP_LEN` bytes within `timeout`, returning `None` on
/// timeout.
pub async fn recv_tcp(
    stream: &mut TcpStream,
    timeout: Duration,
) -> Result<Option<Vec<u8>>, TcpError> {
    let mut buf = [0u8; PDU_TCP_LEN];
    match tokio::time::timeout(timeout, stream.read_exact(&mut buf)).await {
        Ok(Ok(_)) => Ok(Some(buf.to_vec())),
        Ok(Err(e)) => Err(TcpError::Io(e)),
        Err(_elapsed) => Ok(None),
    }
}

/// Writes the full payload to the stream.
pub async fn send_tcp(stream: &mut TcpStream, bytes: &[u8]) -> Result<(), TcpError> {
    stream.write_all(bytes).await?;
    Ok(())
}

/// Dials `addr`, used by the outbound `SEND_DATA` path.
pub async fn dial_tcp(addr: SocketAddr) -> Result<TcpStream, TcpError> {
    Ok(TcpStream::connect(addr).await?)
}
