//! TCP data engine (spec §4.6): services inbound `SET_DATA`/`GET_DATA` from
//! the server on the connection-per-exchange listener, and dispatches
//! outbound `SEND_DATA` requests triggered by the interactive shell.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result, bail};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    controller::state::{ControllerStatus, Credentials, ServerBinding, SharedState},
    net::tcp::{self, TcpListenerHandle},
    wire::{packet_type::PacketTypeTcp, tcp::PduTcp},
};

const RECV_TIMEOUT: Duration = Duration::from_secs(3);

const MSG_UNOWNED_SET: &str = "Received SET_DATA request for an unowned device.";
const MSG_SENSOR_WRITE: &str = "Device is a sensor and can't be assigned with values.";
const MSG_UNOWNED_GET: &str = "Received GET_DATA request for an unowned device.";
const MSG_BAD_CREDENTIALS: &str = "Wrong packet credentials.";

/// Accepts connections until `cancel` fires, servicing exactly one exchange
/// per accepted connection, each on its own task.
pub async fn run_inbound(
    state: SharedState,
    listener: Arc<TcpListenerHandle>,
    cancel: CancellationToken,
) -> Result<()> {
    loop {
        let accepted = tokio::select! {
            res = listener.accept_one() => res,
            () = cancel.cancelled() => return Ok(()),
        };
        let (mut stream, peer) = accepted.context("TCP accept failed")?;
        let state = state.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = service_one(&state, &mut stream, peer, &cancel).await {
                warn!(error = %e, "inbound TCP exchange failed");
            }
        });
    }
}

async fn service_one(
    state: &SharedState,
    stream: &mut TcpStream,
    peer: SocketAddr,
    cancel: &CancellationToken,
) -> Result<()> {
    let Some(bytes) = tcp::recv_tcp(stream, RECV_TIMEOUT).await? else {
        return Ok(());
    };
    let pdu = PduTcp::from_bytes(&bytes)?;

    let IpAddr::V4(src_ip) = peer.ip() else {
        bail!("unexpected non-IPv4 peer on the TCP data listener");
    };
    let creds = Credentials {
        mac: pdu.mac.clone(),
        rnd: pdu.rnd.clone(),
        source_ip: src_ip,
    };

    let binding = { state.lock().await.binding.clone() };
    let Some(binding) = binding else {
        bail!("inbound TCP exchange arrived with no active binding");
    };

    if !binding.matches(&creds) {
        let mac = { state.lock().await.identity.mac.clone() };
        let rej = PduTcp::new(
            PacketTypeTcp::DataRej,
            mac,
            binding.rnd.clone(),
            pdu.device.clone(),
            pdu.value.clone(),
            MSG_BAD_CREDENTIALS,
        );
        tcp::send_tcp(stream, &rej.to_bytes()).await.ok();
        invalidate(state, cancel).await;
        return Ok(());
    }

    let reply = match pdu.packet_type {
        PacketTypeTcp::SetData => handle_set_data(state, &pdu, &binding).await,
        PacketTypeTcp::GetData => handle_get_data(state, &pdu, &binding).await,
        other => {
            warn!(?other, "unexpected packet type on the TCP data listener");
            invalidate(state, cancel).await;
            return Ok(());
        },
    };

    tcp::send_tcp(stream, &reply.to_bytes()).await?;
    Ok(())
}

async fn handle_set_data(state: &SharedState, pdu: &PduTcp, binding: &ServerBinding) -> PduTcp {
    let mut g = state.lock().await;
    let mac = g.identity.mac.clone();
    if !g.identity.owns(&pdu.device) {
        return nack(&mac, binding, pdu, MSG_UNOWNED_SET);
    }
    if pdu.device.ends_with('O') {
        return nack(&mac, binding, pdu, MSG_SENSOR_WRITE);
    }
    g.identity.set(&pdu.device, &pdu.value);
    ack(&mac, binding, &pdu.device, &pdu.value)
}

async fn handle_get_data(state: &SharedState, pdu: &PduTcp, binding: &ServerBinding) -> PduTcp {
    let g = state.lock().await;
    match g.identity.get(&pdu.device) {
        Some(value) => ack(&g.identity.mac, binding, &pdu.device, value),
        None => nack(&g.identity.mac, binding, pdu, MSG_UNOWNED_GET),
    }
}

fn ack(mac: &str, binding: &ServerBinding, device: &str, value: &str) -> PduTcp {
    PduTcp::new(
        PacketTypeTcp::DataAck,
        mac.to_string(),
        binding.rnd.clone(),
        device,
        value,
        "",
    )
}

fn nack(mac: &str, binding: &ServerBinding, pdu: &PduTcp, info: &str) -> PduTcp {
    PduTcp::new(
        PacketTypeTcp::DataNack,
        mac.to_string(),
        binding.rnd.clone(),
        pdu.device.clone(),
        pdu.value.clone(),
        info,
    )
}

async fn invalidate(state: &SharedState, cancel: &CancellationToken) {
    let mut g = state.lock().await;
    g.set_status(ControllerStatus::NotSubscribed);
    drop(g);
    cancel.cancel();
}

/// Dials the server and issues a `SEND_DATA` for `device`, spawned in the
/// background by the `send` shell command.
pub async fn send_outbound(state: SharedState, cancel: CancellationToken, device: String) -> Result<()> {
    let (mac, value, server, binding) = {
        let g = state.lock().await;
        let Some(value) = g.identity.get(&device).map(str::to_string) else {
            bail!("cannot SEND_DATA for unowned device {device}");
        };
        let binding = g
            .binding
            .clone()
            .context("cannot SEND_DATA without an active binding")?;
        (g.identity.mac.clone(), value, g.identity.server, binding)
    };
    let Some(port) = binding.server_tcp_port else {
        bail!("cannot SEND_DATA before INFO_ACK has assigned a TCP port");
    };

    let addr = SocketAddr::from((server, port));
    let mut stream = tcp::dial_tcp(addr)
        .await
        .context("failed to dial server for SEND_DATA")?;

    let req = PduTcp::new(
        PacketTypeTcp::SendData,
        mac,
        binding.rnd.clone(),
        device.clone(),
        value.clone(),
        "",
    );
    tcp::send_tcp(&mut stream, &req.to_bytes()).await?;

    let Some(bytes) = tcp::recv_tcp(&mut stream, RECV_TIMEOUT).await? else {
        info!(%device, "no reply to SEND_DATA within the timeout");
        return Ok(());
    };
    let reply = PduTcp::from_bytes(&bytes)?;

    if reply.mac != binding.server_mac || reply.rnd != binding.rnd {
        warn!("credential mismatch on SEND_DATA reply");
        invalidate(&state, &cancel).await;
        return Ok(());
    }
    if reply.device != device || reply.value != value {
        warn!("SEND_DATA reply echoes a different device/value than requested");
        invalidate(&state, &cancel).await;
        return Ok(());
    }

    match reply.packet_type {
        PacketTypeTcp::DataAck => info!(%device, "SEND_DATA acknowledged"),
        PacketTypeTcp::DataNack => warn!(%device, info = %reply.info, "SEND_DATA rejected"),
        PacketTypeTcp::DataRej => {
            warn!("SEND_DATA credentials rejected by server");
            invalidate(&state, &cancel).await;
        },
        other => {
            warn!(?other, "unexpected reply to SEND_DATA");
            invalidate(&state, &cancel).await;
        },
    }
    Ok(())
}
