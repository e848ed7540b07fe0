//! HELLO sender/receiver tasks (spec §4.5). The pair shares a
//! [`CancellationToken`] as the disconnection signal: whichever side notices
//! the session has gone bad cancels it, and every other task tears down on
//! its next poll.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result, bail};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{
    controller::state::{ControllerStatus, Credentials, SharedState},
    net::{tcp::TcpListenerHandle, udp::UdpTransport},
    wire::{packet_type::PacketTypeUdp, udp::PduUdp},
};

const HELLO_INTERVAL: Duration = Duration::from_secs(2);
const INITIAL_TIMEOUT: Duration = Duration::from_secs(4);
const STEADY_TIMEOUT: Duration = Duration::from_secs(2);
const MAX_MISSED: u32 = 3;

/// Sends `HELLO` every [`HELLO_INTERVAL`] until `cancel` fires. Assumes a
/// binding is already established — the caller only spawns this once
/// subscribed.
pub async fn run_sender(
    state: SharedState,
    udp: Arc<UdpTransport>,
    cancel: CancellationToken,
) -> Result<()> {
    loop {
        let (mac, name, situation, srv_udp, server_ip, rnd) = {
            let g = state.lock().await;
            let binding = g
                .binding
                .as_ref()
                .context("HELLO sender started without a binding")?;
            (
                g.identity.mac.clone(),
                g.identity.name.clone(),
                g.identity.situation.clone(),
                g.identity.srv_udp,
                binding.server_ip,
                binding.rnd.clone(),
            )
        };

        let hello = PduUdp::new(PacketTypeUdp::Hello, mac, rnd, format!("{name},{situation}"));
        let dest = SocketAddr::from((server_ip, srv_udp));
        if let Err(e) = udp.send_udp(&hello.to_bytes(), dest).await {
            warn!(error = %e, "failed to send HELLO");
        }

        tokio::select! {
            () = tokio::time::sleep(HELLO_INTERVAL) => {},
            () = cancel.cancelled() => return Ok(()),
        }
    }
}

/// Runs the initial-HELLO check followed by the steady miss-counting loop.
/// On success, opens the TCP listener and hands it to the caller over
/// `listener_tx` before entering the steady loop — this is what guarantees
/// the listener never opens before the first valid HELLO (spec §5).
pub async fn run_receiver(
    state: SharedState,
    udp: Arc<UdpTransport>,
    cancel: CancellationToken,
    local_tcp: u16,
    listener_tx: oneshot::Sender<Arc<TcpListenerHandle>>,
) -> Result<()> {
    let expected = {
        let g = state.lock().await;
        g.binding
            .clone()
            .context("HELLO receiver started without a binding")?
    };

    let Some((bytes, src)) = udp.recv_udp(INITIAL_TIMEOUT).await? else {
        warn!("no HELLO received within the initial window");
        cancel.cancel();
        return Ok(());
    };
    let pdu = PduUdp::from_bytes(&bytes)?;

    if pdu.packet_type == PacketTypeUdp::HelloRej {
        warn!("received HELLO_REJ on the initial liveness check");
        cancel.cancel();
        return Ok(());
    }

    let creds = to_credentials(&pdu, src)?;
    if !expected.matches(&creds) {
        warn!("credential mismatch on initial HELLO");
        let rej = pdu.with_packet_type(PacketTypeUdp::HelloRej);
        udp.send_udp(&rej.to_bytes(), src).await.ok();
        cancel.cancel();
        return Ok(());
    }

    let listener = TcpListenerHandle::listen(local_tcp)
        .await
        .context("failed to open TCP listener after first valid HELLO")?;
    let listener = Arc::new(listener);

    {
        let mut g = state.lock().await;
        g.set_status(ControllerStatus::SendHello);
        g.subs_attempts = 0;
    }

    if listener_tx.send(listener).is_err() {
        bail!("no one was waiting for the TCP listener handoff");
    }

    run_steady_loop(&state, &udp, &cancel).await
}

async fn run_steady_loop(
    state: &SharedState,
    udp: &UdpTransport,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut missed: u32 = 0;

    loop {
        let Some((bytes, src)) = udp.recv_udp(STEADY_TIMEOUT).await? else {
            missed += 1;
            if missed >= MAX_MISSED {
                warn!("3 consecutive HELLO lost");
                let mut g = state.lock().await;
                g.set_status(ControllerStatus::NotSubscribed);
                drop(g);
                cancel.cancel();
                return Ok(());
            }
            continue;
        };

        let Ok(pdu) = PduUdp::from_bytes(&bytes) else {
            missed += 1;
            continue;
        };

        if pdu.packet_type == PacketTypeUdp::HelloRej {
            let mut g = state.lock().await;
            g.set_status(ControllerStatus::NotSubscribed);
            drop(g);
            cancel.cancel();
            return Ok(());
        }

        let creds = to_credentials(&pdu, src)?;
        let binding = { state.lock().await.binding.clone() };
        let Some(binding) = binding else {
            continue;
        };

        if binding.matches(&creds) {
            missed = 0;
            continue;
        }

        warn!("credential mismatch on steady-state HELLO");
        let rej = pdu.with_packet_type(PacketTypeUdp::HelloRej);
        udp.send_udp(&rej.to_bytes(), src).await.ok();
        let mut g = state.lock().await;
        g.set_status(ControllerStatus::NotSubscribed);
        drop(g);
        cancel.cancel();
        return Ok(());
    }
}

fn to_credentials(pdu: &PduUdp, src: SocketAddr) -> Result<Credentials> {
    let IpAddr::V4(source_ip) = src.ip() else {
        bail!("HELLO arrived from a non-IPv4 source");
    };
    Ok(Credentials {
        mac: pdu.mac.clone(),
        rnd: pdu.rnd.clone(),
        source_ip,
    })
}
