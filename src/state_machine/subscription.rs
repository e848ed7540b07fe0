//! Drives the `SUBS_REQ` → `SUBS_ACK` → `SUBS_INFO` → `INFO_ACK` handshake
//! with its retry/backoff ladder (spec §4.4).
//!
//! The reference implementation re-enters this algorithm recursively on a
//! failed attempt; that becomes an explicit `for attempt in 0..MAX_ATTEMPTS`
//! loop here, since recursion depth would otherwise just mirror the attempt
//! count for no benefit.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    net::{IpAddr, SocketAddr},
    time::Duration,
};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::{
    controller::state::{ControllerStatus, ServerBinding, SharedState},
    net::udp::UdpTransport,
    state_machine::common::Transition,
    wire::{packet_type::PacketTypeUdp, udp::PduUdp},
};

/// Base wait (`t`).
const BASE_WAIT: Duration = Duration::from_secs(1);
/// Inter-attempt pause (`u`).
const ATTEMPT_PAUSE: Duration = Duration::from_secs(2);
/// Packets per attempt (`n`).
const PACKETS_PER_ATTEMPT: u32 = 7;
/// Max attempts (`o`).
const MAX_ATTEMPTS: u32 = 3;
/// Packets after which wait grows (`p`).
const GROWTH_THRESHOLD: u32 = 3;
/// Max wait multiplier (`q`).
const MAX_MULTIPLIER: u32 = 3;

/// Drives up to [`MAX_ATTEMPTS`] subscription attempts. On success the
/// controller's binding is populated and its status is `SUBSCRIBED`. On
/// exhaustion the status is set to `DISCONNECTED` and an error is returned —
/// the caller should surface this to the operator as fatal.
pub async fn subscribe(state: &SharedState, udp: &UdpTransport) -> Result<()> {
    for attempt in 0..MAX_ATTEMPTS {
        {
            let mut g = state.lock().await;
            g.subs_attempts = attempt + 1;
        }
        info!(attempt = attempt + 1, max = MAX_ATTEMPTS, "subscription attempt");

        if let Transition::Done(()) = run_one_attempt(state, udp).await? {
            return Ok(());
        }
    }

    let mut g = state.lock().await;
    g.set_status(ControllerStatus::Disconnected);
    bail!("subscription failed after {MAX_ATTEMPTS} attempts");
}

/// One attempt: up to [`PACKETS_PER_ATTEMPT`] `SUBS_REQ` datagrams with a
/// growing wait. Returns `Transition::Done(())` on a completed subscription,
/// `Transition::Stay` if this attempt should be retried.
async fn run_one_attempt(state: &SharedState, udp: &UdpTransport) -> Result<Transition<()>> {
    let (mac, name, situation, server, srv_udp) = {
        let g = state.lock().await;
        (
            g.identity.mac.clone(),
            g.identity.name.clone(),
            g.identity.situation.clone(),
            g.identity.server,
            g.identity.srv_udp,
        )
    };
    let server_addr = SocketAddr::from((server, srv_udp));

    let mut wait = BASE_WAIT;
    let mut grown = false;
    for k in 0..PACKETS_PER_ATTEMPT {
        {
            let mut g = state.lock().await;
            g.set_status(ControllerStatus::WaitAckSubs);
        }

        let req = PduUdp::new(
            PacketTypeUdp::SubsReq,
            mac.clone(),
            "00000000",
            format!("{name},{situation}"),
        );
        udp.send_udp(&req.to_bytes(), server_addr).await?;

        let Some((bytes, src)) = udp.recv_udp(wait).await? else {
            grow_wait(&mut wait, &mut grown, k);
            continue;
        };

        let Ok(pdu) = PduUdp::from_bytes(&bytes) else {
            // malformed/unknown packet type is treated as SUBS_REJ: the
            // current attempt aborts, but the outer driver still gets to
            // try again, so this is `Stay`, not `Done`.
            let mut g = state.lock().await;
            g.set_status(ControllerStatus::NotSubscribed);
            return Ok(Transition::Stay);
        };

        match pdu.packet_type {
            PacketTypeUdp::SubsAck => {
                return handle_subs_ack(state, udp, &mac, &pdu, src, wait).await;
            },
            PacketTypeUdp::SubsNack => {
                let mut g = state.lock().await;
                g.set_status(ControllerStatus::NotSubscribed);
                drop(g);
                grow_wait(&mut wait, &mut grown, k);
                continue;
            },
            PacketTypeUdp::SubsRej => {
                let mut g = state.lock().await;
                g.set_status(ControllerStatus::NotSubscribed);
                return Ok(Transition::Stay);
            },
            other => {
                warn!(?other, "unexpected packet in WAIT_ACK_SUBS, treated as SUBS_REJ");
                let mut g = state.lock().await;
                g.set_status(ControllerStatus::NotSubscribed);
                return Ok(Transition::Stay);
            },
        }
    }

    // Loop exhausted without SUBS_ACK.
    tokio::time::sleep(ATTEMPT_PAUSE).await;
    Ok(Transition::Stay)
}

/// Doubles `wait` exactly once per attempt, after the `p`-th packet has gone
/// unanswered, capping at `q·t`. `k` is the 0-indexed packet just sent, so
/// `k+1` is the count of packets sent so far; growing on `k+1 > p` (not
/// `>=`) and latching `grown` is what produces the documented `t,t,t,t,
/// 2t,2t,2t` ladder for `p=3` instead of re-triggering on every subsequent
/// timeout.
fn grow_wait(wait: &mut Duration, grown: &mut bool, k: u32) {
    if *grown || k + 1 <= GROWTH_THRESHOLD {
        return;
    }
    let doubled = *wait * 2;
    *wait = doubled.min(BASE_WAIT * MAX_MULTIPLIER);
    *grown = true;
}

async fn handle_subs_ack(
    state: &SharedState,
    udp: &UdpTransport,
    mac: &str,
    pdu: &PduUdp,
    src: SocketAddr,
    current_wait: Duration,
) -> Result<Transition<()>> {
    let IpAddr::V4(server_ip) = src.ip() else {
        bail!("SUBS_ACK arrived from a non-IPv4 source");
    };

    let new_port: u16 = pdu
        .data
        .trim()
        .parse()
        .context("SUBS_ACK.data is not a valid port number")?;
    let info_dest = SocketAddr::from((server_ip, new_port));

    let binding = ServerBinding {
        server_mac: pdu.mac.clone(),
        server_ip,
        rnd: pdu.rnd.clone(),
        server_tcp_port: None,
    };

    let info_data = {
        let g = state.lock().await;
        format!(
            "{},{}",
            g.identity.local_tcp,
            g.identity.element_ids_joined()
        )
    };
    let info_pdu = PduUdp::new(
        PacketTypeUdp::SubsInfo,
        mac.to_string(),
        binding.rnd.clone(),
        info_data,
    );
    udp.send_udp(&info_pdu.to_bytes(), info_dest).await?;

    {
        let mut g = state.lock().await;
        g.binding = Some(binding.clone());
        g.set_status(ControllerStatus::WaitAckInfo);
    }

    await_info_ack(state, udp, &binding, current_wait).await
}

/// WAIT_ACK_INFO phase: one more `recv_udp` at the current timeout.
async fn await_info_ack(
    state: &SharedState,
    udp: &UdpTransport,
    binding: &ServerBinding,
    timeout: Duration,
) -> Result<Transition<()>> {
    let recv = udp.recv_udp(timeout).await?;

    let accepted = recv.and_then(|(bytes, _src)| {
        let pdu = PduUdp::from_bytes(&bytes).ok()?;
        (pdu.packet_type == PacketTypeUdp::InfoAck
            && pdu.mac == binding.server_mac
            && pdu.rnd == binding.rnd)
            .then_some(pdu)
    });

    let Some(pdu) = accepted else {
        let mut g = state.lock().await;
        g.binding = None;
        g.set_status(ControllerStatus::NotSubscribed);
        return Ok(Transition::Stay);
    };

    let tcp_port: u16 = pdu
        .data
        .trim()
        .parse()
        .context("INFO_ACK.data is not a valid port number")?;

    let mut g = state.lock().await;
    if let Some(b) = g.binding.as_mut() {
        b.server_tcp_port = Some(tcp_port);
    }
    g.set_status(ControllerStatus::Subscribed);
    Ok(Transition::Done(()))
}
