// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use sensact_ctrl_rs::{
    controller::state::{ControllerStatus, ServerBinding},
    engine::liveness,
    net::udp::UdpTransport,
    wire::{packet_type::PacketTypeUdp, udp::PduUdp},
};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::integration_tests::common::{bind_server, localhost, shared_state, test_identity};

/// End-to-end scenario 3: after one valid HELLO the server goes silent.
/// Three consecutive steady-loop timeouts (6s of silence) tear the
/// session down.
#[tokio::test]
async fn hello_loss_triggers_disconnection_after_three_misses() -> Result<()> {
    let server = bind_server().await;
    let srv_udp = server.local_addr()?.port();

    let identity = test_identity("CTRL0003", "AABBCCDDEE03", localhost(), srv_udp, 0, &[]);
    let state = shared_state(identity);
    {
        let mut g = state.lock().await;
        g.binding = Some(ServerBinding {
            server_mac: "SERVERMAC03".to_string(),
            server_ip: localhost(),
            rnd: "R0000LIVE".to_string(),
            server_tcp_port: None,
        });
    }

    let client_udp = Arc::new(UdpTransport::bind_ephemeral().await?);
    let server_addr = (localhost(), srv_udp).into();

    // Announce the client's address, as SUBS_INFO would in a real session.
    client_udp.send_udp(b"hello from controller", server_addr).await?;
    let mut buf = [0u8; 103];
    let (_n, client_addr) = server.recv_from(&mut buf).await?;

    let hello = PduUdp::new(PacketTypeUdp::Hello, "SERVERMAC03", "R0000LIVE", "");
    server.send_to(&hello.to_bytes(), client_addr).await?;

    let cancel = CancellationToken::new();
    let (tcp_tx, tcp_rx) = oneshot::channel();
    let receiver = tokio::spawn(liveness::run_receiver(
        state.clone(),
        client_udp.clone(),
        cancel.clone(),
        0,
        tcp_tx,
    ));

    let listener = tokio::time::timeout(Duration::from_secs(2), tcp_rx)
        .await
        .expect("listener handoff timed out")
        .expect("listener handoff channel closed");
    drop(listener);

    receiver.await.expect("receiver task panicked")?;

    assert!(cancel.is_cancelled());
    let g = state.lock().await;
    assert_eq!(g.status, ControllerStatus::NotSubscribed);
    Ok(())
}
