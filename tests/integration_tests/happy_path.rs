// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use sensact_ctrl_rs::{
    controller::state::ControllerStatus,
    net::udp::UdpTransport,
    state_machine::subscription,
    wire::{packet_type::PacketTypeUdp, udp::PduUdp},
};
use tokio::time::timeout;

use crate::integration_tests::common::{bind_server, localhost, shared_state, test_identity};

/// End-to-end scenario 1: `SUBS_REQ` → `SUBS_ACK` (new port) → `SUBS_INFO` →
/// `INFO_ACK`, ending `SUBSCRIBED` with a fully populated binding.
#[tokio::test]
async fn subscribes_through_the_full_handshake() -> Result<()> {
    let server = bind_server().await;
    let srv_udp = server.local_addr()?.port();

    let identity = test_identity("CTRL0001", "AABBCCDDEEFF", localhost(), srv_udp, 19000, &[]);
    let state = shared_state(identity);
    let client_udp = Arc::new(UdpTransport::bind_ephemeral().await?);

    let server_task = tokio::spawn(async move {
        let mut buf = [0u8; 103];
        let (n, client_addr) = server.recv_from(&mut buf).await.expect("recv SUBS_REQ");
        let req = PduUdp::from_bytes(&buf[..n]).expect("decode SUBS_REQ");
        assert_eq!(req.packet_type, PacketTypeUdp::SubsReq);
        assert_eq!(req.rnd, "00000000");
        assert_eq!(req.data, "CTRL0001,B01L02R03A04");

        let phase2 = bind_server().await;
        let phase2_port = phase2.local_addr().expect("addr").port();

        let ack = PduUdp::new(
            PacketTypeUdp::SubsAck,
            "SERVERMAC01",
            "R0000ABCD",
            phase2_port.to_string(),
        );
        server
            .send_to(&ack.to_bytes(), client_addr)
            .await
            .expect("send SUBS_ACK");

        let mut buf2 = [0u8; 103];
        let (n2, client_addr2) = phase2.recv_from(&mut buf2).await.expect("recv SUBS_INFO");
        let info = PduUdp::from_bytes(&buf2[..n2]).expect("decode SUBS_INFO");
        assert_eq!(info.packet_type, PacketTypeUdp::SubsInfo);
        assert_eq!(info.rnd, "R0000ABCD");
        assert_eq!(info.data, "19000,");

        let info_ack = PduUdp::new(PacketTypeUdp::InfoAck, "SERVERMAC01", "R0000ABCD", "12500");
        phase2
            .send_to(&info_ack.to_bytes(), client_addr2)
            .await
            .expect("send INFO_ACK");
    });

    timeout(Duration::from_secs(5), subscription::subscribe(&state, &client_udp))
        .await
        .expect("subscribe timed out")
        .expect("subscribe failed");

    server_task.await.expect("server task");

    let g = state.lock().await;
    assert_eq!(g.status, ControllerStatus::Subscribed);
    let binding = g.binding.as_ref().expect("binding present");
    assert_eq!(binding.server_mac, "SERVERMAC01");
    assert_eq!(binding.rnd, "R0000ABCD");
    assert_eq!(binding.server_tcp_port, Some(12500));
    Ok(())
}
