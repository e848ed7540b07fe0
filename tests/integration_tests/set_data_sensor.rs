// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use sensact_ctrl_rs::{
    controller::state::ServerBinding,
    engine::data,
    net::tcp::{self, TcpListenerHandle},
    wire::{packet_type::PacketTypeTcp, tcp::PduTcp},
};
use tokio_util::sync::CancellationToken;

use crate::integration_tests::common::{localhost, shared_state, test_identity};

/// End-to-end scenario 4: a `SET_DATA` against a sensor (`-O`) device is
/// rejected and the local value is left untouched.
#[tokio::test]
async fn set_data_on_sensor_is_rejected() -> Result<()> {
    let identity = test_identity(
        "CTRL0004",
        "AABBCCDDEE04",
        localhost(),
        19100,
        0,
        &[("TMP-1-O", "22")],
    );
    let state = shared_state(identity);
    {
        let mut g = state.lock().await;
        g.binding = Some(ServerBinding {
            server_mac: "SERVERMAC04".to_string(),
            server_ip: localhost(),
            rnd: "R0000TEST".to_string(),
            server_tcp_port: Some(0),
        });
    }

    let listener = Arc::new(TcpListenerHandle::listen(0).await?);
    let port = listener.local_addr()?.port();
    let cancel = CancellationToken::new();
    let inbound = tokio::spawn(data::run_inbound(state.clone(), listener, cancel.clone()));

    let mut client = tcp::dial_tcp((localhost(), port).into()).await?;
    let req = PduTcp::new(
        PacketTypeTcp::SetData,
        "SERVERMAC04",
        "R0000TEST",
        "TMP-1-O",
        "30",
        "",
    );
    tcp::send_tcp(&mut client, &req.to_bytes()).await?;
    let bytes = tcp::recv_tcp(&mut client, Duration::from_secs(2))
        .await?
        .expect("reply");
    let reply = PduTcp::from_bytes(&bytes)?;

    assert_eq!(reply.packet_type, PacketTypeTcp::DataNack);
    assert_eq!(reply.device, "TMP-1-O");
    assert_eq!(reply.value, "30");
    assert_eq!(reply.info, "Device is a sensor and can't be assigned with values.");

    {
        let g = state.lock().await;
        assert_eq!(g.identity.get("TMP-1-O"), Some("22"));
    }

    cancel.cancel();
    inbound.abort();
    Ok(())
}
