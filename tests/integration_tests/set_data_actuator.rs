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

/// End-to-end scenario 5: a `SET_DATA` against an actuator (`-I`) device is
/// applied locally and acknowledged.
#[tokio::test]
async fn set_data_on_actuator_is_applied() -> Result<()> {
    let identity = test_identity(
        "CTRL0005",
        "AABBCCDDEE05",
        localhost(),
        19101,
        0,
        &[("LGT-1-I", "OFF")],
    );
    let state = shared_state(identity);
    {
        let mut g = state.lock().await;
        g.binding = Some(ServerBinding {
            server_mac: "SERVERMAC05".to_string(),
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
        "SERVERMAC05",
        "R0000TEST",
        "LGT-1-I",
        "ON",
        "",
    );
    tcp::send_tcp(&mut client, &req.to_bytes()).await?;
    let bytes = tcp::recv_tcp(&mut client, Duration::from_secs(2))
        .await?
        .expect("reply");
    let reply = PduTcp::from_bytes(&bytes)?;

    assert_eq!(reply.packet_type, PacketTypeTcp::DataAck);
    assert_eq!(reply.device, "LGT-1-I");
    assert_eq!(reply.value, "ON");
    assert_eq!(reply.info, "");

    {
        let g = state.lock().await;
        assert_eq!(g.identity.get("LGT-1-I"), Some("ON"));
    }

    cancel.cancel();
    inbound.abort();
    Ok(())
}
