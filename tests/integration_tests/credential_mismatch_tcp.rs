// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use sensact_ctrl_rs::{
    controller::state::{ControllerStatus, ServerBinding},
    engine::data,
    net::tcp::{self, TcpListenerHandle},
    wire::{packet_type::PacketTypeTcp, tcp::PduTcp},
};
use tokio_util::sync::CancellationToken;

use crate::integration_tests::common::{localhost, shared_state, test_identity};

/// End-to-end scenario 6: a `GET_DATA` carrying the wrong `rnd` is rejected
/// with `DATA_REJ` and invalidates the session.
#[tokio::test]
async fn get_data_with_wrong_rnd_is_rejected_and_invalidates_session() -> Result<()> {
    let identity = test_identity(
        "CTRL0006",
        "AABBCCDDEE06",
        localhost(),
        19102,
        0,
        &[("TMP-1-O", "22")],
    );
    let state = shared_state(identity);
    {
        let mut g = state.lock().await;
        g.binding = Some(ServerBinding {
            server_mac: "SERVERMAC06".to_string(),
            server_ip: localhost(),
            rnd: "R0000TEST".to_string(),
            server_tcp_port: Some(0),
        });
        g.set_status(ControllerStatus::SendHello);
    }

    let listener = Arc::new(TcpListenerHandle::listen(0).await?);
    let port = listener.local_addr()?.port();
    let cancel = CancellationToken::new();
    let inbound = tokio::spawn(data::run_inbound(state.clone(), listener, cancel.clone()));

    let mut client = tcp::dial_tcp((localhost(), port).into()).await?;
    let req = PduTcp::new(
        PacketTypeTcp::GetData,
        "SERVERMAC06",
        "WRONGRND0",
        "TMP-1-O",
        "",
        "",
    );
    tcp::send_tcp(&mut client, &req.to_bytes()).await?;
    let bytes = tcp::recv_tcp(&mut client, Duration::from_secs(2))
        .await?
        .expect("reply");
    let reply = PduTcp::from_bytes(&bytes)?;

    assert_eq!(reply.packet_type, PacketTypeTcp::DataRej);
    assert_eq!(reply.info, "Wrong packet credentials.");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(cancel.is_cancelled());
    {
        let g = state.lock().await;
        assert_eq!(g.status, ControllerStatus::NotSubscribed);
    }

    inbound.abort();
    Ok(())
}
