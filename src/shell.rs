//! Interactive command shell: `stat`, `set`, `send`, `quit` (spec §6).
//! Commands are honoured only once the controller reaches `SEND_HELLO`;
//! this module carries no protocol logic of its own, it just reads stdin
//! and forwards to the engines.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    controller::state::{ControllerStatus, SharedState},
    engine::data,
};

/// Reads commands from stdin until `quit`, EOF, or cancellation.
pub async fn run(state: SharedState, cancel: CancellationToken) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            () = cancel.cancelled() => return Ok(()),
        };
        let Some(line) = line else {
            return Ok(());
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line == "quit" {
            info!("quit requested");
            cancel.cancel();
            return Ok(());
        }

        let status = { state.lock().await.status };
        if status != ControllerStatus::SendHello {
            warn!(%status, "command ignored: controller is not in SEND_HELLO");
            continue;
        }

        dispatch(&state, &cancel, line).await;
    }
}

async fn dispatch(state: &SharedState, cancel: &CancellationToken, line: &str) {
    let mut parts = line.split_whitespace();
    match parts.next() {
        Some("stat") => print_status(state).await,
        Some("set") => {
            let (Some(device), Some(value)) = (parts.next(), parts.next()) else {
                warn!("usage: set <device> <value>");
                return;
            };
            set_device(state, device, value).await;
        },
        Some("send") => {
            let Some(device) = parts.next() else {
                warn!("usage: send <device>");
                return;
            };
            let state = state.clone();
            let cancel = cancel.clone();
            let device = device.to_string();
            tokio::spawn(async move {
                if let Err(e) = data::send_outbound(state, cancel, device).await {
                    warn!(error = %e, "SEND_DATA exchange failed");
                }
            });
        },
        Some(other) => warn!(command = other, "unknown command"),
        None => {},
    }
}

async fn print_status(state: &SharedState) {
    let g = state.lock().await;
    println!("name: {}", g.identity.name);
    println!("situation: {}", g.identity.situation);
    println!("mac: {}", g.identity.mac);
    println!("status: {}", g.status);
    for (id, value) in &g.identity.elements {
        println!("  {id} = {value}");
    }
}

async fn set_device(state: &SharedState, device: &str, value: &str) {
    let mut g = state.lock().await;
    if g.identity.set(device, value) {
        info!(device, value, "device value updated locally");
    } else {
        warn!(device, "cannot set: device not owned by this controller");
    }
}
