// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sensact_ctrl_rs::{
    cfg::{cli::Args, config::Config, logger::init_logger},
    controller::state::{ControllerIdentity, ControllerState, SharedState},
    engine::{data, liveness},
    net::udp::UdpTransport,
    shell,
    state_machine::subscription,
};
use tokio::sync::{Mutex, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.debug)?;

    let cfg = Config::load_from_file(&args.config)
        .with_context(|| format!("failed to load config file {:?}", args.config))?;
    let identity = ControllerIdentity::from_config(&cfg);
    let local_tcp = identity.local_tcp;
    let state: SharedState = Arc::new(Mutex::new(ControllerState::new(identity)));

    let process_cancel = CancellationToken::new();

    let shell_task = tokio::spawn(shell::run(state.clone(), process_cancel.clone()));

    let outcome = tokio::select! {
        res = run_sessions(state, local_tcp, process_cancel.clone()) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("SIGINT received, shutting down");
            Ok(())
        },
    };

    process_cancel.cancel();
    shell_task.abort();

    if let Err(e) = outcome {
        error!(error = %e, "fatal protocol error");
        std::process::exit(-1);
    }
    Ok(())
}

/// Runs subscription sessions back to back: each successful subscription is
/// followed by the liveness/data engines until the session invalidates
/// itself, at which point the subscription engine re-arms. Returns only on
/// a fatal subscription failure or external cancellation.
async fn run_sessions(state: SharedState, local_tcp: u16, process_cancel: CancellationToken) -> Result<()> {
    while !process_cancel.is_cancelled() {
        run_one_session(state.clone(), local_tcp, process_cancel.clone()).await?;
    }
    Ok(())
}

async fn run_one_session(
    state: SharedState,
    local_tcp: u16,
    process_cancel: CancellationToken,
) -> Result<()> {
    let udp = Arc::new(
        UdpTransport::bind_ephemeral()
            .await
            .context("failed to bind UDP socket")?,
    );

    subscription::subscribe(&state, &udp).await?;

    let session_cancel = process_cancel.child_token();
    let (tcp_tx, tcp_rx) = oneshot::channel();

    let sender = tokio::spawn(liveness::run_sender(
        state.clone(),
        udp.clone(),
        session_cancel.clone(),
    ));
    let receiver = tokio::spawn(liveness::run_receiver(
        state.clone(),
        udp.clone(),
        session_cancel.clone(),
        local_tcp,
        tcp_tx,
    ));

    let listener = tokio::select! {
        res = tcp_rx => res.ok(),
        () = session_cancel.cancelled() => None,
    };

    let data_task = listener.map(|listener| {
        tokio::spawn(data::run_inbound(
            state.clone(),
            listener,
            session_cancel.clone(),
        ))
    });

    session_cancel.cancelled().await;

    sender.abort();
    receiver.abort();
    if let Some(task) = data_task {
        task.abort();
    }

    Ok(())
}
