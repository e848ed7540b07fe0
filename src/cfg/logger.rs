//! Logger initialization.
//!
//! A trimmed-down version of the ambient stack's structured logging: this
//! controller has no distributed-tracing or multi-session fan-out, so it
//! keeps only `tracing_subscriber::fmt` with an `EnvFilter`, instead of the
//! full JSON span-capture + `fastrace` layering used elsewhere.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Initializes the global `tracing` subscriber. `debug` raises the default
/// level from `info` to `debug`; `RUST_LOG` always takes precedence when
/// set.
pub fn init_logger(debug: bool) -> Result<()> {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("failed to build log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to set global default subscriber: {e}"))
}
