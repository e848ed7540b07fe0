//! Command-line interface parsing.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "sensact-ctrl", about = "Sensor/actuator management protocol controller")]
pub struct Args {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", default_value = "client.cfg")]
    pub config: PathBuf,

    /// Enable debug-level logging.
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,
}
