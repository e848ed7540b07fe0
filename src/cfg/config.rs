//! Configuration file parsing and validation.
//!
//! The file is a flat `key=value` list (default name `client.cfg`), not the
//! YAML the ambient stack's original config loader used — the wire format
//! here comes from the reference client's own config reader, which this
//! module reproduces: whitespace-stripped lines, unknown keys ignored,
//! hyphenated keys stored with underscores, `Elements` as a `;`-joined list
//! of device ids.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{collections::HashMap, fs, net::Ipv4Addr, path::Path};

use anyhow::{Context, Result, bail, ensure};
use tracing::warn;

use crate::controller::state::MAX_ELEMENTS;

#[derive(Debug, Clone)]
pub struct Config {
    pub name: String,
    pub situation: String,
    pub mac: String,
    pub local_tcp: u16,
    pub srv_udp: u16,
    pub server: Ipv4Addr,
    /// Ordered device-id → initial-value table, at most [`MAX_ELEMENTS`]
    /// entries.
    pub elements: Vec<(String, String)>,
}

const DEFAULT_VALUE: &str = "NONE";

impl Config {
    /// Parses the `key=value` file at `path`, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let s = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {path:?}"))?;
        Self::parse(&s)
    }

    fn parse(s: &str) -> Result<Self> {
        let mut raw: HashMap<String, String> = HashMap::new();
        for line in s.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim().replace('-', "_");
            let value = value.trim().to_string();
            raw.insert(key, value);
        }

        let name = raw.remove("Name").unwrap_or_default();
        if name.chars().count() != 8 {
            warn!(%name, "Name is not exactly 8 characters");
        }

        let situation = raw.remove("Situation").unwrap_or_default();
        if !is_valid_situation(&situation) {
            warn!(%situation, "Situation does not match B##L##R##A##");
        }

        let mac = raw.remove("MAC").unwrap_or_default();
        if !is_valid_mac(&mac) {
            warn!(%mac, "MAC is not 12 hex characters");
        }

        let local_tcp = parse_port(&raw, "Local_TCP")?;
        let srv_udp = parse_port(&raw, "Srv_UDP")?;

        let server_str = raw
            .remove("Server")
            .context("config is missing required key Server")?;
        let server: Ipv4Addr = server_str
            .parse()
            .with_context(|| format!("Server '{server_str}' is not a valid IPv4 address"))?;

        let elements = parse_elements(raw.remove("Elements").as_deref().unwrap_or(""));

        let cfg = Self {
            name,
            situation,
            mac,
            local_tcp,
            srv_udp,
            server,
            elements,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.local_tcp >= 1, "Local-TCP must be in 1..=65535");
        ensure!(self.srv_udp >= 1, "Srv-UDP must be in 1..=65535");
        Ok(())
    }
}

fn parse_port(raw: &HashMap<String, String>, key: &str) -> Result<u16> {
    let display_key = key.replace('_', "-");
    let v = raw
        .get(key)
        .with_context(|| format!("config is missing required key {display_key}"))?;
    v.parse()
        .with_context(|| format!("{display_key} '{v}' is not a valid port number"))
}

fn parse_elements(raw: &str) -> Vec<(String, String)> {
    let ids: Vec<&str> = raw.split(';').map(str::trim).filter(|s| !s.is_empty()).collect();

    if ids.len() > MAX_ELEMENTS {
        warn!(
            count = ids.len(),
            kept = MAX_ELEMENTS,
            "Elements exceeds the 10-device cap; dropping the rest"
        );
    }

    ids.into_iter()
        .take(MAX_ELEMENTS)
        .map(|id| {
            if !is_valid_device_id(id) {
                warn!(device = id, "device id does not match [A-Z]{{3}}-\\d-[IO]");
            }
            (id.to_string(), DEFAULT_VALUE.to_string())
        })
        .collect()
}

/// `B\d{2}L\d{2}R\d{2}A\d{2}` without pulling in the `regex` crate — the
/// format is fixed-width enough that a hand-rolled scan is clearer than a
/// compiled pattern.
fn is_valid_situation(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 12 {
        return false;
    }
    let tags = [(0, b'B'), (3, b'L'), (6, b'R'), (9, b'A')];
    for (pos, letter) in tags {
        if bytes[pos] != letter {
            return false;
        }
        if !bytes[pos + 1].is_ascii_digit() || !bytes[pos + 2].is_ascii_digit() {
            return false;
        }
    }
    true
}

fn is_valid_mac(s: &str) -> bool {
    s.len() == 12 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// `[A-Z]{3}-\d-[IO]`
pub fn is_valid_device_id(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 7
        && bytes[0..3].iter().all(|b| b.is_ascii_uppercase())
        && bytes[3] == b'-'
        && bytes[4].is_ascii_digit()
        && bytes[5] == b'-'
        && matches!(bytes[6], b'I' | b'O')
}
