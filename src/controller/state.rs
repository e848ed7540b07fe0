// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fmt, net::Ipv4Addr, sync::Arc};

use tokio::sync::Mutex;
use tracing::info;

use crate::cfg::config::Config;

/// Maximum number of devices a controller may report; excess entries loaded
/// from the config file are dropped with a warning (spec §3 invariant).
pub const MAX_ELEMENTS: usize = 10;

/// Devices truncate past this many characters (spec §3).
pub const MAX_VALUE_LEN: usize = 6;

/// The handshake/liveness state, carried as a tagged enum. The 0xA0..0xA6
/// values exist only for log lines and debugging; they never travel on the
/// wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerStatus {
    Disconnected,
    NotSubscribed,
    WaitAckSubs,
    WaitInfo,
    WaitAckInfo,
    Subscribed,
    SendHello,
}

impl ControllerStatus {
    pub fn wire_value(self) -> u8 {
        match self {
            Self::Disconnected => 0xA0,
            Self::NotSubscribed => 0xA1,
            Self::WaitAckSubs => 0xA2,
            Self::WaitInfo => 0xA3,
            Self::WaitAckInfo => 0xA4,
            Self::Subscribed => 0xA5,
            Self::SendHello => 0xA6,
        }
    }
}

impl fmt::Display for ControllerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "DISCONNECTED",
            Self::NotSubscribed => "NOT_SUBSCRIBED",
            Self::WaitAckSubs => "WAIT_ACK_SUBS",
            Self::WaitInfo => "WAIT_INFO",
            Self::WaitAckInfo => "WAIT_ACK_INFO",
            Self::Subscribed => "SUBSCRIBED",
            Self::SendHello => "SEND_HELLO",
        };
        write!(f, "{name}(0x{:02X})", self.wire_value())
    }
}

/// The triple that must match the active binding for any received packet to
/// be honoured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub mac: String,
    pub rnd: String,
    pub source_ip: Ipv4Addr,
}

/// Server coordinates established by a successful subscription. Exists iff
/// status ∈ {WAIT_ACK_INFO, SUBSCRIBED, SEND_HELLO}.
#[derive(Debug, Clone)]
pub struct ServerBinding {
    pub server_mac: String,
    pub server_ip: Ipv4Addr,
    pub rnd: String,
    /// Populated on `INFO_ACK`; absent while in `WAIT_ACK_INFO`.
    pub server_tcp_port: Option<u16>,
}

impl ServerBinding {
    pub fn matches(&self, creds: &Credentials) -> bool {
        self.server_mac == creds.mac
            && self.rnd == creds.rnd
            && self.server_ip == creds.source_ip
    }
}

/// The controller's own identity, loaded once from the config file and
/// immutable thereafter, plus the mutable device table.
#[derive(Debug, Clone)]
pub struct ControllerIdentity {
    pub name: String,
    pub situation: String,
    pub mac: String,
    pub local_tcp: u16,
    pub srv_udp: u16,
    pub server: Ipv4Addr,
    /// Ordered device-id → value table, at most [`MAX_ELEMENTS`] entries.
    pub elements: Vec<(String, String)>,
}

impl ControllerIdentity {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            name: cfg.name.clone(),
            situation: cfg.situation.clone(),
            mac: cfg.mac.clone(),
            local_tcp: cfg.local_tcp,
            srv_udp: cfg.srv_udp,
            server: cfg.server,
            elements: cfg.elements.clone(),
        }
    }

    pub fn owns(&self, device: &str) -> bool {
        self.elements.iter().any(|(id, _)| id == device)
    }

    pub fn get(&self, device: &str) -> Option<&str> {
        self.elements
            .iter()
            .find(|(id, _)| id == device)
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, device: &str, value: &str) -> bool {
        let truncated: String = value.chars().take(MAX_VALUE_LEN).collect();
        match self.elements.iter_mut().find(|(id, _)| id == device) {
            Some((_, v)) => {
                *v = truncated;
                true
            },
            None => false,
        }
    }

    /// Device ids joined with `;`, as required by `SUBS_INFO.data` (spec
    /// §4.4).
    pub fn element_ids_joined(&self) -> String {
        self.elements
            .iter()
            .map(|(id, _)| id.as_str())
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// The full mutable controller record, shared between the three long-lived
/// tasks behind a single mutex (spec §5).
#[derive(Debug)]
pub struct ControllerState {
    pub identity: ControllerIdentity,
    pub status: ControllerStatus,
    pub binding: Option<ServerBinding>,
    pub subs_attempts: u32,
}

impl ControllerState {
    pub fn new(identity: ControllerIdentity) -> Self {
        Self {
            identity,
            status: ControllerStatus::NotSubscribed,
            binding: None,
            subs_attempts: 0,
        }
    }

    /// Only logs when the status actually changes.
    pub fn set_status(&mut self, status: ControllerStatus) {
        if self.status != status {
            info!(from = %self.status, to = %status, "status transition");
            self.status = status;
        }
    }
}

pub type Shared = Mutex<ControllerState>;
pub type SharedState = Arc<Shared>;
