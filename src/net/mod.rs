//! Transport primitives: UDP send/recv with caller timeouts, and
//! connection-per-exchange TCP accept/dial.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod tcp;
pub mod udp;

pub use tcp::{TcpError, TcpListenerHandle};
pub use udp::{RecvError, SendError, UdpTransport};
