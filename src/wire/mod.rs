//! Wire codec for the two fixed-width PDU families exchanged with the
//! server: `PduUdp` (subscription + HELLO, 103 bytes) and `PduTcp`
//! (data request/response, 118 bytes).

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod codec;
pub mod packet_type;
pub mod tcp;
pub mod udp;

pub use packet_type::{PacketTypeTcp, PacketTypeUdp, UnknownPacketType};
pub use tcp::PduTcp;
pub use udp::PduUdp;
