//! `PDU_UDP`: 103 bytes, used for the subscription handshake and HELLO
//! liveness exchanges.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;

use crate::wire::{
    codec::{decode_str, encode_str, ensure_len, read_u8},
    packet_type::{PacketTypeUdp, UnknownPacketType},
};

pub const PDU_UDP_LEN: usize = 103;

const MAC_LEN: usize = 13;
const RND_LEN: usize = 9;
const DATA_LEN: usize = 80;

const OFF_PACKET_TYPE: usize = 0;
const OFF_MAC: usize = 1;
const OFF_RND: usize = OFF_MAC + MAC_LEN;
const OFF_DATA: usize = OFF_RND + RND_LEN;

/// A decoded/to-be-encoded `PDU_UDP` packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PduUdp {
    pub packet_type: PacketTypeUdp,
    pub mac: String,
    pub rnd: String,
    pub data: String,
}

impl PduUdp {
    pub fn new(
        packet_type: PacketTypeUdp,
        mac: impl Into<String>,
        rnd: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            packet_type,
            mac: mac.into(),
            rnd: rnd.into(),
            data: data.into(),
        }
    }

    /// Returns a copy of `self` with `packet_type` replaced. Used to turn an
    /// inbound HELLO into an outbound HELLO_REJ while keeping its
    /// mac/rnd/data untouched, per the rejection-packet convention.
    pub fn with_packet_type(&self, packet_type: PacketTypeUdp) -> Self {
        Self {
            packet_type,
            ..self.clone()
        }
    }

    pub fn to_bytes(&self) -> [u8; PDU_UDP_LEN] {
        let mut buf = [0u8; PDU_UDP_LEN];
        buf[OFF_PACKET_TYPE] = self.packet_type.into();
        encode_str(&self.mac, &mut buf[OFF_MAC..OFF_MAC + MAC_LEN]);
        encode_str(&self.rnd, &mut buf[OFF_RND..OFF_RND + RND_LEN]);
        encode_str(&self.data, &mut buf[OFF_DATA..OFF_DATA + DATA_LEN]);
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, PDU_UDP_LEN, "PDU_UDP")?;
        let packet_type = PacketTypeUdp::try_from(read_u8(
            buf,
            OFF_PACKET_TYPE,
            "packet_type",
        )?)
        .map_err(|UnknownPacketType(b)| {
            anyhow::anyhow!("PDU_UDP: unknown packet type 0x{b:02x}")
        })?;
        let mac = decode_str(&buf[OFF_MAC..OFF_MAC + MAC_LEN]);
        let rnd = decode_str(&buf[OFF_RND..OFF_RND + RND_LEN]);
        let data = decode_str(&buf[OFF_DATA..OFF_DATA + DATA_LEN]);
        Ok(Self {
            packet_type,
            mac,
            rnd,
            data,
        })
    }
}
