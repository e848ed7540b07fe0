//! `PDU_TCP`: 118 bytes, used for the data request/response exchanges
//! (`SEND_DATA`, `SET_DATA`, `GET_DATA` and their replies).

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;

use crate::wire::{
    codec::{decode_str, encode_str, ensure_len, read_u8},
    packet_type::{PacketTypeTcp, UnknownPacketType},
};

pub const PDU_TCP_LEN: usize = 118;

const MAC_LEN: usize = 13;
const RND_LEN: usize = 9;
const DEVICE_LEN: usize = 8;
const VALUE_LEN: usize = 7;
const INFO_LEN: usize = 80;

const OFF_PACKET_TYPE: usize = 0;
const OFF_MAC: usize = 1;
const OFF_RND: usize = OFF_MAC + MAC_LEN;
const OFF_DEVICE: usize = OFF_RND + RND_LEN;
const OFF_VALUE: usize = OFF_DEVICE + DEVICE_LEN;
const OFF_INFO: usize = OFF_VALUE + VALUE_LEN;

/// A decoded/to-be-encoded `PDU_TCP` packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PduTcp {
    pub packet_type: PacketTypeTcp,
    pub mac: String,
    pub rnd: String,
    pub device: String,
    pub value: String,
    pub info: String,
}

impl PduTcp {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        packet_type: PacketTypeTcp,
        mac: impl Into<String>,
        rnd: impl Into<String>,
        device: impl Into<String>,
        value: impl Into<String>,
        info: impl Into<String>,
    ) -> Self {
        Self {
            packet_type,
            mac: mac.into(),
            rnd: rnd.into(),
            device: device.into(),
            value: value.into(),
            info: info.into(),
        }
    }

    pub fn to_bytes(&self) -> [u8; PDU_TCP_LEN] {
        let mut buf = [0u8; PDU_TCP_LEN];
        buf[OFF_PACKET_TYPE] = self.packet_type.into();
        encode_str(&self.mac, &mut buf[OFF_MAC..OFF_MAC + MAC_LEN]);
        encode_str(&self.rnd, &mut buf[OFF_RND..OFF_RND + RND_LEN]);
        encode_str(&self.device, &mut buf[OFF_DEVICE..OFF_DEVICE + DEVICE_LEN]);
        encode_str(&self.value, &mut buf[OFF_VALUE..OFF_VALUE + VALUE_LEN]);
        encode_str(&self.info, &mut buf[OFF_INFO..OFF_INFO + INFO_LEN]);
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, PDU_TCP_LEN, "PDU_TCP")?;
        let packet_type = PacketTypeTcp::try_from(read_u8(
            buf,
            OFF_PACKET_TYPE,
            "packet_type",
        )?)
        .map_err(|UnknownPacketType(b)| {
            anyhow::anyhow!("PDU_TCP: unknown packet type 0x{b:02x}")
        })?;
        let mac = decode_str(&buf[OFF_MAC..OFF_MAC + MAC_LEN]);
        let rnd = decode_str(&buf[OFF_RND..OFF_RND + RND_LEN]);
        let device = decode_str(&buf[OFF_DEVICE..OFF_DEVICE + DEVICE_LEN]);
        let value = decode_str(&buf[OFF_VALUE..OFF_VALUE + VALUE_LEN]);
        let info = decode_str(&buf[OFF_INFO..OFF_INFO + INFO_LEN]);
        Ok(Self {
            packet_type,
            mac,
            rnd,
            device,
            value,
            info,
        })
    }
}
