//! Packet type discriminants for the UDP and TCP PDU families, modeled on the
//! teacher's `Opcode`/`TryFrom<u8>` pattern for BHS opcodes.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown packet type 0x{0:02x}")]
pub struct UnknownPacketType(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketTypeUdp {
    SubsReq = 0x00,
    SubsAck = 0x01,
    SubsRej = 0x02,
    SubsInfo = 0x03,
    InfoAck = 0x04,
    SubsNack = 0x05,
    Hello = 0x10,
    HelloRej = 0x11,
}

impl TryFrom<u8> for PacketTypeUdp {
    type Error = UnknownPacketType;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Ok(match v {
            0x00 => Self::SubsReq,
            0x01 => Self::SubsAck,
            0x02 => Self::SubsRej,
            0x03 => Self::SubsInfo,
            0x04 => Self::InfoAck,
            0x05 => Self::SubsNack,
            0x10 => Self::Hello,
            0x11 => Self::HelloRej,
            other => return Err(UnknownPacketType(other)),
        })
    }
}

impl From<PacketTypeUdp> for u8 {
    fn from(v: PacketTypeUdp) -> Self {
        v as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketTypeTcp {
    SendData = 0x20,
    SetData = 0x21,
    GetData = 0x22,
    DataAck = 0x23,
    DataNack = 0x24,
    DataRej = 0x25,
}

impl TryFrom<u8> for PacketTypeTcp {
    type Error = UnknownPacketType;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Ok(match v {
            0x20 => Self::SendData,
            0x21 => Self::SetData,
            0x22 => Self::GetData,
            0x23 => Self::DataAck,
            0x24 => Self::DataNack,
            0x25 => Self::DataRej,
            other => return Err(UnknownPacketType(other)),
        })
    }
}

impl From<PacketTypeTcp> for u8 {
    fn from(v: PacketTypeTcp) -> Self {
        v as u8
    }
}
