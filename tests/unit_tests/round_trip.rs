// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use sensact_ctrl_rs::wire::{
    packet_type::{PacketTypeTcp, PacketTypeUdp},
    tcp::PduTcp,
    udp::PduUdp,
};

#[test]
fn udp_pdu_round_trips_for_arbitrary_ascii() {
    let pdu = PduUdp::new(
        PacketTypeUdp::Hello,
        "AABBCCDDEEFF",
        "R0000ABCD",
        "CTRL0001,B01L02R03A04",
    );
    let decoded = PduUdp::from_bytes(&pdu.to_bytes()).expect("decode");
    assert_eq!(decoded, pdu);
}

#[test]
fn tcp_pdu_round_trips_for_arbitrary_ascii() {
    let pdu = PduTcp::new(
        PacketTypeTcp::GetData,
        "AABBCCDDEEFF",
        "R0000ABCD",
        "TMP-1-O",
        "22",
        "",
    );
    let decoded = PduTcp::from_bytes(&pdu.to_bytes()).expect("decode");
    assert_eq!(decoded, pdu);
}
