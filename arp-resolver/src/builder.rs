use crate::errors::{Error, ErrorKind};
use afpacket::LinkEndpoint;
use arp_packets::{
    ArpFrame, ArpHardwareType, ArpOp, MacAddr, ARP_ETHER_TYPE, ETHER_ADDR_LEN, IPV4_ADDR_LEN,
    IPV4_ETHER_TYPE,
};
use std::net::Ipv4Addr;

///
/// Builds a broadcast ARP request asking who owns `target_address`.
///
/// Hardware Type: ares_hrd$Ethernet = 1
/// Protocol Type: IPv4
/// Hardware Address Length: 6
/// Protocol Address Length: 4
/// Op: ares_op$REQUEST = 1
/// Sender Hardware Address: the source endpoint's address
/// Sender Protocol Address: `source_address`
/// Target Hardware Address: zero, since it's the value being determined
/// Target Protocol Address: `target_address`
///
pub fn build_request(
    source_endpoint: &LinkEndpoint,
    source_address: Ipv4Addr,
    target_address: Ipv4Addr,
) -> Result<ArpFrame, Error> {
    build_frame(source_endpoint, source_address, target_address, ArpOp::Request)
}

/// Same as `build_request`, with the opcode left to the caller.
pub fn build_frame(
    source_endpoint: &LinkEndpoint,
    source_address: Ipv4Addr,
    target_address: Ipv4Addr,
    opcode: ArpOp,
) -> Result<ArpFrame, Error> {
    let src_mac =
        MacAddr::from_slice(&source_endpoint.hardware_address).ok_or(ErrorKind::InvalidArgument)?;

    let mut frame = ArpFrame::default();

    frame.link_header.dest_mac = MacAddr::BROADCAST;
    frame.link_header.src_mac = src_mac;
    frame.link_header.ether_type = ARP_ETHER_TYPE;

    let arp = &mut frame.arp_header;
    arp.hardware_type = ArpHardwareType::Ethernet as u16;
    arp.protocol_type = IPV4_ETHER_TYPE;
    arp.hardware_addr_len = ETHER_ADDR_LEN as u8;
    arp.protocol_addr_len = IPV4_ADDR_LEN as u8;
    arp.opcode = opcode as u16;
    arp.sender_hardware_addr = src_mac;
    arp.sender_protocol_addr = source_address;
    arp.target_hardware_addr = MacAddr::UNSPECIFIED;
    arp.target_protocol_addr = target_address;

    Ok(frame)
}
