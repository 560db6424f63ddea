use crate::{EthernetHeader, MacAddr, ARP_ETHER_TYPE, ETHERNET_HEADER_LEN, ETHER_ADDR_LEN, IPV4_ADDR_LEN};
use std::convert::{TryFrom, TryInto};
use std::net::Ipv4Addr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArpOp {
    Request = 1,
    Reply = 2,
    RarpRequest = 3,
    RarpReply = 4,
    InArpRequest = 8,
    InArpReply = 9,
    Nak = 10,
}

impl TryFrom<u16> for ArpOp {
    type Error = &'static str;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(ArpOp::Request),
            2 => Ok(ArpOp::Reply),
            3 => Ok(ArpOp::RarpRequest),
            4 => Ok(ArpOp::RarpReply),
            8 => Ok(ArpOp::InArpRequest),
            9 => Ok(ArpOp::InArpReply),
            10 => Ok(ArpOp::Nak),
            _ => Err("Unknown ARP opcode"),
        }
    }
}

pub enum ArpHardwareType {
    Ethernet = 1,
}

/// Length of the ARP payload for Ethernet/IPv4 (RFC 826).
pub const ARP_HEADER_LEN: usize = 28;
/// Zero bytes appended after the ARP payload to reach the minimum Ethernet frame size.
pub const ARP_PADDING_LEN: usize = 32;
/// Size of a frame as built and of the buffer used to receive one.
pub const ARP_FRAME_LEN: usize = ETHERNET_HEADER_LEN + ARP_HEADER_LEN + ARP_PADDING_LEN;

// Offsets below are relative to the start of the ARP payload.
const HARDWARE_TYPE_RANGE: (usize, usize) = (0, 2);
const PROTOCOL_TYPE_RANGE: (usize, usize) = (2, 4);
const HARDWARE_ADDR_LEN_RANGE: (usize, usize) = (4, 5);
const PROTOCOL_ADDR_LEN_RANGE: (usize, usize) = (5, 6);
const OPCODE_RANGE: (usize, usize) = (6, 8);
const SENDER_HARDWARE_ADDR_RANGE: (usize, usize) = (8, 14);
const SENDER_PROTOCOL_ADDR_RANGE: (usize, usize) = (14, 18);
const TARGET_HARDWARE_ADDR_RANGE: (usize, usize) = (18, 24);
const TARGET_PROTOCOL_ADDR_RANGE: (usize, usize) = (24, 28);

///
/// ARP payload for Ethernet hardware addresses and IPv4 protocol addresses, the packet
/// structure described in RFC 826 https://tools.ietf.org/html/rfc826
///
/// `opcode` is kept as the raw wire value so frames with opcodes we don't model still parse.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArpHeader {
    pub hardware_type: u16,
    pub protocol_type: u16,
    pub hardware_addr_len: u8,
    pub protocol_addr_len: u8,
    pub opcode: u16,
    pub sender_hardware_addr: MacAddr,
    pub sender_protocol_addr: Ipv4Addr,
    pub target_hardware_addr: MacAddr,
    pub target_protocol_addr: Ipv4Addr,
}

impl Default for ArpHeader {
    fn default() -> Self {
        ArpHeader {
            hardware_type: 0,
            protocol_type: 0,
            hardware_addr_len: 0,
            protocol_addr_len: 0,
            opcode: 0,
            sender_hardware_addr: MacAddr::UNSPECIFIED,
            sender_protocol_addr: Ipv4Addr::UNSPECIFIED,
            target_hardware_addr: MacAddr::UNSPECIFIED,
            target_protocol_addr: Ipv4Addr::UNSPECIFIED,
        }
    }
}

impl ArpHeader {
    pub fn op(&self) -> Option<ArpOp> {
        ArpOp::try_from(self.opcode).ok()
    }

    /// Writes the payload into the first `ARP_HEADER_LEN` bytes of `buf`.
    pub fn write_to(&self, buf: &mut [u8]) {
        let fields: [(&[u8], (usize, usize)); 9] = [
            (&self.hardware_type.to_be_bytes(), HARDWARE_TYPE_RANGE),
            (&self.protocol_type.to_be_bytes(), PROTOCOL_TYPE_RANGE),
            (&[self.hardware_addr_len], HARDWARE_ADDR_LEN_RANGE),
            (&[self.protocol_addr_len], PROTOCOL_ADDR_LEN_RANGE),
            (&self.opcode.to_be_bytes(), OPCODE_RANGE),
            (&self.sender_hardware_addr.bytes, SENDER_HARDWARE_ADDR_RANGE),
            (&self.sender_protocol_addr.octets(), SENDER_PROTOCOL_ADDR_RANGE),
            (&self.target_hardware_addr.bytes, TARGET_HARDWARE_ADDR_RANGE),
            (&self.target_protocol_addr.octets(), TARGET_PROTOCOL_ADDR_RANGE),
        ];
        for (bytes, (start, end)) in fields.iter() {
            buf[*start..*end].copy_from_slice(bytes);
        }
    }

    ///
    /// Parses an ARP payload. Validates
    /// - The payload holds all Ethernet/IPv4 ARP fields
    /// - The address length fields are 6 and 4
    ///
    pub fn from_bytes(buf: &[u8]) -> Result<ArpHeader, &'static str> {
        if buf.len() < ARP_HEADER_LEN {
            return Err("Frame payload is too small");
        }

        let hardware_addr_len = buf[HARDWARE_ADDR_LEN_RANGE.0];
        let protocol_addr_len = buf[PROTOCOL_ADDR_LEN_RANGE.0];
        if hardware_addr_len as usize != ETHER_ADDR_LEN
            || protocol_addr_len as usize != IPV4_ADDR_LEN
        {
            return Err("Frame payload doesn't match address length fields");
        }

        let field = |(start, end): (usize, usize)| &buf[start..end];
        let ipv4 = |range| {
            let octets: [u8; IPV4_ADDR_LEN] = field(range).try_into().unwrap();
            Ipv4Addr::from(octets)
        };

        Ok(ArpHeader {
            hardware_type: u16::from_be_bytes(field(HARDWARE_TYPE_RANGE).try_into().unwrap()),
            protocol_type: u16::from_be_bytes(field(PROTOCOL_TYPE_RANGE).try_into().unwrap()),
            hardware_addr_len,
            protocol_addr_len,
            opcode: u16::from_be_bytes(field(OPCODE_RANGE).try_into().unwrap()),
            sender_hardware_addr: MacAddr::new(
                field(SENDER_HARDWARE_ADDR_RANGE).try_into().unwrap(),
            ),
            sender_protocol_addr: ipv4(SENDER_PROTOCOL_ADDR_RANGE),
            target_hardware_addr: MacAddr::new(
                field(TARGET_HARDWARE_ADDR_RANGE).try_into().unwrap(),
            ),
            target_protocol_addr: ipv4(TARGET_PROTOCOL_ADDR_RANGE),
        })
    }
}

/// A complete ARP frame: Ethernet header, ARP payload and zero padding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArpFrame {
    pub link_header: EthernetHeader,
    pub arp_header: ArpHeader,
}

impl ArpFrame {
    /// Serializes the frame to its fixed wire layout. Padding is always zero.
    pub fn to_bytes(&self) -> [u8; ARP_FRAME_LEN] {
        let mut buf = [0u8; ARP_FRAME_LEN];
        self.link_header.write_to(&mut buf[..ETHERNET_HEADER_LEN]);
        self.arp_header
            .write_to(&mut buf[ETHERNET_HEADER_LEN..ETHERNET_HEADER_LEN + ARP_HEADER_LEN]);
        buf
    }

    ///
    /// Parses a received frame. Validates
    /// - The frame has an ARP ether type
    /// - The frame is long enough for the ARP payload, and its address lengths are Ethernet/IPv4
    ///
    /// Anything past the ARP payload (padding, FCS) is ignored.
    ///
    pub fn from_bytes(buf: &[u8]) -> Result<ArpFrame, &'static str> {
        let link_header = EthernetHeader::from_bytes(buf)?;
        if link_header.ether_type != ARP_ETHER_TYPE {
            return Err("Frame does not have ARP ether type.");
        }
        let arp_header = ArpHeader::from_bytes(&buf[ETHERNET_HEADER_LEN..])?;
        Ok(ArpFrame {
            link_header,
            arp_header,
        })
    }

    pub fn is_reply(&self) -> bool {
        self.arp_header.op() == Some(ArpOp::Reply)
    }
}

impl TryFrom<&[u8]> for ArpFrame {
    type Error = &'static str;

    fn try_from(buf: &[u8]) -> Result<Self, Self::Error> {
        ArpFrame::from_bytes(buf)
    }
}
