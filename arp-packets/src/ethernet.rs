use crate::MacAddr;
use std::convert::TryInto;

pub const ARP_ETHER_TYPE: u16 = 0x0806;
pub const IPV4_ETHER_TYPE: u16 = 0x0800;

/// Length of an Ethernet II header: two MACs and the ether type.
pub const ETHERNET_HEADER_LEN: usize = 14;

const DEST_MAC_RANGE: (usize, usize) = (0, 6);
const SRC_MAC_RANGE: (usize, usize) = (6, 12);
const ETHER_TYPE_RANGE: (usize, usize) = (12, 14);

/// Ethernet II header.
///
/// ```text
/// 0                    6                    12                      14
/// |---6 byte Dest_MAC--|---6 byte Src_MAC---|--2 Byte EtherType---|
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EthernetHeader {
    pub dest_mac: MacAddr,
    pub src_mac: MacAddr,
    pub ether_type: u16,
}

impl EthernetHeader {
    /// Writes the header into the first `ETHERNET_HEADER_LEN` bytes of `buf`.
    ///
    /// Panics if `buf` is shorter than the header.
    pub fn write_to(&self, buf: &mut [u8]) {
        let (start, end) = DEST_MAC_RANGE;
        buf[start..end].copy_from_slice(&self.dest_mac.bytes);
        let (start, end) = SRC_MAC_RANGE;
        buf[start..end].copy_from_slice(&self.src_mac.bytes);
        let (start, end) = ETHER_TYPE_RANGE;
        buf[start..end].copy_from_slice(&self.ether_type.to_be_bytes());
    }

    pub fn from_bytes(buf: &[u8]) -> Result<EthernetHeader, &'static str> {
        if buf.len() < ETHERNET_HEADER_LEN {
            return Err("Frame is less than the minimum of 14 bytes");
        }

        let (start, end) = DEST_MAC_RANGE;
        let dest_mac = MacAddr::new(buf[start..end].try_into().unwrap());
        let (start, end) = SRC_MAC_RANGE;
        let src_mac = MacAddr::new(buf[start..end].try_into().unwrap());
        let (start, end) = ETHER_TYPE_RANGE;
        let ether_type = u16::from_be_bytes(buf[start..end].try_into().unwrap());

        Ok(EthernetHeader {
            dest_mac,
            src_mac,
            ether_type,
        })
    }
}
