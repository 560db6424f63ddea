use libc;
use std::mem::MaybeUninit;

/// Hardware address length for Ethernet, the only link type we frame for.
const ETHER_ADDR_LEN: usize = 6;

/// A link-layer attachment point, the typed counterpart of `struct sockaddr_ll` (man 7 packet).
///
/// Used both as the destination handed to `sendto` and as the source address reported by
/// `recvfrom`. The hardware address is kept as a byte vector because the kernel reports a
/// variable length; callers that frame Ethernet should check `is_ethernet_sized` first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkEndpoint {
    /// Physical layer address, `sll_addr[..sll_halen]`.
    pub hardware_address: Vec<u8>,
    /// Interface number, as returned by SIOCGIFINDEX.
    pub interface_index: i32,
    /// ARP hardware type (`ARPHRD_*`).
    pub hardware_type: u16,
    /// Packet type (`PACKET_HOST`, `PACKET_BROADCAST`, ...).
    pub packet_type: u8,
}

impl LinkEndpoint {
    pub fn new(hardware_address: &[u8], interface_index: i32) -> Self {
        LinkEndpoint {
            hardware_address: hardware_address.to_vec(),
            interface_index,
            hardware_type: libc::ARPHRD_ETHER,
            packet_type: 0,
        }
    }

    /// Returns true if the hardware address is exactly an Ethernet address long.
    pub fn is_ethernet_sized(&self) -> bool {
        self.hardware_address.len() == ETHER_ADDR_LEN
    }

    /// Builds the `sockaddr_ll` used to address a frame carrying `protocol` (host byte order).
    pub(crate) fn to_sockaddr_ll(&self, protocol: u16) -> libc::sockaddr_ll {
        // A zeroed sockaddr_ll is a valid value: it's a plain C struct of integers.
        let mut ll: libc::sockaddr_ll = unsafe { MaybeUninit::zeroed().assume_init() };
        ll.sll_family = libc::AF_PACKET as libc::c_ushort;
        ll.sll_protocol = protocol.to_be();
        ll.sll_ifindex = self.interface_index;
        ll.sll_hatype = self.hardware_type;
        ll.sll_pkttype = self.packet_type;
        let len = self.hardware_address.len().min(ll.sll_addr.len());
        ll.sll_halen = len as libc::c_uchar;
        ll.sll_addr[..len].copy_from_slice(&self.hardware_address[..len]);
        ll
    }

    pub(crate) fn from_sockaddr_ll(ll: &libc::sockaddr_ll) -> Self {
        let len = (ll.sll_halen as usize).min(ll.sll_addr.len());
        LinkEndpoint {
            hardware_address: ll.sll_addr[..len].to_vec(),
            interface_index: ll.sll_ifindex,
            hardware_type: ll.sll_hatype,
            packet_type: ll.sll_pkttype,
        }
    }
}
