use std::fmt;

pub const ETHER_ADDR_LEN: usize = 6;
pub const IPV4_ADDR_LEN: usize = 4;

//Most significant byte is 0th
#[derive(Eq, Clone, Copy, Hash, PartialEq, Default)]
pub struct MacAddr {
    pub bytes: [u8; ETHER_ADDR_LEN],
}

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr { bytes: [0xff; 6] };
    pub const UNSPECIFIED: MacAddr = MacAddr { bytes: [0; 6] };

    pub fn new(bytes: [u8; ETHER_ADDR_LEN]) -> MacAddr {
        MacAddr { bytes }
    }

    /// Copies a hardware address out of a slice. Returns `None` unless the slice is exactly
    /// `ETHER_ADDR_LEN` bytes long.
    pub fn from_slice(bytes: &[u8]) -> Option<MacAddr> {
        if bytes.len() != ETHER_ADDR_LEN {
            return None;
        }
        let mut mac = MacAddr::UNSPECIFIED;
        mac.bytes.copy_from_slice(bytes);
        Some(mac)
    }

    pub fn is_broadcast(&self) -> bool {
        *self == MacAddr::BROADCAST
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.bytes;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddr({})", self)
    }
}
