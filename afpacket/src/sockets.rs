#![deny(missing_docs)]

use crate::endpoint::LinkEndpoint;
use crate::linux;
use libc;
use std::{
    ffi::CStr,
    io,
    mem::{self, MaybeUninit},
    ptr,
    time::Duration,
};

/// Represents an unbound `AF_PACKET` socket.  At this phase of a socket's lifecycle, it can be
/// configured.
pub struct Socket {
    fd: libc::c_int,
    protocol: u16,
}

/// Represents a bound `AF_PACKET` socket. At this phase of a socket's lifecycle, it can be read
/// to/written from.
pub struct BoundSocket {
    fd: libc::c_int,
    protocol: u16,
    interface_index: i32,
}

impl Socket {
    /// Creates a new unbound raw socket that only sees frames with the given ether type (host byte
    /// order), e.g. `0x0806` for ARP.
    pub fn new(protocol: u16) -> io::Result<Self> {
        // This block must be marked as unsafe because it uses FFI with C code. We believe the code
        // in this block to be safe because it does not interact with any memory owned by Rust
        // code, nor does it violate the invariant of the Socket type -- namely, that it return an
        // Err if it fails to initialize.
        let fd = unsafe {
            // Resources:
            // https://beej.us/guide/bgnet/html/multi/syscalls.html#socket
            // man 7 packet
            let fd = libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW,
                protocol.to_be() as libc::c_int,
            );
            if fd < 0 {
                return Err(io::Error::last_os_error());
            }
            fd
        };
        Ok(Self { fd, protocol })
    }

    /// Looks up the interface index and native hardware address of `iface`.
    pub fn interface_endpoint(&self, iface: impl AsRef<CStr>) -> io::Result<LinkEndpoint> {
        let interface_index = self.interface_index(iface.as_ref())?;
        // Same reasoning as `interface_index`: the ifreq is owned by this frame and the kernel
        // only writes within it.
        let hwaddr = unsafe {
            let mut ifr = ifreq_for(iface.as_ref());
            // Resources:
            // man 7 netdevice
            let err = libc::ioctl(self.fd, linux::SIOCGIFHWADDR, &mut ifr);
            if err < 0 {
                return Err(io::Error::last_os_error());
            }
            ifr.ifr_ifru.ifru_hwaddr
        };

        let hardware_address: Vec<u8> = hwaddr.sa_data[..6].iter().map(|b| *b as u8).collect();
        Ok(LinkEndpoint {
            hardware_address,
            interface_index,
            hardware_type: hwaddr.sa_family,
            packet_type: libc::PACKET_HOST as u8,
        })
    }

    fn interface_index(&self, iface: &CStr) -> io::Result<i32> {
        // This block is marked as unsafe because it uses FFI, however, we believe it to be safe
        // because it handles FFI failures in accordance with the bound API's conventions, and
        // the &CStr is only copied from.
        unsafe {
            let mut ifr = ifreq_for(iface);
            // ioctl(SIOCGIFINDEX) fills in the index field of the ifreq object
            // Resources:
            // man 7 netdevice
            let err = libc::ioctl(self.fd, linux::SIOCGIFINDEX, &mut ifr);
            if err < 0 {
                return Err(io::Error::last_os_error());
            }
            // expanded from `ifr_ifindex` in kernel headers
            Ok(ifr.ifr_ifru.ifru_ivalue)
        }
    }

    /// Binds the socket to a network interface. This function consumes the `Socket` instance, as
    /// no more configuration options may be safely changed.
    pub fn bind(self, iface: impl AsRef<CStr>) -> io::Result<BoundSocket> {
        let interface_index = self.interface_index(iface.as_ref())?;
        let ll = LinkEndpoint::new(&[], interface_index).to_sockaddr_ll(self.protocol);
        // Resources:
        // https://beej.us/guide/bgnet/html/multi/syscalls.html#bind
        // man 7 packet regarding sockaddr_ll
        let err = unsafe {
            libc::bind(
                self.fd,
                &ll as *const _ as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };
        if err < 0 {
            return Err(io::Error::last_os_error());
        }

        let fd = self.fd;
        let protocol = self.protocol;
        // This ensures that `self` does not attempt to close the file descriptor, as the file
        // descriptor is transferred to the BoundSocket we're returning. This doesn't cause any
        // resource leaks since the stack-bound `self` is consumed and deallocated in
        // `mem::forget`.
        mem::forget(self);
        Ok(BoundSocket {
            fd,
            protocol,
            interface_index,
        })
    }
}

/// Zeroed `ifreq` with `ifr_name` set to `iface`, truncated to `IFNAMSIZ - 1` bytes so the name
/// stays NUL-terminated.
unsafe fn ifreq_for(iface: &CStr) -> linux::ifreq {
    let mut ifr: linux::ifreq = MaybeUninit::zeroed().assume_init();
    let name = iface.to_bytes();
    ptr::copy_nonoverlapping(
        name.as_ptr() as *const libc::c_char,
        ifr.ifr_ifrn.ifrn_name.as_mut_ptr(),
        name.len().min(libc::IFNAMSIZ - 1),
    );
    ifr
}

impl BoundSocket {
    /// Index of the interface this socket is bound to.
    pub fn interface_index(&self) -> i32 {
        self.interface_index
    }

    /// Sends a frame to the NIC, addressed to `dest`.
    pub fn send_to(&mut self, frame: &[u8], dest: &LinkEndpoint) -> io::Result<usize> {
        let addr = dest.to_sockaddr_ll(self.protocol);
        // This block is marked as unsafe because it uses FFI. We believe this code to be safe,
        // because it safely borrows the Rust-owned frame and passes the length of the frame to the
        // libc function, so it should not exhibit any C-side undefined behaviour.
        unsafe {
            // Resources:
            // https://beej.us/guide/bgnet/html/multi/syscalls.html#sendtorecv
            let bytes = libc::sendto(
                self.fd,
                frame.as_ptr() as *const _,
                frame.len(),
                0,
                &addr as *const _ as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            );
            if bytes < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(bytes as usize)
            }
        }
    }

    /// Receives a frame from the NIC, along with the endpoint it arrived from.
    pub fn recv(&mut self, frame: &mut [u8]) -> io::Result<(usize, LinkEndpoint)> {
        // Note comment in `send_to` call.
        unsafe {
            let mut storage = MaybeUninit::<libc::sockaddr_storage>::zeroed();
            let mut addrlen = mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;

            // Resources:
            // https://beej.us/guide/bgnet/html/multi/syscalls.html#sendtorecv
            let bytes = libc::recvfrom(
                self.fd,
                frame.as_mut_ptr() as *mut _,
                frame.len(),
                0,
                storage.as_mut_ptr() as *mut _,
                &mut addrlen,
            );
            if bytes < 0 {
                Err(io::Error::last_os_error())
            } else {
                // sockaddr_storage is large enough and suitably aligned for any sockaddr.
                let ll = &*(storage.as_ptr() as *const libc::sockaddr_ll);
                Ok((bytes as usize, LinkEndpoint::from_sockaddr_ll(ll)))
            }
        }
    }

    /// Blocks until a frame is ready to be read or `timeout` elapses. Returns `Ok(false)` on
    /// timeout.
    pub fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        let mut pfd = libc::pollfd {
            fd: self.fd,
            events: libc::POLLIN,
            revents: 0,
        };
        let millis = timeout.as_millis().min(libc::c_int::max_value() as u128) as libc::c_int;
        // Resources:
        // man 2 poll
        let ready = unsafe { libc::poll(&mut pfd, 1, millis) };
        if ready < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(ready > 0)
        }
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}

impl Drop for BoundSocket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}
