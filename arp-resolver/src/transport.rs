use afpacket::{BoundSocket, LinkEndpoint};
use std::io;
use std::time::Duration;

/// Blocking frame I/O over an already open and bound link-layer socket.
///
/// None of these retry on failure; errors are handed back to the caller unchanged.
pub trait Transport {
    /// Transmits the whole of `frame` to `destination`.
    fn send(&mut self, frame: &[u8], destination: &LinkEndpoint) -> io::Result<usize>;

    /// Blocks until a frame can be read or `timeout` elapses. `Ok(false)` means timed out.
    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool>;

    /// Reads at most one frame into `buffer`.
    fn receive(&mut self, buffer: &mut [u8]) -> io::Result<usize>;
}

impl Transport for BoundSocket {
    fn send(&mut self, frame: &[u8], destination: &LinkEndpoint) -> io::Result<usize> {
        self.send_to(frame, destination)
    }

    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        BoundSocket::wait_readable(self, timeout)
    }

    fn receive(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        self.recv(buffer).map(|(len, _)| len)
    }
}
