//! Resolves an IPv4 neighbour's Ethernet address by broadcasting an ARP request on an
//! `AF_PACKET` socket and waiting for the matching reply.

mod builder;
mod errors;
mod resolver;
mod transport;

pub use builder::{build_frame, build_request};
pub use errors::{Error, ErrorKind};
pub use resolver::{Resolver, MAX_ATTEMPTS, POLL_TIMEOUT};
pub use transport::Transport;
