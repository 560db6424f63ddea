#![cfg(target_os = "linux")]
mod endpoint;
mod linux;
mod sockets;

pub use endpoint::LinkEndpoint;
pub use sockets::{BoundSocket, Socket};
