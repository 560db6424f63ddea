use crate::builder::build_request;
use crate::errors::{Error, ErrorKind};
use crate::transport::Transport;
use afpacket::LinkEndpoint;
use arp_packets::{ArpFrame, MacAddr, ARP_FRAME_LEN};
use failure::ResultExt;
use log::{debug, info, warn};
use std::net::Ipv4Addr;
use std::time::Duration;

/// How long each poll waits for a frame before counting a timeout.
pub const POLL_TIMEOUT: Duration = Duration::from_millis(2_020);

/// Timeouts and unusable frames tolerated, in total, before giving up.
pub const MAX_ATTEMPTS: u32 = 5;

/// Drives one ARP request/reply exchange over a `Transport`.
///
/// The request is built once and resent verbatim every time a poll times out. Frames that
/// arrive but aren't a reply to us are skipped without resending. Both count against the
/// same `MAX_ATTEMPTS` budget.
pub struct Resolver<T: Transport> {
    transport: T,
}

impl<T: Transport> Resolver<T> {
    pub fn new(transport: T) -> Self {
        Resolver { transport }
    }

    ///
    /// Resolves `target_address` to a hardware address.
    ///
    /// The request is sent to `destination_endpoint`; on success the resolved address is also
    /// written into it. A reply is accepted when its target protocol address is
    /// `source_address`, i.e. it is directed back at us. The reply's sender protocol address is
    /// not compared with `target_address`.
    ///
    /// Consumes the resolver so the transport (and its socket) is released on every return path.
    ///
    pub fn resolve(
        mut self,
        source_endpoint: &LinkEndpoint,
        destination_endpoint: &mut LinkEndpoint,
        source_address: Ipv4Addr,
        target_address: Ipv4Addr,
    ) -> Result<MacAddr, Error> {
        if !source_endpoint.is_ethernet_sized() || !destination_endpoint.is_ethernet_sized() {
            return Err(ErrorKind::InvalidArgument.into());
        }

        let request = build_request(source_endpoint, source_address, target_address)?;
        let request_bytes = request.to_bytes();
        let our_address = request.arp_header.sender_protocol_addr;

        let mut buffer = [0u8; ARP_FRAME_LEN];
        let mut attempts = 0;

        loop {
            debug!(
                "Sending ARP request for {} on interface {}",
                target_address, destination_endpoint.interface_index
            );
            self.transport
                .send(&request_bytes, destination_endpoint)
                .context(ErrorKind::Transport)?;

            loop {
                let ready = self
                    .transport
                    .wait_readable(POLL_TIMEOUT)
                    .context(ErrorKind::Transport)?;
                if !ready {
                    debug!("No response within {:?}", POLL_TIMEOUT);
                    count_attempt(&mut attempts)?;
                    break;
                }

                let len = self
                    .transport
                    .receive(&mut buffer)
                    .context(ErrorKind::Transport)?;

                match ArpFrame::from_bytes(&buffer[..len]) {
                    Ok(reply) if reply.is_reply() => {
                        let arp = &reply.arp_header;
                        if arp.target_protocol_addr == our_address {
                            let mac = arp.sender_hardware_addr;
                            info!("Target MAC: {}", mac);
                            destination_endpoint.hardware_address = mac.bytes.to_vec();
                            return Ok(mac);
                        }
                        info!(
                            "ARP reply is for {}, not {}, retry...",
                            arp.target_protocol_addr, our_address
                        );
                    }
                    Ok(frame) => info!(
                        "Not an ARP reply (opcode {}), retry...",
                        frame.arp_header.opcode
                    ),
                    Err(reason) => info!("Not an ARP PACKET ({}), retry...", reason),
                }
                count_attempt(&mut attempts)?;
            }
        }
    }
}

fn count_attempt(attempts: &mut u32) -> Result<(), Error> {
    *attempts += 1;
    if *attempts >= MAX_ATTEMPTS {
        warn!("Max Attempts reached, could not get response");
        return Err(ErrorKind::MaxAttemptsExceeded.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_frame;
    use arp_packets::{ArpOp, IPV4_ETHER_TYPE};
    use failure::Fail;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io;
    use std::rc::Rc;

    const OUR_MAC: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x01];
    const PEER_MAC: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x99];

    fn our_ip() -> Ipv4Addr {
        Ipv4Addr::new(192, 168, 7, 1)
    }

    fn peer_ip() -> Ipv4Addr {
        Ipv4Addr::new(192, 168, 7, 42)
    }

    enum Event {
        Timeout,
        Frame(Vec<u8>),
        WaitError(io::ErrorKind),
        ReadError(io::ErrorKind),
    }

    #[derive(Default)]
    struct Record {
        sent: Vec<(Vec<u8>, LinkEndpoint)>,
        waits: usize,
        reads: usize,
        dropped: bool,
    }

    /// Plays back a list of events; once they run out the socket never becomes readable again.
    struct ScriptedTransport {
        events: VecDeque<Event>,
        send_error: Option<io::ErrorKind>,
        record: Rc<RefCell<Record>>,
    }

    impl ScriptedTransport {
        fn new(events: Vec<Event>) -> (Self, Rc<RefCell<Record>>) {
            let record = Rc::new(RefCell::new(Record::default()));
            let transport = ScriptedTransport {
                events: events.into(),
                send_error: None,
                record: record.clone(),
            };
            (transport, record)
        }
    }

    impl Transport for ScriptedTransport {
        fn send(&mut self, frame: &[u8], destination: &LinkEndpoint) -> io::Result<usize> {
            if let Some(kind) = self.send_error {
                return Err(io::Error::new(kind, "send failed"));
            }
            self.record
                .borrow_mut()
                .sent
                .push((frame.to_vec(), destination.clone()));
            Ok(frame.len())
        }

        fn wait_readable(&mut self, _timeout: Duration) -> io::Result<bool> {
            self.record.borrow_mut().waits += 1;
            match self.events.front() {
                None | Some(Event::Timeout) => {
                    self.events.pop_front();
                    Ok(false)
                }
                Some(Event::WaitError(kind)) => Err(io::Error::new(*kind, "poll failed")),
                Some(_) => Ok(true),
            }
        }

        fn receive(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
            self.record.borrow_mut().reads += 1;
            match self.events.pop_front() {
                Some(Event::Frame(bytes)) => {
                    let len = bytes.len().min(buffer.len());
                    buffer[..len].copy_from_slice(&bytes[..len]);
                    Ok(len)
                }
                Some(Event::ReadError(kind)) => Err(io::Error::new(kind, "read failed")),
                _ => panic!("receive called without a readable event"),
            }
        }
    }

    impl Drop for ScriptedTransport {
        fn drop(&mut self) {
            self.record.borrow_mut().dropped = true;
        }
    }

    fn endpoints() -> (LinkEndpoint, LinkEndpoint) {
        let source = LinkEndpoint::new(&OUR_MAC, 2);
        let destination = LinkEndpoint::new(&MacAddr::BROADCAST.bytes, 2);
        (source, destination)
    }

    /// A reply from `sender_ip`/PEER_MAC addressed to `target_ip`, trimmed to the 60 bytes the
    /// kernel hands back for a minimum-size Ethernet frame.
    fn reply(sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Event {
        let peer = LinkEndpoint::new(&PEER_MAC, 2);
        let frame = build_frame(&peer, sender_ip, target_ip, ArpOp::Reply).unwrap();
        Event::Frame(frame.to_bytes()[..60].to_vec())
    }

    fn matching_reply() -> Event {
        reply(peer_ip(), our_ip())
    }

    fn non_arp_frame() -> Event {
        let mut bytes = vec![0u8; 60];
        bytes[12..14].copy_from_slice(&IPV4_ETHER_TYPE.to_be_bytes());
        Event::Frame(bytes)
    }

    fn foreign_request() -> Event {
        let other = LinkEndpoint::new(&[0x02, 0, 0, 0, 0, 0x55], 2);
        let frame =
            build_frame(&other, Ipv4Addr::new(192, 168, 7, 3), our_ip(), ArpOp::Request).unwrap();
        Event::Frame(frame.to_bytes().to_vec())
    }

    fn run(transport: ScriptedTransport) -> (Result<MacAddr, Error>, LinkEndpoint) {
        let (source, mut destination) = endpoints();
        let result = Resolver::new(transport).resolve(&source, &mut destination, our_ip(), peer_ip());
        (result, destination)
    }

    fn io_cause(err: &Error) -> io::ErrorKind {
        err.cause()
            .and_then(|c| c.downcast_ref::<io::Error>())
            .map(|e| e.kind())
            .unwrap()
    }

    #[test]
    fn first_reply_resolves() {
        let (transport, record) = ScriptedTransport::new(vec![matching_reply()]);
        let (result, destination) = run(transport);

        assert_eq!(result.unwrap(), MacAddr::new(PEER_MAC));
        assert_eq!(destination.hardware_address, PEER_MAC.to_vec());

        let record = record.borrow();
        assert_eq!(record.sent.len(), 1);
        assert_eq!(record.waits, 1);
        assert_eq!(record.reads, 1);
        assert!(record.dropped);
    }

    #[test]
    fn request_sent_to_destination() {
        let (transport, record) = ScriptedTransport::new(vec![matching_reply()]);
        let _ = run(transport);

        let record = record.borrow();
        let (bytes, destination) = &record.sent[0];
        assert_eq!(bytes.len(), ARP_FRAME_LEN);
        assert_eq!(destination.hardware_address, MacAddr::BROADCAST.bytes.to_vec());

        let request = ArpFrame::from_bytes(bytes).unwrap();
        assert_eq!(request.arp_header.op(), Some(ArpOp::Request));
        assert_eq!(request.arp_header.sender_protocol_addr, our_ip());
        assert_eq!(request.arp_header.target_protocol_addr, peer_ip());
    }

    #[test]
    fn silence_exhausts_attempts() {
        let (transport, record) = ScriptedTransport::new(vec![]);
        let (result, destination) = run(transport);

        assert_eq!(result.unwrap_err().kind(), ErrorKind::MaxAttemptsExceeded);
        assert_eq!(destination.hardware_address, MacAddr::BROADCAST.bytes.to_vec());

        let record = record.borrow();
        assert_eq!(record.waits, 5);
        assert_eq!(record.sent.len(), 5);
        assert_eq!(record.reads, 0);
        assert!(record.dropped);
    }

    #[test]
    fn every_retransmission_is_identical() {
        let (transport, record) = ScriptedTransport::new(vec![]);
        let _ = run(transport);

        let record = record.borrow();
        let first = &record.sent[0].0;
        assert!(record.sent.iter().all(|(bytes, _)| bytes == first));
    }

    #[test]
    fn timeouts_then_reply() {
        let (transport, record) = ScriptedTransport::new(vec![
            Event::Timeout,
            Event::Timeout,
            matching_reply(),
        ]);
        let (result, _) = run(transport);

        assert_eq!(result.unwrap(), MacAddr::new(PEER_MAC));
        assert_eq!(record.borrow().sent.len(), 3);
    }

    #[test]
    fn unrelated_frames_count_without_retransmitting() {
        let (transport, record) = ScriptedTransport::new(vec![
            non_arp_frame(),
            reply(peer_ip(), Ipv4Addr::new(192, 168, 7, 200)),
            foreign_request(),
            non_arp_frame(),
            reply(Ipv4Addr::new(192, 168, 7, 9), Ipv4Addr::new(10, 0, 0, 1)),
            matching_reply(),
        ]);
        let (result, _) = run(transport);

        assert_eq!(result.unwrap_err().kind(), ErrorKind::MaxAttemptsExceeded);
        let record = record.borrow();
        assert_eq!(record.sent.len(), 1);
        assert_eq!(record.reads, 5);
    }

    #[test]
    fn mismatch_then_reply() {
        let (transport, record) = ScriptedTransport::new(vec![
            non_arp_frame(),
            foreign_request(),
            matching_reply(),
        ]);
        let (result, _) = run(transport);

        assert_eq!(result.unwrap(), MacAddr::new(PEER_MAC));
        let record = record.borrow();
        assert_eq!(record.sent.len(), 1);
        assert_eq!(record.reads, 3);
    }

    #[test]
    fn timeouts_and_mismatches_share_budget() {
        let (transport, record) = ScriptedTransport::new(vec![
            Event::Timeout,
            Event::Timeout,
            Event::Timeout,
            non_arp_frame(),
            non_arp_frame(),
            matching_reply(),
        ]);
        let (result, _) = run(transport);

        assert_eq!(result.unwrap_err().kind(), ErrorKind::MaxAttemptsExceeded);
        let record = record.borrow();
        assert_eq!(record.sent.len(), 4);
        assert_eq!(record.reads, 2);
    }

    #[test]
    fn reply_matched_on_our_address_only() {
        // The sender isn't the host we asked about, but the reply is directed at us.
        let (transport, _) =
            ScriptedTransport::new(vec![reply(Ipv4Addr::new(192, 168, 7, 77), our_ip())]);
        let (result, _) = run(transport);

        assert_eq!(result.unwrap(), MacAddr::new(PEER_MAC));
    }

    #[test]
    fn truncated_frame_counts_as_attempt() {
        let (transport, record) = ScriptedTransport::new(vec![
            Event::Frame(vec![0xff; 20]),
            matching_reply(),
        ]);
        let (result, _) = run(transport);

        assert!(result.is_ok());
        assert_eq!(record.borrow().reads, 2);
    }

    #[test]
    fn send_error_propagates() {
        let (mut transport, record) = ScriptedTransport::new(vec![matching_reply()]);
        transport.send_error = Some(io::ErrorKind::PermissionDenied);
        let (result, _) = run(transport);

        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(io_cause(&err), io::ErrorKind::PermissionDenied);

        let record = record.borrow();
        assert_eq!(record.waits, 0);
        assert!(record.dropped);
    }

    #[test]
    fn read_error_is_terminal() {
        let (transport, record) = ScriptedTransport::new(vec![
            Event::ReadError(io::ErrorKind::ConnectionReset),
            matching_reply(),
        ]);
        let (result, _) = run(transport);

        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(io_cause(&err), io::ErrorKind::ConnectionReset);
        assert_eq!(record.borrow().reads, 1);
    }

    #[test]
    fn wait_error_is_terminal() {
        let (transport, record) =
            ScriptedTransport::new(vec![Event::WaitError(io::ErrorKind::Interrupted)]);
        let (result, _) = run(transport);

        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(io_cause(&err), io::ErrorKind::Interrupted);
        assert_eq!(record.borrow().reads, 0);
    }

    #[test]
    fn invalid_endpoints_rejected_before_io() {
        let cases = vec![
            (LinkEndpoint::new(&[1, 2, 3, 4], 2), LinkEndpoint::new(&[0xff; 6], 2)),
            (LinkEndpoint::new(&OUR_MAC, 2), LinkEndpoint::new(&[0xff; 8], 2)),
            (LinkEndpoint::new(&[], 2), LinkEndpoint::new(&[], 2)),
        ];
        for (source, mut destination) in cases {
            let (transport, record) = ScriptedTransport::new(vec![matching_reply()]);
            let result =
                Resolver::new(transport).resolve(&source, &mut destination, our_ip(), peer_ip());

            assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidArgument);
            let record = record.borrow();
            assert!(record.sent.is_empty());
            assert_eq!(record.waits, 0);
            assert!(record.dropped);
        }
    }
}
