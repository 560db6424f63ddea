use afpacket::{LinkEndpoint, Socket};
use arp_packets::{MacAddr, ARP_ETHER_TYPE};
use arp_resolver::{Error, ErrorKind, Resolver};
use clap::{App, Arg, ArgMatches};
use failure::ResultExt;
use log::{error, LevelFilter, Log, Metadata, Record};
use std::ffi::CString;
use std::net::Ipv4Addr;
use std::process;

/// Prints records to stdout, errors to stderr.
struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match record.level() {
            log::Level::Error => eprintln!("[{}] {}", record.level(), record.args()),
            level => println!("[{}] {}", level, record.args()),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

fn init_logging(verbosity: u64) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // Only fails if a logger is already installed, which can't happen this early.
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}

fn parse_ipv4(matches: &ArgMatches, name: &str) -> Ipv4Addr {
    let value = matches.value_of(name).unwrap();
    value.parse().unwrap_or_else(|_| {
        eprintln!("{} is not a valid IPv4 address: {}", name, value);
        process::exit(2);
    })
}

fn run(iface: &str, source_address: Ipv4Addr, target_address: Ipv4Addr) -> Result<MacAddr, Error> {
    let iface = CString::new(iface).map_err(|_| ErrorKind::InvalidArgument)?;

    let socket = Socket::new(ARP_ETHER_TYPE).context(ErrorKind::Transport)?;
    let source_endpoint = socket
        .interface_endpoint(&iface)
        .context(ErrorKind::Transport)?;
    let mut destination_endpoint =
        LinkEndpoint::new(&MacAddr::BROADCAST.bytes, source_endpoint.interface_index);
    destination_endpoint.hardware_type = source_endpoint.hardware_type;
    destination_endpoint.packet_type = libc::PACKET_BROADCAST as u8;

    let socket = socket.bind(&iface).context(ErrorKind::Transport)?;

    Resolver::new(socket).resolve(
        &source_endpoint,
        &mut destination_endpoint,
        source_address,
        target_address,
    )
}

fn main() {
    let matches = App::new("arp-resolve")
        .version("0.1")
        .author("Route-rs Contributors")
        .about("Resolve an IPv4 neighbour's hardware address with ARP")
        .arg(
            Arg::with_name("interface")
                .short("i")
                .long("interface")
                .value_name("IFACE")
                .help("Interface to send the request on")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("source")
                .short("s")
                .long("source")
                .value_name("IPV4")
                .help("Our own IPv4 address on that interface")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("target")
                .value_name("TARGET")
                .help("IPv4 address to resolve")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Log more; repeat for debug output"),
        )
        .get_matches();

    init_logging(matches.occurrences_of("verbose"));

    let iface = matches.value_of("interface").unwrap();
    let source_address = parse_ipv4(&matches, "source");
    let target_address = parse_ipv4(&matches, "target");

    match run(iface, source_address, target_address) {
        Ok(mac) => println!("{} is at {}", target_address, mac),
        Err(err) => {
            error!("Could not resolve {} on {}: {}", target_address, iface, err);
            process::exit(1);
        }
    }
}
