//! One-shot DHCP client.
//!
//! Sends a broadcast DISCOVER on one interface and prints the first reply
//! matching the transaction as JSON, retrying with growing read deadlines.

use std::time::{Duration, Instant};

use anyhow::{bail, Context};

use crate::codec::{build, hex_colon, parse};
use crate::config::Cli;
use crate::domain::frame::{Frame, Value};
use crate::domain::registry;
use crate::link::{Endpoint, RawLink};

const DEFAULT_PARAMETERS: &[&str] = &[
    "hostname",
    "subnet-mask",
    "routers",
    "domain-name",
    "domain-name-servers",
    "domain-search",
    "classless-route",
    "time-offset",
    "ntp-servers",
];

pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let interface = cli
        .interfaces
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .context("no interface specified")?;

    // The client side of the exchange listens one port above the server's.
    let link = RawLink::open(interface, cli.port + 1)
        .with_context(|| format!("binding interface {interface}"))?;

    for attempt in 3..=5u64 {
        let frame = discover_frame(&link, cli)?;
        let packet = build(&frame).context("building request")?;
        if cli.dump {
            print_frame("> request", &frame, cli.pretty)?;
        }

        let mut from = Endpoint::default();
        if let Some(value) = frame.str("bootp-client-address") {
            from.ip = value.parse().ok();
        }
        let to = Endpoint { mac: None, ip: None, port: cli.port };
        link.send(Some(from), to, &packet)
            .context("sending request")?;

        let deadline = Instant::now() + Duration::from_secs(attempt);
        while let Some(datagram) = link.recv_deadline(deadline)? {
            let Ok(reply) = parse(&datagram.payload) else {
                continue;
            };
            if matches_request(&frame, &reply) {
                let prefix = if cli.pretty { "< response" } else { "" };
                print_frame(prefix, &reply, cli.pretty)?;
                return Ok(());
            }
        }
    }
    bail!("no response from server")
}

/// Build one DISCOVER with a fresh transaction id, overloaded by any `-R`
/// extra options.
fn discover_frame(link: &RawLink, cli: &Cli) -> anyhow::Result<Frame> {
    let mut frame = Frame::new();
    frame.insert("bootp-transaction-id", format!("{:08x}", rand::random::<u32>()));
    frame.insert("bootp-broadcast", true);
    frame.insert("dhcp-message-type", "discover");
    frame.insert(
        "client-hardware-address",
        hex_colon(&link.local_mac().into_array()),
    );
    frame.insert(
        "parameters-request-list",
        Value::List(DEFAULT_PARAMETERS.iter().map(|name| Value::from(*name)).collect()),
    );
    if let Some(address) = link.local_ip() {
        frame.insert("requested-ip-address", address.to_string());
    }
    if let Ok(hostname) = nix::unistd::gethostname() {
        if let Ok(hostname) = hostname.into_string() {
            if !hostname.is_empty() && hostname != "unknown" {
                frame.insert("hostname", hostname);
            }
        }
    }
    if let Some(extra) = &cli.extra {
        let overrides: Frame = serde_json::from_str(extra).context("parsing extra options")?;
        for (name, value) in overrides.iter() {
            frame.insert(name.clone(), value.clone());
        }
    }
    Ok(frame)
}

/// A reply matches when it answers the same hardware address and
/// transaction id with a message type from the request's family.
fn matches_request(request: &Frame, reply: &Frame) -> bool {
    if reply.str("bootp-opcode") != Some("reply") {
        return false;
    }
    if reply.str("client-hardware-address") != request.str("client-hardware-address")
        || reply.str("bootp-transaction-id") != request.str("bootp-transaction-id")
    {
        return false;
    }
    let Some(request_type) = request
        .str("dhcp-message-type")
        .and_then(registry::msgtype_by_name)
    else {
        return false;
    };
    match reply
        .str("dhcp-message-type")
        .and_then(registry::msgtype_by_name)
    {
        Some(reply_type) => {
            reply_type.request == 0 || reply_type.request == request_type.id
        }
        None => false,
    }
}

fn print_frame(prefix: &str, frame: &Frame, pretty: bool) -> anyhow::Result<()> {
    if pretty {
        let content = serde_json::to_string_pretty(frame)?;
        println!("{prefix} {}", content.replace('\n', &format!("\n{prefix} ")));
    } else {
        println!("{}", serde_json::to_string(frame)?);
    }
    Ok(())
}
