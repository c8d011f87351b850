//! Transaction dispatcher.
//!
//! Owns the per-interface sources, the in-flight transaction table and the
//! two channels binding the codec, the link layer and the backend: inbound
//! packets flow in from per-source readers, request frames flow out to the
//! backend, and backend replies come back through the inbound channel to
//! be routed out of the originating interface with the right destination
//! semantics (unicast / broadcast / relay-forward).

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use macaddr::MacAddr6;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::backend::{self, BackendConfig};
use crate::codec::{build, hex_colon, parse, transaction_key};
use crate::domain::frame::Frame;
use crate::link::{udp, Endpoint, RawLink};

/// Capacity of the inbound packet and outbound frame channels.
const CHANNEL_CAPACITY: usize = 1024;
/// In-flight transactions expire this long after creation.
const CONTEXT_TTL: Duration = Duration::from_secs(10);
/// Name of the non-interface-scoped source.
const UNSCOPED: &str = "-";

/// One datagram accepted by a source reader, before parsing.
#[derive(Debug)]
pub struct InboundPacket {
    /// Source name: an interface, `"-"`, `"worker"` or `"http"`.
    pub source: String,
    /// Link-layer source MAC when the packet came off a raw link.
    pub hardware: Option<MacAddr6>,
    /// Sender as `ip:port` (worker pid / backend URL for injected replies).
    pub client: String,
    pub data: Vec<u8>,
}

/// In-flight transaction context, keyed by the transaction key.
#[derive(Debug, Clone)]
pub struct TxnContext {
    pub created: Instant,
    pub source: String,
    pub client: String,
    pub data: Frame,
}

pub type ContextTable = Arc<RwLock<HashMap<String, TxnContext>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Server,
    Relay,
}

/// One bound source: a raw link for link-layer unicast and/or a kernel UDP
/// endpoint. Never mutated after startup.
pub struct Source {
    pub raw: Option<Arc<RawLink>>,
    pub udp: Option<Arc<UdpSocket>>,
}

pub struct Dispatcher {
    mode: Mode,
    relay_target: Option<String>,
    relay_address: Option<Ipv4Addr>,
    sources: HashMap<String, Source>,
    contexts: ContextTable,
}

impl Dispatcher {
    /// Bind one source per configured interface name; an empty name is the
    /// non-interface-scoped UDP endpoint. Interfaces that cannot be bound
    /// are skipped with a `bind` log record.
    pub async fn bind(
        mode: Mode,
        interfaces: &[String],
        address: Ipv4Addr,
        port: u16,
        relay_target: Option<String>,
        relay_address: Option<Ipv4Addr>,
    ) -> anyhow::Result<Self> {
        let mut sources: HashMap<String, Source> = HashMap::new();

        for name in interfaces {
            if name.is_empty() {
                match udp::bind(address, port, None) {
                    Ok(socket) => {
                        info!(bind = %format!("{address}:{port}"), mode = ?mode, "bind");
                        sources.insert(
                            UNSCOPED.to_string(),
                            Source { raw: None, udp: Some(Arc::new(socket)) },
                        );
                    }
                    Err(reason) => {
                        warn!(bind = %format!("{address}:{port}"), reason = %reason, "bind");
                    }
                }
                continue;
            }

            let label = format!("{address}:{port}@{name}");
            match RawLink::open(name, port) {
                Ok(link) => {
                    let Some(local) = link.local_ip() else {
                        warn!(
                            bind = %label,
                            reason = %format!("skipping interface {name}: no address"),
                            "bind"
                        );
                        continue;
                    };
                    info!(
                        bind = %label,
                        interface = %format!("{}@{}", hex_colon(&link.local_mac().into_array()), local),
                        "bind"
                    );
                    sources.insert(
                        name.clone(),
                        Source { raw: Some(Arc::new(link)), udp: None },
                    );
                }
                Err(reason) if mode == Mode::Relay => {
                    // Relay forwarding does not need the raw link; fall back
                    // to a device-bound kernel socket.
                    match udp::bind(address, port, Some(name.as_str())) {
                        Ok(socket) => {
                            info!(bind = %label, fallback = %reason, "bind");
                            sources.insert(
                                name.clone(),
                                Source { raw: None, udp: Some(Arc::new(socket)) },
                            );
                        }
                        Err(reason) => {
                            warn!(
                                bind = %label,
                                reason = %format!("skipping interface {name}: {reason}"),
                                "bind"
                            );
                        }
                    }
                }
                Err(reason) => {
                    warn!(
                        bind = %label,
                        reason = %format!("skipping interface {name}: {reason}"),
                        "bind"
                    );
                }
            }
        }

        if sources.is_empty() {
            anyhow::bail!("no usable source could be bound");
        }

        Ok(Self {
            mode,
            relay_target,
            relay_address,
            sources,
            contexts: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Run the dispatcher: one reader per source, the context reaper, the
    /// backend (server mode) and the central accept loop.
    pub async fn run(self, backend: Option<BackendConfig>) -> anyhow::Result<()> {
        let (packets_tx, mut packets_rx) = mpsc::channel::<InboundPacket>(CHANNEL_CAPACITY);
        let (frames_tx, frames_rx) = mpsc::channel::<Frame>(CHANNEL_CAPACITY);

        if let Some(config) = backend {
            backend::spawn(config, frames_rx, packets_tx.clone(), self.contexts.clone());
        }

        for (name, source) in &self.sources {
            if let Some(link) = &source.raw {
                let link = link.clone();
                let name = name.clone();
                let packets = packets_tx.clone();
                std::thread::spawn(move || loop {
                    match link.recv() {
                        Ok(datagram) => {
                            let packet = InboundPacket {
                                source: name.clone(),
                                hardware: Some(datagram.src_mac),
                                client: datagram.src.to_string(),
                                data: datagram.payload,
                            };
                            if packets.blocking_send(packet).is_err() {
                                return;
                            }
                        }
                        Err(reason) => {
                            warn!(interface = %name, reason = %reason, "recv");
                            return;
                        }
                    }
                });
            }
            if let Some(socket) = &source.udp {
                let socket = socket.clone();
                let name = name.clone();
                let packets = packets_tx.clone();
                tokio::spawn(async move {
                    let mut buffer = vec![0u8; 4 << 10];
                    loop {
                        match socket.recv_from(&mut buffer).await {
                            Ok((read, from)) => {
                                let packet = InboundPacket {
                                    source: name.clone(),
                                    hardware: None,
                                    client: from.to_string(),
                                    data: buffer[..read].to_vec(),
                                };
                                if packets.send(packet).await.is_err() {
                                    return;
                                }
                            }
                            Err(reason) => {
                                warn!(interface = %name, reason = %reason, "recv");
                                return;
                            }
                        }
                    }
                });
            }
        }

        let contexts = self.contexts.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            loop {
                ticker.tick().await;
                purge_expired(&mut contexts.write().unwrap(), Instant::now());
            }
        });

        while let Some(packet) = packets_rx.recv().await {
            let frame = match parse(&packet.data) {
                Ok(frame) => frame,
                Err(reason) => {
                    debug!(interface = %packet.source, reason = %reason, "drop");
                    continue;
                }
            };
            let key = transaction_key(&frame);
            if frame.str("bootp-opcode") == Some("request") {
                self.handle_request(packet, frame, key, &frames_tx).await;
            } else {
                self.handle_reply(frame, key).await;
            }
        }
        Ok(())
    }

    async fn handle_request(
        &self,
        packet: InboundPacket,
        mut frame: Frame,
        key: String,
        frames: &mpsc::Sender<Frame>,
    ) {
        let local_ip = self
            .sources
            .get(&packet.source)
            .and_then(|source| source.raw.as_ref())
            .and_then(|link| link.local_ip());
        if !accept_request(&frame, &packet.source, local_ip, packet.hardware, &packet.client) {
            return;
        }

        {
            let mut contexts = self.contexts.write().unwrap();
            if contexts.contains_key(&key) {
                // Duplicate request mid-flight.
                return;
            }
            contexts.insert(
                key,
                TxnContext {
                    created: Instant::now(),
                    source: packet.source.clone(),
                    client: packet.client.clone(),
                    data: frame.clone(),
                },
            );
        }
        info!(
            msgtype = frame.str("dhcp-message-type").unwrap_or_default(),
            txid = %frame.txid(),
            interface = %packet.source,
            client = %packet.client,
            address = frame.str("requested-ip-address").unwrap_or_default(),
            hostname = frame.str("hostname").unwrap_or_default(),
            "request"
        );

        if self.mode == Mode::Relay {
            self.forward_to_relay(&packet, local_ip).await;
            return;
        }

        if let Some(local) = local_ip {
            frame.insert("source-address", local.to_string());
        }
        // Never block the accept loop on a slow backend.
        let _ = frames.try_send(frame);
    }

    /// Re-parse the accepted packet, bump the hop count, stamp the relay
    /// address and forward it to the configured DHCP server through the
    /// non-scoped endpoint.
    async fn forward_to_relay(&self, packet: &InboundPacket, local_ip: Option<Ipv4Addr>) {
        let Some(target) = &self.relay_target else {
            return;
        };
        let Ok(mut forward) = parse(&packet.data) else {
            return;
        };
        let hops = forward.int("bootp-relay-hops").unwrap_or(0);
        forward.insert("bootp-relay-hops", hops + 1);
        let Some(relay_address) = self.relay_address.or(local_ip) else {
            warn!(interface = %packet.source, reason = "no relay address", "send");
            return;
        };
        forward.insert("bootp-relay-address", relay_address.to_string());
        forward.remove("bootp-broadcast");

        let data = match build(&forward) {
            Ok(data) => data,
            Err(reason) => {
                warn!(txid = %forward.txid(), reason = %reason, "send");
                return;
            }
        };
        let Some(socket) = self
            .sources
            .get(UNSCOPED)
            .and_then(|source| source.udp.as_ref())
        else {
            warn!(reason = "no relay endpoint", "send");
            return;
        };
        match resolve(target).await {
            Ok(address) => {
                if let Err(reason) = socket.send_to(&data, address).await {
                    warn!(relay = %target, reason = %reason, "send");
                    return;
                }
                info!(
                    msgtype = forward.str("dhcp-message-type").unwrap_or_default(),
                    txid = %forward.txid(),
                    relay = %target,
                    "send"
                );
            }
            Err(reason) => {
                warn!(relay = %target, reason = %reason, "send");
            }
        }
    }

    async fn handle_reply(&self, mut frame: Frame, key: String) {
        let Some(context) = ({
            let contexts = self.contexts.read().unwrap();
            contexts.get(&key).cloned()
        }) else {
            return;
        };

        let Some(client) = reply_client(&context.data, &mut frame, &context.client) else {
            return;
        };
        if self.mode == Mode::Relay {
            if let Some(target) = &self.relay_target {
                info!(
                    msgtype = frame.str("dhcp-message-type").unwrap_or_default(),
                    txid = %frame.txid(),
                    relay = %target,
                    "recv"
                );
            }
        }

        let Some(source) = self.sources.get(&context.source) else {
            return;
        };
        if let Some(local) = source.raw.as_ref().and_then(|link| link.local_ip()) {
            frame.insert("server-identifier", local.to_string());
        }
        let data = match build(&frame) {
            Ok(data) => data,
            Err(reason) => {
                // Leave the context to expire; nothing was sent.
                warn!(txid = %frame.txid(), reason = %reason, "reply");
                return;
            }
        };

        if let Some(link) = &source.raw {
            let Some((address, port)) = split_client(&client) else {
                warn!(client = %client, reason = "bad client address", "reply");
                return;
            };
            let mut to = Endpoint { mac: None, ip: Some(address), port };
            if address != Ipv4Addr::BROADCAST {
                to.mac = frame
                    .str("client-hardware-address")
                    .and_then(|value| value.parse::<MacAddr6>().ok());
            }
            if let Err(reason) = link.send(None, to, &data) {
                warn!(client = %client, reason = %reason, "reply");
                return;
            }
        } else if let Some(socket) = &source.udp {
            match resolve(&client).await {
                Ok(address) => {
                    if let Err(reason) = socket.send_to(&data, address).await {
                        warn!(client = %client, reason = %reason, "reply");
                        return;
                    }
                }
                Err(reason) => {
                    warn!(client = %client, reason = %reason, "reply");
                    return;
                }
            }
        }

        let mut hostname = frame.str("hostname").unwrap_or_default().to_string();
        if let Some(domain) = frame.str("domain-name") {
            hostname = format!("{hostname}.{domain}");
        }
        info!(
            msgtype = frame.str("dhcp-message-type").unwrap_or_default(),
            txid = %frame.txid(),
            interface = %context.source,
            client = %client,
            address = frame.str("bootp-assigned-address").unwrap_or_default(),
            hostname = %hostname,
            duration_ms = context.created.elapsed().as_millis() as u64,
            "reply"
        );
        self.contexts.write().unwrap().remove(&key);
    }
}

/// Request acceptance policy.
///
/// Relay-forwarded requests (non-empty relay address) are accepted only on
/// the non-scoped source; direct requests only on interface sources, with
/// the datagram source IP required to match a claimed client address, the
/// server identifier required to match the interface address, and the
/// link-layer source MAC required to match the claimed chaddr.
fn accept_request(
    frame: &Frame,
    source: &str,
    local_ip: Option<Ipv4Addr>,
    hardware: Option<MacAddr6>,
    client: &str,
) -> bool {
    let relayed = frame
        .str("bootp-relay-address")
        .is_some_and(|value| !value.is_empty());
    if relayed {
        if source != UNSCOPED {
            return false;
        }
    } else {
        if source == UNSCOPED {
            return false;
        }
        if let Some(claimed) = frame.str("bootp-client-address") {
            match split_client(client) {
                Some((host, _)) if host.to_string() == claimed => {}
                _ => return false,
            }
        }
    }
    if let Some(identifier) = frame.str("server-identifier") {
        if let Some(local) = local_ip {
            if identifier != local.to_string() {
                return false;
            }
        }
    }
    if let (Some(mac), Some(chaddr)) = (hardware, frame.str("client-hardware-address")) {
        if hex_colon(&mac.into_array()) != chaddr {
            return false;
        }
    }
    true
}

/// Compute the reply destination from the original request: broadcast when
/// the request asked for it or came from 0.0.0.0, the relay address when
/// the request was relayed, else the recorded client address. The chosen
/// signal is mirrored back into the outgoing frame.
fn reply_client(request: &Frame, frame: &mut Frame, client: &str) -> Option<String> {
    let (address, port) = split_client(client)?;
    let mut client = client.to_string();
    if request.boolean("bootp-broadcast") || address == Ipv4Addr::UNSPECIFIED {
        client = format!("{}:{port}", Ipv4Addr::BROADCAST);
        frame.insert("bootp-broadcast", request.boolean("bootp-broadcast"));
    }
    if let Some(relay) = request.str("bootp-relay-address") {
        client = format!("{relay}:{port}");
        frame.insert("bootp-relay-address", relay.to_string());
    }
    Some(client)
}

fn split_client(client: &str) -> Option<(Ipv4Addr, u16)> {
    let (host, port) = client.rsplit_once(':')?;
    Some((host.parse().ok()?, port.parse().ok()?))
}

async fn resolve(target: &str) -> std::io::Result<std::net::SocketAddr> {
    tokio::net::lookup_host(target).await?.next().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, format!("no address for {target}"))
    })
}

/// Drop every context older than the TTL.
fn purge_expired(contexts: &mut HashMap<String, TxnContext>, now: Instant) {
    contexts.retain(|_, context| now.duration_since(context.created) < CONTEXT_TTL);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_frame() -> Frame {
        let mut frame = Frame::new();
        frame.insert("bootp-opcode", "request");
        frame.insert("dhcp-message-type", "request");
        frame.insert("client-hardware-address", "00:11:22:33:44:55");
        frame.insert("bootp-transaction-id", "deadbeef");
        frame
    }

    #[test]
    fn direct_requests_need_an_interface_source() {
        let frame = request_frame();
        assert!(accept_request(&frame, "eth0", None, None, "192.0.2.10:68"));
        assert!(!accept_request(&frame, "-", None, None, "192.0.2.10:68"));
    }

    #[test]
    fn relayed_requests_need_the_unscoped_source() {
        let mut frame = request_frame();
        frame.insert("bootp-relay-address", "10.0.0.1");
        assert!(accept_request(&frame, "-", None, None, "10.0.0.1:67"));
        assert!(!accept_request(&frame, "eth0", None, None, "10.0.0.1:67"));
    }

    #[test]
    fn client_address_must_match_datagram_source() {
        let mut frame = request_frame();
        frame.insert("bootp-client-address", "192.0.2.10");
        assert!(accept_request(&frame, "eth0", None, None, "192.0.2.10:68"));
        assert!(!accept_request(&frame, "eth0", None, None, "192.0.2.99:68"));
    }

    #[test]
    fn server_identifier_must_match_interface_address() {
        let mut frame = request_frame();
        frame.insert("server-identifier", "192.0.2.1");
        let local = Some(Ipv4Addr::new(192, 0, 2, 1));
        let other = Some(Ipv4Addr::new(192, 0, 2, 2));
        assert!(accept_request(&frame, "eth0", local, None, "192.0.2.10:68"));
        assert!(!accept_request(&frame, "eth0", other, None, "192.0.2.10:68"));
    }

    #[test]
    fn source_mac_must_match_chaddr() {
        let frame = request_frame();
        let good = Some(MacAddr6::new(0x00, 0x11, 0x22, 0x33, 0x44, 0x55));
        let bad = Some(MacAddr6::new(0xde, 0xad, 0xbe, 0xef, 0x00, 0x01));
        assert!(accept_request(&frame, "eth0", None, good, "192.0.2.10:68"));
        assert!(!accept_request(&frame, "eth0", None, bad, "192.0.2.10:68"));
    }

    #[test]
    fn reply_goes_to_recorded_client_by_default() {
        let request = request_frame();
        let mut reply = Frame::new();
        let client = reply_client(&request, &mut reply, "192.0.2.10:68").unwrap();
        assert_eq!(client, "192.0.2.10:68");
        assert!(!reply.contains("bootp-broadcast"));
        assert!(!reply.contains("bootp-relay-address"));
    }

    #[test]
    fn broadcast_flag_forces_limited_broadcast() {
        let mut request = request_frame();
        request.insert("bootp-broadcast", true);
        let mut reply = Frame::new();
        let client = reply_client(&request, &mut reply, "192.0.2.10:68").unwrap();
        assert_eq!(client, "255.255.255.255:68");
        assert!(reply.boolean("bootp-broadcast"));
    }

    #[test]
    fn zero_source_forces_limited_broadcast() {
        let request = request_frame();
        let mut reply = Frame::new();
        let client = reply_client(&request, &mut reply, "0.0.0.0:68").unwrap();
        assert_eq!(client, "255.255.255.255:68");
    }

    #[test]
    fn relay_address_wins_over_broadcast() {
        let mut request = request_frame();
        request.insert("bootp-broadcast", true);
        request.insert("bootp-relay-address", "10.0.0.1");
        let mut reply = Frame::new();
        let client = reply_client(&request, &mut reply, "10.0.0.1:67").unwrap();
        assert_eq!(client, "10.0.0.1:67");
        assert_eq!(reply.str("bootp-relay-address"), Some("10.0.0.1"));
    }

    #[test]
    fn reaper_drops_only_expired_contexts() {
        let mut contexts = HashMap::new();
        let now = Instant::now();
        contexts.insert(
            "fresh".to_string(),
            TxnContext {
                created: now,
                source: "eth0".to_string(),
                client: "192.0.2.10:68".to_string(),
                data: Frame::new(),
            },
        );
        let old = now.checked_sub(Duration::from_secs(11)).unwrap();
        contexts.insert(
            "stale".to_string(),
            TxnContext {
                created: old,
                source: "eth0".to_string(),
                client: "192.0.2.11:68".to_string(),
                data: Frame::new(),
            },
        );
        purge_expired(&mut contexts, now);
        assert!(contexts.contains_key("fresh"));
        assert!(!contexts.contains_key("stale"));
    }

    #[test]
    fn split_client_parses_v4_pairs() {
        assert_eq!(
            split_client("192.0.2.10:68"),
            Some((Ipv4Addr::new(192, 0, 2, 10), 68))
        );
        assert_eq!(split_client("not-an-address"), None);
    }
}
