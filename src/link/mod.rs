//! Raw link-layer transceiver.
//!
//! Sends and receives UDP datagrams as hand-built Ethernet+IPv4+UDP frames
//! on one interface, bypassing the kernel UDP stack so replies can be
//! unicast to a client MAC before the client owns its offered address.
//! Only Linux-class raw sockets are supported; other platforms get
//! [`LinkError::NotImplemented`].

pub mod udp;

use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use macaddr::MacAddr6;
use pnet::datalink::{self, Channel, Config, DataLinkReceiver, DataLinkSender};
use pnet::packet::ethernet::{EtherTypes, EthernetPacket, MutableEthernetPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::{self, Ipv4Packet, MutableIpv4Packet};
use pnet::packet::udp::{MutableUdpPacket, UdpPacket};
use pnet::packet::Packet;

use crate::error::LinkError;

pub const BROADCAST_MAC: MacAddr6 = MacAddr6::new(0xff, 0xff, 0xff, 0xff, 0xff, 0xff);

const ETHERNET_LEN: usize = 14;
const IPV4_LEN: usize = 20;
const UDP_LEN: usize = 8;

/// One inbound UDP datagram with its link-layer context.
#[derive(Debug, Clone)]
pub struct Datagram {
    pub src_mac: MacAddr6,
    pub dst_mac: MacAddr6,
    pub src: SocketAddrV4,
    pub dst: SocketAddrV4,
    pub payload: Vec<u8>,
}

/// Link-layer endpoint; missing parts take the link defaults on send.
#[derive(Debug, Clone, Default)]
pub struct Endpoint {
    pub mac: Option<MacAddr6>,
    pub ip: Option<Ipv4Addr>,
    pub port: u16,
}

/// A raw IPv4 datalink channel bound to one interface.
pub struct RawLink {
    name: String,
    local_mac: MacAddr6,
    local_ip: Option<Ipv4Addr>,
    port: u16,
    tx: Mutex<Box<dyn DataLinkSender>>,
    rx: Mutex<Box<dyn DataLinkReceiver>>,
}

impl RawLink {
    /// Open the interface's datalink channel and remember its MAC and
    /// first IPv4 address. The channel uses a short read timeout so
    /// receive loops can observe deadlines.
    pub fn open(name: &str, port: u16) -> Result<Self, LinkError> {
        if !cfg!(target_os = "linux") {
            return Err(LinkError::NotImplemented);
        }

        let interface = datalink::interfaces()
            .into_iter()
            .find(|iface| iface.name == name)
            .ok_or_else(|| LinkError::InterfaceNotFound(name.to_string()))?;
        let mac = interface
            .mac
            .ok_or_else(|| LinkError::NoAddress(name.to_string()))?;
        let local_ip = interface.ips.iter().find_map(|network| match network {
            pnet::ipnetwork::IpNetwork::V4(network) => Some(network.ip()),
            _ => None,
        });

        let config = Config {
            read_timeout: Some(Duration::from_millis(100)),
            ..Config::default()
        };
        let (tx, rx) = match datalink::channel(&interface, config) {
            Ok(Channel::Ethernet(tx, rx)) => (tx, rx),
            Ok(_) => return Err(LinkError::Channel("unsupported channel type".to_string())),
            Err(error) => {
                let message = error.to_string();
                if message.contains("permission") || message.contains("Operation not permitted") {
                    return Err(LinkError::Permission);
                }
                return Err(LinkError::Channel(message));
            }
        };

        Ok(Self {
            name: name.to_string(),
            local_mac: MacAddr6::from(mac.octets()),
            local_ip,
            port,
            tx: Mutex::new(tx),
            rx: Mutex::new(rx),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_mac(&self) -> MacAddr6 {
        self.local_mac
    }

    pub fn local_ip(&self) -> Option<Ipv4Addr> {
        self.local_ip
    }

    /// Block until the next accepted datagram.
    pub fn recv(&self) -> Result<Datagram, LinkError> {
        loop {
            if let Some(datagram) = self.poll()? {
                return Ok(datagram);
            }
        }
    }

    /// Block until the next accepted datagram or the deadline.
    pub fn recv_deadline(&self, deadline: Instant) -> Result<Option<Datagram>, LinkError> {
        while Instant::now() < deadline {
            if let Some(datagram) = self.poll()? {
                return Ok(Some(datagram));
            }
        }
        Ok(None)
    }

    fn poll(&self) -> Result<Option<Datagram>, LinkError> {
        let mut rx = self.rx.lock().unwrap();
        match rx.next() {
            Ok(bytes) => Ok(decode_frame(bytes)
                .filter(|datagram| wanted(datagram, self.local_ip, self.port))),
            Err(error)
                if error.kind() == io::ErrorKind::TimedOut
                    || error.kind() == io::ErrorKind::WouldBlock =>
            {
                Ok(None)
            }
            Err(error) => Err(LinkError::Io(error)),
        }
    }

    /// Emit one UDP payload as a full Ethernet+IPv4+UDP frame.
    ///
    /// The source defaults to the link's MAC, IPv4 and bound port; the
    /// destination MAC is the broadcast address when the destination IP is
    /// the limited broadcast, else the caller-supplied MAC (the client
    /// chaddr for a DHCP reply).
    pub fn send(
        &self,
        from: Option<Endpoint>,
        to: Endpoint,
        payload: &[u8],
    ) -> Result<(), LinkError> {
        if to.port == 0 {
            return Err(LinkError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid destination port",
            )));
        }
        let from = from.unwrap_or_default();
        let src_port = if from.port != 0 { from.port } else { self.port };
        if src_port == 0 {
            return Err(LinkError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid source port",
            )));
        }
        let src_mac = from.mac.unwrap_or(self.local_mac);
        let src_ip = from
            .ip
            .or(self.local_ip)
            .unwrap_or(Ipv4Addr::UNSPECIFIED);
        let dst_ip = to.ip.unwrap_or(Ipv4Addr::BROADCAST);
        let dst_mac = if dst_ip == Ipv4Addr::BROADCAST {
            BROADCAST_MAC
        } else {
            to.mac.unwrap_or(BROADCAST_MAC)
        };

        let frame = encode_frame(
            src_mac,
            dst_mac,
            SocketAddrV4::new(src_ip, src_port),
            SocketAddrV4::new(dst_ip, to.port),
            payload,
        )
        .ok_or_else(|| LinkError::Channel("frame encoding failed".to_string()))?;

        let mut tx = self.tx.lock().unwrap();
        match tx.send_to(&frame, None) {
            Some(Ok(())) => Ok(()),
            Some(Err(error)) => Err(LinkError::Io(error)),
            None => Err(LinkError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "datalink send failed",
            ))),
        }
    }
}

/// Inbound filter: keep only frames for the limited broadcast or the bound
/// local address, on the bound port when one is set.
fn wanted(datagram: &Datagram, local_ip: Option<Ipv4Addr>, port: u16) -> bool {
    let dst_ip = *datagram.dst.ip();
    if dst_ip != Ipv4Addr::BROADCAST && Some(dst_ip) != local_ip {
        return false;
    }
    if port != 0 && datagram.dst.port() != port {
        return false;
    }
    true
}

/// Parse one Ethernet frame into a UDP datagram shape; `None` for anything
/// but a complete IPv4/UDP frame.
fn decode_frame(bytes: &[u8]) -> Option<Datagram> {
    if bytes.len() < ETHERNET_LEN + IPV4_LEN + UDP_LEN {
        return None;
    }
    let ethernet = EthernetPacket::new(bytes)?;
    if ethernet.get_ethertype() != EtherTypes::Ipv4 {
        return None;
    }
    let ipv4 = Ipv4Packet::new(ethernet.payload())?;
    if ipv4.get_next_level_protocol() != IpNextHeaderProtocols::Udp {
        return None;
    }
    let udp = UdpPacket::new(ipv4.payload())?;
    let payload = udp.payload();
    let length = (udp.get_length() as usize)
        .saturating_sub(UDP_LEN)
        .min(payload.len());

    Some(Datagram {
        src_mac: MacAddr6::from(ethernet.get_source().octets()),
        dst_mac: MacAddr6::from(ethernet.get_destination().octets()),
        src: SocketAddrV4::new(ipv4.get_source(), udp.get_source()),
        dst: SocketAddrV4::new(ipv4.get_destination(), udp.get_destination()),
        payload: payload[..length].to_vec(),
    })
}

/// Assemble an Ethernet II + IPv4 + UDP frame around `payload`. The IPv4
/// header checksum is computed; the UDP checksum is left at zero.
fn encode_frame(
    src_mac: MacAddr6,
    dst_mac: MacAddr6,
    src: SocketAddrV4,
    dst: SocketAddrV4,
    payload: &[u8],
) -> Option<Vec<u8>> {
    let mut buffer = vec![0u8; ETHERNET_LEN + IPV4_LEN + UDP_LEN + payload.len()];

    let mut ethernet = MutableEthernetPacket::new(&mut buffer)?;
    ethernet.set_destination(pnet_mac(dst_mac));
    ethernet.set_source(pnet_mac(src_mac));
    ethernet.set_ethertype(EtherTypes::Ipv4);

    let mut ip = MutableIpv4Packet::new(&mut buffer[ETHERNET_LEN..])?;
    ip.set_version(4);
    ip.set_header_length(5);
    ip.set_dscp(0x04); // TOS 0x10
    ip.set_ecn(0);
    ip.set_total_length((IPV4_LEN + UDP_LEN + payload.len()) as u16);
    ip.set_identification(0);
    ip.set_flags(0);
    ip.set_fragment_offset(0);
    ip.set_ttl(128);
    ip.set_next_level_protocol(IpNextHeaderProtocols::Udp);
    ip.set_source(*src.ip());
    ip.set_destination(*dst.ip());
    let checksum = ipv4::checksum(&ip.to_immutable());
    ip.set_checksum(checksum);

    let mut udp = MutableUdpPacket::new(&mut buffer[ETHERNET_LEN + IPV4_LEN..])?;
    udp.set_source(src.port());
    udp.set_destination(dst.port());
    udp.set_length((UDP_LEN + payload.len()) as u16);
    udp.set_checksum(0);
    udp.set_payload(payload);

    Some(buffer)
}

fn pnet_mac(mac: MacAddr6) -> pnet::util::MacAddr {
    let octets = mac.into_array();
    pnet::util::MacAddr::new(
        octets[0], octets[1], octets[2], octets[3], octets[4], octets[5],
    )
}
