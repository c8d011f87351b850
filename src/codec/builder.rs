//! Frame to wire packet encoding.

use std::net::Ipv4Addr;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::frame::{Frame, Value};
use crate::domain::registry::{self, Mode, OptionDef};
use crate::error::CodecError;

use super::{unhex, HEADER_SIZE, MAGIC_COOKIE, MAGIC_OFFSET, MIN_PACKET_SIZE};

static HEX_BLOB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[0-9a-f]{2})+$").unwrap());
static HEX_COLON_BLOB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{2}(?::[0-9a-f]{2})*$").unwrap());
static DOTTED_INTEGERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d+\.)*\d+$").unwrap());
static INET4_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^((?:\d+\.){3}\d+):((?:\d+\.){3}\d+)$").unwrap());
static CIDR4: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^((?:\d+\.){3}\d+)/(\d+)$").unwrap());
static ROUTE4: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^((?:\d+\.){3}\d+)/(\d+):((?:\d+\.){3}\d+)$").unwrap());
static DOMAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9\-]*(?:\.[a-zA-Z0-9\-]+)*$").unwrap());

/// Build a BOOTP/DHCPv4 packet from a frame.
///
/// The packet is at least 300 bytes, zero-padded. A frame without a
/// `dhcp-message-type` produces a pure BOOTP packet (no magic cookie, no
/// option area); otherwise the option area is terminated with 0xff.
pub fn build(frame: &Frame) -> Result<Vec<u8>, CodecError> {
    let mut packet = vec![0u8; 4 << 10];

    let (msg_name, dhcp) = match frame.str("dhcp-message-type") {
        Some(name) => (name, true),
        None => ("request", false),
    };
    let msgtype = registry::msgtype_by_name(msg_name)
        .ok_or_else(|| CodecError::UnknownMessageType(msg_name.to_string()))?;
    packet[0] = msgtype.opcode;

    let hw_name = frame.str("bootp-hardware-type").unwrap_or("ethernet");
    let hwtype = registry::hardware_by_name(hw_name)
        .ok_or_else(|| CodecError::BadHardwareType(hw_name.to_string()))?;
    packet[1] = hwtype.id;
    if hwtype.length != 0 {
        packet[2] = hwtype.length as u8;
    } else if let Some(length) = frame.int("bootp-hardware-length") {
        if (1..=16).contains(&length) {
            packet[2] = length as u8;
        }
    }

    if let Some(hops) = frame.int("bootp-relay-hops") {
        if (1..32).contains(&hops) {
            packet[3] = hops as u8;
        }
    }
    if let Some(txid) = frame.str("bootp-transaction-id") {
        if txid.len() == 8 {
            let mut bytes = [0u8; 4];
            if !unhex(txid, &mut bytes) {
                return Err(CodecError::format("bootp-transaction-id", txid));
            }
            packet[4..8].copy_from_slice(&bytes);
        }
    }
    if let Some(secs) = frame.int("bootp-start-time") {
        if secs != 0 {
            packet[8..10].copy_from_slice(&(secs as u16).to_be_bytes());
        }
    }
    if frame.boolean("bootp-broadcast") {
        packet[10] |= 0x80;
    }

    for (name, offset) in [
        ("bootp-client-address", 12),
        ("bootp-assigned-address", 16),
        ("bootp-server-address", 20),
        ("bootp-relay-address", 24),
    ] {
        if let Some(value) = frame.str(name) {
            let address: Ipv4Addr = value
                .parse()
                .map_err(|_| CodecError::format(name, value))?;
            packet[offset..offset + 4].copy_from_slice(&address.octets());
        }
    }

    if let Some(value) = frame.str("client-hardware-address") {
        let hlen = packet[2] as usize;
        let parts: Vec<&str> = value.split(':').collect();
        if parts.len() != hlen || !HEX_COLON_BLOB.is_match(value) {
            return Err(CodecError::format("client-hardware-address", value));
        }
        for (index, part) in parts.iter().enumerate() {
            let mut byte = [0u8; 1];
            if !unhex(part, &mut byte) {
                return Err(CodecError::format("client-hardware-address", value));
            }
            packet[28 + index] = byte[0];
        }
    }

    if let Some(value) = frame.str("bootp-server-name") {
        let bytes = value.as_bytes();
        let length = bytes.len().min(63);
        packet[44..44 + length].copy_from_slice(&bytes[..length]);
    }
    if let Some(value) = frame.str("bootp-filename") {
        let bytes = value.as_bytes();
        let length = bytes.len().min(127);
        packet[108..108 + length].copy_from_slice(&bytes[..length]);
    }

    if !dhcp {
        packet.truncate(MIN_PACKET_SIZE);
        return Ok(packet);
    }

    packet[MAGIC_OFFSET..MAGIC_OFFSET + 4].copy_from_slice(&MAGIC_COOKIE.to_be_bytes());
    let mut offset = HEADER_SIZE;

    for (key, value) in frame.iter() {
        let (name, option) = resolve_option(key)?;
        if option.id < 1 {
            continue;
        }

        let single = std::slice::from_ref(value);
        let items: &[Value] = match value {
            Value::List(values) => values.as_slice(),
            _ => single,
        };
        if !option.list && items.len() > 1 {
            return Err(CodecError::format(&name, "scalar option given a list"));
        }
        if offset >= packet.len() - 256 {
            return Err(CodecError::PacketOverflow(name));
        }

        let mut body: Vec<u8> = Vec::new();
        for item in items {
            encode_element(&name, option, item, &mut body)?;
            if body.len() > 255 {
                break;
            }
        }
        if body.len() > 255 {
            return Err(CodecError::PacketOverflow(name));
        }
        if (option.min != 0 && body.len() < option.min)
            || (option.max != 0 && body.len() > option.max)
        {
            return Err(CodecError::BadOptionLength {
                option: name,
                size: body.len(),
            });
        }

        packet[offset] = option.id as u8;
        packet[offset + 1] = body.len() as u8;
        packet[offset + 2..offset + 2 + body.len()].copy_from_slice(&body);
        offset += 2 + body.len();
        if offset > packet.len() - 255 {
            return Err(CodecError::PacketOverflow(name));
        }
    }

    packet[offset] = 0xff;
    offset += 1;
    packet.truncate(offset.max(MIN_PACKET_SIZE));
    Ok(packet)
}

/// Resolve a frame key to its option definition: a registered name, a
/// decimal id of a registered option, or a synthesized scalar BINARY
/// definition for an unregistered decimal id in [1,254].
fn resolve_option(key: &str) -> Result<(String, OptionDef), CodecError> {
    if let Some(def) = registry::option_by_name(key) {
        return Ok((key.to_string(), def));
    }
    if let Ok(id) = key.parse::<i16>() {
        if (1..=254).contains(&id) {
            return Ok(match registry::option_by_id(id) {
                Some((name, def)) => (name.to_string(), def),
                None => (key.to_string(), registry::unknown_option(id as u8)),
            });
        }
    }
    Err(CodecError::UnknownOption(key.to_string()))
}

fn encode_element(
    name: &str,
    option: OptionDef,
    item: &Value,
    body: &mut Vec<u8>,
) -> Result<(), CodecError> {
    let text = || {
        item.as_str()
            .filter(|value| !value.is_empty())
            .ok_or_else(|| CodecError::format(name, "missing value"))
    };

    match option.mode {
        Mode::Binary => {
            let value = text()?;
            if !HEX_BLOB.is_match(value) {
                return Err(CodecError::format(name, value));
            }
            let mut bytes = vec![0u8; value.len() / 2];
            unhex(value, &mut bytes);
            body.extend_from_slice(&bytes);
        }
        Mode::SBinary => {
            let value = text()?;
            if !HEX_COLON_BLOB.is_match(value) {
                return Err(CodecError::format(name, value));
            }
            let stripped = value.replace(':', "");
            let mut bytes = vec![0u8; stripped.len() / 2];
            unhex(&stripped, &mut bytes);
            body.extend_from_slice(&bytes);
        }
        Mode::Integer => {
            let value = item
                .as_int()
                .ok_or_else(|| CodecError::format(name, "missing integer"))?;
            match option.min {
                1 => body.push(value as u8),
                2 => body.extend_from_slice(&(value as u16).to_be_bytes()),
                4 => body.extend_from_slice(&(value as u32).to_be_bytes()),
                8 => body.extend_from_slice(&(value as u64).to_be_bytes()),
                width => {
                    return Err(CodecError::BadOptionLength {
                        option: name.to_string(),
                        size: width,
                    })
                }
            }
        }
        Mode::DInteger => {
            let value = text()?;
            if !DOTTED_INTEGERS.is_match(value) {
                return Err(CodecError::format(name, value));
            }
            for part in value.split('.') {
                let integer: u8 = part
                    .parse()
                    .map_err(|_| CodecError::format(name, value))?;
                body.push(integer);
            }
        }
        Mode::Boolean => {
            let value = item
                .as_bool()
                .ok_or_else(|| CodecError::format(name, "missing boolean"))?;
            body.push(value as u8);
        }
        Mode::String => {
            let value = text()?;
            if value.len() > 254 {
                return Err(CodecError::format(name, "string too long"));
            }
            body.extend_from_slice(value.as_bytes());
        }
        Mode::Inet4 => {
            let value = text()?;
            let address: Ipv4Addr = value
                .parse()
                .map_err(|_| CodecError::format(name, value))?;
            body.extend_from_slice(&address.octets());
        }
        Mode::Inet4Pair => {
            let value = text()?;
            let captures = INET4_PAIR
                .captures(value)
                .ok_or_else(|| CodecError::format(name, value))?;
            for index in 1..=2 {
                let address: Ipv4Addr = captures[index]
                    .parse()
                    .map_err(|_| CodecError::format(name, value))?;
                body.extend_from_slice(&address.octets());
            }
        }
        Mode::Cidr4 => {
            let value = text()?;
            let captures = CIDR4
                .captures(value)
                .ok_or_else(|| CodecError::format(name, value))?;
            let address: Ipv4Addr = captures[1]
                .parse()
                .map_err(|_| CodecError::format(name, value))?;
            let ones: u32 = captures[2]
                .parse()
                .map_err(|_| CodecError::format(name, value))?;
            if ones > 32 {
                return Err(CodecError::format(name, value));
            }
            let mask = if ones == 0 { 0 } else { u32::MAX << (32 - ones) };
            body.extend_from_slice(&address.octets());
            body.extend_from_slice(&mask.to_be_bytes());
        }
        Mode::Domain => {
            let value = text()?;
            let trimmed = value.trim_matches('.');
            if trimmed.len() >= 254 || !DOMAIN.is_match(trimmed) {
                return Err(CodecError::format(name, value));
            }
            for label in trimmed.split('.') {
                body.push(label.len() as u8);
                body.extend_from_slice(label.as_bytes());
            }
            body.push(0);
        }
        Mode::Route4 => {
            let value = text()?;
            let captures = ROUTE4
                .captures(value)
                .ok_or_else(|| CodecError::format(name, value))?;
            let destination: Ipv4Addr = captures[1]
                .parse()
                .map_err(|_| CodecError::format(name, value))?;
            let ones: u32 = captures[2]
                .parse()
                .map_err(|_| CodecError::format(name, value))?;
            if ones > 32 {
                return Err(CodecError::format(name, value));
            }
            let gateway: Ipv4Addr = captures[3]
                .parse()
                .map_err(|_| CodecError::format(name, value))?;
            let length = ones.div_ceil(8) as usize;
            body.push(ones as u8);
            body.extend_from_slice(&destination.octets()[..length]);
            body.extend_from_slice(&gateway.octets());
        }
        Mode::MsgType => {
            let value = text()?;
            let msgtype = registry::msgtype_by_name(value)
                .ok_or_else(|| CodecError::UnknownMessageType(value.to_string()))?;
            body.push(msgtype.id);
        }
        Mode::Option => {
            let value = text()?;
            if let Some(def) = registry::option_by_name(value) {
                body.push(def.id as u8);
            } else if let Ok(id) = value.parse::<u16>() {
                if (1..255).contains(&id) {
                    body.push(id as u8);
                } else {
                    return Err(CodecError::format(name, value));
                }
            } else {
                return Err(CodecError::format(name, value));
            }
        }
        Mode::Opcode | Mode::HwType => {
            return Err(CodecError::format(name, "header field in option area"));
        }
    }
    Ok(())
}
