//! Wire packet to frame decoding.

use std::net::Ipv4Addr;

use crate::domain::frame::{Frame, Value};
use crate::domain::registry::{self, Mode, OptionDef};
use crate::error::CodecError;

use super::{hex, hex_colon, HEADER_SIZE, MAGIC_COOKIE, MAGIC_OFFSET};

/// Parse a BOOTP/DHCPv4 packet into a frame.
///
/// A packet without the DHCP magic cookie parses as pure BOOTP (header
/// fields only). Magic-cookie packets additionally walk the TLV option
/// area; `dhcp-message-type` defaults to `"request"` when the walk did not
/// produce one.
pub fn parse(packet: &[u8]) -> Result<Frame, CodecError> {
    if packet.len() < HEADER_SIZE {
        return Err(CodecError::PacketTooShort(packet.len()));
    }

    let mut frame = Frame::new();
    let opcode = registry::opcode_name(packet[0]).ok_or(CodecError::BadOpcode(packet[0]))?;
    let hwtype = registry::hardware_by_id(packet[1])
        .ok_or_else(|| CodecError::BadHardwareType(packet[1].to_string()))?;
    let hlen = packet[2] as usize;
    if hlen == 0 || hlen > 16 || (hwtype.length != 0 && hlen != hwtype.length) {
        return Err(CodecError::BadHardwareType(packet[1].to_string()));
    }
    let hlen = if hwtype.length != 0 { hwtype.length } else { hlen };

    frame.insert("bootp-opcode", opcode);
    frame.insert("bootp-hardware-type", hwtype.name);
    frame.insert("bootp-hardware-length", hlen as i64);
    frame.insert("bootp-relay-hops", packet[3] as i64);
    frame.insert("bootp-transaction-id", hex(&packet[4..8]));
    frame.insert(
        "bootp-start-time",
        u16::from_be_bytes([packet[8], packet[9]]) as i64,
    );
    frame.insert("bootp-broadcast", packet[10] & 0x80 != 0);

    for (name, offset) in [
        ("bootp-client-address", 12),
        ("bootp-assigned-address", 16),
        ("bootp-server-address", 20),
        ("bootp-relay-address", 24),
    ] {
        let octets: [u8; 4] = packet[offset..offset + 4].try_into().unwrap();
        if octets != [0, 0, 0, 0] {
            frame.insert(name, Ipv4Addr::from(octets).to_string());
        }
    }
    frame.insert("client-hardware-address", hex_colon(&packet[28..28 + hlen]));

    if let Some(name) = nul_terminated(&packet[44..107]) {
        frame.insert("bootp-server-name", name);
    }
    if let Some(file) = nul_terminated(&packet[108..235]) {
        frame.insert("bootp-filename", file);
    }

    let magic: [u8; 4] = packet[MAGIC_OFFSET..MAGIC_OFFSET + 4].try_into().unwrap();
    if u32::from_be_bytes(magic) != MAGIC_COOKIE {
        return Ok(frame);
    }

    let mut offset = HEADER_SIZE;
    while offset < packet.len() {
        match packet[offset] {
            0 => offset += 1,
            0xff => break,
            id => {
                // Trailing option id with no length byte: treat as padding.
                if offset + 1 >= packet.len() {
                    break;
                }
                let (name, option) = match registry::option_by_id(id as i16) {
                    Some((name, def)) => (name.to_string(), def),
                    None => (id.to_string(), registry::unknown_option(id)),
                };
                let size = packet[offset + 1] as usize;
                if size < option.min
                    || (option.max != 0 && size > option.max)
                    || (option.step != 0 && size % option.step != 0)
                {
                    return Err(CodecError::BadOptionLength { option: name, size });
                }
                if offset + 2 + size <= packet.len() {
                    let body = &packet[offset + 2..offset + 2 + size];
                    let value = decode_option(&name, option, body)?;
                    frame.insert(name, value);
                }
                offset += 2 + size;
            }
        }
    }

    if !frame.contains("dhcp-message-type") {
        frame.insert("dhcp-message-type", "request");
    }

    Ok(frame)
}

fn nul_terminated(bytes: &[u8]) -> Option<String> {
    if bytes.first() == Some(&0) {
        return None;
    }
    let end = bytes.iter().position(|&byte| byte == 0).unwrap_or(bytes.len());
    Some(String::from_utf8_lossy(&bytes[..end]).into_owned())
}

fn decode_option(name: &str, option: OptionDef, body: &[u8]) -> Result<Value, CodecError> {
    if option.list {
        let mut values = Vec::new();
        let mut index = 0;
        while index < body.len() {
            let (value, used) = decode_element(name, option, &body[index..])?;
            values.push(value);
            index += if option.step != 0 { option.step } else { used.max(1) };
        }
        Ok(Value::List(values))
    } else {
        let (value, _) = decode_element(name, option, body)?;
        Ok(value)
    }
}

/// Decode one element starting at the head of `body`, returning the value
/// and the number of bytes it consumed. Scalar modes consume the whole
/// remaining span; fixed-step list elements consume `step` bytes; DOMAIN
/// and ROUTE4 elements are self-delimiting.
fn decode_element(
    name: &str,
    option: OptionDef,
    body: &[u8],
) -> Result<(Value, usize), CodecError> {
    let short = || CodecError::BadOptionLength {
        option: name.to_string(),
        size: body.len(),
    };

    match option.mode {
        Mode::Binary => Ok((Value::Str(hex(body)), body.len())),
        Mode::SBinary => Ok((Value::Str(hex_colon(body)), body.len())),
        Mode::Integer => {
            let value = match option.min {
                1 => *body.first().ok_or_else(short)? as i64,
                2 => {
                    let bytes: [u8; 2] = body.get(..2).ok_or_else(short)?.try_into().unwrap();
                    u16::from_be_bytes(bytes) as i64
                }
                4 => {
                    let bytes: [u8; 4] = body.get(..4).ok_or_else(short)?.try_into().unwrap();
                    u32::from_be_bytes(bytes) as i64
                }
                8 => {
                    let bytes: [u8; 8] = body.get(..8).ok_or_else(short)?.try_into().unwrap();
                    u64::from_be_bytes(bytes) as i64
                }
                width => {
                    return Err(CodecError::BadOptionLength {
                        option: name.to_string(),
                        size: width,
                    })
                }
            };
            Ok((Value::Int(value), option.min))
        }
        Mode::DInteger => {
            let value = body
                .iter()
                .map(|byte| byte.to_string())
                .collect::<Vec<_>>()
                .join(".");
            Ok((Value::Str(value), body.len()))
        }
        Mode::Boolean => Ok((
            Value::Bool(*body.first().ok_or_else(short)? != 0),
            body.len(),
        )),
        Mode::String => Ok((
            Value::Str(String::from_utf8_lossy(body).into_owned()),
            body.len(),
        )),
        Mode::Inet4 => {
            let octets: [u8; 4] = body.get(..4).ok_or_else(short)?.try_into().unwrap();
            Ok((Value::Str(Ipv4Addr::from(octets).to_string()), 4))
        }
        Mode::Inet4Pair => {
            let first: [u8; 4] = body.get(..4).ok_or_else(short)?.try_into().unwrap();
            let second: [u8; 4] = body.get(4..8).ok_or_else(short)?.try_into().unwrap();
            Ok((
                Value::Str(format!(
                    "{}:{}",
                    Ipv4Addr::from(first),
                    Ipv4Addr::from(second)
                )),
                8,
            ))
        }
        Mode::Cidr4 => {
            let address: [u8; 4] = body.get(..4).ok_or_else(short)?.try_into().unwrap();
            let mask: [u8; 4] = body.get(4..8).ok_or_else(short)?.try_into().unwrap();
            let ones = u32::from_be_bytes(mask).count_ones();
            Ok((
                Value::Str(format!("{}/{}", Ipv4Addr::from(address), ones)),
                8,
            ))
        }
        Mode::Domain => {
            let mut labels: Vec<String> = Vec::new();
            let mut index = 0;
            while index < body.len() {
                let size = body[index] as usize;
                if size == 0 {
                    index += 1;
                    break;
                }
                if index + 1 + size > body.len() {
                    return Err(CodecError::format(name, "malformed domain label"));
                }
                labels.push(String::from_utf8_lossy(&body[index + 1..index + 1 + size]).into_owned());
                index += 1 + size;
            }
            if labels.is_empty() {
                return Err(CodecError::format(name, "empty domain"));
            }
            Ok((Value::Str(labels.join(".")), index))
        }
        Mode::Route4 => {
            let ones = *body.first().ok_or_else(short)? as u32;
            if ones > 32 {
                return Err(CodecError::format(name, format!("invalid prefix /{ones}")));
            }
            let length = ones.div_ceil(8) as usize;
            if body.len() < 1 + length + 4 {
                return Err(CodecError::format(name, "truncated route"));
            }
            let mut destination = 0u32;
            for (position, byte) in body[1..1 + length].iter().enumerate() {
                destination += (*byte as u32) << ((3 - position) * 8);
            }
            let gateway: [u8; 4] = body[1 + length..1 + length + 4].try_into().unwrap();
            Ok((
                Value::Str(format!(
                    "{}/{}:{}",
                    Ipv4Addr::from(destination),
                    ones,
                    Ipv4Addr::from(gateway)
                )),
                1 + length + 4,
            ))
        }
        Mode::MsgType => {
            let id = *body.first().ok_or_else(short)?;
            let msgtype = registry::msgtype_by_id(id)
                .ok_or_else(|| CodecError::UnknownMessageType(id.to_string()))?;
            Ok((Value::Str(msgtype.name.to_string()), 1))
        }
        Mode::Option => {
            let id = *body.first().ok_or_else(short)?;
            let value = match registry::option_by_id(id as i16) {
                Some((name, _)) => name.to_string(),
                None => id.to_string(),
            };
            Ok((Value::Str(value), 1))
        }
        Mode::Opcode | Mode::HwType => {
            // Header-only modes never appear in the TLV area.
            Err(CodecError::format(name, "header field in option area"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAGIC: [u8; 4] = [0x63, 0x82, 0x53, 0x63];

    fn base_packet() -> Vec<u8> {
        let mut packet = vec![0u8; 300];
        packet[0] = 1; // BOOTREQUEST
        packet[1] = 1; // ethernet
        packet[2] = 6;
        packet[4..8].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        packet[28..34].copy_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        packet[236..240].copy_from_slice(&MAGIC);
        packet[240] = 0xff;
        packet
    }

    fn with_options(options: &[u8]) -> Vec<u8> {
        let mut packet = base_packet();
        packet.truncate(240);
        packet.extend_from_slice(options);
        packet.push(0xff);
        while packet.len() < 300 {
            packet.push(0);
        }
        packet
    }

    #[test]
    fn discover_with_parameter_list() {
        let packet = with_options(&[53, 1, 1, 55, 3, 1, 3, 6]);
        let frame = parse(&packet).unwrap();
        assert_eq!(frame.str("dhcp-message-type"), Some("discover"));
        assert_eq!(
            frame.str("client-hardware-address"),
            Some("00:11:22:33:44:55")
        );
        assert_eq!(frame.str("bootp-transaction-id"), Some("deadbeef"));
        assert_eq!(
            frame.get("parameters-request-list"),
            Some(&Value::List(vec![
                Value::Str("subnet-mask".into()),
                Value::Str("routers".into()),
                Value::Str("domain-name-servers".into()),
            ]))
        );
    }

    #[test]
    fn too_short_is_rejected() {
        assert!(matches!(
            parse(&[0u8; 239]),
            Err(CodecError::PacketTooShort(239))
        ));
    }

    #[test]
    fn bad_opcode_is_rejected() {
        let mut packet = base_packet();
        packet[0] = 3;
        assert!(matches!(parse(&packet), Err(CodecError::BadOpcode(3))));
    }

    #[test]
    fn hardware_length_must_match_canonical() {
        let mut packet = base_packet();
        packet[2] = 8; // ethernet declares 6
        assert!(matches!(
            parse(&packet),
            Err(CodecError::BadHardwareType(_))
        ));
    }

    #[test]
    fn exactly_240_bytes_without_magic_is_pure_bootp() {
        let mut packet = base_packet();
        packet.truncate(240);
        packet[236..240].copy_from_slice(&[0, 0, 0, 0]);
        let frame = parse(&packet).unwrap();
        assert_eq!(frame.str("bootp-opcode"), Some("request"));
        assert!(!frame.contains("dhcp-message-type"));
    }

    #[test]
    fn message_type_defaults_to_request() {
        let frame = parse(&base_packet()).unwrap();
        assert_eq!(frame.str("dhcp-message-type"), Some("request"));
    }

    #[test]
    fn zero_addresses_are_omitted() {
        let mut packet = base_packet();
        packet[16..20].copy_from_slice(&[192, 0, 2, 10]);
        let frame = parse(&packet).unwrap();
        assert!(!frame.contains("bootp-client-address"));
        assert_eq!(frame.str("bootp-assigned-address"), Some("192.0.2.10"));
    }

    #[test]
    fn broadcast_flag_follows_high_bit() {
        let mut packet = base_packet();
        assert!(!parse(&packet).unwrap().boolean("bootp-broadcast"));
        packet[10] = 0x80;
        assert!(parse(&packet).unwrap().boolean("bootp-broadcast"));
    }

    #[test]
    fn sname_and_file_are_nul_terminated() {
        let mut packet = base_packet();
        packet[44..49].copy_from_slice(b"boots");
        packet[108..117].copy_from_slice(b"pxe/linux");
        let frame = parse(&packet).unwrap();
        assert_eq!(frame.str("bootp-server-name"), Some("boots"));
        assert_eq!(frame.str("bootp-filename"), Some("pxe/linux"));
    }

    #[test]
    fn classless_route_decodes() {
        let packet = with_options(&[121, 8, 24, 192, 0, 2, 198, 51, 100, 1]);
        let frame = parse(&packet).unwrap();
        assert_eq!(
            frame.get("classless-route"),
            Some(&Value::List(vec![Value::Str(
                "192.0.2.0/24:198.51.100.1".into()
            )]))
        );
    }

    #[test]
    fn classless_route_zero_prefix() {
        let packet = with_options(&[121, 5, 0, 198, 51, 100, 1]);
        let frame = parse(&packet).unwrap();
        assert_eq!(
            frame.get("classless-route"),
            Some(&Value::List(vec![Value::Str(
                "0.0.0.0/0:198.51.100.1".into()
            )]))
        );
    }

    #[test]
    fn unknown_option_becomes_decimal_key_with_hex_value() {
        let packet = with_options(&[180, 2, 0xab, 0xcd]);
        let frame = parse(&packet).unwrap();
        assert_eq!(frame.str("180"), Some("abcd"));
    }

    #[test]
    fn option_length_below_minimum_is_rejected() {
        let packet = with_options(&[54, 2, 192, 0]);
        assert!(matches!(
            parse(&packet),
            Err(CodecError::BadOptionLength { option, size: 2 }) if option == "server-identifier"
        ));
    }

    #[test]
    fn list_length_must_match_step() {
        let packet = with_options(&[3, 6, 192, 0, 2, 1, 192, 0]);
        assert!(matches!(
            parse(&packet),
            Err(CodecError::BadOptionLength { option, size: 6 }) if option == "routers"
        ));
    }

    #[test]
    fn zero_length_option_is_rejected() {
        let packet = with_options(&[12, 0]);
        assert!(matches!(
            parse(&packet),
            Err(CodecError::BadOptionLength { size: 0, .. })
        ));
    }

    #[test]
    fn unknown_message_type_is_rejected() {
        let packet = with_options(&[53, 1, 200]);
        assert!(matches!(
            parse(&packet),
            Err(CodecError::UnknownMessageType(_))
        ));
    }

    #[test]
    fn truncated_option_value_is_skipped() {
        let mut packet = base_packet();
        packet.truncate(240);
        packet.extend_from_slice(&[12, 30, b'a']); // claims 30 bytes, has 1
        let frame = parse(&packet).unwrap();
        assert!(!frame.contains("hostname"));
    }

    #[test]
    fn domain_search_decodes_labels() {
        let packet = with_options(&[
            119, 13, 7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 3, b'c', b'o', b'm', 0,
        ]);
        let frame = parse(&packet).unwrap();
        assert_eq!(
            frame.get("domain-search"),
            Some(&Value::List(vec![Value::Str("example.com".into())]))
        );
    }

    #[test]
    fn secs_and_hops_are_integers() {
        let mut packet = base_packet();
        packet[3] = 2;
        packet[8..10].copy_from_slice(&[0x01, 0x00]);
        let frame = parse(&packet).unwrap();
        assert_eq!(frame.int("bootp-relay-hops"), Some(2));
        assert_eq!(frame.int("bootp-start-time"), Some(256));
    }
}
