//! BOOTP/DHCPv4 wire codec.
//!
//! [`parse`] decodes a wire packet into a [`Frame`](crate::Frame) driven by
//! the option registry; [`build`] performs the reverse; and
//! [`transaction_key`] derives the correlation key that pairs a request
//! with its reply across the backend round trip.

mod builder;
mod key;
mod parser;

pub use builder::build;
pub use key::transaction_key;
pub use parser::parse;

/// Offset of the DHCP magic cookie within a BOOTP packet.
pub(crate) const MAGIC_OFFSET: usize = 236;
/// The four bytes marking the start of the DHCP option area.
pub(crate) const MAGIC_COOKIE: u32 = 0x6382_5363;
/// Size of the fixed BOOTP header plus the magic cookie.
pub(crate) const HEADER_SIZE: usize = 240;
/// Minimum emitted packet size; shorter packets are zero-padded.
pub(crate) const MIN_PACKET_SIZE: usize = 300;

/// Lowercase hex without separators.
pub(crate) fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Lowercase hex with `:` between bytes.
pub(crate) fn hex_colon(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

/// Decode lowercase hex (separators already stripped) into `out`, which
/// must be exactly half as long as `input`.
pub(crate) fn unhex(input: &str, out: &mut [u8]) -> bool {
    if input.len() != out.len() * 2 || !input.is_ascii() {
        return false;
    }
    for (index, chunk) in input.as_bytes().chunks_exact(2).enumerate() {
        let pair = std::str::from_utf8(chunk).unwrap_or_default();
        match u8::from_str_radix(pair, 16) {
            Ok(byte) => out[index] = byte,
            Err(_) => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_helpers() {
        assert_eq!(hex(&[0xde, 0xad, 0xbe, 0xef]), "deadbeef");
        assert_eq!(hex_colon(&[0x00, 0x11, 0xff]), "00:11:ff");
        let mut out = [0u8; 4];
        assert!(unhex("deadbeef", &mut out));
        assert_eq!(out, [0xde, 0xad, 0xbe, 0xef]);
        assert!(!unhex("dead", &mut out));
        assert!(!unhex("zzzzzzzz", &mut out));
    }
}
