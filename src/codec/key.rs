//! Transaction correlation key.

use crate::domain::frame::Frame;
use crate::domain::registry;

/// Derive the correlation key pairing a request with its reply.
///
/// The key is the client hardware address (separators stripped), the
/// transaction id, and the message-type family: replies contribute the id
/// of the request kind they answer, requests contribute their own id, and
/// frames without a known message type fall into the discover family.
pub fn transaction_key(frame: &Frame) -> String {
    let mut key = String::new();
    if let Some(value) = frame.str("client-hardware-address") {
        key.push_str(&value.replace(':', ""));
    }
    if let Some(value) = frame.str("bootp-transaction-id") {
        key.push_str(value);
    }
    match frame
        .str("dhcp-message-type")
        .and_then(registry::msgtype_by_name)
    {
        Some(msgtype) => {
            let family = if msgtype.request != 0 { msgtype.request } else { msgtype.id };
            key.push_str(&family.to_string());
        }
        None => key.push('1'),
    }
    key
}
