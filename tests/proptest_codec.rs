use proptest::prelude::*;

use dhcpmux::{build, parse, Frame, Value};

const DHCP_MAGIC_COOKIE: [u8; 4] = [99, 130, 83, 99];
const DHCP_FIXED_HEADER_SIZE: usize = 240;

fn valid_header() -> Vec<u8> {
    let mut packet = vec![0u8; DHCP_FIXED_HEADER_SIZE];
    packet[0] = 1;
    packet[1] = 1;
    packet[2] = 6;
    packet[4..8].copy_from_slice(&0xdeadbeefu32.to_be_bytes());
    packet[28..34].copy_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
    packet[236..240].copy_from_slice(&DHCP_MAGIC_COOKIE);
    packet
}

fn base_frame(msgtype: &str) -> Frame {
    let mut frame = Frame::new();
    frame.insert("dhcp-message-type", msgtype);
    frame.insert("client-hardware-address", "00:11:22:33:44:55");
    frame.insert("bootp-transaction-id", "deadbeef");
    frame
}

fn quad(address: u32) -> String {
    std::net::Ipv4Addr::from(address).to_string()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2000))]

    #[test]
    fn parse_never_panics_on_arbitrary_bytes(data: Vec<u8>) {
        let _ = parse(&data);
    }

    #[test]
    fn parse_never_panics_on_valid_header_with_random_options(
        options in prop::collection::vec(any::<u8>(), 0..512)
    ) {
        let mut packet = valid_header();
        packet.extend_from_slice(&options);
        let _ = parse(&packet);
    }

    #[test]
    fn parse_never_panics_on_corrupted_header(
        bytes in prop::collection::vec(any::<u8>(), 240..600),
        indices in prop::collection::vec(0usize..240, 1..10),
        values in prop::collection::vec(any::<u8>(), 1..10)
    ) {
        let mut packet = bytes;
        packet[236..240].copy_from_slice(&DHCP_MAGIC_COOKIE);
        for (index, value) in indices.iter().zip(values.iter()) {
            packet[*index] = *value;
        }
        let _ = parse(&packet);
    }

    #[test]
    fn integer_options_round_trip(lease: u32, mtu: u16, ttl: u8) {
        let mut frame = base_frame("ack");
        frame.insert("address-lease-time", lease as i64);
        frame.insert("interface-mtu", mtu as i64);
        frame.insert("ip-default-ttl", ttl as i64);
        let reparsed = parse(&build(&frame).unwrap()).unwrap();
        prop_assert_eq!(reparsed.int("address-lease-time"), Some(lease as i64));
        prop_assert_eq!(reparsed.int("interface-mtu"), Some(mtu as i64));
        prop_assert_eq!(reparsed.int("ip-default-ttl"), Some(ttl as i64));
    }

    #[test]
    fn boolean_options_round_trip(flag: bool) {
        let mut frame = base_frame("ack");
        frame.insert("ip-forwarding", flag);
        let reparsed = parse(&build(&frame).unwrap()).unwrap();
        prop_assert_eq!(reparsed.get("ip-forwarding"), Some(&Value::Bool(flag)));
    }

    #[test]
    fn inet4_lists_round_trip_in_order(
        addresses in prop::collection::vec(any::<u32>(), 1..20)
    ) {
        let mut frame = base_frame("offer");
        let values: Vec<Value> = addresses.iter().map(|a| Value::from(quad(*a))).collect();
        frame.insert("routers", Value::List(values.clone()));
        let reparsed = parse(&build(&frame).unwrap()).unwrap();
        prop_assert_eq!(reparsed.get("routers"), Some(&Value::List(values)));
    }

    #[test]
    fn inet4pair_round_trips(first: u32, second: u32) {
        let mut frame = base_frame("ack");
        let pair = format!("{}:{}", quad(first), quad(second));
        frame.insert("static-routes", Value::List(vec![Value::from(pair.clone())]));
        let reparsed = parse(&build(&frame).unwrap()).unwrap();
        prop_assert_eq!(
            reparsed.get("static-routes"),
            Some(&Value::List(vec![Value::from(pair)]))
        );
    }

    #[test]
    fn cidr4_round_trips(address: u32, ones in 0u32..=32) {
        let mut frame = base_frame("ack");
        let block = format!("{}/{}", quad(address), ones);
        frame.insert("policy-filters", Value::List(vec![Value::from(block)]));
        let reparsed = parse(&build(&frame).unwrap()).unwrap();
        let expected = format!("{}/{}", quad(address), ones);
        prop_assert_eq!(
            reparsed.get("policy-filters").cloned(),
            Some(Value::List(vec![Value::from(expected)]))
        );
    }

    #[test]
    fn route4_round_trips(destination: u32, ones in 0u32..=32, gateway: u32) {
        // Only the transmitted ceil(ones/8) destination octets survive the
        // wire, so start from a destination already confined to them.
        let kept = ones.div_ceil(8) * 8;
        let masked = if kept == 0 { 0 } else { destination & (u32::MAX << (32 - kept)) };
        let route = format!("{}/{}:{}", quad(masked), ones, quad(gateway));
        let mut frame = base_frame("ack");
        frame.insert("classless-route", Value::List(vec![Value::from(route.clone())]));
        let reparsed = parse(&build(&frame).unwrap()).unwrap();
        prop_assert_eq!(
            reparsed.get("classless-route"),
            Some(&Value::List(vec![Value::from(route)]))
        );
    }

    #[test]
    fn domain_lists_round_trip(
        labels in prop::collection::vec("[a-z][a-z0-9]{0,9}", 1..4),
        count in 1usize..3
    ) {
        let domain = labels.join(".");
        let mut frame = base_frame("ack");
        let values = vec![Value::from(domain); count];
        frame.insert("domain-search", Value::List(values.clone()));
        let reparsed = parse(&build(&frame).unwrap()).unwrap();
        prop_assert_eq!(reparsed.get("domain-search"), Some(&Value::List(values)));
    }

    #[test]
    fn built_packets_are_padded_and_terminated(
        msgtype in prop::sample::select(vec!["discover", "offer", "request", "ack", "nak"]),
        lease: u32
    ) {
        let mut frame = base_frame(msgtype);
        frame.insert("address-lease-time", lease as i64);
        let packet = build(&frame).unwrap();
        prop_assert!(packet.len() >= 300);
        let last = packet.iter().rposition(|&byte| byte != 0).unwrap();
        prop_assert_eq!(packet[last], 0xff);
    }

    #[test]
    fn successful_parses_rebuild_to_equal_frames(
        options in prop::collection::vec(
            prop::sample::select(vec![
                vec![53u8, 1, 1],
                vec![51, 4, 0, 1, 0x51, 0x80],
                vec![1, 4, 255, 255, 255, 0],
                vec![3, 8, 192, 0, 2, 1, 192, 0, 2, 2],
                vec![12, 4, b'h', b'o', b's', b't'],
                vec![19, 1, 1],
                vec![121, 8, 24, 10, 0, 0, 10, 0, 0, 1],
                vec![180, 2, 0xca, 0xfe],
            ]),
            0..6
        )
    ) {
        let mut packet = valid_header();
        for option in &options {
            packet.extend_from_slice(option);
        }
        packet.push(0xff);
        while packet.len() < 300 {
            packet.push(0);
        }
        let Ok(frame) = parse(&packet) else { return Ok(()); };
        let rebuilt = build(&frame).unwrap();
        prop_assert_eq!(parse(&rebuilt).unwrap(), frame);
    }
}
