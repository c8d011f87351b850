//! Static option registry.
//!
//! Canonical definitions for every known BOOTP/DHCPv4 option, the hardware
//! type table and the message type table, with bidirectional name/id
//! lookups. Negative ids denote BOOTP fixed-header fields so one record
//! type covers both; ids 1..=254 are DHCP options.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Semantic type of an option value on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Opcode,
    HwType,
    Binary,
    SBinary,
    Integer,
    DInteger,
    Boolean,
    String,
    Inet4,
    Inet4Pair,
    Cidr4,
    Domain,
    Route4,
    MsgType,
    Option,
}

impl Mode {
    /// Short identifier used by the JSON option listing.
    pub fn label(self) -> &'static str {
        match self {
            Mode::Opcode => "opcode",
            Mode::HwType => "hwtype",
            Mode::Binary => "binary",
            Mode::SBinary => "sbinary",
            Mode::Integer => "integer",
            Mode::DInteger => "dinteger",
            Mode::Boolean => "boolean",
            Mode::String => "string",
            Mode::Inet4 => "inet4",
            Mode::Inet4Pair => "inet4pair",
            Mode::Cidr4 => "cidr4",
            Mode::Domain => "domain",
            Mode::Route4 => "route4",
            Mode::MsgType => "msgtype",
            Mode::Option => "option",
        }
    }
}

/// One option definition.
///
/// `max == 0` means unbounded up to the TLV limit of 255; `step` is the
/// element size for list options (0 for variable-size elements).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionDef {
    pub id: i16,
    pub mode: Mode,
    pub list: bool,
    pub min: usize,
    pub max: usize,
    pub step: usize,
}

/// Hardware address type; `length == 0` means no canonical length.
#[derive(Debug, Clone, Copy)]
pub struct HardwareType {
    pub id: u8,
    pub name: &'static str,
    pub length: usize,
}

/// DHCP message type; `request != 0` names the request id a reply answers.
#[derive(Debug, Clone, Copy)]
pub struct MessageType {
    pub id: u8,
    pub name: &'static str,
    pub opcode: u8,
    pub request: u8,
}

const fn opt(id: i16, mode: Mode, min: usize, max: usize) -> OptionDef {
    OptionDef { id, mode, list: false, min, max, step: 0 }
}

const fn list(id: i16, mode: Mode, min: usize, step: usize) -> OptionDef {
    OptionDef { id, mode, list: true, min, max: 0, step }
}

#[rustfmt::skip]
pub const OPTIONS: &[(&str, OptionDef)] = &[
    ("bootp-opcode",                       opt(-14, Mode::Opcode, 1, 1)),
    ("bootp-hardware-type",                opt(-13, Mode::HwType, 1, 1)),
    ("bootp-hardware-length",              opt(-12, Mode::Integer, 1, 1)),
    ("bootp-relay-hops",                   opt(-11, Mode::Integer, 1, 1)),
    ("bootp-transaction-id",               opt(-10, Mode::Binary, 1, 1)),
    ("bootp-start-time",                   opt(-9, Mode::Integer, 2, 2)),
    ("bootp-broadcast",                    opt(-8, Mode::Boolean, 2, 2)),
    ("bootp-client-address",               opt(-7, Mode::Inet4, 4, 4)),
    ("bootp-assigned-address",             opt(-6, Mode::Inet4, 4, 4)),
    ("bootp-server-address",               opt(-5, Mode::Inet4, 4, 4)),
    ("bootp-relay-address",                opt(-4, Mode::Inet4, 4, 4)),
    ("client-hardware-address",            opt(-3, Mode::SBinary, 6, 6)),
    ("bootp-server-name",                  opt(-2, Mode::String, 1, 63)),
    ("bootp-filename",                     opt(-1, Mode::String, 1, 127)),
    ("subnet-mask",                        opt(1, Mode::Inet4, 4, 4)),
    ("time-offset",                        opt(2, Mode::Integer, 4, 4)),
    ("routers",                            list(3, Mode::Inet4, 4, 4)),
    ("time-servers",                       list(4, Mode::Inet4, 4, 4)),
    ("name-servers",                       list(5, Mode::Inet4, 4, 4)),
    ("domain-name-servers",                list(6, Mode::Inet4, 4, 4)),
    ("log-servers",                        list(7, Mode::Inet4, 4, 4)),
    ("cookie-servers",                     list(8, Mode::Inet4, 4, 4)),
    ("lpr-servers",                        list(9, Mode::Inet4, 4, 4)),
    ("impress-servers",                    list(10, Mode::Inet4, 4, 4)),
    ("resource-location-servers",          list(11, Mode::Inet4, 4, 4)),
    ("hostname",                           opt(12, Mode::String, 1, 0)),
    ("boot-file-size",                     opt(13, Mode::Integer, 2, 2)),
    ("merit-dump-file",                    opt(14, Mode::String, 1, 0)),
    ("domain-name",                        opt(15, Mode::String, 1, 0)),
    ("swap-server",                        opt(16, Mode::Inet4, 4, 4)),
    ("root-path",                          opt(17, Mode::String, 1, 0)),
    ("extensions-path",                    opt(18, Mode::String, 1, 0)),
    ("ip-forwarding",                      opt(19, Mode::Boolean, 1, 1)),
    ("non-local-source-routing",           opt(20, Mode::Boolean, 1, 1)),
    ("policy-filters",                     list(21, Mode::Cidr4, 8, 8)),
    ("maximum-datagram-reassembly-size",   opt(22, Mode::Integer, 2, 2)),
    ("ip-default-ttl",                     opt(23, Mode::Integer, 1, 1)),
    ("path-mtu-aging-timeout",             opt(24, Mode::Integer, 4, 4)),
    ("path-mtu-plateau-table",             list(25, Mode::Integer, 2, 2)),
    ("interface-mtu",                      opt(26, Mode::Integer, 2, 2)),
    ("all-subnets-local",                  opt(27, Mode::Boolean, 1, 1)),
    ("broadcast-address",                  opt(28, Mode::Inet4, 4, 4)),
    ("perform-mask-discovery",             opt(29, Mode::Boolean, 1, 1)),
    ("mask-supplier",                      opt(30, Mode::Boolean, 1, 1)),
    ("perform-router-discovery",           opt(31, Mode::Boolean, 1, 1)),
    ("router-solicitation-address",        opt(32, Mode::Inet4, 4, 4)),
    ("static-routes",                      list(33, Mode::Inet4Pair, 8, 8)),
    ("trailer-encapsulation",              opt(34, Mode::Boolean, 1, 1)),
    ("arp-cache-timeout",                  opt(35, Mode::Integer, 4, 4)),
    ("ethernet-encapsulation",             opt(36, Mode::Boolean, 1, 1)),
    ("tcp-default-ttl",                    opt(37, Mode::Integer, 1, 1)),
    ("tcp-keepalive-interval",             opt(38, Mode::Integer, 4, 4)),
    ("tcp-keepalive-garbage",              opt(39, Mode::Boolean, 1, 1)),
    ("nis-domain",                         opt(40, Mode::String, 1, 0)),
    ("nis-servers",                        list(41, Mode::Inet4, 4, 4)),
    ("ntp-servers",                        list(42, Mode::Inet4, 4, 4)),
    ("vendor-specific-information",        opt(43, Mode::Binary, 1, 0)),
    ("netbios-name-servers",               list(44, Mode::Inet4, 4, 4)),
    ("netbios-dgram-distribution-servers", list(45, Mode::Inet4, 4, 4)),
    ("netbios-node-type",                  opt(46, Mode::Integer, 1, 1)),
    ("netbios-scope",                      opt(47, Mode::String, 1, 0)),
    ("xwindow-font-servers",               list(48, Mode::Inet4, 4, 4)),
    ("xwindow-display-managers",           list(49, Mode::Inet4, 4, 4)),
    ("requested-ip-address",               opt(50, Mode::Inet4, 4, 4)),
    ("address-lease-time",                 opt(51, Mode::Integer, 4, 4)),
    ("option-overload",                    opt(52, Mode::Integer, 1, 1)),
    ("dhcp-message-type",                  opt(53, Mode::MsgType, 1, 1)),
    ("server-identifier",                  opt(54, Mode::Inet4, 4, 4)),
    ("parameters-request-list",            list(55, Mode::Option, 1, 1)),
    ("message",                            opt(56, Mode::String, 1, 0)),
    ("max-message-size",                   opt(57, Mode::Integer, 2, 2)),
    ("renewal-time",                       opt(58, Mode::Integer, 4, 4)),
    ("rebinding-time",                     opt(59, Mode::Integer, 4, 4)),
    ("vendor-class-identifier",            opt(60, Mode::String, 1, 0)),
    ("client-identifier",                  opt(61, Mode::Binary, 2, 0)),
    ("netware-domain",                     opt(62, Mode::String, 1, 0)),
    ("netware-option",                     opt(63, Mode::Binary, 1, 0)),
    ("nisplus-domain",                     opt(64, Mode::String, 1, 0)),
    ("nisplus-servers",                    list(65, Mode::Inet4, 4, 4)),
    ("tftp-server-name",                   opt(66, Mode::String, 1, 0)),
    ("boot-filename",                      opt(67, Mode::String, 1, 0)),
    ("mobile-ip-home-agents",              list(68, Mode::Inet4, 4, 4)),
    ("smtp-servers",                       list(69, Mode::Inet4, 4, 4)),
    ("pop3-servers",                       list(70, Mode::Inet4, 4, 4)),
    ("nntp-servers",                       list(71, Mode::Inet4, 4, 4)),
    ("www-servers",                        list(72, Mode::Inet4, 4, 4)),
    ("finger-servers",                     list(73, Mode::Inet4, 4, 4)),
    ("irc-servers",                        list(74, Mode::Inet4, 4, 4)),
    ("streettalk-servers",                 list(75, Mode::Inet4, 4, 4)),
    ("streettalk-directory-servers",       list(76, Mode::Inet4, 4, 4)),
    ("user-class",                         opt(77, Mode::String, 1, 0)),
    ("directory-agent",                    opt(78, Mode::Binary, 1, 0)),
    ("service-scope",                      opt(79, Mode::Binary, 1, 0)),
    ("client-fqdn",                        opt(81, Mode::Binary, 1, 0)),
    ("relay-agent-information",            opt(82, Mode::Binary, 1, 0)),
    ("isns-configuration",                 opt(83, Mode::Binary, 1, 0)),
    ("nds-servers",                        list(85, Mode::Inet4, 4, 4)),
    ("nds-tree-name",                      opt(86, Mode::String, 1, 0)),
    ("nds-context",                        opt(87, Mode::String, 1, 0)),
    ("bcmcs-domain",                       opt(88, Mode::String, 1, 0)),
    ("bcmcs-servers",                      list(89, Mode::Inet4, 4, 4)),
    ("authentication",                     opt(90, Mode::Binary, 3, 0)),
    ("last-transaction-time",              opt(91, Mode::Integer, 4, 4)),
    ("associated-addresses",               list(92, Mode::Inet4, 4, 4)),
    ("client-system",                      opt(93, Mode::Integer, 2, 2)),
    ("client-ndi",                         opt(94, Mode::DInteger, 3, 3)),
    ("client-guid",                        opt(97, Mode::Binary, 1, 0)),
    ("user-authentication",                opt(98, Mode::String, 1, 0)),
    ("geoconf-civic",                      opt(99, Mode::Binary, 1, 0)),
    ("tz-posix",                           opt(100, Mode::String, 1, 0)),
    ("tz-database",                        opt(101, Mode::String, 1, 0)),
    ("auto-configuration",                 opt(116, Mode::Integer, 1, 1)),
    ("name-service-search",                list(117, Mode::Integer, 2, 2)),
    ("subnet-selection",                   opt(118, Mode::Inet4, 4, 4)),
    ("domain-search",                      list(119, Mode::Domain, 1, 0)),
    ("sip-server",                         opt(120, Mode::Binary, 1, 0)),
    ("classless-route",                    list(121, Mode::Route4, 5, 0)),
    ("cablelabs-configuration",            opt(122, Mode::Binary, 1, 0)),
    ("geoconf",                            opt(123, Mode::Binary, 1, 0)),
    ("vi-vendor-class",                    opt(124, Mode::Binary, 1, 0)),
    ("vi-vendor-specific-information",     opt(125, Mode::Binary, 1, 0)),
    ("pana-agents",                        list(136, Mode::Inet4, 4, 4)),
    ("v4-lost",                            opt(137, Mode::String, 1, 0)),
    ("v4-capwap-access-controller",        opt(138, Mode::Binary, 1, 0)),
    ("v4-address-mos",                     opt(139, Mode::Binary, 1, 0)),
    ("v4-fqdn-mos",                        opt(140, Mode::Binary, 1, 0)),
    ("sip-ua-domain",                      opt(141, Mode::String, 1, 0)),
    ("v4-address-andsf",                   opt(142, Mode::Binary, 1, 0)),
    ("v4-geoloc",                          opt(144, Mode::Binary, 1, 0)),
    ("forcerenew-nonce-capable",           opt(145, Mode::Binary, 1, 0)),
    ("rdnss-selection",                    opt(146, Mode::Binary, 1, 0)),
    ("tftp-servers",                       list(150, Mode::Inet4, 4, 4)),
    ("status-code",                        opt(151, Mode::String, 1, 0)),
    ("base-time",                          opt(152, Mode::Integer, 4, 4)),
    ("start-time-of-state",                opt(153, Mode::Integer, 4, 4)),
    ("query-start-time",                   opt(154, Mode::Integer, 4, 4)),
    ("query-end-time",                     opt(155, Mode::Integer, 4, 4)),
    ("dhcp-state",                         opt(156, Mode::Integer, 1, 1)),
    ("data-source",                        opt(157, Mode::Integer, 1, 1)),
    ("v4-pcp-server",                      opt(158, Mode::Binary, 5, 0)),
    ("pxelinux-magic",                     opt(208, Mode::Binary, 4, 4)),
    ("configuration-file",                 opt(209, Mode::String, 1, 0)),
    ("path-prefix",                        opt(210, Mode::String, 1, 0)),
    ("reboot-time",                        opt(211, Mode::Integer, 4, 4)),
    ("v6-6rd",                             opt(212, Mode::Binary, 1, 0)),
    ("v4-access-domain",                   opt(213, Mode::String, 1, 0)),
    ("subnet-allocation",                  opt(220, Mode::Binary, 1, 0)),
    ("virtual-subnet-allocation",          opt(221, Mode::Binary, 1, 0)),
    ("private-01",                         opt(224, Mode::Binary, 1, 0)),
    ("private-02",                         opt(225, Mode::Binary, 1, 0)),
    ("private-03",                         opt(226, Mode::Binary, 1, 0)),
    ("private-04",                         opt(227, Mode::Binary, 1, 0)),
    ("private-05",                         opt(228, Mode::Binary, 1, 0)),
    ("private-06",                         opt(229, Mode::Binary, 1, 0)),
    ("private-07",                         opt(230, Mode::Binary, 1, 0)),
    ("private-08",                         opt(231, Mode::Binary, 1, 0)),
    ("private-09",                         opt(232, Mode::Binary, 1, 0)),
    ("private-10",                         opt(233, Mode::Binary, 1, 0)),
    ("private-11",                         opt(234, Mode::Binary, 1, 0)),
    ("private-12",                         opt(235, Mode::Binary, 1, 0)),
    ("private-13",                         opt(236, Mode::Binary, 1, 0)),
    ("private-14",                         opt(237, Mode::Binary, 1, 0)),
    ("private-15",                         opt(238, Mode::Binary, 1, 0)),
    ("private-16",                         opt(239, Mode::Binary, 1, 0)),
    ("private-17",                         opt(240, Mode::Binary, 1, 0)),
    ("private-18",                         opt(241, Mode::Binary, 1, 0)),
    ("private-19",                         opt(242, Mode::Binary, 1, 0)),
    ("private-20",                         opt(243, Mode::Binary, 1, 0)),
    ("private-21",                         opt(244, Mode::Binary, 1, 0)),
    ("private-22",                         opt(245, Mode::Binary, 1, 0)),
    ("private-23",                         opt(246, Mode::Binary, 1, 0)),
    ("private-24",                         opt(247, Mode::Binary, 1, 0)),
    ("private-25",                         opt(248, Mode::Binary, 1, 0)),
    ("private-26",                         opt(249, Mode::Binary, 1, 0)),
    ("private-27",                         opt(250, Mode::Binary, 1, 0)),
    ("private-28",                         opt(251, Mode::Binary, 1, 0)),
    ("private-29",                         opt(252, Mode::Binary, 1, 0)),
    ("private-30",                         opt(253, Mode::Binary, 1, 0)),
    ("private-31",                         opt(254, Mode::Binary, 1, 0)),
];

pub const HARDWARE_TYPES: &[HardwareType] = &[
    HardwareType { id: 1, name: "ethernet", length: 6 },
    HardwareType { id: 6, name: "ieee-802", length: 0 },
    HardwareType { id: 7, name: "arcnet", length: 0 },
    HardwareType { id: 11, name: "localtalk", length: 0 },
    HardwareType { id: 12, name: "localnet", length: 0 },
    HardwareType { id: 14, name: "smds", length: 0 },
    HardwareType { id: 15, name: "frame-relay", length: 0 },
    HardwareType { id: 16, name: "atm", length: 0 },
    HardwareType { id: 17, name: "hdlc", length: 0 },
    HardwareType { id: 18, name: "fiber-channel", length: 0 },
    HardwareType { id: 19, name: "atm", length: 0 },
    HardwareType { id: 20, name: "serial", length: 0 },
];

pub const MESSAGE_TYPES: &[MessageType] = &[
    MessageType { id: 1, name: "discover", opcode: 1, request: 0 },
    MessageType { id: 2, name: "offer", opcode: 2, request: 1 },
    MessageType { id: 3, name: "request", opcode: 1, request: 0 },
    MessageType { id: 4, name: "decline", opcode: 1, request: 0 },
    MessageType { id: 5, name: "ack", opcode: 2, request: 3 },
    MessageType { id: 6, name: "nak", opcode: 2, request: 3 },
    MessageType { id: 7, name: "release", opcode: 1, request: 0 },
    MessageType { id: 8, name: "inform", opcode: 1, request: 0 },
    MessageType { id: 9, name: "forcerenew", opcode: 1, request: 0 },
    MessageType { id: 10, name: "leasequery", opcode: 1, request: 0 },
    MessageType { id: 11, name: "leaseunassigned", opcode: 2, request: 10 },
    MessageType { id: 12, name: "leaseunknown", opcode: 2, request: 10 },
    MessageType { id: 13, name: "leaseactive", opcode: 2, request: 10 },
    MessageType { id: 14, name: "bulkleasequery", opcode: 1, request: 0 },
    MessageType { id: 15, name: "leasequerydone", opcode: 2, request: 14 },
];

/// BOOTP opcode name, `None` for anything but 1/2.
pub fn opcode_name(opcode: u8) -> Option<&'static str> {
    match opcode {
        1 => Some("request"),
        2 => Some("reply"),
        _ => None,
    }
}

fn name_index() -> &'static HashMap<&'static str, OptionDef> {
    static INDEX: OnceLock<HashMap<&'static str, OptionDef>> = OnceLock::new();
    INDEX.get_or_init(|| OPTIONS.iter().map(|(name, def)| (*name, *def)).collect())
}

fn id_index() -> &'static HashMap<i16, &'static str> {
    static INDEX: OnceLock<HashMap<i16, &'static str>> = OnceLock::new();
    INDEX.get_or_init(|| OPTIONS.iter().map(|(name, def)| (def.id, *name)).collect())
}

pub fn option_by_name(name: &str) -> Option<OptionDef> {
    name_index().get(name).copied()
}

pub fn option_by_id(id: i16) -> Option<(&'static str, OptionDef)> {
    let name = *id_index().get(&id)?;
    Some((name, option_by_name(name)?))
}

/// Ephemeral definition for an option id missing from the registry.
///
/// Always scalar BINARY; synthesizing a list for an unknown id is refused
/// by construction.
pub fn unknown_option(id: u8) -> OptionDef {
    OptionDef { id: id as i16, mode: Mode::Binary, list: false, min: 1, max: 0, step: 0 }
}

pub fn hardware_by_id(id: u8) -> Option<&'static HardwareType> {
    HARDWARE_TYPES.iter().find(|hwtype| hwtype.id == id)
}

pub fn hardware_by_name(name: &str) -> Option<&'static HardwareType> {
    HARDWARE_TYPES.iter().find(|hwtype| hwtype.name == name)
}

pub fn msgtype_by_id(id: u8) -> Option<&'static MessageType> {
    MESSAGE_TYPES.iter().find(|msgtype| msgtype.id == id)
}

pub fn msgtype_by_name(name: &str) -> Option<&'static MessageType> {
    MESSAGE_TYPES.iter().find(|msgtype| msgtype.name == name)
}

fn mode_description(def: &OptionDef) -> String {
    let (text, plural) = match def.mode {
        Mode::Binary => ("hex-encoded blob", "s"),
        Mode::SBinary => ("colon-separated hex-encoded blob", "s"),
        Mode::Integer => return format!("{}bits integer{}", 8 * def.min, if def.list { "s list" } else { "" }),
        Mode::DInteger => ("dotted-integer (version)", "s"),
        Mode::Boolean => ("boolean", "s"),
        Mode::String => ("string", "s"),
        Mode::Inet4 => ("IPv4 address", "es"),
        Mode::Inet4Pair => ("IPv4 addresses pair", "s"),
        Mode::Cidr4 => ("IPv4 CIDR block", "s"),
        Mode::Domain => ("DNS domain", "s"),
        Mode::Route4 => ("IPv4 classless route", "s"),
        Mode::Opcode => ("BOOTP opcode", "s"),
        Mode::HwType => ("hardware address type", "s"),
        Mode::MsgType => ("DHCP message type", "s"),
        Mode::Option => ("DHCP option", "s"),
    };
    if def.list {
        format!("{text}{plural} list")
    } else {
        text.to_string()
    }
}

/// Render the option catalogue, either as a human-readable table or as a
/// JSON object keyed by option name.
pub fn render_listing(json: bool, pretty: bool) -> String {
    if json {
        let listing: serde_json::Map<String, serde_json::Value> = OPTIONS
            .iter()
            .map(|(name, def)| {
                let mut entry = serde_json::Map::new();
                entry.insert("id".into(), serde_json::Value::from(def.id));
                entry.insert("mode".into(), serde_json::Value::from(def.mode.label()));
                if def.list {
                    entry.insert("list".into(), serde_json::Value::from(true));
                }
                (name.to_string(), serde_json::Value::Object(entry))
            })
            .collect();
        let listing = serde_json::Value::Object(listing);
        if pretty {
            serde_json::to_string_pretty(&listing).unwrap_or_default()
        } else {
            serde_json::to_string(&listing).unwrap_or_default()
        }
    } else {
        let mut output = String::from(
            "option                                  type                                    id\n\
             --------------------------------------- --------------------------------------- ---\n",
        );
        let mut entries: Vec<&(&str, OptionDef)> = OPTIONS.iter().collect();
        entries.sort_by_key(|(_, def)| def.id);
        for (name, def) in entries {
            let id = if def.id > 0 { def.id.to_string() } else { "-".to_string() };
            output.push_str(&format!("{name:<40}{:<40}{id}\n", mode_description(def)));
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_id_lookups_agree() {
        for (name, def) in OPTIONS {
            let (back, found) = option_by_id(def.id).unwrap();
            assert_eq!(back, *name, "id {} resolves to a different name", def.id);
            assert_eq!(found, *def);
        }
    }

    #[test]
    fn header_fields_use_negative_ids() {
        assert_eq!(option_by_name("bootp-opcode").unwrap().id, -14);
        assert_eq!(option_by_name("client-hardware-address").unwrap().id, -3);
        assert_eq!(option_by_name("subnet-mask").unwrap().id, 1);
    }

    #[test]
    fn unknown_option_is_scalar_binary() {
        let def = unknown_option(180);
        assert_eq!(def.id, 180);
        assert_eq!(def.mode, Mode::Binary);
        assert!(!def.list);
        assert_eq!(def.min, 1);
    }

    #[test]
    fn ethernet_has_canonical_length() {
        let hwtype = hardware_by_id(1).unwrap();
        assert_eq!(hwtype.name, "ethernet");
        assert_eq!(hwtype.length, 6);
        assert_eq!(hardware_by_name("ieee-802").unwrap().length, 0);
    }

    #[test]
    fn reply_types_name_their_request() {
        assert_eq!(msgtype_by_name("offer").unwrap().request, 1);
        assert_eq!(msgtype_by_name("ack").unwrap().request, 3);
        assert_eq!(msgtype_by_name("nak").unwrap().request, 3);
        assert_eq!(msgtype_by_name("leaseactive").unwrap().request, 10);
        assert_eq!(msgtype_by_name("discover").unwrap().request, 0);
    }

    #[test]
    fn listing_contains_every_option() {
        let listing = render_listing(false, false);
        assert!(listing.contains("classless-route"));
        assert!(listing.contains("IPv4 classless routes list"));
        let json: serde_json::Value =
            serde_json::from_str(&render_listing(true, false)).unwrap();
        assert_eq!(json["routers"]["id"], 3);
        assert_eq!(json["routers"]["list"], true);
        assert_eq!(json["dhcp-message-type"]["mode"], "msgtype");
    }
}
