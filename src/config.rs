//! Command-line surface.
//!
//! Short flags with `DHCPMUX_`-prefixed environment defaults. The mode is
//! implied: a backend command/URL makes the process a server, a relay
//! target makes it a relay, anything else is a one-shot client.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::Parser;

use crate::backend::BackendConfig;

const DHCP_SERVER_PORT: u16 = 67;

#[derive(Parser, Debug)]
#[command(name = crate::PROGNAME, version, about = "DHCPv4/BOOTP relay and server dispatcher")]
pub struct Cli {
    /// List available DHCP options (human format)
    #[arg(short = 'l', env = "DHCPMUX_LIST")]
    pub list: bool,

    /// List available DHCP options (JSON format)
    #[arg(short = 'j', env = "DHCPMUX_LIST_JSON")]
    pub list_json: bool,

    /// Run in IPv6 mode
    #[arg(short = '6', env = "DHCPMUX_V6")]
    pub ipv6: bool,

    /// Comma-separated interface list; an empty element binds the
    /// non-interface-scoped UDP endpoint
    #[arg(short = 'i', env = "DHCPMUX_INTERFACES")]
    pub interfaces: Option<String>,

    /// Backend command or http(s) URL (server mode)
    #[arg(short = 'b', env = "DHCPMUX_BACKEND")]
    pub backend: Option<String>,

    /// Workers count (subprocess backend)
    #[arg(short = 'w', default_value_t = 1, env = "DHCPMUX_WORKERS")]
    pub workers: usize,

    /// Remote DHCP server address (relay mode)
    #[arg(short = 'r', env = "DHCPMUX_RELAY")]
    pub relay: Option<String>,

    /// Alternate relay local address (relay mode)
    #[arg(short = 's', env = "DHCPMUX_RELAY_ADDRESS")]
    pub relay_address: Option<Ipv4Addr>,

    /// Overload default options with a JSON object (client mode)
    #[arg(short = 'R', env = "DHCPMUX_EXTRA")]
    pub extra: Option<String>,

    /// Alternate bind address (server/relay modes)
    #[arg(short = 'a', default_value = "*", env = "DHCPMUX_ADDRESS")]
    pub address: String,

    /// Alternate port (server/relay modes)
    #[arg(short = 'p', default_value_t = DHCP_SERVER_PORT, env = "DHCPMUX_PORT")]
    pub port: u16,

    /// Pretty-print JSON
    #[arg(short = 'P', env = "DHCPMUX_PRETTY")]
    pub pretty: bool,

    /// Dump the request (client mode)
    #[arg(short = 'd', env = "DHCPMUX_DUMP")]
    pub dump: bool,

    /// Allow insecure TLS connections (HTTP backend)
    #[arg(short = 'I', env = "DHCPMUX_INSECURE")]
    pub insecure: bool,

    /// Add an HTTP header as name:value (HTTP backend, repeatable)
    #[arg(short = 'H')]
    pub header: Vec<String>,

    /// Client certificate as cert-path,key-path (HTTP backend)
    #[arg(short = 'c', env = "DHCPMUX_CERT")]
    pub cert: Option<String>,

    /// CA certificate path (HTTP backend)
    #[arg(short = 'C', env = "DHCPMUX_CACERT")]
    pub cacert: Option<PathBuf>,

    /// Backend timeout in seconds, clamped to [3,30]
    #[arg(short = 't', default_value_t = 7, env = "DHCPMUX_TIMEOUT")]
    pub timeout: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Client,
    Server,
    Relay,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Client => write!(formatter, "client"),
            Mode::Server => write!(formatter, "server"),
            Mode::Relay => write!(formatter, "relay"),
        }
    }
}

impl Cli {
    pub fn mode(&self) -> Mode {
        if self.backend.is_some() {
            Mode::Server
        } else if self.relay.is_some() {
            Mode::Relay
        } else {
            Mode::Client
        }
    }

    /// Interface names to bind, with one empty entry for the non-scoped
    /// endpoint (always present in server/relay modes).
    pub fn interface_list(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .interfaces
            .as_deref()
            .unwrap_or_default()
            .trim_matches(',')
            .split(',')
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        names.push(String::new());
        names
    }

    pub fn bind_address(&self) -> Ipv4Addr {
        if self.address == "*" {
            Ipv4Addr::UNSPECIFIED
        } else {
            self.address.parse().unwrap_or(Ipv4Addr::UNSPECIFIED)
        }
    }

    /// Relay target with the DHCP server port appended when unspecified.
    pub fn relay_target(&self) -> Option<String> {
        self.relay.as_ref().map(|target| {
            if target.contains(':') {
                target.clone()
            } else {
                format!("{target}:{DHCP_SERVER_PORT}")
            }
        })
    }

    pub fn backend_config(&self) -> Option<BackendConfig> {
        let target = self.backend.clone()?;
        Some(BackendConfig {
            target,
            workers: self.workers.clamp(1, 32),
            timeout: std::time::Duration::from_secs(self.timeout.clamp(3, 30)),
            headers: self
                .header
                .iter()
                .filter_map(|header| {
                    header
                        .split_once(':')
                        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
                })
                .collect(),
            insecure: self.insecure,
            ca_certificate: self.cacert.clone(),
            client_certificate: self.cert.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("dhcpmux").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn mode_selection() {
        assert_eq!(parse(&["-i", "eth0"]).mode(), Mode::Client);
        assert_eq!(parse(&["-b", "backend.py"]).mode(), Mode::Server);
        assert_eq!(parse(&["-r", "10.0.0.1"]).mode(), Mode::Relay);
        // A backend wins over a relay target.
        assert_eq!(parse(&["-b", "backend.py", "-r", "10.0.0.1"]).mode(), Mode::Server);
    }

    #[test]
    fn interface_list_always_carries_the_unscoped_entry() {
        assert_eq!(parse(&[]).interface_list(), vec![String::new()]);
        assert_eq!(
            parse(&["-i", "eth0,eth1"]).interface_list(),
            vec!["eth0".to_string(), "eth1".to_string(), String::new()]
        );
        assert_eq!(
            parse(&["-i", ",eth0,"]).interface_list(),
            vec!["eth0".to_string(), String::new()]
        );
    }

    #[test]
    fn relay_target_defaults_to_port_67() {
        assert_eq!(
            parse(&["-r", "10.0.0.1"]).relay_target(),
            Some("10.0.0.1:67".to_string())
        );
        assert_eq!(
            parse(&["-r", "10.0.0.1:1067"]).relay_target(),
            Some("10.0.0.1:1067".to_string())
        );
        assert_eq!(parse(&[]).relay_target(), None);
    }

    #[test]
    fn backend_values_are_clamped() {
        let cli = parse(&["-b", "backend.py", "-w", "100", "-t", "1"]);
        let config = cli.backend_config().unwrap();
        assert_eq!(config.workers, 32);
        assert_eq!(config.timeout.as_secs(), 3);
        let cli = parse(&["-b", "backend.py", "-w", "0", "-t", "90"]);
        let config = cli.backend_config().unwrap();
        assert_eq!(config.workers, 1);
        assert_eq!(config.timeout.as_secs(), 30);
    }

    #[test]
    fn headers_split_on_the_first_colon() {
        let cli = parse(&["-b", "http://x/", "-H", "x-token: abc:def", "-H", "bogus"]);
        let config = cli.backend_config().unwrap();
        assert_eq!(
            config.headers,
            vec![("x-token".to_string(), "abc:def".to_string())]
        );
    }

    #[test]
    fn bind_address_star_is_unspecified() {
        assert_eq!(parse(&[]).bind_address(), Ipv4Addr::UNSPECIFIED);
        assert_eq!(
            parse(&["-a", "192.0.2.1"]).bind_address(),
            Ipv4Addr::new(192, 0, 2, 1)
        );
    }
}
