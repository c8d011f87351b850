//! dhcpmux - DHCPv4/BOOTP message engine with a multi-interface
//! relay/server dispatcher.
//!
//! The crate is built from three subsystems: a schema-driven wire codec
//! ([`codec`]), a raw Ethernet+IPv4+UDP transceiver ([`link`]) and a
//! transaction dispatcher ([`dispatcher`]) that multiplexes requests from
//! multiple interfaces to an out-of-process backend ([`backend`]).

pub mod backend;
pub mod client;
pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod link;

pub use codec::{build, parse, transaction_key};
pub use config::Cli;
pub use domain::frame::{Frame, Value};
pub use error::{CodecError, LinkError};

/// Program name used in logs and the HTTP User-Agent.
pub const PROGNAME: &str = "dhcpmux";
/// Program version used in logs and the HTTP User-Agent.
pub const PROGVER: &str = env!("CARGO_PKG_VERSION");
