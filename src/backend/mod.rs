//! Out-of-process backend client.
//!
//! Two mutually exclusive variants behind one entry point: a subprocess
//! pool speaking newline-delimited JSON frames on stdin/stdout, and an
//! HTTP POST client. Both consume request frames from the dispatcher's
//! outgoing channel and inject reply packets back on its inbound channel;
//! correlation stays with the dispatcher.

mod http;
mod subprocess;

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::dispatcher::{ContextTable, InboundPacket};
use crate::domain::frame::Frame;

/// Backend selection and transport settings.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Subprocess command line, or an `http(s)://` URL.
    pub target: String,
    /// Subprocess worker count, clamped to [1,32] by the CLI layer.
    pub workers: usize,
    /// Per-HTTP-request timeout, clamped to [3,30]s by the CLI layer.
    pub timeout: Duration,
    /// Extra HTTP headers as (name, value) pairs.
    pub headers: Vec<(String, String)>,
    /// Skip TLS certificate verification.
    pub insecure: bool,
    /// PEM CA certificate to trust.
    pub ca_certificate: Option<PathBuf>,
    /// PEM client certificate as `cert-path,key-path`.
    pub client_certificate: Option<String>,
}

impl BackendConfig {
    pub fn is_http(&self) -> bool {
        self.target.starts_with("http")
    }
}

/// Start the configured backend variant.
pub fn spawn(
    config: BackendConfig,
    frames: mpsc::Receiver<Frame>,
    packets: mpsc::Sender<InboundPacket>,
    contexts: ContextTable,
) {
    if config.is_http() {
        tokio::spawn(http::run(config, frames, packets, contexts));
    } else {
        subprocess::spawn_pool(config, frames, packets, contexts);
    }
}
