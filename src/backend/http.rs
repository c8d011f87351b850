//! HTTP backend: POST each request frame as JSON and inject the response
//! frame when its transaction is still in flight.

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::codec::{build, transaction_key};
use crate::dispatcher::{ContextTable, InboundPacket};
use crate::domain::frame::Frame;
use crate::{PROGNAME, PROGVER};

pub(super) async fn run(
    config: super::BackendConfig,
    mut frames: mpsc::Receiver<Frame>,
    packets: mpsc::Sender<InboundPacket>,
    contexts: ContextTable,
) {
    let client = match build_client(&config) {
        Ok(client) => client,
        Err(reason) => {
            error!(remote = %config.target, reason = %reason, "start");
            return;
        }
    };

    while let Some(frame) = frames.recv().await {
        let client = client.clone();
        let packets = packets.clone();
        let contexts = contexts.clone();
        let target = config.target.clone();
        let headers = config.headers.clone();
        tokio::spawn(async move {
            exchange(client, target, headers, frame, packets, contexts).await;
        });
    }
}

async fn exchange(
    client: reqwest::Client,
    target: String,
    headers: Vec<(String, String)>,
    frame: Frame,
    packets: mpsc::Sender<InboundPacket>,
    contexts: ContextTable,
) {
    info!(
        msgtype = frame.str("dhcp-message-type").unwrap_or_default(),
        txid = %frame.txid(),
        remote = %target,
        "send"
    );

    let mut request = client.post(&target).json(&frame);
    for (name, value) in &headers {
        request = request.header(name, value);
    }

    let reply = match request.send().await {
        Ok(response) => match response.json::<Frame>().await {
            Ok(reply) => reply,
            Err(reason) => {
                warn!(txid = %frame.txid(), remote = %target, reason = %reason, "recv");
                return;
            }
        },
        Err(reason) => {
            warn!(txid = %frame.txid(), remote = %target, reason = %reason, "recv");
            return;
        }
    };

    let key = transaction_key(&reply);
    let in_flight = { contexts.read().unwrap().contains_key(&key) };
    if !in_flight {
        return;
    }
    match build(&reply) {
        Ok(data) => {
            info!(
                msgtype = reply.str("dhcp-message-type").unwrap_or_default(),
                txid = %reply.txid(),
                remote = %target,
                "recv"
            );
            let packet = InboundPacket {
                source: "http".to_string(),
                hardware: None,
                client: target,
                data,
            };
            let _ = packets.send(packet).await;
        }
        Err(reason) => {
            warn!(txid = %reply.txid(), remote = %target, reason = %reason, "recv");
        }
    }
}

fn build_client(config: &super::BackendConfig) -> anyhow::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(format!("{PROGNAME}/{PROGVER}"))
        .timeout(config.timeout)
        .use_rustls_tls()
        .danger_accept_invalid_certs(config.insecure);

    if let Some(path) = &config.ca_certificate {
        let pem = std::fs::read(path)
            .with_context(|| format!("reading CA certificate {}", path.display()))?;
        builder = builder.add_root_certificate(
            reqwest::Certificate::from_pem(&pem).context("parsing CA certificate")?,
        );
    }
    if let Some(pair) = &config.client_certificate {
        let (cert, key) = pair
            .split_once(',')
            .context("client certificate must be 'cert-path,key-path'")?;
        let mut pem = std::fs::read(cert.trim())
            .with_context(|| format!("reading client certificate {cert}"))?;
        pem.extend(
            std::fs::read(key.trim())
                .with_context(|| format!("reading client certificate key {key}"))?,
        );
        builder = builder
            .identity(reqwest::Identity::from_pem(&pem).context("parsing client certificate")?);
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn client_builds_with_defaults() {
        let config = super::super::BackendConfig {
            target: "http://127.0.0.1:8067/dhcp".to_string(),
            workers: 1,
            timeout: Duration::from_secs(7),
            headers: vec![("x-token".to_string(), "secret".to_string())],
            insecure: true,
            ca_certificate: None,
            client_certificate: None,
        };
        assert!(build_client(&config).is_ok());
    }

    #[test]
    fn missing_certificate_files_are_reported() {
        let config = super::super::BackendConfig {
            target: "https://dhcp.example.com/".to_string(),
            workers: 1,
            timeout: Duration::from_secs(7),
            headers: Vec::new(),
            insecure: false,
            ca_certificate: Some("/nonexistent/ca.pem".into()),
            client_certificate: None,
        };
        assert!(build_client(&config).is_err());
    }
}
