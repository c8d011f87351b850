//! Subprocess backend: a pool of workers speaking one JSON object per line
//! on stdin/stdout, stderr passed through.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdout, Command};
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use crate::codec::{build, transaction_key};
use crate::dispatcher::{ContextTable, InboundPacket};
use crate::domain::frame::Frame;

const RESPAWN_DELAY: Duration = Duration::from_secs(3);

type SharedFrames = Arc<Mutex<mpsc::Receiver<Frame>>>;

/// Spawn the worker pool; each worker owns a one-request-at-a-time loop
/// over the shared outgoing channel.
pub(super) fn spawn_pool(
    config: super::BackendConfig,
    frames: mpsc::Receiver<Frame>,
    packets: mpsc::Sender<InboundPacket>,
    contexts: ContextTable,
) {
    let frames: SharedFrames = Arc::new(Mutex::new(frames));
    for _ in 0..config.workers {
        tokio::spawn(run_worker(
            config.target.clone(),
            frames.clone(),
            packets.clone(),
            contexts.clone(),
        ));
    }
}

/// One worker: spawn the command, feed it request frames, and respawn it
/// three seconds after it exits or is killed.
async fn run_worker(
    command: String,
    frames: SharedFrames,
    packets: mpsc::Sender<InboundPacket>,
    contexts: ContextTable,
) {
    loop {
        let mut parts = command.split_whitespace();
        let Some(program) = parts.next() else {
            warn!(reason = "empty backend command", "start");
            return;
        };
        let args: Vec<&str> = parts.collect();

        match Command::new(program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(mut child) => {
                let pid = child.id().unwrap_or_default();
                info!(local = program, worker = pid, "start");
                let (Some(mut stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take())
                else {
                    let _ = child.kill().await;
                    continue;
                };

                let mut reader = tokio::spawn(read_replies(
                    stdout,
                    packets.clone(),
                    contexts.clone(),
                    pid,
                ));

                loop {
                    tokio::select! {
                        request = async { frames.lock().await.recv().await } => {
                            let Some(frame) = request else { return; };
                            let Ok(mut payload) = serde_json::to_vec(&frame) else { continue; };
                            payload.push(b'\n');
                            if stdin.write_all(&payload).await.is_err() {
                                break;
                            }
                            info!(
                                msgtype = frame.str("dhcp-message-type").unwrap_or_default(),
                                txid = %frame.txid(),
                                local = program,
                                worker = pid,
                                "send"
                            );
                        }
                        outcome = &mut reader => {
                            if matches!(outcome, Ok(WorkerVerdict::Kill)) {
                                let _ = child.start_kill();
                            }
                            break;
                        }
                    }
                }

                drop(stdin);
                let status = match child.wait().await {
                    Ok(status) => status.to_string(),
                    Err(error) => error.to_string(),
                };
                warn!(local = program, worker = pid, status = %status, "stop");
            }
            Err(error) => {
                warn!(local = program, reason = %error, "start");
            }
        }
        tokio::time::sleep(RESPAWN_DELAY).await;
    }
}

enum WorkerVerdict {
    /// stdout closed or became unreadable; wait for the exit status.
    Eof,
    /// a malformed response line; the worker gets killed and respawned.
    Kill,
}

/// Forward valid response lines whose transaction is still in flight; the
/// reply packet is built here and injected on the inbound channel so the
/// dispatcher's reply path is the single send site.
async fn read_replies(
    stdout: ChildStdout,
    packets: mpsc::Sender<InboundPacket>,
    contexts: ContextTable,
    pid: u32,
) -> WorkerVerdict {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let Ok(frame) = serde_json::from_str::<Frame>(&line) else {
                    warn!(worker = pid, reason = "unparseable response line", "recv");
                    return WorkerVerdict::Kill;
                };
                let key = transaction_key(&frame);
                let in_flight = { contexts.read().unwrap().contains_key(&key) };
                if !in_flight {
                    continue;
                }
                match build(&frame) {
                    Ok(data) => {
                        info!(
                            msgtype = frame.str("dhcp-message-type").unwrap_or_default(),
                            txid = %frame.txid(),
                            worker = pid,
                            "recv"
                        );
                        let packet = InboundPacket {
                            source: "worker".to_string(),
                            hardware: None,
                            client: pid.to_string(),
                            data,
                        };
                        if packets.send(packet).await.is_err() {
                            return WorkerVerdict::Eof;
                        }
                    }
                    Err(error) => {
                        warn!(worker = pid, reason = %error, "recv");
                    }
                }
            }
            Ok(None) | Err(_) => return WorkerVerdict::Eof,
        }
    }
}
