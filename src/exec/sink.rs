// src/exec/sink.rs

//! Per-pipeline output relay.
//!
//! Every stage's stdout and stderr are pumped into one bounded channel, and
//! a single relay task per pipeline forwards the chunks to the configured
//! [`OutputTarget`]. Output of all stages of one pipeline therefore forms one
//! continuous stream. A slow target stalls the relay, the full channel stalls
//! the pumps, and the child then blocks on its own pipe writes. Closing the
//! sink (on kill) stops the relay immediately and drops whatever is still
//! buffered.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Chunks buffered between the pumps and the relay.
const SINK_CAPACITY: usize = 16;

/// Where stage output ends up.
#[derive(Debug, Clone, Default)]
pub enum OutputTarget {
    /// The tool's own standard output.
    #[default]
    Stdout,
    /// Raw chunks sent to an in-process consumer. A consumer that stops
    /// receiving stalls the pipeline's output.
    Channel(mpsc::Sender<Vec<u8>>),
}

/// The shared output stream of one pipeline.
#[derive(Debug)]
pub struct OutputSink {
    tx: mpsc::Sender<Vec<u8>>,
    closed: CancellationToken,
    relay: JoinHandle<()>,
}

impl OutputSink {
    /// Start the relay task. Cancelling `closed` shuts the sink.
    pub fn spawn(target: OutputTarget, closed: CancellationToken) -> Self {
        let (tx, rx) = mpsc::channel(SINK_CAPACITY);
        let relay = tokio::spawn(relay(rx, target, closed.clone()));
        Self { tx, closed, relay }
    }

    pub fn writer(&self) -> SinkWriter {
        SinkWriter {
            tx: self.tx.clone(),
            closed: self.closed.clone(),
        }
    }

    /// Drop our sender and wait for the relay to drain.
    ///
    /// All writers must be gone for the relay to see the end of the stream,
    /// unless the sink was closed.
    pub async fn finish(self) {
        drop(self.tx);
        if let Err(err) = self.relay.await {
            debug!(error = %err, "output relay task failed");
        }
    }
}

/// A handle that feeds one reader into the sink.
#[derive(Debug, Clone)]
pub struct SinkWriter {
    tx: mpsc::Sender<Vec<u8>>,
    closed: CancellationToken,
}

impl SinkWriter {
    /// Copy `reader` into the sink until EOF, a read error, or sink closure.
    pub fn pump<R>(self, mut reader: R) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        tokio::spawn(async move {
            let mut buf = vec![0u8; 8 * 1024];
            loop {
                let n = tokio::select! {
                    biased;
                    _ = self.closed.cancelled() => break,
                    read = reader.read(&mut buf) => match read {
                        Ok(0) => break,
                        Ok(n) => n,
                        Err(err) => {
                            debug!(error = %err, "stage output read failed");
                            break;
                        }
                    },
                };
                let sent = tokio::select! {
                    biased;
                    _ = self.closed.cancelled() => break,
                    sent = self.tx.send(buf[..n].to_vec()) => sent,
                };
                if sent.is_err() {
                    break;
                }
            }
        })
    }
}

async fn relay(
    mut rx: mpsc::Receiver<Vec<u8>>,
    target: OutputTarget,
    closed: CancellationToken,
) {
    let mut stdout = tokio::io::stdout();

    loop {
        let chunk = tokio::select! {
            biased;
            _ = closed.cancelled() => break,
            chunk = rx.recv() => match chunk {
                Some(chunk) => chunk,
                None => break,
            },
        };

        let delivered = match &target {
            OutputTarget::Stdout => tokio::select! {
                biased;
                _ = closed.cancelled() => false,
                written = write_flush(&mut stdout, &chunk) => match written {
                    Ok(()) => true,
                    Err(err) => {
                        debug!(error = %err, "writing stage output failed");
                        false
                    }
                },
            },
            OutputTarget::Channel(tx) => tokio::select! {
                biased;
                _ = closed.cancelled() => false,
                sent = tx.send(chunk) => sent.is_ok(),
            },
        };
        if !delivered {
            break;
        }
    }
}

async fn write_flush(stdout: &mut tokio::io::Stdout, chunk: &[u8]) -> std::io::Result<()> {
    stdout.write_all(chunk).await?;
    stdout.flush().await
}
