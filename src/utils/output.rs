/// Bounded output collection
///
/// Each captured stream is drained on its own thread into a buffer capped at
/// the judge's output ceiling. Crossing the ceiling raises a shared flag so the
/// runner can kill the producer instead of buffering without bound.
use crate::config::types::OutputIntegrity;
use std::io::{BufReader, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Bytes and integrity of one drained stream
#[derive(Debug, Clone, Default)]
pub struct CollectedOutput {
    pub bytes: Vec<u8>,
    pub integrity: OutputIntegrity,
}

impl CollectedOutput {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).to_string()
    }
}

/// A stream still being drained in the background
pub struct PendingOutput {
    rx: Receiver<CollectedOutput>,
}

impl PendingOutput {
    /// Wait for the collector to finish. Descendants that escaped the process
    /// group can keep a pipe open forever, so the wait is bounded.
    pub fn finish(self, timeout: Duration) -> CollectedOutput {
        match self.rx.recv_timeout(timeout) {
            Ok(output) => output,
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("output collector did not finish within {:?}", timeout);
                CollectedOutput {
                    bytes: Vec::new(),
                    integrity: OutputIntegrity::CollectionTimeout,
                }
            }
            Err(RecvTimeoutError::Disconnected) => CollectedOutput {
                bytes: Vec::new(),
                integrity: OutputIntegrity::ReadError,
            },
        }
    }
}

/// Output collector with a per-stream byte ceiling
#[derive(Debug, Clone)]
pub struct OutputCollector {
    limit: usize,
    overflow: Arc<AtomicBool>,
}

impl OutputCollector {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            overflow: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set once any stream handed to this collector crosses the ceiling
    pub fn overflowed(&self) -> bool {
        self.overflow.load(Ordering::SeqCst)
    }

    /// Drain `stream` on a background thread
    pub fn spawn<R: Read + Send + 'static>(&self, stream: R) -> PendingOutput {
        let (tx, rx) = channel();
        let limit = self.limit;
        let overflow = Arc::clone(&self.overflow);
        thread::spawn(move || collect_stream(stream, limit, overflow, tx));
        PendingOutput { rx }
    }
}

/// Combined integrity of two streams, worst state wins
pub fn combine_integrity(a: OutputIntegrity, b: OutputIntegrity) -> OutputIntegrity {
    fn rank(i: OutputIntegrity) -> u8 {
        match i {
            OutputIntegrity::Complete => 0,
            OutputIntegrity::CollectionTimeout => 1,
            OutputIntegrity::ReadError => 2,
            OutputIntegrity::TruncatedByJudgeLimit => 3,
        }
    }
    if rank(a) >= rank(b) {
        a
    } else {
        b
    }
}

fn collect_stream<R: Read>(
    stream: R,
    limit: usize,
    overflow: Arc<AtomicBool>,
    tx: Sender<CollectedOutput>,
) {
    let mut reader = BufReader::new(stream);
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 8192];
    let mut integrity = OutputIntegrity::Complete;

    loop {
        match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                if buffer.len() + n > limit {
                    let remaining = limit - buffer.len();
                    buffer.extend_from_slice(&chunk[..remaining]);
                    integrity = OutputIntegrity::TruncatedByJudgeLimit;
                    overflow.store(true, Ordering::SeqCst);
                    break;
                }
                buffer.extend_from_slice(&chunk[..n]);
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                log::debug!("output stream read failed: {}", e);
                integrity = OutputIntegrity::ReadError;
                break;
            }
        }
    }

    let _ = tx.send(CollectedOutput {
        bytes: buffer,
        integrity,
    });
}
