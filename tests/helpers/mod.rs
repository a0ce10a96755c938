/// Test doubles to simulate a serial line and the tick source during integration tests.
use std::collections::VecDeque;
use tasklink::transport::{SerialOpen, SerialRead, SerialWrite, TickSource};
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum PipeError {
    /// The other end of the line was dropped.
    Closed,
    /// No device behind the requested path.
    NotFound,
}

/// Receive half of an in-memory serial line.
#[derive(Debug)]
pub struct PipeReader {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    pending: VecDeque<u8>,
}

/// Transmit half of an in-memory serial line.
#[derive(Debug, Clone)]
pub struct PipeWriter {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

#[allow(dead_code)]
impl PipeReader {
    /// Wait for at least one byte and return everything buffered so far.
    pub async fn recv_chunk(&mut self) -> Option<Vec<u8>> {
        if self.pending.is_empty() {
            let chunk = self.rx.recv().await?;
            self.pending.extend(chunk);
        }
        Some(self.pending.drain(..).collect())
    }

    /// Everything already on the line, without waiting.
    pub fn drain_now(&mut self) -> Vec<u8> {
        while let Ok(chunk) = self.rx.try_recv() {
            self.pending.extend(chunk);
        }
        self.pending.drain(..).collect()
    }
}

#[allow(dead_code)]
impl PipeWriter {
    /// Push raw bytes onto the line, as a misbehaving peer would.
    pub fn inject(&self, bytes: &[u8]) {
        let _ = self.tx.send(bytes.to_vec());
    }
}

/// Serial line with two endpoints.
#[allow(dead_code)]
pub struct SerialPipe;

#[allow(dead_code)]
impl SerialPipe {
    /// Construct a pair of cross-connected endpoints (DUT ↔ host).
    pub fn create_pair() -> ((PipeReader, PipeWriter), (PipeReader, PipeWriter)) {
        let (dut_tx, host_rx) = mpsc::unbounded_channel();
        let (host_tx, dut_rx) = mpsc::unbounded_channel();

        let dut = (
            PipeReader {
                rx: dut_rx,
                pending: VecDeque::new(),
            },
            PipeWriter { tx: dut_tx },
        );
        let host = (
            PipeReader {
                rx: host_rx,
                pending: VecDeque::new(),
            },
            PipeWriter { tx: host_tx },
        );
        (dut, host)
    }
}

impl SerialRead for PipeReader {
    type Error = PipeError;

    async fn read<'a>(&'a mut self, buf: &'a mut [u8]) -> Result<usize, Self::Error> {
        if self.pending.is_empty() {
            let chunk = self.rx.recv().await.ok_or(PipeError::Closed)?;
            self.pending.extend(chunk);
        }
        let n = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl SerialWrite for PipeWriter {
    type Error = PipeError;

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.tx.send(bytes.to_vec()).map_err(|_| PipeError::Closed)
    }
}

/// Device opener handing out one pipe endpoint, or failing when it has none.
pub struct MockOpener {
    device: Option<(PipeReader, PipeWriter)>,
}

#[allow(dead_code)]
impl MockOpener {
    pub fn with_device(reader: PipeReader, writer: PipeWriter) -> Self {
        Self {
            device: Some((reader, writer)),
        }
    }

    pub fn missing() -> Self {
        Self { device: None }
    }
}

impl SerialOpen for MockOpener {
    type Reader = PipeReader;
    type Writer = PipeWriter;
    type Error = PipeError;

    fn open(&mut self, _path: &str) -> Result<(PipeReader, PipeWriter), PipeError> {
        self.device.take().ok_or(PipeError::NotFound)
    }
}

#[allow(dead_code)]
/// Tick source based on `tokio::time::sleep` to drive the timer service in tests.
pub struct MockTickSource;

impl TickSource for MockTickSource {
    async fn delay_ms(&mut self, millis: u32) {
        sleep(Duration::from_millis(millis as u64)).await;
    }
}
