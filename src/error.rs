//! Error definitions shared across library modules.
//! Each type models a specific failure scenario (mailbox delivery, timer
//! registration, link protocol invariants, transport access).
use crate::core::TaskId;
use thiserror_no_std::Error;

//==================================================================================KERNEL_ERROR
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Failures raised by the message kernel while posting or receiving.
pub enum KernelError {
    /// The task identifier does not map to a mailbox.
    #[error("Unknown task {task:?}")]
    UnknownTask { task: TaskId },
    /// The destination mailbox has no free slot.
    #[error("Mailbox of task {task:?} is full")]
    MailboxFull { task: TaskId },
    /// The payload does not fit into a message copy.
    #[error("Message payload too large: {len} > {max}")]
    PayloadTooLarge { len: usize, max: usize },
    /// Forwarding was requested for a message without interface routing.
    #[error("Message carries no interface route")]
    MissingRoute,
}

//==================================================================================TIMER_ERROR
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Failures raised by the timer table.
pub enum TimerError {
    /// Every timer slot is armed.
    #[error("Timer table full ({capacity} slots)")]
    TableFull { capacity: usize },
}

//==================================================================================FRAME_ERROR
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Failures while building or decoding a link frame.
pub enum FrameError {
    /// Payload exceeds the frame capacity.
    #[error("Payload too large: {len} > {max}")]
    PayloadTooLarge { len: usize, max: usize },
    /// Buffer shorter than the header or than the advertised payload.
    #[error("Truncated frame: {len} bytes")]
    Truncated { len: usize },
    /// Encoded frame does not start with the SOF sentinel.
    #[error("Missing start-of-frame marker")]
    MissingSof,
}

//==================================================================================RX_ERROR
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Failures raised while feeding received bytes to the parser.
pub enum RxError {
    /// The parsed frame could not be handed to the link task.
    #[error(transparent)]
    Kernel(#[from] KernelError),
    /// The reassembly timeout could not be armed.
    #[error(transparent)]
    Timer(#[from] TimerError),
}

//==================================================================================LINK_ERROR
#[derive(Error, Debug)]
/// Invariant violations inside the link physical layer.
///
/// Every variant is fatal: the link task stops and returns the error so the
/// application can halt or reboot.
pub enum LinkError<E: core::fmt::Debug> {
    /// Outbound frame could not be built (payload larger than a frame).
    #[error("Outbound frame error: {0}")]
    Frame(#[from] FrameError),
    /// A send was requested while a frame is still in flight.
    #[error("Send requested while a frame is in flight")]
    ConcurrentSend,
    /// The transport refused a write.
    #[error("Transport write error: {0:?}")]
    Write(E),
    /// A message could not be delivered.
    #[error(transparent)]
    Kernel(#[from] KernelError),
    /// A timeout could not be armed.
    #[error(transparent)]
    Timer(#[from] TimerError),
}

impl<E: core::fmt::Debug> LinkError<E> {
    /// Numeric code reported to the fatal handler.
    pub fn fatal_code(&self) -> u8 {
        match self {
            LinkError::Frame(_) => 0x01,
            LinkError::ConcurrentSend => 0x02,
            LinkError::Kernel(_) => 0x03,
            LinkError::Timer(_) => 0x04,
            LinkError::Write(_) => 0x05,
        }
    }
}

//==================================================================================TRANSPORT_ERROR
#[derive(Error, Debug)]
/// Errors surfaced by the serial transport adapter.
pub enum TransportError<E: core::fmt::Debug> {
    /// The serial device could not be opened. The link keeps running offline.
    #[error("Transport open error: {0:?}")]
    Open(E),
    /// The receiver loop lost its device.
    #[error("Transport read error: {0:?}")]
    Read(E),
    /// The offline notification could not be posted to the owner task.
    #[error(transparent)]
    Kernel(#[from] KernelError),
    /// Received bytes could not be processed.
    #[error(transparent)]
    Rx(#[from] RxError),
}
