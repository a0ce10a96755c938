//! Shared identifiers and build-time constants.
//!
//! Everything that both the kernel and the link layer agree on lives here:
//! task and signal identifiers, the frame geometry, and the timing budget of
//! the stop-and-wait protocol.

/// Semantic event identifier carried by every kernel message.
pub type Signal = u8;

/// Index of a task mailbox inside a [`Kernel`](crate::kernel::Kernel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskId(pub u8);

impl TaskId {
    /// Mailbox slot used for this task.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

//==================================================================================FRAME_GEOMETRY

/// Start-of-frame sentinel.
pub const LINK_SOF: u8 = 0xEF;

/// Largest payload a link frame may carry.
///
/// The length byte can express up to 255; anything above this bound is
/// rejected by the parser before payload bytes are collected.
pub const MAX_PAYLOAD: usize = 128;

/// Encoded header size: sof, dest(4), src(4), type, sub-type, seq, len, fcs.
pub const FRAME_HEADER_LEN: usize = 14;

/// Largest encoded frame (header + maximum payload).
pub const MAX_FRAME_LEN: usize = FRAME_HEADER_LEN + MAX_PAYLOAD;

/// Largest payload copied into a kernel message.
///
/// Sized so that a complete encoded frame fits, since the parser hands whole
/// frames to the link task through its mailbox.
pub const MAX_MESSAGE_DATA: usize = MAX_FRAME_LEN;

//==================================================================================TIMING

/// Time allowed for the peer to acknowledge a REQ frame before retransmitting (ms).
pub const SEND_TIMEOUT_MS: u32 = 100;

/// Time allowed between the SOF byte and the last byte of a frame (ms).
pub const RECEIVE_TIMEOUT_MS: u32 = 50;

/// Retransmissions attempted after the first send when no ACK arrives.
pub const DEFAULT_MAX_RETRY: u8 = 3;

/// Size of the scratch buffer used by the receiver loop for each read.
pub const RX_CHUNK_LEN: usize = 64;
