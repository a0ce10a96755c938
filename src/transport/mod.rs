//! Byte transport underneath the link layer: serial device traits, the tick
//! source pacing the timer service and the receiver loop feeding the parser.
//!
//! ## Timing
//!
//! The link layer works with three delays:
//!
//! - [`SEND_TIMEOUT_MS`](crate::core::SEND_TIMEOUT_MS): ACK wait per
//!   transmission of a REQ frame.
//! - [`RECEIVE_TIMEOUT_MS`](crate::core::RECEIVE_TIMEOUT_MS): longest gap
//!   tolerated while reassembling one frame.
//! - The timer service tick period chosen by the application. Timeouts are
//!   only as precise as this period; 1 to 10 ms is typical.
pub mod receiver;
pub mod traits;

pub use receiver::run_receiver;
pub use traits::serial::{SerialOpen, SerialRead, SerialWrite};
pub use traits::tick_source::{EmbassyTickSource, TickSource};
