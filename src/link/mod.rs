//! Point-to-point link layer over a byte stream.
//!
//! Frames are parsed byte by byte in the receive context ([`phy`]) and handed
//! to the link task ([`task`]) through its mailbox. The task runs a
//! stop-and-wait ARQ: one REQ frame in flight, retransmitted on NACK or on
//! ACK timeout until the retry budget is spent.
pub mod frame;
pub mod parser;
pub mod phy;
pub mod sig;
pub mod task;

pub use frame::{Frame, FrameHeader, FrameType};
pub use parser::{FrameParser, ParseEvent, ParserState};
pub use phy::LinkPhy;
pub use task::{LinkConfig, LinkState, LinkTask, SendState};
