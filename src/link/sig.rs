//! Signal identifiers exchanged with the link task.

//==================================================================================LINK_TASK
/// One-shot initialisation; moves the link task into its steady state.
pub const INIT: u8 = 0x01;
/// Request to send the message payload in a REQ frame.
pub const SEND_REQ: u8 = 0x02;
/// ACK wait elapsed for the in-flight frame.
pub const SEND_TO: u8 = 0x03;
/// Valid frame reassembled by the parser (payload: encoded frame).
pub const FRAME_REV: u8 = 0x04;
/// Frame reassembled with a checksum mismatch (payload: encoded frame).
pub const FRAME_REV_CS_ERR: u8 = 0x05;
/// Frame reassembly took too long.
pub const FRAME_REV_TO: u8 = 0x06;

//==================================================================================OWNER_TASK
/// Link task finished its initialisation.
pub const PHY_STARTED: u8 = 0x20;
/// Payload of a REQ frame received from the peer.
pub const FRAME_DELIVERED: u8 = 0x21;
/// The in-flight frame was acknowledged.
pub const SEND_DONE: u8 = 0x22;
/// The in-flight frame was abandoned after the last retry.
pub const SEND_ERR: u8 = 0x23;
/// The serial device could not be opened; the link runs offline.
pub const TRANSPORT_OFFLINE: u8 = 0x24;
