//! Byte-level frame reassembler.
//!
//! The parser consumes exactly one byte per call and reports what that byte
//! did. It owns the scratch receive frame; completed frames are returned by
//! value so the caller can hand them to the link task.
//!
//! It has no notion of time or mailboxes: arming the reassembly timeout and
//! posting the results is the job of [`LinkPhy`](crate::link::phy::LinkPhy).
use crate::core::{LINK_SOF, MAX_PAYLOAD};
use crate::link::frame::{Frame, FrameType};

/// Field the parser expects next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParserState {
    AwaitingSof,
    DestAddr,
    SrcAddr,
    Type,
    SubType,
    SeqNum,
    Len,
    Data,
    Fcs,
}

/// Effect of a single byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseEvent {
    /// Byte received outside a frame and discarded.
    Ignored,
    /// SOF matched; a new frame starts.
    Started,
    /// Byte stored into the frame being assembled.
    Consumed,
    /// Advertised length exceeds the payload capacity; frame discarded.
    Dropped,
    /// Frame complete and checksum valid.
    Complete(Frame),
    /// Frame complete but checksum mismatch.
    ChecksumError(Frame),
}

impl ParseEvent {
    /// Whether the byte belonged to a frame.
    pub fn is_handled(&self) -> bool {
        !matches!(self, ParseEvent::Ignored)
    }
}

/// Reassembly state plus the scratch receive frame.
#[derive(Debug, Clone)]
pub struct FrameParser {
    state: ParserState,
    frame: Frame,
    /// Address byte position (counts down from 3) or payload write position.
    index: usize,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    pub const fn new() -> Self {
        Self {
            state: ParserState::AwaitingSof,
            frame: Frame::empty(),
            index: 0,
        }
    }

    #[inline]
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Abandon any partial frame and wait for the next SOF.
    pub fn reset(&mut self) {
        self.state = ParserState::AwaitingSof;
        self.index = 0;
    }

    /// Feed one byte.
    pub fn push(&mut self, byte: u8) -> ParseEvent {
        match self.state {
            ParserState::AwaitingSof => {
                if byte != LINK_SOF {
                    return ParseEvent::Ignored;
                }
                self.frame = Frame::empty();
                self.index = 3;
                self.state = ParserState::DestAddr;
                ParseEvent::Started
            }

            ParserState::DestAddr => {
                Self::store_address_byte(&mut self.frame.header.dest, self.index, byte);
                if self.index == 0 {
                    self.index = 3;
                    self.state = ParserState::SrcAddr;
                } else {
                    self.index -= 1;
                }
                ParseEvent::Consumed
            }

            ParserState::SrcAddr => {
                Self::store_address_byte(&mut self.frame.header.src, self.index, byte);
                if self.index == 0 {
                    self.state = ParserState::Type;
                } else {
                    self.index -= 1;
                }
                ParseEvent::Consumed
            }

            ParserState::Type => {
                self.frame.header.kind = FrameType::from(byte);
                self.state = ParserState::SubType;
                ParseEvent::Consumed
            }

            ParserState::SubType => {
                self.frame.header.sub_type = byte;
                self.state = ParserState::SeqNum;
                ParseEvent::Consumed
            }

            ParserState::SeqNum => {
                self.frame.header.seq = byte;
                self.state = ParserState::Len;
                ParseEvent::Consumed
            }

            ParserState::Len => {
                if byte as usize > MAX_PAYLOAD {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("Frame length {} exceeds {}, dropping", byte, MAX_PAYLOAD);
                    self.reset();
                    return ParseEvent::Dropped;
                }
                self.frame.header.len = byte;
                self.state = ParserState::Fcs;
                ParseEvent::Consumed
            }

            ParserState::Fcs => {
                self.frame.header.fcs = byte;
                if self.frame.header.len > 0 {
                    self.index = 0;
                    self.state = ParserState::Data;
                    ParseEvent::Consumed
                } else {
                    self.finish()
                }
            }

            ParserState::Data => {
                self.frame.data[self.index] = byte;
                self.index += 1;
                if self.index == self.frame.payload_len() {
                    self.finish()
                } else {
                    ParseEvent::Consumed
                }
            }
        }
    }

    /// Addresses arrive most significant byte first: `index` 3 is the top byte.
    fn store_address_byte(address: &mut u32, index: usize, byte: u8) {
        let shift = 8 * index as u32;
        *address = (*address & !(0xFFu32 << shift)) | (u32::from(byte) << shift);
    }

    fn finish(&mut self) -> ParseEvent {
        let frame = self.frame;
        self.reset();
        if frame.is_valid() {
            ParseEvent::Complete(frame)
        } else {
            #[cfg(feature = "defmt")]
            defmt::debug!("Checksum mismatch on seq {}", frame.header.seq);
            ParseEvent::ChecksumError(frame)
        }
    }
}
