//! Link frame representation, wire encoding and XOR checksum.
//!
//! ```text
//! | sof | dest (4) | src (4) | type | sub | seq | len | fcs | payload (len) |
//! ```
//!
//! Addresses travel most significant byte first. The frame check sequence is
//! the XOR of the 13 header bytes that precede it followed by the XOR of the
//! `len` payload bytes.
use crate::core::{FRAME_HEADER_LEN, LINK_SOF, MAX_FRAME_LEN, MAX_PAYLOAD};
use crate::error::FrameError;

/// Position of the checksum byte inside the encoded header.
const FCS_OFFSET: usize = FRAME_HEADER_LEN - 1;
const LEN_OFFSET: usize = FRAME_HEADER_LEN - 2;

//==================================================================================FRAME_TYPE
/// Frame kind carried by the type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameType {
    /// Positive acknowledgment of a REQ.
    Ack,
    /// Negative acknowledgment (checksum failure on the peer side).
    Nack,
    /// Data frame requiring an acknowledgment.
    Req,
    /// Value not defined by the protocol; ignored by the link task.
    Other(u8),
}

impl From<u8> for FrameType {
    fn from(value: u8) -> Self {
        match value {
            0x01 => FrameType::Ack,
            0x02 => FrameType::Nack,
            0x03 => FrameType::Req,
            other => FrameType::Other(other),
        }
    }
}

impl From<FrameType> for u8 {
    fn from(kind: FrameType) -> Self {
        match kind {
            FrameType::Ack => 0x01,
            FrameType::Nack => 0x02,
            FrameType::Req => 0x03,
            FrameType::Other(other) => other,
        }
    }
}

/// Sub-type values. Informational only; the link task never branches on them.
pub mod sub_type {
    pub const NONE: u8 = 0x00;
    /// NACK emitted because the frame did not complete in time.
    pub const NACK_TIMEOUT: u8 = 0x01;
    /// NACK emitted because the checksum did not match.
    pub const NACK_ERROR: u8 = 0x02;
}

//==================================================================================FRAME
/// Fixed header fields of a link frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameHeader {
    pub dest: u32,
    pub src: u32,
    pub kind: FrameType,
    pub sub_type: u8,
    pub seq: u8,
    pub len: u8,
    pub fcs: u8,
}

impl FrameHeader {
    const fn empty() -> Self {
        Self {
            dest: 0,
            src: 0,
            kind: FrameType::Other(0),
            sub_type: sub_type::NONE,
            seq: 0,
            len: 0,
            fcs: 0,
        }
    }
}

/// A complete link frame with its payload stored inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub header: FrameHeader,
    pub data: [u8; MAX_PAYLOAD],
}

impl Default for Frame {
    fn default() -> Self {
        Self::empty()
    }
}

impl Frame {
    /// Frame with every field zeroed.
    pub const fn empty() -> Self {
        Self {
            header: FrameHeader::empty(),
            data: [0; MAX_PAYLOAD],
        }
    }

    /// Build a sealed frame carrying `payload`.
    pub fn new(
        kind: FrameType,
        dest: u32,
        src: u32,
        seq: u8,
        payload: &[u8],
    ) -> Result<Self, FrameError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(FrameError::PayloadTooLarge {
                len: payload.len(),
                max: MAX_PAYLOAD,
            });
        }
        let mut frame = Self::empty();
        frame.header = FrameHeader {
            dest,
            src,
            kind,
            sub_type: sub_type::NONE,
            seq,
            len: payload.len() as u8,
            fcs: 0,
        };
        frame.data[..payload.len()].copy_from_slice(payload);
        frame.seal();
        Ok(frame)
    }

    /// REQ frame for an outbound payload.
    pub fn request(dest: u32, src: u32, seq: u8, payload: &[u8]) -> Result<Self, FrameError> {
        Self::new(FrameType::Req, dest, src, seq, payload)
    }

    /// Empty reply addressed back to the sender of `received`, same sequence number.
    pub fn reply_to(received: &Frame, kind: FrameType, sub: u8) -> Self {
        let mut reply = Self::empty();
        reply.header = FrameHeader {
            dest: received.header.src,
            src: received.header.dest,
            kind,
            sub_type: sub,
            seq: received.header.seq,
            len: 0,
            fcs: 0,
        };
        reply.seal();
        reply
    }

    pub fn ack_for(received: &Frame) -> Self {
        Self::reply_to(received, FrameType::Ack, sub_type::NONE)
    }

    pub fn nack_for(received: &Frame) -> Self {
        Self::reply_to(received, FrameType::Nack, sub_type::NACK_ERROR)
    }

    /// Valid payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.payload_len()]
    }

    #[inline]
    pub fn payload_len(&self) -> usize {
        (self.header.len as usize).min(MAX_PAYLOAD)
    }

    /// Header plus payload size on the wire.
    #[inline]
    pub fn encoded_len(&self) -> usize {
        FRAME_HEADER_LEN + self.payload_len()
    }

    //==================================================================================CHECKSUM
    /// Compute the frame check sequence from the current header and payload.
    pub fn checksum(&self) -> u8 {
        let header = self.encode_header();
        checksum(&header[..FCS_OFFSET], self.payload())
    }

    /// Store the computed checksum in the header.
    pub fn seal(&mut self) {
        self.header.fcs = self.checksum();
    }

    /// Whether the stored checksum matches the frame content.
    pub fn is_valid(&self) -> bool {
        self.header.fcs == self.checksum()
    }

    //==================================================================================ENCODING
    /// Encode the 14 header bytes.
    pub fn encode_header(&self) -> [u8; FRAME_HEADER_LEN] {
        let h = &self.header;
        let dest = h.dest.to_be_bytes();
        let src = h.src.to_be_bytes();
        [
            LINK_SOF,
            dest[0],
            dest[1],
            dest[2],
            dest[3],
            src[0],
            src[1],
            src[2],
            src[3],
            h.kind.into(),
            h.sub_type,
            h.seq,
            h.len,
            h.fcs,
        ]
    }

    /// Encode header and payload into `out`, returning the encoded length.
    pub fn to_bytes(&self, out: &mut [u8; MAX_FRAME_LEN]) -> usize {
        let len = self.encoded_len();
        out[..FRAME_HEADER_LEN].copy_from_slice(&self.encode_header());
        out[FRAME_HEADER_LEN..len].copy_from_slice(self.payload());
        len
    }

    /// Decode an encoded frame. The checksum is kept as received, not verified.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < FRAME_HEADER_LEN {
            return Err(FrameError::Truncated { len: bytes.len() });
        }
        if bytes[0] != LINK_SOF {
            return Err(FrameError::MissingSof);
        }
        let len = bytes[LEN_OFFSET] as usize;
        if len > MAX_PAYLOAD {
            return Err(FrameError::PayloadTooLarge {
                len,
                max: MAX_PAYLOAD,
            });
        }
        if bytes.len() < FRAME_HEADER_LEN + len {
            return Err(FrameError::Truncated { len: bytes.len() });
        }

        let mut frame = Self::empty();
        frame.header = FrameHeader {
            dest: u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]),
            src: u32::from_be_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]),
            kind: FrameType::from(bytes[9]),
            sub_type: bytes[10],
            seq: bytes[11],
            len: len as u8,
            fcs: bytes[FCS_OFFSET],
        };
        frame.data[..len].copy_from_slice(&bytes[FRAME_HEADER_LEN..FRAME_HEADER_LEN + len]);
        Ok(frame)
    }
}

/// XOR of the header bytes (checksum byte excluded) then the payload bytes.
pub fn checksum(header_without_fcs: &[u8], payload: &[u8]) -> u8 {
    header_without_fcs
        .iter()
        .chain(payload.iter())
        .fold(0u8, |acc, byte| acc ^ byte)
}
