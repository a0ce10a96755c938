//! Shared half of the link physical layer.
//!
//! [`LinkPhy`] is touched from two contexts at once:
//!
//! * the receive context (reader loop or UART interrupt) pushes raw bytes
//!   through [`LinkPhy::receive_byte`];
//! * the link task ([`LinkTask`](crate::link::task::LinkTask)) writes frames
//!   and resets the parser on reassembly timeout.
//!
//! The parser and the write path each sit behind their own critical-section
//! mutex. Everything else goes through the kernel mailboxes and the timer
//! service.
use core::cell::RefCell;

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};

use crate::core::{TaskId, RECEIVE_TIMEOUT_MS};
use crate::error::{KernelError, LinkError, RxError, TransportError};
use crate::kernel::{Kernel, SharedRing, TimerMode, TimerService};
use crate::link::frame::Frame;
use crate::link::parser::{FrameParser, ParseEvent, ParserState};
use crate::link::sig;
use crate::transport::{SerialOpen, SerialWrite};

/// Link physical layer resources shared between the receive context and the
/// link task.
pub struct LinkPhy<'a, W, const TASKS: usize, const DEPTH: usize, const SLOTS: usize>
where
    W: SerialWrite,
{
    kernel: &'a Kernel<TASKS, DEPTH>,
    timers: &'a TimerService<SLOTS>,
    /// Mailbox of the link task.
    task: TaskId,
    /// Upper layer receiving deliveries and send results.
    owner: TaskId,
    parser: Mutex<CriticalSectionRawMutex, RefCell<FrameParser>>,
    writer: Mutex<CriticalSectionRawMutex, RefCell<Option<W>>>,
}

impl<'a, W, const TASKS: usize, const DEPTH: usize, const SLOTS: usize>
    LinkPhy<'a, W, TASKS, DEPTH, SLOTS>
where
    W: SerialWrite,
{
    /// Create an offline link. Attach a writer or open a transport to go online.
    pub const fn new(
        kernel: &'a Kernel<TASKS, DEPTH>,
        timers: &'a TimerService<SLOTS>,
        task: TaskId,
        owner: TaskId,
    ) -> Self {
        Self {
            kernel,
            timers,
            task,
            owner,
            parser: Mutex::new(RefCell::new(FrameParser::new())),
            writer: Mutex::new(RefCell::new(None)),
        }
    }

    #[inline]
    pub fn task(&self) -> TaskId {
        self.task
    }

    #[inline]
    pub fn owner(&self) -> TaskId {
        self.owner
    }

    #[inline]
    pub fn kernel(&self) -> &'a Kernel<TASKS, DEPTH> {
        self.kernel
    }

    #[inline]
    pub fn timers(&self) -> &'a TimerService<SLOTS> {
        self.timers
    }

    //==================================================================================TRANSPORT
    /// Install the transmit half of the serial device.
    pub fn attach(&self, writer: W) {
        self.writer.lock(|w| *w.borrow_mut() = Some(writer));
    }

    /// Remove the transmit half; later writes are skipped.
    pub fn detach(&self) -> Option<W> {
        self.writer.lock(|w| w.borrow_mut().take())
    }

    pub fn is_online(&self) -> bool {
        self.writer.lock(|w| w.borrow().is_some())
    }

    /// Open the serial device at `path`.
    ///
    /// On success the writer is attached and the reader is returned for the
    /// receiver loop. On failure the owner task receives
    /// [`sig::TRANSPORT_OFFLINE`] and the link keeps running without a device.
    pub fn open_transport<O>(
        &self,
        opener: &mut O,
        path: &str,
    ) -> Result<O::Reader, TransportError<O::Error>>
    where
        O: SerialOpen<Writer = W>,
    {
        match opener.open(path) {
            Ok((reader, writer)) => {
                #[cfg(feature = "defmt")]
                defmt::info!("Opened {} success", path);
                self.attach(writer);
                Ok(reader)
            }
            Err(err) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Cannot open {}, link offline", path);
                self.kernel.post_pure(self.owner, sig::TRANSPORT_OFFLINE)?;
                Err(TransportError::Open(err))
            }
        }
    }

    /// Write header then payload as one unit.
    ///
    /// Without an attached writer the frame is silently discarded. The write
    /// runs inside a critical section, so on a microcontroller `write_all`
    /// should only fill a TX queue and return.
    pub fn write_frame(&self, frame: &Frame) -> Result<(), LinkError<W::Error>> {
        self.writer.lock(|w| -> Result<(), LinkError<W::Error>> {
            let mut w = w.borrow_mut();
            let Some(writer) = w.as_mut() else {
                #[cfg(feature = "defmt")]
                defmt::trace!("Link offline, frame seq {} not written", frame.header.seq);
                return Ok(());
            };
            writer
                .write_all(&frame.encode_header())
                .map_err(LinkError::Write)?;
            if frame.payload_len() > 0 {
                writer.write_all(frame.payload()).map_err(LinkError::Write)?;
            }
            Ok(())
        })
    }

    //==================================================================================RECEIVE
    /// Feed one received byte to the parser.
    ///
    /// Arms the reassembly timeout on SOF, cancels it when the frame ends and
    /// posts complete frames to the link task. Returns whether the byte
    /// belonged to a frame.
    pub fn receive_byte(&self, byte: u8) -> Result<bool, RxError> {
        let event = self.parser.lock(|parser| parser.borrow_mut().push(byte));
        let handled = event.is_handled();

        match event {
            ParseEvent::Ignored | ParseEvent::Consumed => {}
            ParseEvent::Started => {
                self.timers.set(
                    self.task,
                    sig::FRAME_REV_TO,
                    RECEIVE_TIMEOUT_MS,
                    TimerMode::OneShot,
                )?;
            }
            ParseEvent::Dropped => {
                self.timers.cancel(self.task, sig::FRAME_REV_TO);
            }
            ParseEvent::Complete(frame) => {
                self.timers.cancel(self.task, sig::FRAME_REV_TO);
                self.post_frame(sig::FRAME_REV, &frame)?;
            }
            ParseEvent::ChecksumError(frame) => {
                self.timers.cancel(self.task, sig::FRAME_REV_TO);
                #[cfg(feature = "defmt")]
                defmt::warn!("Checksum incorrect, seq {}", frame.header.seq);
                self.post_frame(sig::FRAME_REV_CS_ERR, &frame)?;
            }
        }

        Ok(handled)
    }

    /// Feed a chunk of received bytes.
    pub fn receive_bytes(&self, bytes: &[u8]) -> Result<(), RxError> {
        for &byte in bytes {
            self.receive_byte(byte)?;
        }
        Ok(())
    }

    /// Drain bytes queued by an interrupt handler into the parser.
    pub fn poll_ring<const N: usize>(&self, ring: &SharedRing<N>) -> Result<usize, RxError> {
        let mut drained = 0;
        while let Some(byte) = ring.get() {
            self.receive_byte(byte)?;
            drained += 1;
        }
        Ok(drained)
    }

    /// Drop any partially received frame.
    pub fn reset_parser(&self) {
        self.parser.lock(|parser| parser.borrow_mut().reset());
    }

    pub fn parser_state(&self) -> ParserState {
        self.parser.lock(|parser| parser.borrow().state())
    }

    /// Ask the link task to send `payload` to the peer.
    pub fn request_send(&self, payload: &[u8]) -> Result<(), KernelError> {
        self.kernel.post_common(self.task, sig::SEND_REQ, payload)
    }

    fn post_frame(&self, signal: u8, frame: &Frame) -> Result<(), KernelError> {
        let mut encoded = [0u8; crate::core::MAX_FRAME_LEN];
        let len = frame.to_bytes(&mut encoded);
        self.kernel.post_common(self.task, signal, &encoded[..len])
    }
}
