//! Frame-level state machine of the link physical layer: stop-and-wait ARQ
//! on the send side, ACK/NACK generation and upward delivery on the receive
//! side.
//!
//! The task owns the single outbound frame, both sequence counters and the
//! retry counter. It only reacts to messages from its own mailbox, so none of
//! this state needs a lock.
use crate::core::{SEND_TIMEOUT_MS, DEFAULT_MAX_RETRY};
use crate::error::{KernelError, LinkError};
use crate::kernel::{Fsm, Message, StateHandler, TimerMode, Transition};
use crate::link::frame::{Frame, FrameType};
use crate::link::phy::LinkPhy;
use crate::link::sig;
use crate::transport::SerialWrite;

/// Top-level state of the link task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    /// Waiting for [`sig::INIT`].
    Init,
    /// Steady state; never left once entered.
    Handle,
}

/// Whether a REQ frame is waiting for its ACK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendState {
    Idle,
    Sending,
}

/// Runtime parameters of a link instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkConfig {
    /// Address written as source of outbound REQ frames.
    pub local_addr: u32,
    /// Address written as destination of outbound REQ frames.
    pub peer_addr: u32,
    /// Entropy used to pick the initial sequence numbers.
    pub seed: u32,
    /// Retransmissions attempted before a send is abandoned.
    pub max_retry: u8,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            local_addr: 0,
            peer_addr: 0,
            seed: 0,
            max_retry: DEFAULT_MAX_RETRY,
        }
    }
}

/// ARQ bookkeeping plus the handle on the shared physical resources.
pub struct LinkHandler<'a, W, const TASKS: usize, const DEPTH: usize, const SLOTS: usize>
where
    W: SerialWrite,
{
    phy: &'a LinkPhy<'a, W, TASKS, DEPTH, SLOTS>,
    config: LinkConfig,
    send_state: SendState,
    send_seq: u8,
    rev_seq: u8,
    retry: u8,
    max_retry: u8,
    send_frame: Frame,
}

impl<'a, W, const TASKS: usize, const DEPTH: usize, const SLOTS: usize>
    LinkHandler<'a, W, TASKS, DEPTH, SLOTS>
where
    W: SerialWrite,
{
    fn set_send_state(&mut self, state: SendState) {
        #[cfg(feature = "defmt")]
        defmt::debug!("[PHY] send state -> {}", state);
        self.send_state = state;
    }

    fn init(&mut self) -> Result<(), LinkError<W::Error>> {
        self.set_send_state(SendState::Idle);
        self.retry = 0;
        self.send_seq = mix_seed(self.config.seed) as u8;
        self.rev_seq = (mix_seed(self.config.seed) >> 8) as u8;
        self.max_retry = self.config.max_retry;
        self.phy.reset_parser();
        self.phy
            .kernel()
            .post_pure(self.phy.owner(), sig::PHY_STARTED)?;
        Ok(())
    }

    /// Write the in-flight frame and (re)arm its ACK timeout.
    fn transmit(&mut self) -> Result<(), LinkError<W::Error>> {
        if self.send_state != SendState::Sending {
            return Ok(());
        }
        self.phy.write_frame(&self.send_frame)?;
        self.phy.timers().set(
            self.phy.task(),
            sig::SEND_TO,
            SEND_TIMEOUT_MS,
            TimerMode::OneShot,
        )?;
        Ok(())
    }

    /// Retransmit, or give up once every retry has been spent.
    fn retry_or_abandon(&mut self) -> Result<(), LinkError<W::Error>> {
        if self.retry >= self.max_retry {
            self.abandon()?;
        } else {
            #[cfg(feature = "defmt")]
            defmt::debug!("Retransmit seq {} ({}/{})", self.send_seq, self.retry + 1, self.max_retry);
            self.transmit()?;
        }
        self.retry = self.retry.saturating_add(1);
        Ok(())
    }

    fn abandon(&mut self) -> Result<(), KernelError> {
        #[cfg(feature = "defmt")]
        defmt::warn!("Send seq {} abandoned after {} retries", self.send_seq, self.retry);
        self.set_send_state(SendState::Idle);
        self.phy.kernel().post_pure(self.phy.owner(), sig::SEND_ERR)
    }

    fn on_send_request(&mut self, msg: &Message) -> Result<(), LinkError<W::Error>> {
        if self.send_state != SendState::Idle {
            #[cfg(feature = "defmt")]
            defmt::error!("Send requested while seq {} in flight", self.send_seq);
            return Err(LinkError::ConcurrentSend);
        }
        let seq = self.send_seq.wrapping_add(1);
        self.send_frame = Frame::request(self.config.peer_addr, self.config.local_addr, seq, msg.data())?;
        self.send_seq = seq;
        self.retry = 0;
        self.set_send_state(SendState::Sending);
        self.transmit()
    }

    fn on_send_timeout(&mut self) -> Result<(), LinkError<W::Error>> {
        // A timeout already queued when the ACK arrived.
        if self.send_state != SendState::Sending {
            return Ok(());
        }
        // Fired timers leave the table; an armed one means this expiry was
        // queued before a NACK retransmitted and re-armed the timeout.
        if self.phy.timers().is_armed(self.phy.task(), sig::SEND_TO) {
            #[cfg(feature = "defmt")]
            defmt::trace!("Stale send timeout for seq {} ignored", self.send_seq);
            return Ok(());
        }
        self.retry_or_abandon()
    }

    fn on_frame(&mut self, msg: &Message) -> Result<(), LinkError<W::Error>> {
        let Ok(frame) = Frame::from_bytes(msg.data()) else {
            #[cfg(feature = "defmt")]
            defmt::warn!("Malformed frame hand-off ignored");
            return Ok(());
        };

        match frame.header.kind {
            FrameType::Req => {
                self.rev_seq = frame.header.seq;
                self.phy.write_frame(&Frame::ack_for(&frame))?;
                self.phy.kernel().post_common(
                    self.phy.owner(),
                    sig::FRAME_DELIVERED,
                    frame.payload(),
                )?;
            }

            FrameType::Ack => {
                if self.is_outstanding(frame.header.seq) {
                    self.phy.timers().cancel(self.phy.task(), sig::SEND_TO);
                    self.set_send_state(SendState::Idle);
                    self.phy
                        .kernel()
                        .post_pure(self.phy.owner(), sig::SEND_DONE)?;
                }
            }

            FrameType::Nack => {
                if self.is_outstanding(frame.header.seq) {
                    self.phy.timers().cancel(self.phy.task(), sig::SEND_TO);
                    self.retry_or_abandon()?;
                }
            }

            FrameType::Other(_kind) => {
                #[cfg(feature = "defmt")]
                defmt::trace!("Unknown frame type {} ignored", _kind);
            }
        }
        Ok(())
    }

    fn on_checksum_error(&mut self, msg: &Message) -> Result<(), LinkError<W::Error>> {
        if let Ok(frame) = Frame::from_bytes(msg.data()) {
            self.phy.write_frame(&Frame::nack_for(&frame))?;
        }
        Ok(())
    }

    fn is_outstanding(&self, seq: u8) -> bool {
        self.send_state == SendState::Sending && self.send_seq == seq
    }
}

impl<'a, W, const TASKS: usize, const DEPTH: usize, const SLOTS: usize> StateHandler
    for LinkHandler<'a, W, TASKS, DEPTH, SLOTS>
where
    W: SerialWrite,
{
    type State = LinkState;
    type Error = LinkError<W::Error>;

    fn handle(
        &mut self,
        state: LinkState,
        msg: &Message,
    ) -> Result<Transition<LinkState>, Self::Error> {
        match state {
            LinkState::Init => {
                if msg.signal() != sig::INIT {
                    return Ok(Transition::Stay);
                }
                self.init()?;
                Ok(Transition::To(LinkState::Handle))
            }
            LinkState::Handle => {
                match msg.signal() {
                    sig::SEND_REQ => self.on_send_request(msg)?,
                    sig::SEND_TO => self.on_send_timeout()?,
                    sig::FRAME_REV => self.on_frame(msg)?,
                    sig::FRAME_REV_CS_ERR => self.on_checksum_error(msg)?,
                    sig::FRAME_REV_TO => {
                        #[cfg(feature = "defmt")]
                        defmt::debug!("Frame receive timeout, parser reset");
                        self.phy.reset_parser();
                    }
                    _ => {}
                }
                Ok(Transition::Stay)
            }
        }
    }
}

/// Link task: owns the ARQ state machine and drains the link mailbox.
pub struct LinkTask<'a, W, const TASKS: usize, const DEPTH: usize, const SLOTS: usize>
where
    W: SerialWrite,
{
    fsm: Fsm<LinkHandler<'a, W, TASKS, DEPTH, SLOTS>>,
}

impl<'a, W, const TASKS: usize, const DEPTH: usize, const SLOTS: usize>
    LinkTask<'a, W, TASKS, DEPTH, SLOTS>
where
    W: SerialWrite,
{
    /// Build the task in its [`LinkState::Init`] state.
    pub fn new(phy: &'a LinkPhy<'a, W, TASKS, DEPTH, SLOTS>, config: LinkConfig) -> Self {
        let handler = LinkHandler {
            phy,
            config,
            send_state: SendState::Idle,
            send_seq: 0,
            rev_seq: 0,
            retry: 0,
            max_retry: config.max_retry,
            send_frame: Frame::empty(),
        };
        Self {
            fsm: Fsm::new(LinkState::Init, handler),
        }
    }

    /// Queue the initialisation signal on the link mailbox.
    pub fn start(&self) -> Result<(), KernelError> {
        let phy = self.fsm.handler().phy;
        phy.kernel().post_pure(phy.task(), sig::INIT)
    }

    /// Handle one message.
    pub fn dispatch(&mut self, msg: &Message) -> Result<(), LinkError<W::Error>> {
        self.fsm.dispatch(msg)
    }

    /// Handle every message already queued, returning how many were processed.
    pub fn process_pending(&mut self) -> Result<usize, LinkError<W::Error>> {
        let phy = self.fsm.handler().phy;
        let mut processed = 0;
        while let Some(msg) = phy.kernel().try_receive(phy.task())? {
            self.dispatch(&msg)?;
            processed += 1;
        }
        Ok(processed)
    }

    /// Receive and handle messages forever.
    ///
    /// Only returns on a fatal condition; the caller is expected to halt or
    /// reset the system with the returned error.
    pub async fn run(&mut self) -> Result<(), LinkError<W::Error>> {
        let phy = self.fsm.handler().phy;
        loop {
            let msg = phy.kernel().receive(phy.task()).await?;
            if let Err(err) = self.dispatch(&msg) {
                #[cfg(feature = "defmt")]
                defmt::error!("LK_PHY fatal {:#04X}", err.fatal_code());
                return Err(err);
            }
        }
    }

    //==================================================================================ACCESSORS
    pub fn state(&self) -> LinkState {
        self.fsm.state()
    }

    pub fn send_state(&self) -> SendState {
        self.fsm.handler().send_state
    }

    /// Sequence number of the last REQ frame built.
    pub fn send_seq(&self) -> u8 {
        self.fsm.handler().send_seq
    }

    /// Sequence number of the last REQ frame received.
    pub fn receive_seq(&self) -> u8 {
        self.fsm.handler().rev_seq
    }

    pub fn retry_count(&self) -> u8 {
        self.fsm.handler().retry
    }

    pub fn max_retry(&self) -> u8 {
        self.fsm.handler().max_retry
    }

    /// Change the retry ceiling; applies to the in-flight frame as well and
    /// survives initialisation.
    pub fn set_max_retry(&mut self, max_retry: u8) {
        let handler = self.fsm.handler_mut();
        handler.config.max_retry = max_retry;
        handler.max_retry = max_retry;
    }

    /// Worst-case time (ms) before a send resolves with success or failure.
    pub fn send_budget_ms(&self) -> u32 {
        (u32::from(self.max_retry()) + 1) * SEND_TIMEOUT_MS
    }

    /// Frame currently (or last) in flight.
    pub fn send_frame(&self) -> &Frame {
        &self.fsm.handler().send_frame
    }
}

/// Scramble the configured seed so nearby seeds give unrelated sequence numbers.
fn mix_seed(seed: u32) -> u32 {
    let mut x = seed ^ 0x9E37_79B9;
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    x
}
