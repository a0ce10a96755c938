//! Per-task bounded FIFO mailboxes.
//!
//! `Kernel<TASKS, DEPTH>` owns one [`embassy_sync::channel::Channel`] per
//! task. Posting never blocks: a full mailbox is reported as
//! [`KernelError::MailboxFull`], which callers treat as fatal. Receiving
//! suspends the calling task until a message is available.
use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex,
    channel::{Channel, TrySendError},
};

use crate::core::{Signal, TaskId};
use crate::error::KernelError;
use crate::kernel::message::Message;

/// Mailbox set for `TASKS` tasks, each holding at most `DEPTH` messages.
pub struct Kernel<const TASKS: usize, const DEPTH: usize> {
    mailboxes: [Channel<CriticalSectionRawMutex, Message, DEPTH>; TASKS],
}

impl<const TASKS: usize, const DEPTH: usize> Default for Kernel<TASKS, DEPTH> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const TASKS: usize, const DEPTH: usize> Kernel<TASKS, DEPTH> {
    /// Create a kernel with every mailbox empty.
    pub const fn new() -> Self {
        Self {
            mailboxes: [const { Channel::new() }; TASKS],
        }
    }

    fn mailbox(
        &self,
        task: TaskId,
    ) -> Result<&Channel<CriticalSectionRawMutex, Message, DEPTH>, KernelError> {
        self.mailboxes
            .get(task.index())
            .ok_or(KernelError::UnknownTask { task })
    }

    //==================================================================================POST
    /// Enqueue an already-built message.
    pub fn post(&self, dest: TaskId, msg: Message) -> Result<(), KernelError> {
        match self.mailbox(dest)?.try_send(msg) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_dropped)) => {
                #[cfg(feature = "defmt")]
                defmt::error!("Mailbox full: task {}, sig {}", dest.0, _dropped.signal());
                Err(KernelError::MailboxFull { task: dest })
            }
        }
    }

    /// Enqueue a signal-only message.
    pub fn post_pure(&self, dest: TaskId, signal: Signal) -> Result<(), KernelError> {
        self.post(dest, Message::pure(signal))
    }

    /// Enqueue a message carrying a copy of `data`. The caller keeps its buffer.
    pub fn post_common(&self, dest: TaskId, signal: Signal, data: &[u8]) -> Result<(), KernelError> {
        self.post(dest, Message::common(signal, data)?)
    }

    /// Enqueue `msg` under `signal` without copying its payload.
    ///
    /// The payload reference count grows by one until the receiver drops it.
    pub fn post_ref(&self, dest: TaskId, signal: Signal, msg: &Message) -> Result<(), KernelError> {
        self.post(dest, msg.share(signal))
    }

    /// Relay a routed message to its final task.
    ///
    /// The relayed copy takes the route's signal, reports the route's source
    /// task as its sender and shares the payload with `msg`.
    pub fn forward(&self, msg: &Message) -> Result<(), KernelError> {
        let route = msg.route().ok_or(KernelError::MissingRoute)?;
        let relayed = msg.share(route.signal).with_src(route.src_task);
        self.post(route.dest_task, relayed)
    }

    //==================================================================================RECEIVE
    /// Wait for the next message addressed to `task`.
    pub async fn receive(&self, task: TaskId) -> Result<Message, KernelError> {
        Ok(self.mailbox(task)?.receive().await)
    }

    /// Pop the next message for `task` if one is queued.
    pub fn try_receive(&self, task: TaskId) -> Result<Option<Message>, KernelError> {
        Ok(self.mailbox(task)?.try_receive().ok())
    }

    /// Number of messages waiting for `task`.
    pub fn pending(&self, task: TaskId) -> Result<usize, KernelError> {
        Ok(self.mailbox(task)?.len())
    }

    pub const fn task_count(&self) -> usize {
        TASKS
    }
}
