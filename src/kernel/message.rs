//! Kernel message: a signal, an optional shared payload and optional
//! interface-routing metadata.
//!
//! Payloads are reference counted. Posting the same message to several
//! mailboxes shares one buffer; the buffer is released when the last holder
//! drops its message.
use alloc::sync::Arc;

use crate::core::{Signal, TaskId, MAX_MESSAGE_DATA};
use crate::error::KernelError;

/// Routing information used by interface tasks to relay a message to a task
/// living behind another interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterfaceRoute {
    /// Task that originally produced the message.
    pub src_task: TaskId,
    /// Task the message must finally reach.
    pub dest_task: TaskId,
    /// Signal the message carries once delivered to `dest_task`.
    pub signal: Signal,
    /// Interface descriptor (serial, radio, ...), application defined.
    pub kind: u8,
}

/// Unit of delivery between tasks.
#[derive(Debug, Clone)]
pub struct Message {
    signal: Signal,
    src: Option<TaskId>,
    data: Option<Arc<[u8]>>,
    route: Option<InterfaceRoute>,
}

impl Message {
    /// Signal-only message.
    pub const fn pure(signal: Signal) -> Self {
        Self {
            signal,
            src: None,
            data: None,
            route: None,
        }
    }

    /// Message owning a copy of `data`.
    pub fn common(signal: Signal, data: &[u8]) -> Result<Self, KernelError> {
        if data.len() > MAX_MESSAGE_DATA {
            return Err(KernelError::PayloadTooLarge {
                len: data.len(),
                max: MAX_MESSAGE_DATA,
            });
        }
        Ok(Self {
            signal,
            src: None,
            data: Some(Arc::from(data)),
            route: None,
        })
    }

    /// New message sharing this message's payload under another signal.
    pub fn share(&self, signal: Signal) -> Self {
        Self {
            signal,
            src: self.src,
            data: self.data.clone(),
            route: self.route,
        }
    }

    pub fn with_src(mut self, src: TaskId) -> Self {
        self.src = Some(src);
        self
    }

    pub fn with_route(mut self, route: InterfaceRoute) -> Self {
        self.route = Some(route);
        self
    }

    #[inline]
    pub fn signal(&self) -> Signal {
        self.signal
    }

    #[inline]
    pub fn set_signal(&mut self, signal: Signal) {
        self.signal = signal;
    }

    #[inline]
    pub fn src(&self) -> Option<TaskId> {
        self.src
    }

    #[inline]
    pub fn route(&self) -> Option<InterfaceRoute> {
        self.route
    }

    /// Payload bytes; empty for pure messages.
    pub fn data(&self) -> &[u8] {
        self.data.as_deref().unwrap_or(&[])
    }

    #[inline]
    pub fn data_len(&self) -> usize {
        self.data().len()
    }

    /// Copy the payload into `out`, returning the number of bytes copied.
    pub fn copy_data(&self, out: &mut [u8]) -> usize {
        let data = self.data();
        let len = data.len().min(out.len());
        out[..len].copy_from_slice(&data[..len]);
        len
    }

    /// Whether the message carries a payload.
    #[inline]
    pub fn is_pure(&self) -> bool {
        self.data.is_none()
    }

    /// Number of live holders of the payload. Pure messages report one.
    pub fn ref_count(&self) -> usize {
        self.data.as_ref().map_or(1, Arc::strong_count)
    }
}
