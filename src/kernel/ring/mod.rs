//! Fixed-capacity circular byte queue used to hand received bytes from an
//! interrupt (or reader thread) to the parser context.
//!
//! The queue never grows. When it is full, `put` rejects the incoming byte and
//! leaves the stored bytes untouched (drop-newest policy).
use core::cell::RefCell;

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use thiserror_no_std::Error;

/// Returned by `put` when the queue has no room left; carries the rejected byte.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Ring buffer full, byte {0:#04X} dropped")]
pub struct RingFull(pub u8);

/// Single-owner circular queue. Callers serialize access themselves.
#[derive(Debug, Clone, Copy)]
pub struct RingBuffer<const N: usize> {
    buffer: [u8; N],
    head: usize,
    tail: usize,
    len: usize,
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RingBuffer<N> {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self {
            buffer: [0; N],
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    /// Append a byte at the tail.
    pub fn put(&mut self, byte: u8) -> Result<(), RingFull> {
        if self.is_full() {
            return Err(RingFull(byte));
        }
        self.buffer[self.tail] = byte;
        self.tail = (self.tail + 1) % N;
        self.len += 1;
        Ok(())
    }

    /// Pop the oldest byte.
    pub fn get(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let byte = self.buffer[self.head];
        self.head = (self.head + 1) % N;
        self.len -= 1;
        Some(byte)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Discard every stored byte.
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.len = 0;
    }
}

/// [`RingBuffer`] behind a critical-section mutex, shareable between an
/// interrupt handler (producer) and a task (consumer).
pub struct SharedRing<const N: usize> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<RingBuffer<N>>>,
}

impl<const N: usize> Default for SharedRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SharedRing<N> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(RingBuffer::new())),
        }
    }

    pub fn put(&self, byte: u8) -> Result<(), RingFull> {
        self.inner.lock(|ring| ring.borrow_mut().put(byte))
    }

    pub fn get(&self) -> Option<u8> {
        self.inner.lock(|ring| ring.borrow_mut().get())
    }

    pub fn len(&self) -> usize {
        self.inner.lock(|ring| ring.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pop bytes one at a time and hand them to `f` until the queue is empty.
    ///
    /// The lock is released between bytes so the producer is never blocked
    /// for longer than a single pop.
    pub fn drain(&self, mut f: impl FnMut(u8)) -> usize {
        let mut drained = 0;
        while let Some(byte) = self.get() {
            f(byte);
            drained += 1;
        }
        drained
    }
}
