//! Process-wide timeout registry.
//!
//! Timers are keyed by `(owner task, signal)`. Arming an existing key
//! replaces it, so a timeout is never stacked. When a timer elapses the
//! service posts a pure message carrying the signal to the owner task.
//!
//! Entries are kept in registration order (re-arming moves an entry to the
//! back), which is also the order in which timers expiring during the same
//! tick fire.
use core::cell::RefCell;

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};

use crate::core::{Signal, TaskId};
use crate::error::{KernelError, TimerError};
use crate::kernel::mailbox::Kernel;
use crate::transport::TickSource;

/// Whether a timer fires once or reloads its interval after firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerMode {
    OneShot,
    Periodic,
}

#[derive(Debug, Clone, Copy)]
struct TimerEntry {
    owner: TaskId,
    signal: Signal,
    interval_ms: u32,
    remaining_ms: u32,
    mode: TimerMode,
}

impl TimerEntry {
    #[inline]
    fn matches(&self, owner: TaskId, signal: Signal) -> bool {
        self.owner == owner && self.signal == signal
    }
}

/// Compact, ordered table of armed timers.
#[derive(Debug)]
struct TimerTable<const SLOTS: usize> {
    entries: [Option<TimerEntry>; SLOTS],
    len: usize,
}

impl<const SLOTS: usize> TimerTable<SLOTS> {
    const fn new() -> Self {
        Self {
            entries: [None; SLOTS],
            len: 0,
        }
    }

    fn position(&self, owner: TaskId, signal: Signal) -> Option<usize> {
        self.entries[..self.len]
            .iter()
            .position(|e| e.is_some_and(|e| e.matches(owner, signal)))
    }

    /// Remove the entry at `index`, shifting later entries down one slot.
    fn remove_at(&mut self, index: usize) {
        self.entries[index..self.len].rotate_left(1);
        self.len -= 1;
        self.entries[self.len] = None;
    }

    fn push(&mut self, entry: TimerEntry) -> Result<(), TimerError> {
        if self.len == SLOTS {
            return Err(TimerError::TableFull { capacity: SLOTS });
        }
        self.entries[self.len] = Some(entry);
        self.len += 1;
        Ok(())
    }

    fn get(&self, owner: TaskId, signal: Signal) -> Option<TimerEntry> {
        self.position(owner, signal).and_then(|i| self.entries[i])
    }
}

/// Timer registry shared by every task. Safe to use from the parser context
/// and the task context at the same time.
pub struct TimerService<const SLOTS: usize> {
    table: Mutex<CriticalSectionRawMutex, RefCell<TimerTable<SLOTS>>>,
}

impl<const SLOTS: usize> Default for TimerService<SLOTS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const SLOTS: usize> TimerService<SLOTS> {
    pub const fn new() -> Self {
        Self {
            table: Mutex::new(RefCell::new(TimerTable::new())),
        }
    }

    /// Arm a timer, replacing any timer with the same `(owner, signal)` key.
    pub fn set(
        &self,
        owner: TaskId,
        signal: Signal,
        interval_ms: u32,
        mode: TimerMode,
    ) -> Result<(), TimerError> {
        self.table.lock(|table| {
            let mut table = table.borrow_mut();
            if let Some(index) = table.position(owner, signal) {
                table.remove_at(index);
            }
            table.push(TimerEntry {
                owner,
                signal,
                interval_ms,
                remaining_ms: interval_ms,
                mode,
            })
        })
    }

    /// Disarm a timer. Cancelling an unknown or already fired timer is a no-op.
    ///
    /// Returns whether a timer was removed.
    pub fn cancel(&self, owner: TaskId, signal: Signal) -> bool {
        self.table.lock(|table| {
            let mut table = table.borrow_mut();
            match table.position(owner, signal) {
                Some(index) => {
                    table.remove_at(index);
                    true
                }
                None => false,
            }
        })
    }

    pub fn is_armed(&self, owner: TaskId, signal: Signal) -> bool {
        self.remaining(owner, signal).is_some()
    }

    /// Milliseconds left before the timer fires.
    pub fn remaining(&self, owner: TaskId, signal: Signal) -> Option<u32> {
        self.table
            .lock(|table| table.borrow().get(owner, signal).map(|e| e.remaining_ms))
    }

    /// Number of armed timers.
    pub fn armed(&self) -> usize {
        self.table.lock(|table| table.borrow().len)
    }

    /// Advance every armed timer by `delta_ms` and post the expired ones.
    ///
    /// Returns the number of timers that fired. Posting happens after the
    /// table lock is released, so owners may re-arm from any context. A
    /// failed post does not stop the remaining expiries from being posted;
    /// the first failure is returned once all of them were attempted.
    pub fn tick<const TASKS: usize, const DEPTH: usize>(
        &self,
        delta_ms: u32,
        kernel: &Kernel<TASKS, DEPTH>,
    ) -> Result<usize, KernelError> {
        let mut expired: [Option<(TaskId, Signal)>; SLOTS] = [None; SLOTS];
        let mut fired = 0;

        self.table.lock(|table| {
            let mut table = table.borrow_mut();
            let mut index = 0;
            while index < table.len {
                let Some(entry) = table.entries[index].as_mut() else {
                    index += 1;
                    continue;
                };
                entry.remaining_ms = entry.remaining_ms.saturating_sub(delta_ms);
                if entry.remaining_ms > 0 {
                    index += 1;
                    continue;
                }

                expired[fired] = Some((entry.owner, entry.signal));
                fired += 1;

                let mode = entry.mode;
                match mode {
                    TimerMode::Periodic => {
                        entry.remaining_ms = entry.interval_ms.max(1);
                        index += 1;
                    }
                    TimerMode::OneShot => table.remove_at(index),
                }
            }
        });

        // Every expiry is delivered even if an earlier owner's mailbox is full.
        let mut first_error = None;
        for (owner, signal) in expired.iter().flatten() {
            #[cfg(feature = "defmt")]
            defmt::trace!("Timer fired: task {}, sig {}", owner.0, signal);
            if let Err(err) = kernel.post_pure(*owner, *signal) {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(fired),
        }
    }

    /// Tick the table forever, waiting `period_ms` between ticks.
    pub async fn drive<S: TickSource, const TASKS: usize, const DEPTH: usize>(
        &self,
        kernel: &Kernel<TASKS, DEPTH>,
        source: &mut S,
        period_ms: u32,
    ) -> Result<(), KernelError> {
        loop {
            source.delay_ms(period_ms).await;
            self.tick(period_ms, kernel)?;
        }
    }
}
