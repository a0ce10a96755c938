//! Message-passing task kernel: mailboxes, timers, state machines and the
//! byte queue used for interrupt-to-task handoff.
pub mod fsm;
pub mod mailbox;
pub mod message;
pub mod ring;
pub mod timer;

pub use fsm::{Fsm, StateHandler, Transition};
pub use mailbox::Kernel;
pub use message::{InterfaceRoute, Message};
pub use ring::{RingBuffer, RingFull, SharedRing};
pub use timer::{TimerMode, TimerService};
