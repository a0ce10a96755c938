//! `tasklink` library: a small message-passing task kernel and a
//! point-to-point link protocol (framing, checksum, stop-and-wait ARQ) for
//! serial byte streams, usable in a `no_std` environment.
#![no_std]
//==================================================================================
extern crate alloc;
//==================================================================================
/// Identifiers and protocol constants shared by every layer.
pub mod core;
/// Kernel, framing, link and transport errors.
pub mod error;
/// Mailboxes, timers, state machines and byte queues.
pub mod kernel;
/// Link frames, byte parser, physical layer and ARQ task.
pub mod link;
/// Serial device and tick source abstractions plus the receiver loop.
pub mod transport;
//==================================================================================
