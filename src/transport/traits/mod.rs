//! Abstraction traits used by the link layer (serial device and tick source).
pub mod serial;
pub mod tick_source;
