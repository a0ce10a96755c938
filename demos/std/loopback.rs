//! # Loopback Example
//!
//! Two links wired back to back on the host:
//! - Encode a REQ frame and show its bytes
//! - Deliver a payload from link A to link B, with ACK
//! - Let a send run out of retries against a silent peer
//!
//! Everything is driven by hand (no executor): bytes are shuttled between the
//! two in-memory wires and the timer service is ticked explicitly.
//!
//! ```bash
//! cargo run --example loopback
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use tasklink::core::{TaskId, MAX_FRAME_LEN, SEND_TIMEOUT_MS};
use tasklink::kernel::{Kernel, TimerService};
use tasklink::link::{sig, Frame, LinkConfig, LinkPhy, LinkTask};
use tasklink::transport::SerialWrite;

const LINK: TaskId = TaskId(0);
const OWNER: TaskId = TaskId(1);

/// Wire shared between the writer of one link and the caller.
#[derive(Clone, Default)]
struct Wire(Rc<RefCell<Vec<u8>>>);

impl Wire {
    fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.0.borrow_mut())
    }
}

impl SerialWrite for Wire {
    type Error = core::convert::Infallible;

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.0.borrow_mut().extend_from_slice(bytes);
        Ok(())
    }
}

fn signal_name(signal: u8) -> &'static str {
    match signal {
        sig::PHY_STARTED => "PHY_STARTED",
        sig::FRAME_DELIVERED => "FRAME_DELIVERED",
        sig::SEND_DONE => "SEND_DONE",
        sig::SEND_ERR => "SEND_ERR",
        sig::TRANSPORT_OFFLINE => "TRANSPORT_OFFLINE",
        _ => "?",
    }
}

fn print_owner_events(name: &str, kernel: &Kernel<2, 16>) {
    while let Ok(Some(msg)) = kernel.try_receive(OWNER) {
        println!(
            "   [{}] {} {:02X?}",
            name,
            signal_name(msg.signal()),
            msg.data()
        );
    }
}

fn main() {
    println!("=== tasklink Loopback ===\n");

    // ======================================================================
    // 1. Encode a frame
    // ======================================================================
    println!("1. Encoding a REQ frame");

    let frame = Frame::request(0x0000_00B2, 0x0000_00A1, 7, b"hi").expect("payload fits");
    let mut buffer = [0u8; MAX_FRAME_LEN];
    let len = frame.to_bytes(&mut buffer);
    print!("   Bytes: ");
    for byte in &buffer[..len] {
        print!("{:02X} ", byte);
    }
    println!("\n   Checksum valid: {}\n", frame.is_valid());

    // ======================================================================
    // 2. Two links exchange a payload
    // ======================================================================
    println!("2. Link A sends \"hello\" to link B");

    let (kernel_a, timers_a) = (Kernel::<2, 16>::new(), TimerService::<4>::new());
    let (kernel_b, timers_b) = (Kernel::<2, 16>::new(), TimerService::<4>::new());
    let (wire_a, wire_b) = (Wire::default(), Wire::default());

    let phy_a = LinkPhy::new(&kernel_a, &timers_a, LINK, OWNER);
    let phy_b = LinkPhy::new(&kernel_b, &timers_b, LINK, OWNER);
    phy_a.attach(wire_a.clone());
    phy_b.attach(wire_b.clone());

    let mut task_a = LinkTask::new(
        &phy_a,
        LinkConfig {
            local_addr: 0xA1,
            peer_addr: 0xB2,
            seed: 1,
            max_retry: 2,
        },
    );
    let mut task_b = LinkTask::new(
        &phy_b,
        LinkConfig {
            local_addr: 0xB2,
            peer_addr: 0xA1,
            seed: 2,
            max_retry: 2,
        },
    );

    task_a.start().expect("mailbox A");
    task_b.start().expect("mailbox B");
    task_a.process_pending().expect("link A");
    task_b.process_pending().expect("link B");

    phy_a.request_send(b"hello").expect("mailbox A");
    task_a.process_pending().expect("link A");

    // A -> B: the REQ frame.
    phy_b.receive_bytes(&wire_a.take()).expect("parser B");
    task_b.process_pending().expect("link B");
    // B -> A: the ACK frame.
    phy_a.receive_bytes(&wire_b.take()).expect("parser A");
    task_a.process_pending().expect("link A");

    print_owner_events("A", &kernel_a);
    print_owner_events("B", &kernel_b);
    println!();

    // ======================================================================
    // 3. Silent peer
    // ======================================================================
    println!(
        "3. Link A sends to a silent peer (budget {} ms)",
        task_a.send_budget_ms()
    );

    phy_a.request_send(&[0x01, 0x02, 0x03]).expect("mailbox A");
    task_a.process_pending().expect("link A");

    let mut transmissions = 0;
    let mut elapsed = 0;
    while elapsed < task_a.send_budget_ms() {
        if !wire_a.take().is_empty() {
            transmissions += 1;
        }
        timers_a.tick(SEND_TIMEOUT_MS, &kernel_a).expect("timers A");
        task_a.process_pending().expect("link A");
        elapsed += SEND_TIMEOUT_MS;
    }
    println!("   Transmissions: {}", transmissions);
    print_owner_events("A", &kernel_a);
}
