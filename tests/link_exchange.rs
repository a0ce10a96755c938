//! End-to-end link scenarios over an in-memory serial line: two links talking
//! to each other, and one link facing a scripted host.
mod helpers;

use helpers::{MockOpener, MockTickSource, PipeReader, PipeWriter, SerialPipe};
use tasklink::{
    core::{TaskId, MAX_FRAME_LEN, SEND_TIMEOUT_MS},
    kernel::{Kernel, Message, TimerService},
    link::{sig, Frame, FrameParser, FrameType, LinkConfig, LinkPhy, LinkTask, ParseEvent},
    transport::run_receiver,
};
use tokio::time::{sleep, timeout, Duration};

const LINK: TaskId = TaskId(0);
const OWNER: TaskId = TaskId(1);
const ADDR_A: u32 = 0x0000_00A1;
const ADDR_B: u32 = 0x0000_00B2;
const TICK_MS: u32 = 5;

type NodeKernel = Kernel<2, 16>;
type NodeTimers = TimerService<4>;
type NodePhy<'a> = LinkPhy<'a, PipeWriter, 2, 16, 4>;

fn config(local_addr: u32, peer_addr: u32, max_retry: u8) -> LinkConfig {
    LinkConfig {
        local_addr,
        peer_addr,
        seed: local_addr,
        max_retry,
    }
}

/// Next message for the owner task, failing the test after one second.
async fn next_owner_message(kernel: &NodeKernel) -> Message {
    timeout(Duration::from_secs(1), kernel.receive(OWNER))
        .await
        .expect("owner message within timeout")
        .expect("owner mailbox")
}

/// Decode every complete frame contained in a raw capture.
fn frames_in(bytes: &[u8]) -> Vec<Frame> {
    let mut parser = FrameParser::new();
    bytes
        .iter()
        .filter_map(|&byte| match parser.push(byte) {
            ParseEvent::Complete(frame) => Some(frame),
            _ => None,
        })
        .collect()
}

fn encode(frame: &Frame) -> Vec<u8> {
    let mut out = [0u8; MAX_FRAME_LEN];
    let len = frame.to_bytes(&mut out);
    out[..len].to_vec()
}

/// Wait until `count` frames were captured from the host end of the line.
async fn host_frames(host: &mut PipeReader, count: usize) -> Vec<Frame> {
    let mut capture = Vec::new();
    timeout(Duration::from_secs(1), async {
        while frames_in(&capture).len() < count {
            capture.extend(host.recv_chunk().await.expect("line open"));
        }
    })
    .await
    .expect("frames within timeout");
    frames_in(&capture)
}

#[tokio::test]
async fn test_two_links_exchange_payloads() {
    // Two links wired back to back deliver in both directions and report success.
    let ((dut_reader, dut_writer), (host_reader, host_writer)) = SerialPipe::create_pair();

    let (kernel_a, timers_a) = (NodeKernel::new(), NodeTimers::new());
    let (kernel_b, timers_b) = (NodeKernel::new(), NodeTimers::new());
    let phy_a: NodePhy = LinkPhy::new(&kernel_a, &timers_a, LINK, OWNER);
    let phy_b: NodePhy = LinkPhy::new(&kernel_b, &timers_b, LINK, OWNER);

    let mut reader_a = phy_a
        .open_transport(&mut MockOpener::with_device(dut_reader, dut_writer), "/dev/ttyA")
        .expect("open A");
    let mut reader_b = phy_b
        .open_transport(&mut MockOpener::with_device(host_reader, host_writer), "/dev/ttyB")
        .expect("open B");

    let mut task_a = LinkTask::new(&phy_a, config(ADDR_A, ADDR_B, 3));
    let mut task_b = LinkTask::new(&phy_b, config(ADDR_B, ADDR_A, 3));
    task_a.start().unwrap();
    task_b.start().unwrap();

    let (mut tick_a, mut tick_b) = (MockTickSource, MockTickSource);

    tokio::select! {
        r = task_a.run() => panic!("link A stopped: {:?}", r),
        r = task_b.run() => panic!("link B stopped: {:?}", r),
        r = run_receiver(&phy_a, &mut reader_a) => panic!("receiver A stopped: {:?}", r),
        r = run_receiver(&phy_b, &mut reader_b) => panic!("receiver B stopped: {:?}", r),
        r = timers_a.drive(&kernel_a, &mut tick_a, TICK_MS) => panic!("timers A stopped: {:?}", r),
        r = timers_b.drive(&kernel_b, &mut tick_b, TICK_MS) => panic!("timers B stopped: {:?}", r),

        _ = async {
            assert_eq!(next_owner_message(&kernel_a).await.signal(), sig::PHY_STARTED);
            assert_eq!(next_owner_message(&kernel_b).await.signal(), sig::PHY_STARTED);

            phy_a.request_send(&[0x01, 0x02, 0x03]).unwrap();
            let delivered = next_owner_message(&kernel_b).await;
            assert_eq!(delivered.signal(), sig::FRAME_DELIVERED);
            assert_eq!(delivered.data(), &[0x01, 0x02, 0x03]);
            assert_eq!(next_owner_message(&kernel_a).await.signal(), sig::SEND_DONE);

            phy_b.request_send(b"pong").unwrap();
            let delivered = next_owner_message(&kernel_a).await;
            assert_eq!(delivered.signal(), sig::FRAME_DELIVERED);
            assert_eq!(delivered.data(), b"pong");
            assert_eq!(next_owner_message(&kernel_b).await.signal(), sig::SEND_DONE);
        } => {
            // Test complete
        }
    }
}

#[tokio::test]
async fn test_silent_peer_exhausts_retries() {
    // max-retry 2 against a host that never answers: three REQs, then SEND_ERR.
    let ((dut_reader, dut_writer), (mut host_reader, _host_writer)) = SerialPipe::create_pair();
    let (kernel, timers) = (NodeKernel::new(), NodeTimers::new());
    let phy: NodePhy = LinkPhy::new(&kernel, &timers, LINK, OWNER);
    let mut reader = phy
        .open_transport(&mut MockOpener::with_device(dut_reader, dut_writer), "/dev/ttyA")
        .expect("open");
    let mut task = LinkTask::new(&phy, config(ADDR_A, ADDR_B, 2));
    assert_eq!(task.send_budget_ms(), 3 * SEND_TIMEOUT_MS);
    task.start().unwrap();
    let mut tick = MockTickSource;

    tokio::select! {
        r = task.run() => panic!("link stopped: {:?}", r),
        r = run_receiver(&phy, &mut reader) => panic!("receiver stopped: {:?}", r),
        r = timers.drive(&kernel, &mut tick, TICK_MS) => panic!("timers stopped: {:?}", r),

        _ = async {
            assert_eq!(next_owner_message(&kernel).await.signal(), sig::PHY_STARTED);
            phy.request_send(&[0x01, 0x02, 0x03]).unwrap();

            assert_eq!(next_owner_message(&kernel).await.signal(), sig::SEND_ERR);
            let frames = frames_in(&host_reader.drain_now());
            assert_eq!(frames.len(), 3);
            assert!(frames.iter().all(|f| f == &frames[0]));
            assert_eq!(frames[0].header.kind, FrameType::Req);
            assert_eq!(frames[0].header.dest, ADDR_B);
            assert_eq!(frames[0].header.src, ADDR_A);

            // No further transmission once abandoned.
            sleep(Duration::from_millis(u64::from(2 * SEND_TIMEOUT_MS))).await;
            assert!(host_reader.drain_now().is_empty());
        } => {}
    }
}

#[tokio::test]
async fn test_host_request_acked_and_corruption_nacked() {
    // The link answers a REQ with an ACK and a corrupted frame with a NACK.
    let ((dut_reader, dut_writer), (mut host_reader, host_writer)) = SerialPipe::create_pair();
    let (kernel, timers) = (NodeKernel::new(), NodeTimers::new());
    let phy: NodePhy = LinkPhy::new(&kernel, &timers, LINK, OWNER);
    let mut reader = phy
        .open_transport(&mut MockOpener::with_device(dut_reader, dut_writer), "/dev/ttyA")
        .expect("open");
    let mut task = LinkTask::new(&phy, config(ADDR_A, ADDR_B, 3));
    task.start().unwrap();
    let mut tick = MockTickSource;

    tokio::select! {
        r = task.run() => panic!("link stopped: {:?}", r),
        r = run_receiver(&phy, &mut reader) => panic!("receiver stopped: {:?}", r),
        r = timers.drive(&kernel, &mut tick, TICK_MS) => panic!("timers stopped: {:?}", r),

        _ = async {
            assert_eq!(next_owner_message(&kernel).await.signal(), sig::PHY_STARTED);

            let req = Frame::request(ADDR_A, ADDR_B, 5, &[]).unwrap();
            host_writer.inject(&encode(&req));
            let ack = host_frames(&mut host_reader, 1).await;
            assert_eq!(ack[0].header.kind, FrameType::Ack);
            assert_eq!(ack[0].header.seq, 5);
            assert_eq!(ack[0].header.dest, ADDR_B);
            assert_eq!(ack[0].header.src, ADDR_A);
            let delivered = next_owner_message(&kernel).await;
            assert_eq!(delivered.signal(), sig::FRAME_DELIVERED);
            assert_eq!(delivered.data_len(), 0);

            let mut corrupted = encode(&Frame::request(ADDR_A, ADDR_B, 6, &[1, 2, 3]).unwrap());
            let last = corrupted.len() - 1;
            corrupted[last] ^= 0x01;
            host_writer.inject(&corrupted);
            let nack = host_frames(&mut host_reader, 1).await;
            assert_eq!(nack[0].header.kind, FrameType::Nack);
            assert_eq!(nack[0].header.seq, 6);
            assert_eq!(kernel.pending(OWNER), Ok(0));
        } => {}
    }
}

#[tokio::test]
async fn test_noise_and_oversized_length_skipped() {
    // Garbage and an impossible length on the line do not disturb the next frame.
    let ((dut_reader, dut_writer), (mut host_reader, host_writer)) = SerialPipe::create_pair();
    let (kernel, timers) = (NodeKernel::new(), NodeTimers::new());
    let phy: NodePhy = LinkPhy::new(&kernel, &timers, LINK, OWNER);
    let mut reader = phy
        .open_transport(&mut MockOpener::with_device(dut_reader, dut_writer), "/dev/ttyA")
        .expect("open");
    let mut task = LinkTask::new(&phy, config(ADDR_A, ADDR_B, 3));
    task.start().unwrap();
    let mut tick = MockTickSource;

    tokio::select! {
        r = task.run() => panic!("link stopped: {:?}", r),
        r = run_receiver(&phy, &mut reader) => panic!("receiver stopped: {:?}", r),
        r = timers.drive(&kernel, &mut tick, TICK_MS) => panic!("timers stopped: {:?}", r),

        _ = async {
            assert_eq!(next_owner_message(&kernel).await.signal(), sig::PHY_STARTED);

            host_writer.inject(&[0x00, 0x55, 0xAA]);
            host_writer.inject(&[0xEF, 0, 0, 0, 0xA1, 0, 0, 0, 0xB2, 0x03, 0x00, 0x01, 0xFF]);
            host_writer.inject(&encode(&Frame::request(ADDR_A, ADDR_B, 9, b"ok").unwrap()));

            let delivered = next_owner_message(&kernel).await;
            assert_eq!(delivered.signal(), sig::FRAME_DELIVERED);
            assert_eq!(delivered.data(), b"ok");
            let ack = host_frames(&mut host_reader, 1).await;
            assert_eq!(ack.len(), 1);
            assert_eq!(ack[0].header.seq, 9);
        } => {}
    }
}

#[tokio::test]
async fn test_stalled_frame_abandoned_after_receive_timeout() {
    // Half a frame followed by silence is discarded; the following frame parses.
    let ((dut_reader, dut_writer), (_host_reader, host_writer)) = SerialPipe::create_pair();
    let (kernel, timers) = (NodeKernel::new(), NodeTimers::new());
    let phy: NodePhy = LinkPhy::new(&kernel, &timers, LINK, OWNER);
    let mut reader = phy
        .open_transport(&mut MockOpener::with_device(dut_reader, dut_writer), "/dev/ttyA")
        .expect("open");
    let mut task = LinkTask::new(&phy, config(ADDR_A, ADDR_B, 3));
    task.start().unwrap();
    let mut tick = MockTickSource;

    tokio::select! {
        r = task.run() => panic!("link stopped: {:?}", r),
        r = run_receiver(&phy, &mut reader) => panic!("receiver stopped: {:?}", r),
        r = timers.drive(&kernel, &mut tick, TICK_MS) => panic!("timers stopped: {:?}", r),

        _ = async {
            assert_eq!(next_owner_message(&kernel).await.signal(), sig::PHY_STARTED);

            let stalled = encode(&Frame::request(ADDR_A, ADDR_B, 1, &[1, 2, 3, 4]).unwrap());
            host_writer.inject(&stalled[..10]);
            sleep(Duration::from_millis(200)).await;

            host_writer.inject(&encode(&Frame::request(ADDR_A, ADDR_B, 2, &[5]).unwrap()));
            let delivered = next_owner_message(&kernel).await;
            assert_eq!(delivered.signal(), sig::FRAME_DELIVERED);
            assert_eq!(delivered.data(), &[5]);
        } => {}
    }
}
