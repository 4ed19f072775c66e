//! Frame channel behavior under a slow sink and concurrent producers.

use std::sync::Arc;
use std::time::Duration;

use fobreader_hardware::mock::MemoryFrameSink;
use fobreader_hardware::{Frame, FrameChannel, FrameGeometry, FrameStats, WriterState};

const GEOMETRY: FrameGeometry = FrameGeometry::new(8, 4);
const WAIT: Duration = Duration::from_secs(5);

fn is_uniform(frame: &Frame) -> bool {
    let first = frame.pixel(0, 0);
    (0..GEOMETRY.height).all(|y| (0..GEOMETRY.width).all(|x| frame.pixel(x, y) == first))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_busy_writer_keeps_only_newest_pending() {
    let (sink, handle) = MemoryFrameSink::gated();
    let channel = FrameChannel::new(sink).unwrap();
    let frames: Vec<Frame> = (1..=5).map(|c| Frame::filled(GEOMETRY, c)).collect();

    channel.submit(frames[0].clone());
    assert!(handle.wait_write_started(WAIT));

    for frame in &frames[1..] {
        channel.submit(frame.clone());
    }
    assert_eq!(channel.state(), WriterState::Writing);

    handle.release(2);
    channel.flush().await;

    assert_eq!(handle.frames(), vec![frames[0].clone(), frames[4].clone()]);
    assert_eq!(
        channel.stats(),
        FrameStats {
            submitted: 5,
            written: 2,
            dropped: 3,
            failed: 0,
        }
    );
    assert_eq!(channel.state(), WriterState::Idle);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submitters_share_one_writer() {
    let (sink, handle) = MemoryFrameSink::new();
    let channel = Arc::new(FrameChannel::new(sink).unwrap());

    let producers: Vec<_> = (0..8u16)
        .map(|producer| {
            let channel = Arc::clone(&channel);
            std::thread::spawn(move || {
                for i in 0..50u16 {
                    channel.submit(Frame::filled(GEOMETRY, producer * 100 + i));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }
    channel.flush().await;

    let written = handle.frames();
    let stats = channel.stats();

    assert_eq!(handle.max_concurrent_writes(), 1);
    assert_eq!(stats.submitted, 400);
    assert_eq!(stats.written as usize, written.len());
    assert_eq!(stats.written + stats.dropped, stats.submitted);
    assert!(written.iter().all(is_uniform));
}
