/// Integration test: send a file from disk over an in-memory stream pair,
/// save it on the receiving side, and verify it arrives intact.
use std::sync::Arc;

use quicdrop_protocol::MemoryStream;
use quicdrop_transfer::{
    FileSource, Receiver, Sender, TransferConfig, TransferEvent, TransferSession, TransferStatus,
    checksum_bytes,
};
use tokio::sync::mpsc;

#[tokio::test]
async fn loopback_transfer_small_file() {
    loopback_transfer(10 * 1024, 64 * 1024).await;
}

#[tokio::test]
async fn loopback_transfer_exact_chunk_boundary() {
    loopback_transfer(16 * 1024 * 3, 64 * 1024).await;
}

#[tokio::test]
async fn loopback_transfer_through_tight_buffer() {
    // Send buffer holds only two chunks, so the writer waits on every write.
    loopback_transfer(1024 * 1024, 32 * 1024).await;
}

#[tokio::test]
async fn loopback_transfer_empty_file() {
    loopback_transfer(0, 64 * 1024).await;
}

async fn loopback_transfer(file_size: usize, capacity: usize) {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("input.bin");
    let out_dir = dir.path().join("received");

    let data: Vec<u8> = (0..file_size).map(|i| (i % 251) as u8).collect();
    std::fs::write(&input_path, &data).unwrap();

    let (tx, rx) = MemoryStream::pair(capacity);
    let source = FileSource::open(&input_path).await.unwrap();
    let (events_tx, mut events_rx) = mpsc::channel(1024);

    let mut sender = Sender::new(tx, source, TransferConfig::default());
    let mut receiver =
        Receiver::new(rx, TransferConfig::default()).with_observer(Arc::new(events_tx));

    let send = tokio::spawn(async move {
        let sent = sender.run().await;
        (sent, sender.status())
    });
    let received = receiver.run().await.unwrap();
    let (sent, sender_status) = send.await.unwrap();

    assert_eq!(sent.unwrap() as usize, file_size);
    assert_eq!(sender_status, TransferStatus::Completed);
    assert_eq!(receiver.status(), TransferStatus::Completed);
    assert_eq!(received.filename, "input.bin");

    let saved = received.save_to(&out_dir).await.unwrap();
    let output = std::fs::read(&saved).unwrap();
    assert_eq!(output.len(), file_size);
    assert_eq!(checksum_bytes(&output), checksum_bytes(&data));

    let mut last_offset = 0;
    let mut header_seen = false;
    while let Ok(event) = events_rx.try_recv() {
        match event {
            TransferEvent::Header {
                filename,
                file_size: size,
            } => {
                assert_eq!(filename, "input.bin");
                assert_eq!(size as usize, file_size);
                header_seen = true;
            }
            TransferEvent::Progress(progress) => {
                assert!(header_seen);
                assert!(progress.offset > last_offset);
                last_offset = progress.offset;
            }
            _ => {}
        }
    }
    assert!(header_seen);
    assert_eq!(last_offset as usize, file_size);
}
