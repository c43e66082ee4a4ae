//! Runs one loopback transfer per input file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use quicdrop_protocol::MemoryStream;
use quicdrop_transfer::format::{format_bps_rate, format_bytes_amount};
use quicdrop_transfer::{
    FileSource, Receiver, Sender, TransferConfig, TransferEvent, TransferProgress,
    TransferSession, checksum_bytes,
};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::args::Args;

/// Outcome of one file transfer.
#[derive(Debug)]
pub struct Delivered {
    pub path: PathBuf,
    pub size: usize,
    pub sha256: String,
}

/// Transfers every file at once, one session pair per file.
pub async fn run(args: &Args, config: &TransferConfig) -> anyhow::Result<()> {
    let mut transfers = JoinSet::new();
    for file in &args.files {
        let file = file.clone();
        let out_dir = args.out.clone();
        let capacity = args.capacity;
        let config = config.clone();
        transfers.spawn(async move {
            send_file(&file, &out_dir, capacity, &config)
                .await
                .with_context(|| format!("transfer of {} failed", file.display()))
        });
    }

    let mut failures = 0;
    while let Some(joined) = transfers.join_next().await {
        match joined? {
            Ok(delivered) => println!(
                "saved {} ({}) sha256 {}",
                delivered.path.display(),
                format_bytes_amount(delivered.size as u64, delivered.size as u64),
                delivered.sha256
            ),
            Err(e) => {
                error!("{e:#}");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} transfers failed", args.files.len());
    }
    Ok(())
}

/// Sends `path` through a fresh loopback pair and saves it under `out_dir`.
pub async fn send_file(
    path: &Path,
    out_dir: &Path,
    capacity: usize,
    config: &TransferConfig,
) -> anyhow::Result<Delivered> {
    let source = FileSource::open(path)
        .await
        .with_context(|| format!("cannot open {}", path.display()))?;
    let (tx, rx) = MemoryStream::pair(capacity);
    let (events_tx, events_rx) = mpsc::channel(256);

    let mut sender = Sender::new(tx, source, config.clone());
    let mut receiver = Receiver::new(rx, config.clone()).with_observer(Arc::new(events_tx));

    let printer = tokio::spawn(print_events(events_rx));
    let send = tokio::spawn(async move { sender.run().await });

    let received = receiver.run().await?;
    let sent = send.await??;
    let rate = receiver.average_rate();
    // Closes the event channel.
    drop(receiver);
    printer.await?;

    info!(
        filename = %received.filename,
        bytes = sent,
        rate = %format_bps_rate(rate),
        "file received"
    );

    let saved = received.save_to(out_dir).await?;
    Ok(Delivered {
        path: saved,
        size: received.data.len(),
        sha256: checksum_bytes(&received.data),
    })
}

async fn print_events(mut events: mpsc::Receiver<TransferEvent>) {
    let mut name = String::new();
    let mut progress = TransferProgress::default();
    while let Some(event) = events.recv().await {
        match event {
            TransferEvent::Header {
                filename,
                file_size,
            } => {
                println!(
                    "receiving {filename} ({})",
                    format_bytes_amount(file_size as u64, file_size as u64)
                );
                name = filename;
            }
            TransferEvent::Progress(p) => progress = p,
            TransferEvent::Rate { bits_per_second } => {
                println!(
                    "  {name}: {} {:>5.1}%  {}",
                    format_bytes_amount(progress.offset as u64, progress.total as u64),
                    progress.fraction() * 100.0,
                    format_bps_rate(bits_per_second)
                );
            }
            TransferEvent::StatusChanged(status) => debug!(file = %name, ?status, "receiver status"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_file_into_out_dir() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.txt");
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 97) as u8).collect();
        std::fs::write(&input, &data).unwrap();
        let out_dir = dir.path().join("received");

        let delivered = send_file(&input, &out_dir, 64 * 1024, &TransferConfig::default())
            .await
            .unwrap();

        assert_eq!(delivered.path, out_dir.join("notes.txt"));
        assert_eq!(delivered.size, 100_000);
        assert_eq!(delivered.sha256, checksum_bytes(&data));
        assert_eq!(std::fs::read(&delivered.path).unwrap(), data);
    }

    #[tokio::test]
    async fn run_delivers_files_concurrently() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = Vec::new();
        for (name, len) in [("a.bin", 70_000usize), ("b.bin", 0), ("c.bin", 123_456)] {
            let path = dir.path().join(name);
            std::fs::write(&path, vec![len as u8; len]).unwrap();
            files.push(path);
        }
        let out_dir = dir.path().join("received");
        let args = Args {
            files,
            out: out_dir.clone(),
            config: None,
            capacity: 32 * 1024,
        };

        run(&args, &TransferConfig::default()).await.unwrap();

        for (name, len) in [("a.bin", 70_000usize), ("b.bin", 0), ("c.bin", 123_456)] {
            let saved = std::fs::read(out_dir.join(name)).unwrap();
            assert_eq!(saved, vec![len as u8; len], "{name}");
        }
    }

    #[tokio::test]
    async fn run_reports_failed_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.txt");
        std::fs::write(&good, b"fine").unwrap();
        let args = Args {
            files: vec![good, dir.path().join("missing.txt")],
            out: dir.path().join("received"),
            config: None,
            capacity: 64 * 1024,
        };

        let err = run(&args, &TransferConfig::default()).await.unwrap_err();
        assert!(err.to_string().contains("1 of 2 transfers failed"));
        // The healthy transfer still completes.
        assert_eq!(
            std::fs::read(dir.path().join("received/good.txt")).unwrap(),
            b"fine"
        );
    }

    #[tokio::test]
    async fn missing_input_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = send_file(
            &dir.path().join("absent.bin"),
            dir.path(),
            64 * 1024,
            &TransferConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("cannot open"));
    }

    #[tokio::test]
    async fn chunk_larger_than_capacity_fails() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("x.bin");
        std::fs::write(&input, b"abc").unwrap();

        // The sender rejects the config and drops its end, so the receiver
        // sees a reset while waiting for the header.
        let result = send_file(&input, dir.path(), 1024, &TransferConfig::default()).await;
        assert!(result.is_err());
    }
}
