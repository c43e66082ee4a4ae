//! Command-line argument parsing

use clap::Parser;
use std::path::PathBuf;

/// Default loopback send buffer: 1 MiB.
pub const DEFAULT_CAPACITY: usize = 1024 * 1024;

/// Send files through a flow-controlled loopback stream
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Files to send
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Directory received files are written to
    #[arg(short, long, default_value = "received")]
    pub out: PathBuf,

    /// JSON transfer config (chunkSize, pollIntervalMs)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Send buffer capacity of the loopback stream, in bytes
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    pub capacity: usize,
}
