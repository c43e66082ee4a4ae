use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::Mutex;

/// Random-access byte provider for the sending side.
#[async_trait]
pub trait ByteSource: Send + Sync {
    /// Name announced to the peer in the transfer header.
    fn name(&self) -> &str;

    /// Total length in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns up to `max_len` bytes starting at `offset`.
    ///
    /// An empty result before the end of the source is treated as a failure
    /// by the writer.
    async fn read_chunk(&self, offset: u64, max_len: usize) -> io::Result<Vec<u8>>;
}

// ---------------------------------------------------------------------------
// MemorySource
// ---------------------------------------------------------------------------

/// In-memory byte source.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    data: Vec<u8>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

#[async_trait]
impl ByteSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    async fn read_chunk(&self, offset: u64, max_len: usize) -> io::Result<Vec<u8>> {
        let start = usize::try_from(offset)
            .unwrap_or(usize::MAX)
            .min(self.data.len());
        let end = start.saturating_add(max_len).min(self.data.len());
        Ok(self.data[start..end].to_vec())
    }
}

// ---------------------------------------------------------------------------
// FileSource
// ---------------------------------------------------------------------------

/// Reads a local file at arbitrary offsets.
#[derive(Debug)]
pub struct FileSource {
    name: String,
    path: PathBuf,
    len: u64,
    file: Mutex<tokio::fs::File>,
}

impl FileSource {
    /// Opens `path`; the announced name is the path's final component.
    pub async fn open(path: &Path) -> io::Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        let len = file.metadata().await?.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("no file name in {}", path.display()),
                )
            })?;
        Ok(Self {
            name,
            path: path.to_path_buf(),
            len,
            file: Mutex::new(file),
        })
    }

    /// Overrides the announced name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ByteSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> u64 {
        self.len
    }

    async fn read_chunk(&self, offset: u64, max_len: usize) -> io::Result<Vec<u8>> {
        let remaining = self.len.saturating_sub(offset);
        let read_size = (remaining.min(max_len as u64)) as usize;
        let mut buf = vec![0u8; read_size];

        let mut file = self.file.lock().await;
        file.seek(SeekFrom::Start(offset)).await?;
        let mut filled = 0;
        while filled < read_size {
            let n = file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        Ok(buf)
    }
}

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
