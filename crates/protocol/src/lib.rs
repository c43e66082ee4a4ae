//! Stream abstraction and wire framing for QuicDrop file transfers.
//!
//! A transfer runs over one reliable, ordered, flow-controlled stream per
//! direction (see [`TransferStream`]). The peers exchange a small header
//! followed by the raw file body:
//!
//! ```text
//! [4 bytes LE: name_len][name_len bytes: UTF-8 name][4 bytes LE: file_size][body...][finish]
//! ```
//!
//! See the [`wire`] module for the framing primitives.

pub mod error;
pub mod loopback;
pub mod stream;
pub mod wire;

pub use error::{ProtocolError, StreamError};
pub use loopback::MemoryStream;
pub use stream::{ReadResult, TransferStream};
pub use wire::TransferHeader;

/// Largest prefixed string accepted on either side of the wire (64 KiB).
pub const MAX_PREFIXED_STRING_LEN: u32 = 64 * 1024;
