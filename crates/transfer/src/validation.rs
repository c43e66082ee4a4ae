use std::path::{Component, Path};

use crate::TransferError;

/// Validates a peer-supplied filename before it is joined onto a local
/// download directory.
///
/// Rejects:
/// - Empty names
/// - Absolute paths (Unix `/`, Windows `C:\`, UNC `\\server`)
/// - Parent directory traversal (`..`)
/// - Windows prefix components
pub fn validate_received_filename(filename: &str) -> Result<(), TransferError> {
    if filename.is_empty() {
        return Err(TransferError::InvalidPath("empty filename".into()));
    }

    // Drive letters and UNC shares parse as normal components on Unix.
    if filename.len() >= 2 && filename.as_bytes()[1] == b':' {
        return Err(TransferError::InvalidPath(format!(
            "drive prefix not allowed: {filename}"
        )));
    }
    if filename.starts_with("\\\\") {
        return Err(TransferError::InvalidPath(format!(
            "UNC path not allowed: {filename}"
        )));
    }

    let path = Path::new(filename);
    if path.is_absolute() {
        return Err(TransferError::InvalidPath(format!(
            "absolute path not allowed: {filename}"
        )));
    }

    for component in path.components() {
        match component {
            Component::ParentDir => {
                return Err(TransferError::InvalidPath(format!(
                    "parent directory traversal not allowed: {filename}"
                )));
            }
            Component::Prefix(_) | Component::RootDir => {
                return Err(TransferError::InvalidPath(format!(
                    "absolute path not allowed: {filename}"
                )));
            }
            Component::CurDir | Component::Normal(_) => {}
        }
    }

    Ok(())
}
