//! Filesystem operations module.
//!
//! This module provides the low-level primitives the traversal builds on:
//! - Copying a single file with its modification time preserved
//! - Recursively deleting a folder
//! - Reading modification times for rule comparisons

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use filetime::FileTime;

use crate::error::EngineError;

/// Buffer size for the copy loop. Files stream through a buffer of this
/// size so a large file is never held in memory whole.
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Copy a file from source to destination, overwriting any existing
/// destination file, and set the destination's modification time equal to
/// the source's so a later timestamp comparison sees them as identical.
///
/// # Returns
/// Number of bytes copied
///
/// # Errors
/// Returns EngineError if the source is unreadable or any I/O step fails.
/// The destination may be left partially written in that case; the caller
/// reports the failure and the next matching run re-copies it.
pub fn copy_file(source: &Path, destination: &Path) -> Result<u64, EngineError> {
    let mut src = fs::File::open(source).map_err(|e| EngineError::ReadError {
        path: source.to_path_buf(),
        source: e,
    })?;

    let src_metadata = src.metadata().map_err(|e| EngineError::ReadError {
        path: source.to_path_buf(),
        source: e,
    })?;
    let src_mtime = FileTime::from_last_modification_time(&src_metadata);

    let mut dst = fs::File::create(destination).map_err(|e| EngineError::WriteError {
        path: destination.to_path_buf(),
        source: e,
    })?;

    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut bytes_copied: u64 = 0;
    loop {
        let read = src.read(&mut buffer).map_err(|e| EngineError::ReadError {
            path: source.to_path_buf(),
            source: e,
        })?;
        if read == 0 {
            break;
        }
        dst.write_all(&buffer[..read])
            .map_err(|e| EngineError::WriteError {
                path: destination.to_path_buf(),
                source: e,
            })?;
        bytes_copied += read as u64;
    }
    drop(dst);

    // Keep the source timestamp, otherwise the destination would default to
    // the time of the copy. A failure here is ignored, matching the copy
    // itself having succeeded.
    let _ = filetime::set_file_mtime(destination, src_mtime);

    Ok(bytes_copied)
}

/// Recursively delete a folder and all its contents.
///
/// Files are deleted directly, subfolders through recursive descent, then
/// the emptied folder itself. The first failure propagates to the caller;
/// mirror-delete catches it per top-level entry so one undeletable item
/// does not abort the rest.
pub fn delete_folder(folder: &Path) -> Result<(), EngineError> {
    let entries = fs::read_dir(folder).map_err(|e| EngineError::EnumerationFailed {
        path: folder.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| EngineError::EnumerationFailed {
            path: folder.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_dir() {
            delete_folder(&path)?;
        } else {
            fs::remove_file(&path).map_err(|e| EngineError::DeleteFailed {
                path: path.clone(),
                source: e,
            })?;
        }
    }

    fs::remove_dir(folder).map_err(|e| EngineError::DeleteFailed {
        path: folder.to_path_buf(),
        source: e,
    })
}

/// Create a directory and any missing parents.
pub fn create_dirs(path: &Path) -> Result<(), EngineError> {
    fs::create_dir_all(path).map_err(|e| EngineError::DirectoryCreationFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Modification time of a path, or the zero timestamp when it can't be read.
///
/// An unreadable timestamp therefore compares as "differs" against any real
/// one, which puts the file on the copy side of the changed rules.
pub fn modification_time(path: &Path) -> FileTime {
    fs::metadata(path)
        .map(|m| FileTime::from_last_modification_time(&m))
        .unwrap_or_else(|_| FileTime::zero())
}
