// rdl-aio/src/fs.rs
//! Primitive synchronous filesystem operations.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rdl_common::error::{RdlError, Result};
use tempfile::NamedTempFile;
use tracing::{debug, error, warn};

/// Creates a directory and all its parent components if they are missing.
pub fn create_dir_all(path: &Path) -> Result<()> {
    debug!("Creating directory recursively: {}", path.display());
    fs::create_dir_all(path).map_err(|e| {
        error!("Failed create dir {}: {}", path.display(), e);
        RdlError::from(e)
    })
}

/// Reads the entire contents of a file into a byte vector.
pub fn read_to_bytes(path: &Path) -> Result<Vec<u8>> {
    debug!("Reading file to bytes: {}", path.display());
    fs::read(path).map_err(|e| {
        if e.kind() != io::ErrorKind::NotFound {
            error!("Failed read file {}: {}", path.display(), e);
        }
        RdlError::from(e)
    })
}

/// Removes a file. Returns `Ok(false)` when there was nothing to remove.
pub fn remove_file_if_exists(path: &Path) -> Result<bool> {
    debug!("Removing file: {}", path.display());
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => {
            error!("Failed remove file {}: {}", path.display(), e);
            Err(RdlError::from(e))
        }
    }
}

fn temp_file_beside(target: &Path) -> Result<(NamedTempFile, PathBuf)> {
    let dir = target.parent().ok_or_else(|| {
        RdlError::Io(Arc::new(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Cannot get parent directory for {}", target.display()),
        )))
    })?;
    create_dir_all(dir)?;

    let temp_file = NamedTempFile::new_in(dir)?;
    let temp_path = temp_file.path().to_path_buf();
    Ok((temp_file, temp_path))
}

fn persist(temp_file: NamedTempFile, temp_path: &Path, target: &Path) -> Result<()> {
    temp_file.as_file().sync_all()?;
    temp_file.persist(target).map_err(|e| {
        error!(
            "Failed to persist/rename temporary file {} over {}: {}",
            temp_path.display(),
            target.display(),
            e.error
        );
        RdlError::Io(Arc::new(e.error))
    })?;
    Ok(())
}

/// Atomically writes data to a file using a temporary file in the same
/// directory. Readers see either the old or the new content, never a mix.
pub fn atomic_write_file(target: &Path, content: &[u8]) -> Result<()> {
    let (mut temp_file, temp_path) = temp_file_beside(target)?;

    debug!(
        "Atomically writing {} bytes to {} via temp file {}",
        content.len(),
        target.display(),
        temp_path.display()
    );

    temp_file.write_all(content)?;
    temp_file.flush()?;
    persist(temp_file, &temp_path, target)
}

/// Copies `source` over `target` through a temporary file, so a partially
/// copied file is never visible at `target`.
pub fn atomic_copy_file(source: &Path, target: &Path) -> Result<u64> {
    let mut reader = File::open(source).map_err(|e| {
        error!("Failed open file {}: {}", source.display(), e);
        RdlError::from(e)
    })?;
    let (mut temp_file, temp_path) = temp_file_beside(target)?;

    debug!(
        "Atomically copying {} to {} via temp file {}",
        source.display(),
        target.display(),
        temp_path.display()
    );

    let copied = io::copy(&mut reader, &mut temp_file)?;
    temp_file.flush()?;
    if let Err(e) = persist(temp_file, &temp_path, target) {
        warn!("Copy of {} was not installed", source.display());
        return Err(e);
    }
    Ok(copied)
}
