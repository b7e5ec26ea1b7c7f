//! Signed-in session persisted between CLI runs.

use inkboard_core::Session;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionFileError {
    #[error("Failed to access session file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Corrupt session file {}: {source}", path.display())]
    Format {
        path: PathBuf,
        source: serde_json::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SessionFileError + '_ {
    move |source| SessionFileError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Read the stored session, if any.
pub fn load(path: &Path) -> Result<Option<Session>, SessionFileError> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_error(path)(e)),
    };
    let session = serde_json::from_str(&json).map_err(|source| SessionFileError::Format {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("Loaded session from {}", path.display());
    Ok(Some(session))
}

pub fn save(path: &Path, session: &Session) -> Result<(), SessionFileError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let json = serde_json::to_string_pretty(session).map_err(|source| SessionFileError::Format {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(io_error(path))?;
    log::info!("Saved session to {}", path.display());
    Ok(())
}

/// Remove the stored session. Missing files are fine.
pub fn clear(path: &Path) -> Result<(), SessionFileError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_error(path)(e)),
    }
}
