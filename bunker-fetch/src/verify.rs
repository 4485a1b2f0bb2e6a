use bunker_core::compress;
use rusqlite::{Connection, OpenFlags};
use std::{io, path::Path, path::PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("failed to create scratch directory")]
    Scratch(#[source] io::Error),
    #[error("failed to decompress {}", .path.display())]
    Decompress {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to open decompressed database")]
    Open(#[source] rusqlite::Error),
    #[error("integrity check failed to run")]
    Check(#[source] rusqlite::Error),
    #[error("integrity check reported {0:?}")]
    NotOk(String),
}

/// Proves a downloaded artifact is structurally sound: decompresses it into a
/// scratch file (removed afterwards, success or failure), opens the result
/// read-only, and requires `PRAGMA integrity_check` to report exactly `ok`.
///
/// Both strategies' outputs pass through here identically.
pub fn verify(compressed_path: &Path) -> Result<(), VerifyError> {
    let scratch = tempfile::Builder::new()
        .prefix("bunker-verify-")
        .tempdir()
        .map_err(VerifyError::Scratch)?;
    let db_path = scratch.path().join("restored.db");
    compress::decompress_file(compressed_path, &db_path).map_err(|e| VerifyError::Decompress {
        path: compressed_path.to_owned(),
        source: e,
    })?;

    let conn = Connection::open_with_flags(&db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(VerifyError::Open)?;
    let result: String = conn
        .query_row("PRAGMA integrity_check", [], |row| row.get(0))
        .map_err(VerifyError::Check)?;
    if result != "ok" {
        return Err(VerifyError::NotOk(result));
    }

    tracing::info!(path = %compressed_path.display(), "backup artifact verified");
    Ok(())
}
