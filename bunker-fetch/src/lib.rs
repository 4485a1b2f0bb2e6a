pub mod remote;
pub mod resolve;
pub mod transfer;
pub mod verify;

pub use remote::{LocalFs, RemoteFs};
pub use resolve::{resolve_latest, ResolveError, ResolvePolicy};
pub use transfer::{download, TransferError};
pub use verify::{verify, VerifyError};

use std::path::{Path, PathBuf};

/// The three retrieval stages fail distinctly: resolution ("which file"),
/// transfer ("didn't arrive"), verification ("arrived corrupted").
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to resolve latest backup")]
    Resolve(#[from] ResolveError),
    #[error("failed to download backup")]
    Transfer(#[from] TransferError),
    #[error("backup failed verification")]
    Verify(#[from] VerifyError),
}

/// Resolves the newest artifact in `remote_dir`, downloads it into
/// `local_dir`, and verifies it. Returns the verified local path.
pub fn fetch_latest(
    remote: &dyn RemoteFs,
    remote_dir: &Path,
    local_dir: &Path,
    policy: ResolvePolicy,
) -> Result<PathBuf, FetchError> {
    let file_name = resolve_latest(remote, remote_dir, policy)?;
    tracing::info!(%file_name, "resolved latest backup artifact");
    let local_path = download(remote, &remote_dir.join(&file_name), local_dir)?;
    verify(&local_path)?;
    Ok(local_path)
}
