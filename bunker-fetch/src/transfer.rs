use crate::remote::RemoteFs;
use std::{
    fs, io,
    path::{Path, PathBuf},
};

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("could not create local directory {}", .dir.display())]
    CreateLocalDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("remote path {} has no file name", .path.display())]
    NoFileName { path: PathBuf },
    #[error("could not open remote file {}", .path.display())]
    OpenRemote {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not write local file {}", .path.display())]
    WriteLocal {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl TransferError {
    /// True when the remote file does not exist, e.g. the manifest points at
    /// an artifact that retention tooling has already deleted.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TransferError::OpenRemote { source, .. }
                if source.kind() == io::ErrorKind::NotFound
        )
    }
}

/// Streams `remote_path` byte-for-byte into a same-named file in `local_dir`
/// and returns the local path.
///
/// There is no partial-resume: a failed transfer leaves the incomplete local
/// file in place, and the caller is expected to remove it and rerun.
pub fn download(
    remote: &dyn RemoteFs,
    remote_path: &Path,
    local_dir: &Path,
) -> Result<PathBuf, TransferError> {
    fs::create_dir_all(local_dir).map_err(|e| TransferError::CreateLocalDir {
        dir: local_dir.to_owned(),
        source: e,
    })?;
    let file_name = remote_path
        .file_name()
        .ok_or_else(|| TransferError::NoFileName {
            path: remote_path.to_owned(),
        })?;
    let local_path = local_dir.join(file_name);

    let mut reader = remote
        .open_read(remote_path)
        .map_err(|e| TransferError::OpenRemote {
            path: remote_path.to_owned(),
            source: e,
        })?;
    let mut writer = fs::File::create(&local_path).map_err(|e| TransferError::WriteLocal {
        path: local_path.clone(),
        source: e,
    })?;
    let bytes = io::copy(&mut reader, &mut writer).map_err(|e| TransferError::WriteLocal {
        path: local_path.clone(),
        source: e,
    })?;

    tracing::info!(bytes, path = %local_path.display(), "downloaded backup artifact");
    Ok(local_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::LocalFs;

    #[test]
    fn should_copy_remote_file_into_local_dir() {
        let dir = tempfile::tempdir().unwrap();
        let remote_dir = dir.path().join("remote");
        let local_dir = dir.path().join("local");
        fs::create_dir_all(&remote_dir).unwrap();
        let remote_path = remote_dir.join("app.bck.gz");
        fs::write(&remote_path, vec![42u8; 4096]).unwrap();

        let local_path = download(&LocalFs, &remote_path, &local_dir).unwrap();

        assert_eq!(local_path, local_dir.join("app.bck.gz"));
        assert_eq!(fs::read(&local_path).unwrap(), vec![42u8; 4096]);
    }

    #[test]
    fn should_create_missing_local_dir() {
        let dir = tempfile::tempdir().unwrap();
        let remote_path = dir.path().join("app.bck.gz");
        fs::write(&remote_path, b"x").unwrap();
        let local_dir = dir.path().join("a/b/c");

        download(&LocalFs, &remote_path, &local_dir).unwrap();
        assert!(local_dir.join("app.bck.gz").exists());
    }

    #[test]
    fn should_report_not_found_for_deleted_remote_file() {
        let dir = tempfile::tempdir().unwrap();
        let remote_path = dir.path().join("gone.bck.gz");
        let local_dir = dir.path().join("local");

        let error = download(&LocalFs, &remote_path, &local_dir).unwrap_err();
        assert!(error.is_not_found());
    }
}
