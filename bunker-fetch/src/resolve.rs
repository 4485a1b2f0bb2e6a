use crate::remote::RemoteFs;
use bunker_core::manifest::{ARTIFACT_SUFFIX, MANIFEST_FILE_NAME};
use std::{
    io,
    io::Read,
    path::{Path, PathBuf},
};

/// How the newest artifact in a remote backup directory is named. Chosen once
/// per deployment, not a runtime fallback chain.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResolvePolicy {
    /// Read the `latest.txt` pointer and use its contents verbatim.
    Manifest,
    /// Take the lexicographically greatest artifact name; valid because the
    /// zero-padded UTC timestamp makes lexicographic order chronological.
    Lexicographic,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("could not read manifest pointer {}", .path.display())]
    ManifestUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("manifest pointer {} is empty", .path.display())]
    ManifestEmpty { path: PathBuf },
    #[error("could not list backup directory {}", .dir.display())]
    ListFailed {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no backup artifacts in {}", .dir.display())]
    NoArtifacts { dir: PathBuf },
}

/// Names the newest backup artifact in `dir`. A read that races the
/// producer's pointer overwrite can fail transiently; callers retry rather
/// than lock.
pub fn resolve_latest(
    remote: &dyn RemoteFs,
    dir: &Path,
    policy: ResolvePolicy,
) -> Result<String, ResolveError> {
    match policy {
        ResolvePolicy::Manifest => resolve_from_manifest(remote, dir),
        ResolvePolicy::Lexicographic => resolve_from_listing(remote, dir),
    }
}

fn resolve_from_manifest(remote: &dyn RemoteFs, dir: &Path) -> Result<String, ResolveError> {
    let path = dir.join(MANIFEST_FILE_NAME);
    let mut reader = remote
        .open_read(&path)
        .map_err(|e| ResolveError::ManifestUnreadable {
            path: path.clone(),
            source: e,
        })?;
    let mut contents = String::new();
    reader
        .read_to_string(&mut contents)
        .map_err(|e| ResolveError::ManifestUnreadable {
            path: path.clone(),
            source: e,
        })?;
    let name = contents.trim();
    if name.is_empty() {
        return Err(ResolveError::ManifestEmpty { path });
    }
    Ok(name.to_owned())
}

fn resolve_from_listing(remote: &dyn RemoteFs, dir: &Path) -> Result<String, ResolveError> {
    let entries = remote.list_dir(dir).map_err(|e| ResolveError::ListFailed {
        dir: dir.to_owned(),
        source: e,
    })?;
    entries
        .into_iter()
        .filter(|name| name.ends_with(ARTIFACT_SUFFIX))
        .max()
        .ok_or_else(|| ResolveError::NoArtifacts {
            dir: dir.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::LocalFs;
    use std::fs;

    #[test]
    fn manifest_policy_should_return_pointer_contents() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(MANIFEST_FILE_NAME),
            "app-2023-02-05T09-07-03Z-vacuum.bck.gz\n",
        )
        .unwrap();

        let name = resolve_latest(&LocalFs, dir.path(), ResolvePolicy::Manifest).unwrap();
        assert_eq!(name, "app-2023-02-05T09-07-03Z-vacuum.bck.gz");
    }

    #[test]
    fn manifest_policy_should_fail_on_missing_pointer() {
        let dir = tempfile::tempdir().unwrap();
        let result = resolve_latest(&LocalFs, dir.path(), ResolvePolicy::Manifest);
        assert!(matches!(result, Err(ResolveError::ManifestUnreadable { .. })));
    }

    #[test]
    fn manifest_policy_should_fail_on_empty_pointer() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE_NAME), "\n").unwrap();

        let result = resolve_latest(&LocalFs, dir.path(), ResolvePolicy::Manifest);
        assert!(matches!(result, Err(ResolveError::ManifestEmpty { .. })));
    }

    #[test]
    fn lexicographic_policy_should_pick_the_chronologically_latest() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "app-2023-02-05T09-07-03Z-vacuum.bck.gz",
            "app-2023-11-01T00-00-00Z-online.bck.gz",
            "app-2022-12-31T23-59-59Z-vacuum.bck.gz",
        ] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let name = resolve_latest(&LocalFs, dir.path(), ResolvePolicy::Lexicographic).unwrap();
        assert_eq!(name, "app-2023-11-01T00-00-00Z-online.bck.gz");
    }

    #[test]
    fn lexicographic_policy_should_ignore_non_artifact_entries() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE_NAME), b"x").unwrap();
        fs::write(dir.path().join("zzz.bck.gz.part"), b"x").unwrap();
        fs::write(
            dir.path().join("app-2023-02-05T09-07-03Z-vacuum.bck.gz"),
            b"x",
        )
        .unwrap();

        let name = resolve_latest(&LocalFs, dir.path(), ResolvePolicy::Lexicographic).unwrap();
        assert_eq!(name, "app-2023-02-05T09-07-03Z-vacuum.bck.gz");
    }

    #[test]
    fn lexicographic_policy_should_fail_on_directory_without_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let result = resolve_latest(&LocalFs, dir.path(), ResolvePolicy::Lexicographic);
        assert!(matches!(result, Err(ResolveError::NoArtifacts { .. })));
    }
}
