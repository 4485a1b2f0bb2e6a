use crate::config::Strategy;
use std::{fs, io, path::Path};
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};

/// Pointer file in the backup directory naming the latest artifact.
pub const MANIFEST_FILE_NAME: &str = "latest.txt";

/// Suffix shared by all backup artifacts.
pub const ARTIFACT_SUFFIX: &str = ".bck.gz";

/// Filesystem-safe UTC timestamp at second precision. Zero padding makes
/// lexicographic order of artifact names equal to chronological order, which
/// the directory-listing resolution policy relies on.
const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]-[minute]-[second]Z");

/// Derives the artifact file name for a backup of `source_path` taken at
/// `timestamp`: `<stem>-<timestamp>-<strategy>.bck.gz`.
///
/// Two runs in different seconds never collide; two runs with the same
/// strategy within the same second are not distinguished.
pub fn artifact_name(source_path: &Path, strategy: Strategy, timestamp: OffsetDateTime) -> String {
    let stem = source_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "backup".to_string());
    let timestamp = timestamp
        .format(TIMESTAMP_FORMAT)
        .expect("timestamp format is statically valid");
    format!("{stem}-{timestamp}-{strategy}{ARTIFACT_SUFFIX}")
}

/// Overwrites the manifest pointer with `artifact_name`. Callers must only
/// invoke this once the named artifact is fully written; readers that catch
/// the overwrite mid-write are expected to retry.
pub fn write_pointer(backup_dir: &Path, artifact_name: &str) -> io::Result<()> {
    fs::write(backup_dir.join(MANIFEST_FILE_NAME), artifact_name)
}
