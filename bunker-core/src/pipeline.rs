use crate::{
    cancel::CancelFlag,
    compress,
    config::Config,
    manifest,
    strategy::{self, BackupError},
};
use std::{fs, io, path::PathBuf};
use time::OffsetDateTime;

/// One published backup: the compressed file the manifest pointer names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("backup creation failed")]
    Create(#[from] BackupError),
    #[error("failed to create backup directory {}", .path.display())]
    CreateBackupDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to create temporary directory")]
    TempDir(#[source] io::Error),
    #[error("failed to compress backup to {}", .path.display())]
    Compress {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to publish artifact {}", .path.display())]
    Publish {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to update manifest pointer in {}", .path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Runs one full backup: consistent copy into a scratch directory, gzip into
/// the backup directory, then manifest pointer update as the commit point.
///
/// Either a new artifact exists and `latest.txt` names it, or neither exists.
/// The scratch copy is removed when the run ends, success or failure. Callers
/// must not run two backups against the same backup directory concurrently;
/// the invoking scheduler is expected to serialize triggers.
pub fn run_backup(config: &Config, cancel: &CancelFlag) -> Result<Artifact, RunError> {
    config.validate().map_err(BackupError::from)?;

    let file_name = manifest::artifact_name(
        &config.source_path,
        config.strategy,
        OffsetDateTime::now_utc(),
    );
    let artifact_path = config.backup_dir.join(&file_name);
    tracing::info!(
        source = %config.source_path.display(),
        strategy = %config.strategy,
        destination = %artifact_path.display(),
        "starting database backup"
    );

    fs::create_dir_all(&config.backup_dir).map_err(|e| RunError::CreateBackupDir {
        path: config.backup_dir.clone(),
        source: e,
    })?;

    // removed on drop, so the raw copy never outlives the attempt
    let temp_dir = tempfile::Builder::new()
        .prefix("bunker-")
        .tempdir()
        .map_err(RunError::TempDir)?;
    let temp_copy = temp_dir.path().join("backup.db");

    let stats = strategy::create_consistent_copy(config, &temp_copy, cancel)?;
    tracing::info!(total_pages = stats.total_pages, "created temporary backup copy");

    // a vacuum copy runs as one engine statement and cannot observe the flag
    // itself, so cancellation is honored here before anything is published
    if cancel.is_cancelled() {
        return Err(BackupError::Cancelled.into());
    }

    // compress to a .part file in the backup directory and publish by rename,
    // so a half-written file never carries an artifact name
    let part_path = config.backup_dir.join(format!("{file_name}.part"));
    if let Err(e) = compress::compress_file(&temp_copy, &part_path) {
        let _ = fs::remove_file(&part_path);
        return Err(RunError::Compress {
            path: part_path,
            source: e,
        });
    }
    if cancel.is_cancelled() {
        let _ = fs::remove_file(&part_path);
        return Err(BackupError::Cancelled.into());
    }
    if let Err(e) = fs::rename(&part_path, &artifact_path) {
        let _ = fs::remove_file(&part_path);
        return Err(RunError::Publish {
            path: artifact_path,
            source: e,
        });
    }
    tracing::info!(artifact = %file_name, "compressed backup published");

    if let Err(e) = manifest::write_pointer(&config.backup_dir, &file_name) {
        let _ = fs::remove_file(&artifact_path);
        return Err(RunError::Manifest {
            path: config.backup_dir.join(manifest::MANIFEST_FILE_NAME),
            source: e,
        });
    }

    tracing::info!("database backup completed successfully");
    Ok(Artifact {
        file_name,
        path: artifact_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Strategy;
    use rusqlite::Connection;
    use std::{path::Path, time::Duration};

    fn config(source: &Path, backup_dir: &Path, strategy: Strategy) -> Config {
        Config {
            source_path: source.to_owned(),
            backup_dir: backup_dir.to_owned(),
            strategy,
            pages_per_step: 10,
            sleep_interval: Duration::ZERO,
            progress_log_interval: Duration::from_secs(15),
        }
    }

    fn create_source_db(path: &Path, rows: usize) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE entries (id INTEGER PRIMARY KEY, payload BLOB NOT NULL)",
        )
        .unwrap();
        let payload = vec![0x5au8; 512];
        for _ in 0..rows {
            conn.execute("INSERT INTO entries (payload) VALUES (?1)", [&payload])
                .unwrap();
        }
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut entries: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        entries.sort();
        entries
    }

    #[test]
    fn should_publish_artifact_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("app.db");
        let backup_dir = dir.path().join("backups");
        create_source_db(&source, 50);

        let artifact = run_backup(
            &config(&source, &backup_dir, Strategy::Vacuum),
            &CancelFlag::new(),
        )
        .unwrap();

        assert!(artifact.path.exists());
        assert!(artifact.file_name.starts_with("app-"));
        assert!(artifact.file_name.ends_with("-vacuum.bck.gz"));
        let pointer =
            fs::read_to_string(backup_dir.join(manifest::MANIFEST_FILE_NAME)).unwrap();
        assert_eq!(pointer, artifact.file_name);
        // exactly the artifact and the pointer, no scratch leftovers
        assert_eq!(
            dir_entries(&backup_dir),
            vec![artifact.file_name.clone(), manifest::MANIFEST_FILE_NAME.to_string()]
        );
    }

    #[test]
    fn published_artifact_should_decompress_to_a_working_database() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("app.db");
        let backup_dir = dir.path().join("backups");
        create_source_db(&source, 50);

        let artifact = run_backup(
            &config(&source, &backup_dir, Strategy::Online),
            &CancelFlag::new(),
        )
        .unwrap();

        let restored = dir.path().join("restored.db");
        compress::decompress_file(&artifact.path, &restored).unwrap();
        let conn = Connection::open(&restored).unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 50);
    }

    #[test]
    fn invalid_config_should_fail_before_creating_any_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("app.db");
        let backup_dir = dir.path().join("backups");
        create_source_db(&source, 5);
        let mut config = config(&source, &backup_dir, Strategy::Online);
        config.pages_per_step = 0;

        let result = run_backup(&config, &CancelFlag::new());

        assert!(matches!(
            result,
            Err(RunError::Create(BackupError::Config(_)))
        ));
        assert!(!backup_dir.exists());
    }

    #[test]
    fn failed_run_should_leave_no_artifact_and_no_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("missing.db");
        let backup_dir = dir.path().join("backups");

        let result = run_backup(
            &config(&source, &backup_dir, Strategy::Vacuum),
            &CancelFlag::new(),
        );

        assert!(matches!(
            result,
            Err(RunError::Create(BackupError::OpenSource { .. }))
        ));
        assert_eq!(dir_entries(&backup_dir), Vec::<String>::new());
    }

    #[test]
    fn cancelled_run_should_leave_manifest_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("app.db");
        let backup_dir = dir.path().join("backups");
        create_source_db(&source, 50);
        let cancel = CancelFlag::new();
        cancel.cancel();

        let result = run_backup(&config(&source, &backup_dir, Strategy::Online), &cancel);

        assert!(matches!(
            result,
            Err(RunError::Create(BackupError::Cancelled))
        ));
        assert!(!backup_dir.join(manifest::MANIFEST_FILE_NAME).exists());
        assert_eq!(dir_entries(&backup_dir), Vec::<String>::new());
    }

    #[test]
    fn cancelled_vacuum_run_should_not_publish_artifact_or_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("app.db");
        let backup_dir = dir.path().join("backups");
        create_source_db(&source, 50);
        let cancel = CancelFlag::new();
        cancel.cancel();

        let result = run_backup(&config(&source, &backup_dir, Strategy::Vacuum), &cancel);

        assert!(matches!(
            result,
            Err(RunError::Create(BackupError::Cancelled))
        ));
        assert!(!backup_dir.join(manifest::MANIFEST_FILE_NAME).exists());
        assert_eq!(dir_entries(&backup_dir), Vec::<String>::new());
    }

    #[test]
    fn empty_source_should_still_publish_a_valid_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("empty.db");
        let backup_dir = dir.path().join("backups");
        fs::File::create(&source).unwrap();

        let artifact = run_backup(
            &config(&source, &backup_dir, Strategy::Online),
            &CancelFlag::new(),
        )
        .unwrap();

        assert!(artifact.path.exists());
        let pointer =
            fs::read_to_string(backup_dir.join(manifest::MANIFEST_FILE_NAME)).unwrap();
        assert_eq!(pointer, artifact.file_name);
    }
}
