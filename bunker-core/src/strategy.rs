use crate::{
    cancel::CancelFlag,
    config::{Config, ConfigError, Strategy},
    progress::ProgressReporter,
};
use rusqlite::{
    backup::{Backup, StepResult},
    Connection, OpenFlags,
};
use std::{os::raw::c_int, path::Path, path::PathBuf, thread};

/// Summary of one completed copy, mostly useful for logging and tests.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct CopyStats {
    pub total_pages: u64,
    pub steps: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to open source database {}", .path.display())]
    OpenSource {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to create destination database {}", .path.display())]
    OpenDestination {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to read page count of {}", .path.display())]
    PageCount {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("vacuum into {} failed", .path.display())]
    Vacuum {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("backup step failed")]
    Step(#[source] rusqlite::Error),
    #[error("backup cancelled")]
    Cancelled,
}

/// Produces a consistent point-in-time copy of the configured source database
/// at `dest`, using the configured strategy. Every error is fatal to the run;
/// retry policy belongs to the scheduler that triggered it.
pub fn create_consistent_copy(
    config: &Config,
    dest: &Path,
    cancel: &CancelFlag,
) -> Result<CopyStats, BackupError> {
    config.validate()?;
    match config.strategy {
        Strategy::Vacuum => vacuum_into(&config.source_path, dest),
        Strategy::Online => online_backup(config, dest, cancel),
    }
}

fn open_source_read_only(path: &Path) -> Result<Connection, BackupError> {
    Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(|e| {
        BackupError::OpenSource {
            path: path.to_owned(),
            source: e,
        }
    })
}

fn source_page_count(conn: &Connection, path: &Path) -> Result<u64, BackupError> {
    let pages: i64 = conn
        .query_row("PRAGMA page_count", [], |row| row.get(0))
        .map_err(|e| BackupError::PageCount {
            path: path.to_owned(),
            source: e,
        })?;
    Ok(pages as u64)
}

/// `VACUUM INTO`: one statement, defragmented minimal-size output. Holds a
/// read lock on the source for the full copy, so concurrent writers block
/// until it finishes.
fn vacuum_into(source: &Path, dest: &Path) -> Result<CopyStats, BackupError> {
    tracing::info!("starting vacuum backup, source writers are blocked until the copy finishes");
    let conn = open_source_read_only(source)?;
    let total_pages = source_page_count(&conn, source)?;
    conn.execute("VACUUM INTO ?1", [dest.to_string_lossy()])
        .map_err(|e| BackupError::Vacuum {
            path: dest.to_owned(),
            source: e,
        })?;
    Ok(CopyStats {
        total_pages,
        steps: 1,
    })
}

/// Incremental copy via the SQLite backup API. Each step copies at most
/// `pages_per_step` pages and is its own short critical section; the loop
/// sleeps `sleep_interval` between steps and logs progress at least every
/// `progress_log_interval`.
fn online_backup(config: &Config, dest: &Path, cancel: &CancelFlag) -> Result<CopyStats, BackupError> {
    tracing::info!("starting online backup, slower but does not block source writers");

    let src = open_source_read_only(&config.source_path)?;
    let total_pages = source_page_count(&src, &config.source_path)?;
    let mut dst = Connection::open(dest).map_err(|e| BackupError::OpenDestination {
        path: dest.to_owned(),
        source: e,
    })?;

    if total_pages == 0 {
        tracing::info!("source database has no pages, nothing to copy");
        return Ok(CopyStats {
            total_pages: 0,
            steps: 0,
        });
    }

    let backup = Backup::new(&src, &mut dst).map_err(BackupError::Step)?;
    // SQLite treats a negative page count as "copy everything"
    let pages_per_step = c_int::try_from(config.pages_per_step).unwrap_or(c_int::MAX);
    let mut reporter = ProgressReporter::new(config.progress_log_interval);
    let mut steps = 0u64;
    tracing::info!(
        pages_per_step = config.pages_per_step,
        sleep_interval = ?config.sleep_interval,
        progress_log_interval = ?config.progress_log_interval,
        "starting online backup copy"
    );

    loop {
        if cancel.is_cancelled() {
            return Err(BackupError::Cancelled);
        }

        let result = backup.step(pages_per_step).map_err(BackupError::Step)?;
        match result {
            StepResult::Done => {
                steps += 1;
                let progress = backup.progress();
                tracing::info!(
                    steps,
                    total_pages = progress.pagecount,
                    "online backup copy completed"
                );
                return Ok(CopyStats {
                    total_pages: progress.pagecount as u64,
                    steps,
                });
            }
            StepResult::More => {
                steps += 1;
                if reporter.due() {
                    let progress = backup.progress();
                    let copied = progress.pagecount - progress.remaining;
                    let percent = (copied as f64 / progress.pagecount as f64) * 100.0;
                    tracing::info!(
                        pages_copied = copied,
                        total_pages = progress.pagecount,
                        progress_percent = %format!("{percent:.2}%"),
                        "online backup in progress"
                    );
                }
            }
            // Busy and Locked mean the source is momentarily busy; the page
            // is retried next step. Unknown results get the same treatment.
            other => {
                tracing::debug!(step_result = ?other, "step made no progress, retrying");
            }
        }

        if !config.sleep_interval.is_zero() {
            thread::sleep(config.sleep_interval);
        }
    }
}
