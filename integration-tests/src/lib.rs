use bunker_core::{Config, Strategy};
use rusqlite::Connection;
use std::{path::Path, time::Duration};

pub fn seed_database(path: &Path, rows: usize) -> eyre::Result<()> {
    let conn = Connection::open(path)?;
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS entries (id INTEGER PRIMARY KEY, payload BLOB NOT NULL)",
    )?;
    let payload = vec![0x42u8; 1024];
    conn.execute_batch("BEGIN")?;
    for _ in 0..rows {
        conn.execute("INSERT INTO entries (payload) VALUES (?1)", [&payload])?;
    }
    conn.execute_batch("COMMIT")?;
    Ok(())
}

pub fn count_rows(path: &Path) -> eyre::Result<i64> {
    let conn = Connection::open(path)?;
    let rows = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
    Ok(rows)
}

pub fn backup_config(source: &Path, backup_dir: &Path, strategy: Strategy) -> Config {
    Config {
        source_path: source.to_owned(),
        backup_dir: backup_dir.to_owned(),
        strategy,
        pages_per_step: 8,
        sleep_interval: Duration::ZERO,
        progress_log_interval: Duration::from_secs(15),
    }
}
