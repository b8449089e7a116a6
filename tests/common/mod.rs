use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use chatline::history::sqlite::SCHEMA;

/// One logged row: (sender, is_self, kind, body, timestamp)
pub type Row<'a> = (&'a str, bool, &'a str, &'a str, i64);

#[allow(dead_code)]
pub fn temp_log_db(account: &str, partner: &str, rows: &[Row<'_>]) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("log.db");
    let conn = rusqlite::Connection::open(&db_path).expect("failed to open sqlite db");
    conn.execute_batch(SCHEMA).expect("failed to create schema");
    for (sender, is_self, kind, body, timestamp) in rows {
        conn.execute(
            "INSERT INTO events (account, partner, sender, is_self, kind, body, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![account, partner, sender, is_self, kind, body, timestamp],
        )
        .expect("failed to insert event");
    }
    (tmp, db_path)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
