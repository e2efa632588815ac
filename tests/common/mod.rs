#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use progress_engine::engine::ProgressEngine;
use progress_engine::store::Store;

pub fn open_engine() -> (TempDir, ProgressEngine) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::open(dir.path().join("db").to_str().expect("db path"))
        .expect("open sled store");
    store.run_migrations().expect("run migrations");
    (dir, ProgressEngine::new(Arc::new(store)))
}

pub fn noon(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .expect("valid date")
}
