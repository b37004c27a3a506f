/*
 * This file is part of Drivetemp.
 *
 * Copyright (C) 2025 Drivetemp contributors
 *
 * Drivetemp is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Drivetemp is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Drivetemp. If not, see <https://www.gnu.org/licenses/>.
 */

//! Optional JSON-lines event log of attach decisions and readings.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use lazy_static::lazy_static;
use serde_json::{json, Value};

pub const DEFAULT_LOG_PATH: &str = "/var/log/drivetemp/events.json";
const FALLBACK_LOG_PATH: &str = "/tmp/drivetemp_events.json";

lazy_static! {
    static ref LOG_FILE: Mutex<Option<File>> = Mutex::new(None);
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

fn open_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Start logging to `path` (or the default), falling back to /tmp.
/// Returns the path actually in use.
pub fn init_logging(path: Option<&Path>) -> Option<PathBuf> {
    let primary = path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH));
    let (file, used) = match open_append(&primary) {
        Ok(f) => (f, primary),
        Err(_) => {
            let fallback = PathBuf::from(FALLBACK_LOG_PATH);
            (open_append(&fallback).ok()?, fallback)
        }
    };
    match LOG_FILE.lock() {
        Ok(mut guard) => *guard = Some(file),
        Err(poisoned) => *poisoned.into_inner() = Some(file),
    }
    Some(used)
}

pub fn shutdown_logging() {
    match LOG_FILE.lock() {
        Ok(mut guard) => *guard = None,
        Err(poisoned) => *poisoned.into_inner() = None,
    }
}

pub fn is_enabled() -> bool {
    LOG_FILE.lock().map(|g| g.is_some()).unwrap_or(false)
}

/// Append one event line; a no-op until `init_logging` succeeded.
pub fn log_event(event: &str, data: Value) {
    let line = json!({
        "ts_ms": now_millis(),
        "event": event,
        "data": data,
    })
    .to_string();

    if let Ok(mut guard) = LOG_FILE.lock() {
        if let Some(f) = guard.as_mut() {
            let _ = writeln!(f, "{}", line);
        }
    }
}
