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

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DriveTempError, Result};
use crate::smart::SmartOptions;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub smart: SmartOptions,
    /// Kernel block device names to probe, e.g. "sda". Empty means all.
    pub devices: Vec<String>,
    /// Event log location used with --logging
    pub log_path: Option<PathBuf>,
}

pub fn config_path() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        return Path::new(&xdg).join("drivetemp").join("config.json");
    }
    if let Ok(home) = env::var("HOME") {
        return Path::new(&home)
            .join(".config")
            .join("drivetemp")
            .join("config.json");
    }
    PathBuf::from("/etc/drivetemp/config.json")
}

/// Load and validate `path`; a missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config> {
    let data = match fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(e) => return Err(e.into()),
    };
    let cfg: Config = serde_json::from_str(&data)?;
    validate_config(&cfg)?;
    Ok(cfg)
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path())
}

fn is_block_name(s: &str) -> bool {
    s.len() > 2
        && s.len() <= 16
        && s.starts_with("sd")
        && s[2..].chars().all(|c| c.is_ascii_lowercase())
}

pub fn validate_config(cfg: &Config) -> Result<()> {
    if cfg.devices.len() > 256 {
        return Err(DriveTempError::config("too many devices (max 256)"));
    }
    for (i, dev) in cfg.devices.iter().enumerate() {
        if !is_block_name(dev) {
            return Err(DriveTempError::config(format!(
                "device #{} ({:?}) must be a kernel disk name like 'sda'",
                i + 1,
                dev
            )));
        }
    }
    if let Some(path) = &cfg.log_path {
        if !path.is_absolute() {
            return Err(DriveTempError::config("log_path must be absolute"));
        }
    }
    Ok(())
}
