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

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::identify::DeviceIdentity;

#[derive(Debug, Clone)]
pub struct BlockDevice {
    /// Kernel name, e.g. "sda"
    pub name: String,
    pub dev_path: PathBuf,
    pub model: String,
    pub identity: DeviceIdentity,
}

fn read_trimmed<P: AsRef<Path>>(p: P) -> io::Result<String> {
    let mut s = String::new();
    fs::File::open(p)?.read_to_string(&mut s)?;
    Ok(s.trim().to_string())
}

/// Enumerate SCSI disks under `<root>/sys/block` with their cached identification.
pub fn scan_block_devices(root: &Path) -> io::Result<Vec<BlockDevice>> {
    let block = root.join("sys").join("block");
    let mut out = Vec::new();

    let entries = match fs::read_dir(&block) {
        Ok(it) => it,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(out),
        Err(e) => return Err(e),
    };

    for ent in entries.flatten() {
        let name = ent.file_name().to_string_lossy().to_string();
        if !name.starts_with("sd") {
            continue;
        }
        let device = ent.path().join("device");
        // No vendor file means no SCSI inquiry data; nothing to verify against.
        let Ok(vendor) = read_trimmed(device.join("vendor")) else { continue };
        let model = read_trimmed(device.join("model")).unwrap_or_default();
        let vpd = fs::read(device.join("vpd_pg89")).ok();

        out.push(BlockDevice {
            dev_path: root.join("dev").join(&name),
            name,
            model,
            identity: DeviceIdentity::new(&vendor, vpd),
        });
    }

    out.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(out)
}
