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

//! SCT Command Transport pages (ATA8-ACS).
//!
//! Temperatures are signed bytes in degrees Celsius; 0x80 marks a field the
//! drive does not report.

use crate::command::{Page, SECTOR_SIZE};

pub const INVALID_TEMP: u8 = 0x80;

const STATUS_VERSION_LOW: usize = 0;
const STATUS_VERSION_HIGH: usize = 1;
const STATUS_TEMP: usize = 200;
const STATUS_TEMP_LOWEST: usize = 201;
const STATUS_TEMP_HIGHEST: usize = 202;

const TABLE_TEMP_MAX: usize = 6;
const TABLE_TEMP_CRIT: usize = 7;
const TABLE_TEMP_MIN: usize = 8;
const TABLE_TEMP_LCRIT: usize = 9;

const DATA_TABLE_COMMAND: u8 = 5;
const DATA_TABLE_ACTION_READ: u8 = 1;
pub const TEMPERATURE_HISTORY_TABLE: u8 = 2;

/// Decode one signed temperature byte to millidegrees, honouring the sentinel.
pub fn temp_millidegrees(raw: u8) -> Option<i64> {
    if raw == INVALID_TEMP {
        return None;
    }
    Some(i64::from(raw as i8) * 1000)
}

/// Little-endian SCT status format version from bytes 0..2.
pub fn status_version(page: &Page) -> u16 {
    u16::from_le_bytes([page[STATUS_VERSION_LOW], page[STATUS_VERSION_HIGH]])
}

pub fn is_supported_version(version: u16) -> bool {
    version == 2 || version == 3
}

/// Temperatures reported in an SCT status log page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SctStatus {
    pub version: u16,
    pub current: Option<i64>,
    pub lowest: Option<i64>,
    pub highest: Option<i64>,
}

impl SctStatus {
    pub fn decode(page: &Page) -> Self {
        Self {
            version: status_version(page),
            current: temp_millidegrees(page[STATUS_TEMP]),
            lowest: temp_millidegrees(page[STATUS_TEMP_LOWEST]),
            highest: temp_millidegrees(page[STATUS_TEMP_HIGHEST]),
        }
    }
}

/// Limits from the temperature history data table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SctLimits {
    pub max: Option<i64>,
    pub crit: Option<i64>,
    pub min: Option<i64>,
    pub lcrit: Option<i64>,
}

impl SctLimits {
    pub fn decode(page: &Page) -> Self {
        Self {
            max: temp_millidegrees(page[TABLE_TEMP_MAX]),
            crit: temp_millidegrees(page[TABLE_TEMP_CRIT]),
            min: temp_millidegrees(page[TABLE_TEMP_MIN]),
            lcrit: temp_millidegrees(page[TABLE_TEMP_LCRIT]),
        }
    }
}

/// The key page written to log 0xe0 to select a data table for reading.
pub fn data_table_request(table_id: u8) -> Page {
    let mut page = [0u8; SECTOR_SIZE];
    page[0] = DATA_TABLE_COMMAND;
    page[2] = DATA_TABLE_ACTION_READ;
    page[4] = table_id;
    page
}
