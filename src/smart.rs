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

//! SMART READ VALUES attribute table decoding.
//!
//! Temperature attributes:
//! - 194: device temperature, lowest raw byte in degrees C. Always preferred.
//! - 190: airflow temperature on most drives, same encoding. Used when 194 is absent.
//! - 231: temperature on a few pre-2010 drives, SSD life left on many others.
//!   Only consulted when explicitly enabled.
//!
//! The fractional byte and vendor-specific limit bytes are ignored.

use serde::{Deserialize, Serialize};

use crate::command::Page;
use crate::error::{DriveTempError, Result};

pub const MAX_SMART_ATTRS: usize = 30;
pub const ATTR_RECORD_LEN: usize = 12;

pub const ATTR_TEMPERATURE: u8 = 194;
pub const ATTR_AIRFLOW_TEMPERATURE: u8 = 190;
pub const ATTR_LEGACY_TEMPERATURE: u8 = 231;

// Offsets relative to the start of the i-th 12-byte stride; the 2-byte table
// revision header shifts each attribute by two.
const ATTR_ID: usize = 2;
const ATTR_RAW_LOW: usize = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SmartOptions {
    /// Accept attribute 231 as a temperature source when 194 and 190 are absent.
    pub trust_attribute_231: bool,
}

/// One attribute slot of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeRecord {
    pub id: u8,
    pub raw_low: u8,
}

impl AttributeRecord {
    fn at(page: &Page, index: usize) -> Self {
        let base = index * ATTR_RECORD_LEN;
        Self {
            id: page[base + ATTR_ID],
            raw_low: page[base + ATTR_RAW_LOW],
        }
    }
}

/// Byte sum of the whole page; valid tables sum to zero.
pub fn checksum(page: &Page) -> u8 {
    page.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Iterate the non-empty attribute slots.
pub fn attributes(page: &Page) -> impl Iterator<Item = AttributeRecord> + '_ {
    (0..MAX_SMART_ATTRS)
        .map(move |i| AttributeRecord::at(page, i))
        .filter(|attr| attr.id != 0)
}

/// Decode the drive temperature in millidegrees from a SMART values page.
pub fn decode_temperature(page: &Page, opts: &SmartOptions) -> Result<i64> {
    let sum = checksum(page);
    if sum != 0 {
        return Err(DriveTempError::ChecksumError { sum });
    }

    let mut airflow: Option<u8> = None;
    let mut legacy: Option<u8> = None;
    for attr in attributes(page) {
        match attr.id {
            ATTR_TEMPERATURE => return Ok(i64::from(attr.raw_low) * 1000),
            ATTR_AIRFLOW_TEMPERATURE => airflow = Some(attr.raw_low),
            ATTR_LEGACY_TEMPERATURE if opts.trust_attribute_231 => legacy = Some(attr.raw_low),
            _ => {}
        }
    }

    airflow
        .or(legacy)
        .map(|raw| i64::from(raw) * 1000)
        .ok_or(DriveTempError::NoSensor)
}
