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

//! Drivetemp - temperature sensing for SATA drives behind a SCSI layer
//!
//! Drives are probed once with ATA PASS-THROUGH(16) commands to pick a
//! reporting mode (SCT Command Transport status, or the SMART attribute
//! table as a fallback). Afterwards each attached drive exposes
//! hwmon-style `temp1_*` channels in millidegrees Celsius.

pub mod command;
pub mod config;
pub mod error;
pub mod identify;
pub mod logger;
pub mod probe;
pub mod registry;
pub mod sct;
pub mod sensor;
pub mod sgio;
pub mod smart;
pub mod system;

#[cfg(test)]
pub mod test_utils;

pub use command::{AtaCommand, Direction, Page, Transport};
pub use error::{DriveTempError, Result};
pub use identify::DeviceIdentity;
pub use probe::{probe, CapabilityRecord, ReportingMode};
pub use registry::{AttachOutcome, DeviceHandle, Registry};
pub use sensor::{Metric, Reading, TemperatureSource};
pub use smart::SmartOptions;
