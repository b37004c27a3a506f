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

use std::fmt;

use parking_lot::Mutex;
use serde::Serialize;

use crate::command::{read_page, AtaCommand, Transport, SCT_STATUS_REQ_ADDR};
use crate::error::{DriveTempError, Result};
use crate::identify::DeviceIdentity;
use crate::probe::{self, CapabilityRecord, ReportingMode};
use crate::sct::SctStatus;
use crate::smart::{self, SmartOptions};

/// Mode bits for a readable hwmon attribute.
pub const VISIBLE_MODE: u32 = 0o444;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Input,
    Lowest,
    Highest,
    Min,
    Max,
    Lcrit,
    Crit,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Input,
        Metric::Lowest,
        Metric::Highest,
        Metric::Min,
        Metric::Max,
        Metric::Lcrit,
        Metric::Crit,
    ];

    /// Read from the drive on every request rather than from the probe cache.
    pub fn is_live(self) -> bool {
        matches!(self, Metric::Input | Metric::Lowest | Metric::Highest)
    }

    /// hwmon attribute name for the single temperature channel
    pub fn attribute_name(self) -> &'static str {
        match self {
            Metric::Input => "temp1_input",
            Metric::Lowest => "temp1_lowest",
            Metric::Highest => "temp1_highest",
            Metric::Min => "temp1_min",
            Metric::Max => "temp1_max",
            Metric::Lcrit => "temp1_lcrit",
            Metric::Crit => "temp1_crit",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attribute_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reading {
    pub metric: Metric,
    /// millidegree C
    pub value: i64,
}

/// Temperature channel of one probed drive.
///
/// The transport sits behind a per-device lock so concurrent readers never
/// interleave commands on the same drive.
pub struct TemperatureSource<T> {
    transport: Mutex<T>,
    caps: CapabilityRecord,
    options: SmartOptions,
}

impl<T: Transport> TemperatureSource<T> {
    pub fn new(transport: T, caps: CapabilityRecord, options: SmartOptions) -> Self {
        Self {
            transport: Mutex::new(transport),
            caps,
            options,
        }
    }

    /// Probe `transport` and wrap it if the drive has a usable sensor.
    pub fn probe(mut transport: T, identity: &DeviceIdentity, options: SmartOptions) -> Result<Self> {
        let caps = probe::probe(&mut transport, identity, options)?;
        Ok(Self::new(transport, caps, options))
    }

    pub fn capabilities(&self) -> &CapabilityRecord {
        &self.caps
    }

    /// hwmon-style visibility: 0444 for readable metrics, 0 otherwise.
    pub fn is_visible(&self, metric: Metric) -> u32 {
        if self.caps.supports(metric) {
            VISIBLE_MODE
        } else {
            0
        }
    }

    pub fn visible_metrics(&self) -> Vec<Metric> {
        Metric::ALL.into_iter().filter(|m| self.caps.supports(*m)).collect()
    }

    /// Read one metric in millidegrees Celsius.
    pub fn read(&self, metric: Metric) -> Result<i64> {
        if !metric.is_live() {
            return self
                .caps
                .limit(metric)
                .ok_or(DriveTempError::UnsupportedAttribute(metric));
        }

        match self.caps.mode() {
            ReportingMode::Sct => {
                if !self.caps.supports(metric) {
                    return Err(DriveTempError::UnsupportedAttribute(metric));
                }
                let status = self.read_sct_status()?;
                live_sct_value(&status, metric).ok_or(DriveTempError::UnsupportedAttribute(metric))
            }
            ReportingMode::SmartFallback => match metric {
                Metric::Input => self.read_smart_temperature(),
                _ => Err(DriveTempError::UnsupportedAttribute(metric)),
            },
            ReportingMode::None => Err(DriveTempError::NoSensor),
        }
    }

    /// Every visible metric, with a single live command for input/lowest/highest.
    ///
    /// Live metrics whose field turned into the sentinel since probing are left out.
    pub fn read_all(&self) -> Result<Vec<Reading>> {
        let mut out = Vec::new();
        match self.caps.mode() {
            ReportingMode::Sct => {
                let status = self.read_sct_status()?;
                for metric in [Metric::Input, Metric::Lowest, Metric::Highest] {
                    if !self.caps.supports(metric) {
                        continue;
                    }
                    if let Some(value) = live_sct_value(&status, metric) {
                        out.push(Reading { metric, value });
                    }
                }
            }
            ReportingMode::SmartFallback => {
                let value = self.read_smart_temperature()?;
                out.push(Reading { metric: Metric::Input, value });
            }
            ReportingMode::None => return Err(DriveTempError::NoSensor),
        }

        for metric in [Metric::Min, Metric::Max, Metric::Lcrit, Metric::Crit] {
            if let Some(value) = self.caps.limit(metric) {
                out.push(Reading { metric, value });
            }
        }
        Ok(out)
    }

    fn read_sct_status(&self) -> Result<SctStatus> {
        let page = {
            let mut transport = self.transport.lock();
            read_page(&mut *transport, AtaCommand::read_log(SCT_STATUS_REQ_ADDR))?
        };
        Ok(SctStatus::decode(&page))
    }

    fn read_smart_temperature(&self) -> Result<i64> {
        let page = {
            let mut transport = self.transport.lock();
            read_page(&mut *transport, AtaCommand::smart_read_values())?
        };
        smart::decode_temperature(&page, &self.options)
    }
}

fn live_sct_value(status: &SctStatus, metric: Metric) -> Option<i64> {
    match metric {
        Metric::Input => status.current,
        Metric::Lowest => status.lowest,
        Metric::Highest => status.highest,
        _ => None,
    }
}
