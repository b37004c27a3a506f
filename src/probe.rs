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

//! One-shot feature detection run when a device is attached.
//!
//! The SCT Command Transport feature set is the primary source: it gives the
//! current temperature, historic lowest/highest and the configured limits.
//! SMART attributes are only a fallback, since their format is not well
//! defined. The result is a `CapabilityRecord` that never changes afterwards.

use serde::Serialize;
use tracing::{debug, warn};

use crate::command::{read_page, write_page, AtaCommand, Transport, SCT_READ_LOG_ADDR, SCT_STATUS_REQ_ADDR};
use crate::error::{DriveTempError, Result};
use crate::identify::{DeviceIdentity, IdentifyData};
use crate::sct::{self, SctLimits, SctStatus, TEMPERATURE_HISTORY_TABLE};
use crate::sensor::Metric;
use crate::smart::{self, SmartOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    Init,
    VerifyAta,
    DetectSctSupport,
    ReadSctStatus,
    ReadSctDataTable,
    Fallback,
    Done,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportingMode {
    /// Live reads from the SCT status log
    Sct,
    /// Live reads from SMART attribute 194/190
    SmartFallback,
    #[default]
    None,
}

/// What a device can report, decided once at attach time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapabilityRecord {
    mode: ReportingMode,
    has_lowest: bool,
    has_highest: bool,
    min: Option<i64>,
    max: Option<i64>,
    lcrit: Option<i64>,
    crit: Option<i64>,
}

impl CapabilityRecord {
    pub fn mode(&self) -> ReportingMode {
        self.mode
    }

    pub fn has_lowest(&self) -> bool {
        self.has_lowest
    }

    pub fn has_highest(&self) -> bool {
        self.has_highest
    }

    pub fn has_min(&self) -> bool {
        self.min.is_some()
    }

    pub fn has_max(&self) -> bool {
        self.max.is_some()
    }

    pub fn has_lcrit(&self) -> bool {
        self.lcrit.is_some()
    }

    pub fn has_crit(&self) -> bool {
        self.crit.is_some()
    }

    /// Whether `metric` may be read from this device at all.
    pub fn supports(&self, metric: Metric) -> bool {
        match metric {
            Metric::Input => self.mode != ReportingMode::None,
            Metric::Lowest => self.has_lowest,
            Metric::Highest => self.has_highest,
            Metric::Min => self.has_min(),
            Metric::Max => self.has_max(),
            Metric::Lcrit => self.has_lcrit(),
            Metric::Crit => self.has_crit(),
        }
    }

    /// Cached limit in millidegrees; `None` for live metrics.
    pub fn limit(&self, metric: Metric) -> Option<i64> {
        match metric {
            Metric::Min => self.min,
            Metric::Max => self.max,
            Metric::Lcrit => self.lcrit,
            Metric::Crit => self.crit,
            Metric::Input | Metric::Lowest | Metric::Highest => None,
        }
    }
}

/// Drives the probe state machine against one device.
pub struct DeviceProbe<'a, T: Transport + ?Sized> {
    transport: &'a mut T,
    identity: &'a DeviceIdentity,
    options: SmartOptions,
    state: ProbeState,
    identify: Option<IdentifyData>,
    sct_data_tables: bool,
    record: CapabilityRecord,
}

impl<'a, T: Transport + ?Sized> DeviceProbe<'a, T> {
    pub fn new(transport: &'a mut T, identity: &'a DeviceIdentity, options: SmartOptions) -> Self {
        Self {
            transport,
            identity,
            options,
            state: ProbeState::Init,
            identify: None,
            sct_data_tables: false,
            record: CapabilityRecord::default(),
        }
    }

    pub fn state(&self) -> ProbeState {
        self.state
    }

    /// Run one state and move to the next. Errors are terminal.
    pub fn step(&mut self) -> Result<ProbeState> {
        let next = match self.state {
            ProbeState::Init => ProbeState::VerifyAta,
            ProbeState::VerifyAta => {
                self.identify = self.identity.verify_ata()?;
                ProbeState::DetectSctSupport
            }
            ProbeState::DetectSctSupport => self.detect_sct_support(),
            ProbeState::ReadSctStatus => self.read_sct_status(),
            ProbeState::ReadSctDataTable => {
                self.read_sct_data_table();
                ProbeState::Done
            }
            ProbeState::Fallback => {
                self.fallback()?;
                ProbeState::Done
            }
            ProbeState::Done => ProbeState::Done,
        };
        if next != self.state {
            debug!(from = ?self.state, to = ?next, "probe transition");
        }
        self.state = next;
        Ok(next)
    }

    /// Run to completion and freeze the result.
    pub fn run(mut self) -> Result<CapabilityRecord> {
        while self.step()? != ProbeState::Done {}
        Ok(self.record)
    }

    fn detect_sct_support(&mut self) -> ProbeState {
        // Prefer the IDENTIFY copy libata put in the VPD page; otherwise ask the drive.
        let id = match self.identify.take() {
            Some(id) => Some(id),
            None => match read_page(&mut *self.transport, AtaCommand::identify_device()) {
                Ok(page) => Some(IdentifyData::from_page(&page)),
                Err(e) => {
                    debug!("IDENTIFY DEVICE failed, skipping SCT: {}", e);
                    None
                }
            },
        };

        let Some(id) = id else {
            return ProbeState::Fallback;
        };
        self.sct_data_tables = id.sct_data_tables_supported();
        if id.sct_status_supported() {
            ProbeState::ReadSctStatus
        } else {
            ProbeState::Fallback
        }
    }

    fn read_sct_status(&mut self) -> ProbeState {
        let page = match read_page(&mut *self.transport, AtaCommand::read_log(SCT_STATUS_REQ_ADDR)) {
            Ok(page) => page,
            Err(e) => {
                debug!("SCT status read failed: {}", e);
                return ProbeState::Fallback;
            }
        };

        let status = SctStatus::decode(&page);
        if !sct::is_supported_version(status.version) {
            debug!("unsupported SCT status version {}", status.version);
            return ProbeState::Fallback;
        }
        if status.current.is_none() {
            debug!("SCT status reports no current temperature");
            return ProbeState::Fallback;
        }

        self.record.mode = ReportingMode::Sct;
        self.record.has_lowest = status.lowest.is_some();
        self.record.has_highest = status.highest.is_some();

        if self.sct_data_tables {
            ProbeState::ReadSctDataTable
        } else {
            ProbeState::Done
        }
    }

    fn read_sct_data_table(&mut self) {
        // Failure here only costs the optional limits.
        match self.read_limits() {
            Ok(limits) => {
                self.record.max = limits.max;
                self.record.crit = limits.crit;
                self.record.min = limits.min;
                self.record.lcrit = limits.lcrit;
            }
            Err(e) => warn!("temperature history table unavailable, limits dropped: {}", e),
        }
    }

    fn read_limits(&mut self) -> Result<SctLimits> {
        let request = sct::data_table_request(TEMPERATURE_HISTORY_TABLE);
        write_page(&mut *self.transport, AtaCommand::write_log(SCT_STATUS_REQ_ADDR), &request)?;
        let page = read_page(&mut *self.transport, AtaCommand::read_log(SCT_READ_LOG_ADDR))?;
        Ok(SctLimits::decode(&page))
    }

    fn fallback(&mut self) -> Result<()> {
        let temp = read_page(&mut *self.transport, AtaCommand::smart_read_values())
            .and_then(|page| smart::decode_temperature(&page, &self.options));
        match temp {
            Ok(_) => {
                self.record = CapabilityRecord {
                    mode: ReportingMode::SmartFallback,
                    ..CapabilityRecord::default()
                };
                Ok(())
            }
            Err(e) => {
                debug!("SMART fallback failed: {}", e);
                Err(DriveTempError::NoSensor)
            }
        }
    }
}

/// Probe a device once and return its frozen capabilities.
pub fn probe<T: Transport + ?Sized>(
    transport: &mut T,
    identity: &DeviceIdentity,
    options: SmartOptions,
) -> Result<CapabilityRecord> {
    DeviceProbe::new(transport, identity, options).run()
}
