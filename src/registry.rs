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

//! Attached drives, keyed by an opaque handle chosen by the caller.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use crate::command::Transport;
use crate::error::Result;
use crate::identify::DeviceIdentity;
use crate::logger;
use crate::sensor::TemperatureSource;
use crate::smart::SmartOptions;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DeviceHandle(String);

impl DeviceHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachOutcome {
    Registered,
    /// Probe rejected the device; it gets no temperature channel.
    Rejected(String),
    /// The handle is already attached and was left as is.
    AlreadyAttached,
}

pub struct Registry<T> {
    devices: HashMap<DeviceHandle, Arc<TemperatureSource<T>>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self { devices: HashMap::new() }
    }
}

impl<T: Transport> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe `transport` and register it under `handle` if a sensor is found.
    ///
    /// Probe rejections are not errors to the caller, they only keep the
    /// device out of the registry.
    pub fn attach(
        &mut self,
        handle: DeviceHandle,
        transport: T,
        identity: &DeviceIdentity,
        options: SmartOptions,
    ) -> Result<AttachOutcome> {
        if self.devices.contains_key(&handle) {
            return Ok(AttachOutcome::AlreadyAttached);
        }

        match TemperatureSource::probe(transport, identity, options) {
            Ok(source) => {
                info!(device = %handle, mode = ?source.capabilities().mode(), "temperature sensor attached");
                logger::log_event(
                    "attach",
                    json!({
                        "device": handle.as_str(),
                        "capabilities": source.capabilities(),
                    }),
                );
                self.devices.insert(handle, Arc::new(source));
                Ok(AttachOutcome::Registered)
            }
            Err(e) if e.is_probe_rejection() => {
                debug!(device = %handle, "not registering: {}", e);
                logger::log_event(
                    "attach_rejected",
                    json!({ "device": handle.as_str(), "reason": e.to_string() }),
                );
                Ok(AttachOutcome::Rejected(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// Drop the device and its capability record.
    pub fn detach(&mut self, handle: &DeviceHandle) -> bool {
        let removed = self.devices.remove(handle).is_some();
        if removed {
            logger::log_event("detach", json!({ "device": handle.as_str() }));
        }
        removed
    }

    pub fn get(&self, handle: &DeviceHandle) -> Option<Arc<TemperatureSource<T>>> {
        self.devices.get(handle).cloned()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Attached devices sorted by handle for stable output.
    pub fn iter(&self) -> impl Iterator<Item = (&DeviceHandle, &Arc<TemperatureSource<T>>)> {
        let mut entries: Vec<_> = self.devices.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ReportingMode;
    use crate::sensor::Metric;
    use crate::test_utils::test_utils::*;
    use serial_test::serial;

    fn smart_drive(temp: u8) -> FakeDrive {
        FakeDrive {
            identify: Some(identify_page(false, false)),
            smart_values: Some(smart_values_page(&[(194, temp)])),
            ..FakeDrive::default()
        }
    }

    #[test]
    #[serial]
    fn test_attach_registers_probed_device() {
        let mut registry = Registry::new();
        let outcome = registry
            .attach(
                DeviceHandle::new("sda"),
                FakeTransport::new(smart_drive(41)),
                &DeviceIdentity::new("ATA", None),
                SmartOptions::default(),
            )
            .unwrap();
        assert_eq!(outcome, AttachOutcome::Registered);
        assert_eq!(registry.len(), 1);

        let source = registry.get(&DeviceHandle::new("sda")).unwrap();
        assert_eq!(source.capabilities().mode(), ReportingMode::SmartFallback);
        assert_eq!(source.read(Metric::Input).unwrap(), 41_000);
    }

    #[test]
    #[serial]
    fn test_attach_rejects_non_ata() {
        let mut registry = Registry::new();
        let outcome = registry
            .attach(
                DeviceHandle::new("sdb"),
                FakeTransport::new(smart_drive(41)),
                &DeviceIdentity::new("USB", None),
                SmartOptions::default(),
            )
            .unwrap();
        assert!(matches!(outcome, AttachOutcome::Rejected(_)));
        assert!(registry.is_empty());
        assert!(registry.get(&DeviceHandle::new("sdb")).is_none());
    }

    #[test]
    #[serial]
    fn test_attach_rejects_no_sensor() {
        let mut registry = Registry::new();
        let drive = FakeDrive {
            identify: Some(identify_page(false, false)),
            smart_values: Some(smart_values_page(&[(9, 10)])),
            ..FakeDrive::default()
        };
        let outcome = registry
            .attach(
                DeviceHandle::new("sdc"),
                FakeTransport::new(drive),
                &DeviceIdentity::new("ATA", None),
                SmartOptions::default(),
            )
            .unwrap();
        assert!(matches!(outcome, AttachOutcome::Rejected(_)));
        assert!(registry.is_empty());
    }

    #[test]
    #[serial]
    fn test_probe_does_not_rerun_for_attached_handle() {
        let mut registry = Registry::new();
        let identity = DeviceIdentity::new("ATA", None);
        let first = FakeTransport::new(smart_drive(41));
        registry
            .attach(DeviceHandle::new("sda"), first, &identity, SmartOptions::default())
            .unwrap();

        let second = FakeTransport::new(smart_drive(50));
        let calls = second.calls.clone();
        let outcome = registry
            .attach(DeviceHandle::new("sda"), second, &identity, SmartOptions::default())
            .unwrap();
        assert_eq!(outcome, AttachOutcome::AlreadyAttached);
        assert!(calls.lock().is_empty());
        let source = registry.get(&DeviceHandle::new("sda")).unwrap();
        assert_eq!(source.read(Metric::Input).unwrap(), 41_000);
    }

    #[test]
    #[serial]
    fn test_detach() {
        let mut registry = Registry::new();
        let identity = DeviceIdentity::new("ATA", None);
        registry
            .attach(DeviceHandle::new("sda"), FakeTransport::new(smart_drive(30)), &identity, SmartOptions::default())
            .unwrap();
        assert!(registry.detach(&DeviceHandle::new("sda")));
        assert!(!registry.detach(&DeviceHandle::new("sda")));
        assert!(registry.is_empty());
    }

    #[test]
    #[serial]
    fn test_iter_is_sorted() {
        let mut registry = Registry::new();
        let identity = DeviceIdentity::new("ATA", None);
        for name in ["sdc", "sda", "sdb"] {
            registry
                .attach(DeviceHandle::new(name), FakeTransport::new(smart_drive(30)), &identity, SmartOptions::default())
                .unwrap();
        }
        let names: Vec<&str> = registry.iter().map(|(h, _)| h.as_str()).collect();
        assert_eq!(names, vec!["sda", "sdb", "sdc"]);
    }
}
