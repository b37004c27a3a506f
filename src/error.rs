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

//! Unified error type for drive temperature probing and reads.

use std::io;
use std::path::PathBuf;

use crate::sensor::Metric;

/// Result type alias using DriveTempError
pub type Result<T> = std::result::Result<T, DriveTempError>;

#[derive(thiserror::Error, Debug)]
pub enum DriveTempError {
    // ============================================================================
    // Probe-time rejections
    // ============================================================================
    #[error("Not an ATA device: {0}")]
    NotADevice(String),

    #[error("No usable temperature sensor")]
    NoSensor,

    // ============================================================================
    // Per-read failures
    // ============================================================================
    #[error("ATA command {command:#04x} (feature {feature:#04x}) failed: {reason}")]
    CommandFailed {
        command: u8,
        feature: u8,
        reason: String,
    },

    #[error("Checksum error in SMART attribute table (sum {sum:#04x})")]
    ChecksumError {
        sum: u8,
    },

    #[error("Unsupported attribute: {0}")]
    UnsupportedAttribute(Metric),

    // ============================================================================
    // Host-side errors
    // ============================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to open device {path}: {source}")]
    DeviceOpen {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl DriveTempError {
    /// Create a command failure from a string
    pub fn command_failed(command: u8, feature: u8, reason: impl Into<String>) -> Self {
        Self::CommandFailed {
            command,
            feature,
            reason: reason.into(),
        }
    }

    /// Create a config error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Errors that terminate a probe and keep the device from being registered.
    pub fn is_probe_rejection(&self) -> bool {
        matches!(self, Self::NotADevice(_) | Self::NoSensor)
    }
}
