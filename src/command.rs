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

//! ATA PASS-THROUGH(16) command encoding and the transport seam.
//!
//! Every command moves exactly one 512-byte sector. The caller owns the page
//! for the duration of a single command; nothing is shared between calls.

use std::io;
use std::time::Duration;

use tracing::trace;

use crate::error::{DriveTempError, Result};

pub const SECTOR_SIZE: usize = 512;

/// One sector of command payload or response data.
pub type Page = [u8; SECTOR_SIZE];

/// SCSI opcode for ATA PASS-THROUGH(16)
pub const ATA_16: u8 = 0x85;
pub const CDB_LEN: usize = 16;

pub const ATA_CMD_SMART: u8 = 0xb0;
pub const ATA_CMD_IDENTIFY_DEVICE: u8 = 0xec;

pub const SMART_READ_VALUES: u8 = 0xd0;
pub const SMART_READ_LOG: u8 = 0xd5;
pub const SMART_WRITE_LOG: u8 = 0xd6;

pub const SMART_LBAM_PASS: u8 = 0x4f;
pub const SMART_LBAH_PASS: u8 = 0xc2;

pub const SCT_STATUS_REQ_ADDR: u8 = 0xe0;
pub const SCT_READ_LOG_ADDR: u8 = 0xe1;

pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(1);
pub const COMMAND_RETRIES: u32 = 5;

// ATA_16 protocol field, shifted into byte 1
const PROTO_PIO_DATA_IN: u8 = 4;
const PROTO_PIO_DATA_OUT: u8 = 5;

// Byte 2: no off.line, no ck_cond, byte_block, transfer length in sector count
const FLAGS_READ: u8 = 0x0e;
const FLAGS_WRITE: u8 = 0x06;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Device to host
    DataIn,
    /// Host to device
    DataOut,
}

/// The taskfile registers for a single-sector ATA command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtaCommand {
    pub command: u8,
    pub feature: u8,
    pub lba_low: u8,
    pub lba_mid: u8,
    pub lba_high: u8,
}

impl AtaCommand {
    pub fn identify_device() -> Self {
        Self {
            command: ATA_CMD_IDENTIFY_DEVICE,
            feature: 0,
            lba_low: 0,
            lba_mid: 0,
            lba_high: 0,
        }
    }

    /// A SMART sub-command; `select` lands in lba_low (log address for log commands).
    pub fn smart(feature: u8, select: u8) -> Self {
        Self {
            command: ATA_CMD_SMART,
            feature,
            lba_low: select,
            lba_mid: SMART_LBAM_PASS,
            lba_high: SMART_LBAH_PASS,
        }
    }

    pub fn smart_read_values() -> Self {
        Self::smart(SMART_READ_VALUES, 0)
    }

    pub fn read_log(address: u8) -> Self {
        Self::smart(SMART_READ_LOG, address)
    }

    pub fn write_log(address: u8) -> Self {
        Self::smart(SMART_WRITE_LOG, address)
    }

    pub fn direction(&self) -> Direction {
        if self.command == ATA_CMD_SMART && self.feature == SMART_WRITE_LOG {
            Direction::DataOut
        } else {
            Direction::DataIn
        }
    }

    /// Encode as a 16-byte ATA PASS-THROUGH CDB transferring one sector.
    pub fn cdb(&self) -> [u8; CDB_LEN] {
        let mut cdb = [0u8; CDB_LEN];
        cdb[0] = ATA_16;
        match self.direction() {
            Direction::DataOut => {
                cdb[1] = PROTO_PIO_DATA_OUT << 1;
                cdb[2] = FLAGS_WRITE;
            }
            Direction::DataIn => {
                cdb[1] = PROTO_PIO_DATA_IN << 1;
                cdb[2] = FLAGS_READ;
            }
        }
        cdb[4] = self.feature;
        cdb[6] = 1;
        cdb[8] = self.lba_low;
        cdb[10] = self.lba_mid;
        cdb[12] = self.lba_high;
        cdb[14] = self.command;
        cdb
    }
}

/// A byte-oriented command channel to one block device.
///
/// For `DataIn` the transport fills `page`; for `DataOut` it sends it.
/// Retrying up to `max_retries` times is the transport's job.
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    fn submit(
        &mut self,
        cdb: &[u8; CDB_LEN],
        direction: Direction,
        page: &mut Page,
        timeout: Duration,
        max_retries: u32,
    ) -> io::Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn submit(
        &mut self,
        cdb: &[u8; CDB_LEN],
        direction: Direction,
        page: &mut Page,
        timeout: Duration,
        max_retries: u32,
    ) -> io::Result<()> {
        (**self).submit(cdb, direction, page, timeout, max_retries)
    }
}

/// Run one command against `page` with the fixed timeout and retry budget.
pub fn execute<T: Transport + ?Sized>(transport: &mut T, cmd: AtaCommand, page: &mut Page) -> Result<()> {
    trace!(
        command = cmd.command,
        feature = cmd.feature,
        lba_low = cmd.lba_low,
        "submitting ATA pass-through"
    );
    transport
        .submit(&cmd.cdb(), cmd.direction(), page, COMMAND_TIMEOUT, COMMAND_RETRIES)
        .map_err(|e| DriveTempError::command_failed(cmd.command, cmd.feature, e.to_string()))
}

/// Issue a data-in command and hand back a freshly filled page.
pub fn read_page<T: Transport + ?Sized>(transport: &mut T, cmd: AtaCommand) -> Result<Page> {
    let mut page = [0u8; SECTOR_SIZE];
    execute(transport, cmd, &mut page)?;
    Ok(page)
}

/// Issue a data-out command carrying a copy of `page`.
pub fn write_page<T: Transport + ?Sized>(transport: &mut T, cmd: AtaCommand, page: &Page) -> Result<()> {
    let mut out = *page;
    execute(transport, cmd, &mut out)
}
