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

//! Linux SG_IO transport for ATA PASS-THROUGH(16) commands.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::ptr;
use std::time::Duration;

use tracing::{debug, trace};

use crate::command::{Direction, Page, Transport, CDB_LEN, SECTOR_SIZE};
use crate::error::{DriveTempError, Result};

const SG_IO: libc::c_ulong = 0x2285;
const SG_INTERFACE_ID: libc::c_int = b'S' as libc::c_int;
const SG_DXFER_TO_DEV: libc::c_int = -2;
const SG_DXFER_FROM_DEV: libc::c_int = -3;
const SG_INFO_OK_MASK: libc::c_uint = 0x1;

const SENSE_LEN: usize = 32;

// host_status values from the SCSI midlayer
const DID_OK: u16 = 0x00;
const DID_TIME_OUT: u16 = 0x03;

/// `struct sg_io_hdr` from <scsi/sg.h>.
#[repr(C)]
#[derive(Debug)]
struct SgIoHdr {
    interface_id: libc::c_int,
    dxfer_direction: libc::c_int,
    cmd_len: libc::c_uchar,
    mx_sb_len: libc::c_uchar,
    iovec_count: libc::c_ushort,
    dxfer_len: libc::c_uint,
    dxferp: *mut libc::c_void,
    cmdp: *const libc::c_uchar,
    sbp: *mut libc::c_uchar,
    timeout: libc::c_uint,
    flags: libc::c_uint,
    pack_id: libc::c_int,
    usr_ptr: *mut libc::c_void,
    status: libc::c_uchar,
    masked_status: libc::c_uchar,
    msg_status: libc::c_uchar,
    sb_len_wr: libc::c_uchar,
    host_status: libc::c_ushort,
    driver_status: libc::c_ushort,
    resid: libc::c_int,
    duration: libc::c_uint,
    info: libc::c_uint,
}

impl SgIoHdr {
    fn new(
        cdb: &[u8; CDB_LEN],
        direction: Direction,
        page: &mut Page,
        sense: &mut [u8; SENSE_LEN],
        timeout: Duration,
    ) -> Self {
        Self {
            interface_id: SG_INTERFACE_ID,
            dxfer_direction: match direction {
                Direction::DataIn => SG_DXFER_FROM_DEV,
                Direction::DataOut => SG_DXFER_TO_DEV,
            },
            cmd_len: CDB_LEN as libc::c_uchar,
            mx_sb_len: SENSE_LEN as libc::c_uchar,
            iovec_count: 0,
            dxfer_len: SECTOR_SIZE as libc::c_uint,
            dxferp: page.as_mut_ptr().cast(),
            cmdp: cdb.as_ptr(),
            sbp: sense.as_mut_ptr(),
            timeout: timeout.as_millis().min(u32::MAX as u128) as libc::c_uint,
            flags: 0,
            pack_id: 0,
            usr_ptr: ptr::null_mut(),
            status: 0,
            masked_status: 0,
            msg_status: 0,
            sb_len_wr: 0,
            host_status: 0,
            driver_status: 0,
            resid: 0,
            duration: 0,
            info: 0,
        }
    }
}

/// Translate the completion fields of an SG_IO request into a result.
fn check_status(info: u32, status: u8, host_status: u16, driver_status: u16) -> io::Result<()> {
    if info & SG_INFO_OK_MASK == 0 && status == 0 && host_status == DID_OK && driver_status == 0 {
        return Ok(());
    }
    if host_status == DID_TIME_OUT {
        return Err(io::Error::new(io::ErrorKind::TimedOut, "command timed out"));
    }
    Err(io::Error::new(
        io::ErrorKind::Other,
        format!(
            "scsi status 0x{:02x}, host 0x{:02x}, driver 0x{:02x}",
            status, host_status, driver_status
        ),
    ))
}

/// An opened SCSI generic capable block device such as /dev/sda.
#[derive(Debug)]
pub struct SgDevice {
    file: File,
    path: PathBuf,
}

impl SgDevice {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&path)
            .map_err(|source| DriveTempError::DeviceOpen { path: path.clone(), source })?;
        debug!(path = %path.display(), "opened device for SG_IO");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn submit_once(
        &self,
        cdb: &[u8; CDB_LEN],
        direction: Direction,
        page: &mut Page,
        timeout: Duration,
    ) -> io::Result<()> {
        let mut sense = [0u8; SENSE_LEN];
        let mut hdr = SgIoHdr::new(cdb, direction, page, &mut sense, timeout);
        // SAFETY: every pointer in `hdr` refers to a buffer that outlives the call
        // and whose length matches the corresponding length field.
        let rc = unsafe { libc::ioctl(self.file.as_raw_fd(), SG_IO as _, &mut hdr as *mut SgIoHdr) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        check_status(hdr.info, hdr.status, hdr.host_status, hdr.driver_status)
    }
}

impl Transport for SgDevice {
    fn submit(
        &mut self,
        cdb: &[u8; CDB_LEN],
        direction: Direction,
        page: &mut Page,
        timeout: Duration,
        max_retries: u32,
    ) -> io::Result<()> {
        let mut attempt = 0;
        loop {
            match self.submit_once(cdb, direction, page, timeout) {
                Ok(()) => return Ok(()),
                Err(e) if attempt < max_retries && is_retryable(&e) => {
                    attempt += 1;
                    trace!(path = %self.path.display(), attempt, "retrying SG_IO: {}", e);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn is_retryable(err: &io::Error) -> bool {
    match err.raw_os_error() {
        Some(code) => code == libc::EINTR || code == libc::EAGAIN,
        // Device-side completion failures
        None => true,
    }
}
