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

//! Cached SCSI identification data and the ATA IDENTIFY DEVICE words we use.

use crate::command::{Page, ATA_CMD_IDENTIFY_DEVICE, SECTOR_SIZE};
use crate::error::{DriveTempError, Result};

/// libata reports this SCSI vendor for every ATA disk.
pub const ATA_VENDOR: &[u8; 8] = b"ATA     ";
/// SAT vendor identification in the ATA Information VPD page (0x89).
pub const LIBATA_SAT_ORIGIN: &[u8; 24] = b"linux   libata          ";

pub const INQUIRY_VENDOR_OFFSET: usize = 8;
const VENDOR_LEN: usize = 8;

const VPD_SAT_VENDOR: usize = 8;
const VPD_COMMAND_CODE: usize = 56;
const VPD_IDENTIFY_DATA: usize = 60;

const ID_CONFIG: usize = 0;
const ID_MAJOR_VER: usize = 80;
const ID_HW_CONFIG: usize = 93;
const ID_SCT_CMD_XPORT: usize = 206;

const SCT_STATUS_SUPPORTED: u16 = 1 << 0;
const SCT_DATA_TABLES_SUPPORTED: u16 = 1 << 5;

/// IDENTIFY DEVICE response as 256 little-endian words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifyData {
    words: [u16; 256],
}

impl IdentifyData {
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < SECTOR_SIZE {
            return None;
        }
        let mut words = [0u16; 256];
        for (w, chunk) in words.iter_mut().zip(bytes.chunks_exact(2)) {
            *w = u16::from_le_bytes([chunk[0], chunk[1]]);
        }
        Some(Self { words })
    }

    pub fn from_page(page: &Page) -> Self {
        let mut words = [0u16; 256];
        for (w, chunk) in words.iter_mut().zip(page.chunks_exact(2)) {
            *w = u16::from_le_bytes([chunk[0], chunk[1]]);
        }
        Self { words }
    }

    pub fn word(&self, index: usize) -> u16 {
        self.words[index]
    }

    /// Word 0 bit 15 clear means an ATA (not ATAPI) device.
    pub fn is_ata(&self) -> bool {
        self.words[ID_CONFIG] & (1 << 15) == 0
    }

    /// Word 93 zero and at least ATA-5 in word 80. Treating word 80 as signed
    /// filters out the reserved 0x0000 and 0xffff values.
    pub fn is_sata(&self) -> bool {
        self.words[ID_HW_CONFIG] == 0 && (self.words[ID_MAJOR_VER] as i16) >= 0x0020
    }

    pub fn sct_status_supported(&self) -> bool {
        self.words[ID_SCT_CMD_XPORT] & SCT_STATUS_SUPPORTED != 0
    }

    pub fn sct_data_tables_supported(&self) -> bool {
        self.words[ID_SCT_CMD_XPORT] & SCT_DATA_TABLES_SUPPORTED != 0
    }
}

/// What the SCSI layer already knows about a device before we send anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceIdentity {
    vendor: [u8; VENDOR_LEN],
    ata_info_vpd: Option<Vec<u8>>,
}

impl DeviceIdentity {
    /// `vendor` is space-padded or truncated to the 8-byte INQUIRY field.
    pub fn new(vendor: &str, ata_info_vpd: Option<Vec<u8>>) -> Self {
        let mut field = [b' '; VENDOR_LEN];
        for (dst, src) in field.iter_mut().zip(vendor.bytes()) {
            *dst = src;
        }
        Self { vendor: field, ata_info_vpd }
    }

    /// Build from a standard INQUIRY response; returns None if it is too short.
    pub fn from_inquiry(inquiry: &[u8], ata_info_vpd: Option<Vec<u8>>) -> Option<Self> {
        let raw = inquiry.get(INQUIRY_VENDOR_OFFSET..INQUIRY_VENDOR_OFFSET + VENDOR_LEN)?;
        let mut vendor = [0u8; VENDOR_LEN];
        vendor.copy_from_slice(raw);
        Some(Self { vendor, ata_info_vpd })
    }

    pub fn vendor(&self) -> String {
        String::from_utf8_lossy(&self.vendor).trim_end().to_string()
    }

    pub fn ata_info_vpd(&self) -> Option<&[u8]> {
        self.ata_info_vpd.as_deref()
    }

    /// Reject anything that is not an ATA disk behind libata.
    ///
    /// Returns the IDENTIFY data embedded in the VPD page when one was cached.
    pub fn verify_ata(&self) -> Result<Option<IdentifyData>> {
        if &self.vendor != ATA_VENDOR {
            return Err(DriveTempError::NotADevice(format!("vendor {:?}", self.vendor())));
        }

        let Some(vpd) = self.ata_info_vpd.as_deref() else {
            return Ok(None);
        };

        if vpd.len() < VPD_IDENTIFY_DATA + SECTOR_SIZE {
            return Err(DriveTempError::NotADevice(format!(
                "ATA information page too short ({} bytes)",
                vpd.len()
            )));
        }
        if &vpd[VPD_SAT_VENDOR..VPD_SAT_VENDOR + LIBATA_SAT_ORIGIN.len()] != LIBATA_SAT_ORIGIN {
            return Err(DriveTempError::NotADevice("unexpected SAT origin".into()));
        }
        if vpd[VPD_COMMAND_CODE] != ATA_CMD_IDENTIFY_DEVICE {
            return Err(DriveTempError::NotADevice(format!(
                "ATA information page carries command {:#04x}",
                vpd[VPD_COMMAND_CODE]
            )));
        }

        let id = IdentifyData::from_bytes(&vpd[VPD_IDENTIFY_DATA..])
            .ok_or_else(|| DriveTempError::NotADevice("truncated IDENTIFY data".into()))?;
        if !id.is_ata() || !id.is_sata() {
            return Err(DriveTempError::NotADevice("not a SATA device".into()));
        }
        Ok(Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_utils::{ata_info_vpd, identify_page};

    #[test]
    fn test_vendor_is_padded() {
        let id = DeviceIdentity::new("ATA", None);
        assert_eq!(id.vendor(), "ATA");
        assert!(id.verify_ata().unwrap().is_none());
    }

    #[test]
    fn test_vendor_mismatch() {
        for vendor in ["SEAGATE", "ATAPI", "ata", "", "NVMe"] {
            let id = DeviceIdentity::new(vendor, None);
            assert!(
                matches!(id.verify_ata(), Err(DriveTempError::NotADevice(_))),
                "vendor {vendor:?}"
            );
        }
    }

    #[test]
    fn test_from_inquiry() {
        let mut inquiry = vec![0u8; 36];
        inquiry[8..16].copy_from_slice(b"ATA     ");
        let id = DeviceIdentity::from_inquiry(&inquiry, None).unwrap();
        assert!(id.verify_ata().is_ok());

        assert!(DeviceIdentity::from_inquiry(&inquiry[..12], None).is_none());
    }

    #[test]
    fn test_vpd_cross_check_accepts_libata() {
        let vpd = ata_info_vpd(&identify_page(true, true));
        let id = DeviceIdentity::new("ATA", Some(vpd));
        let data = id.verify_ata().unwrap().unwrap();
        assert!(data.sct_status_supported());
        assert!(data.sct_data_tables_supported());
    }

    #[test]
    fn test_vpd_wrong_origin() {
        let mut vpd = ata_info_vpd(&identify_page(true, false));
        vpd[8..16].copy_from_slice(b"JMicron ");
        let id = DeviceIdentity::new("ATA", Some(vpd));
        assert!(matches!(id.verify_ata(), Err(DriveTempError::NotADevice(_))));
    }

    #[test]
    fn test_vpd_wrong_command_code() {
        let mut vpd = ata_info_vpd(&identify_page(true, false));
        vpd[56] = 0xa1;
        let id = DeviceIdentity::new("ATA", Some(vpd));
        assert!(matches!(id.verify_ata(), Err(DriveTempError::NotADevice(_))));
    }

    #[test]
    fn test_vpd_too_short() {
        let id = DeviceIdentity::new("ATA", Some(vec![0u8; 64]));
        assert!(matches!(id.verify_ata(), Err(DriveTempError::NotADevice(_))));
    }

    #[test]
    fn test_vpd_atapi_rejected() {
        let mut page = identify_page(false, false);
        page[1] |= 0x80; // word 0 bit 15
        let id = DeviceIdentity::new("ATA", Some(ata_info_vpd(&page)));
        assert!(matches!(id.verify_ata(), Err(DriveTempError::NotADevice(_))));
    }

    #[test]
    fn test_vpd_parallel_ata_rejected() {
        let mut page = identify_page(false, false);
        page[93 * 2] = 0x01; // word 93 nonzero
        let id = DeviceIdentity::new("ATA", Some(ata_info_vpd(&page)));
        assert!(matches!(id.verify_ata(), Err(DriveTempError::NotADevice(_))));
    }

    #[test]
    fn test_major_version_reserved_values() {
        let mut page = identify_page(false, false);
        page[80 * 2] = 0xff;
        page[80 * 2 + 1] = 0xff;
        assert!(!IdentifyData::from_page(&page).is_sata());
        page[80 * 2] = 0x00;
        page[80 * 2 + 1] = 0x00;
        assert!(!IdentifyData::from_page(&page).is_sata());
    }

    #[test]
    fn test_sct_bits() {
        let data = IdentifyData::from_page(&identify_page(true, false));
        assert!(data.sct_status_supported());
        assert!(!data.sct_data_tables_supported());

        let data = IdentifyData::from_page(&identify_page(false, false));
        assert!(!data.sct_status_supported());
        assert_eq!(data.word(206), 0);
    }

    #[test]
    fn test_identify_from_short_bytes() {
        assert!(IdentifyData::from_bytes(&[0u8; 100]).is_none());
    }
}
