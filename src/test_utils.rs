/*
 * Test utilities and mock helpers for Drivetemp
 *
 * This module provides page builders and a scripted transport that behaves
 * like a libata disk, so probe and read paths can be exercised without
 * hardware.
 */

#[cfg(test)]
pub mod test_utils {
    use std::io;
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;

    use crate::command::{
        Direction, Page, Transport, ATA_CMD_IDENTIFY_DEVICE, ATA_CMD_SMART, CDB_LEN,
        SCT_READ_LOG_ADDR, SCT_STATUS_REQ_ADDR, SECTOR_SIZE, SMART_READ_LOG, SMART_READ_VALUES,
        SMART_WRITE_LOG,
    };
    use crate::identify::LIBATA_SAT_ORIGIN;
    use crate::smart::{ATTR_RECORD_LEN, MAX_SMART_ATTRS};

    /// Make the byte sum of `page` zero by adjusting the last byte.
    pub fn fix_checksum(page: &mut Page) {
        page[SECTOR_SIZE - 1] = 0;
        let sum = page.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        page[SECTOR_SIZE - 1] = 0u8.wrapping_sub(sum);
    }

    /// A valid SMART READ VALUES page with the given (id, raw low byte) slots.
    pub fn smart_values_page(attrs: &[(u8, u8)]) -> Page {
        assert!(attrs.len() <= MAX_SMART_ATTRS);
        let mut page = [0u8; SECTOR_SIZE];
        page[0] = 0x10; // table revision
        for (i, (id, raw)) in attrs.iter().enumerate() {
            let base = i * ATTR_RECORD_LEN;
            page[base + 2] = *id;
            if *id != 0 {
                page[base + 3] = 0x22; // flags
                page[base + 5] = 100; // normalized value
                page[base + 6] = 100; // worst
            }
            page[base + 7] = *raw;
        }
        fix_checksum(&mut page);
        page
    }

    pub fn sct_status_page(version: u16, current: u8, lowest: u8, highest: u8) -> Page {
        let mut page = [0u8; SECTOR_SIZE];
        page[0..2].copy_from_slice(&version.to_le_bytes());
        page[200] = current;
        page[201] = lowest;
        page[202] = highest;
        page
    }

    pub fn data_table_page(max: u8, crit: u8, min: u8, lcrit: u8) -> Page {
        let mut page = [0u8; SECTOR_SIZE];
        page[0..2].copy_from_slice(&2u16.to_le_bytes());
        page[6] = max;
        page[7] = crit;
        page[8] = min;
        page[9] = lcrit;
        page
    }

    /// IDENTIFY DEVICE data for a SATA disk with the given SCT capabilities.
    pub fn identify_page(sct_status: bool, sct_data_tables: bool) -> Page {
        let mut page = [0u8; SECTOR_SIZE];
        let mut put = |word: usize, val: u16| page[word * 2..word * 2 + 2].copy_from_slice(&val.to_le_bytes());
        put(0, 0x0040);
        put(80, 0x01f0);
        put(93, 0);
        let mut sct = 0u16;
        if sct_status {
            sct |= 1 << 0;
        }
        if sct_data_tables {
            sct |= 1 << 5;
        }
        put(206, sct);
        page
    }

    /// ATA Information VPD page (0x89) as libata produces it.
    pub fn ata_info_vpd(identify: &Page) -> Vec<u8> {
        let mut vpd = vec![0u8; 60 + SECTOR_SIZE];
        vpd[1] = 0x89;
        vpd[2..4].copy_from_slice(&0x0238u16.to_be_bytes());
        vpd[8..32].copy_from_slice(LIBATA_SAT_ORIGIN);
        vpd[56] = ATA_CMD_IDENTIFY_DEVICE;
        vpd[60..].copy_from_slice(identify);
        vpd
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Submitted {
        pub command: u8,
        pub feature: u8,
        pub lba_low: u8,
        pub direction: Direction,
    }

    /// Scripted responses for each command a probe or read can send.
    /// `None` makes the matching command fail.
    #[derive(Debug, Clone, Default)]
    pub struct FakeDrive {
        pub identify: Option<Page>,
        pub sct_status: Option<Page>,
        pub data_table: Option<Page>,
        pub smart_values: Option<Page>,
        pub fail_write_log: bool,
    }

    /// Transport backed by a `FakeDrive`; READ LOG 0xe1 only answers after a
    /// WRITE LOG has selected a table, like a real drive.
    #[derive(Debug, Clone)]
    pub struct FakeTransport {
        pub drive: Arc<Mutex<FakeDrive>>,
        pub calls: Arc<Mutex<Vec<Submitted>>>,
        selected_table: Option<u8>,
    }

    impl FakeTransport {
        pub fn new(drive: FakeDrive) -> Self {
            Self {
                drive: Arc::new(Mutex::new(drive)),
                calls: Arc::new(Mutex::new(Vec::new())),
                selected_table: None,
            }
        }

        pub fn commands(&self) -> Vec<(u8, u8, u8)> {
            self.calls.lock().iter().map(|c| (c.command, c.feature, c.lba_low)).collect()
        }
    }

    fn fail(what: &str) -> io::Error {
        io::Error::new(io::ErrorKind::Other, format!("{} aborted", what))
    }

    impl Transport for FakeTransport {
        fn submit(
            &mut self,
            cdb: &[u8; CDB_LEN],
            direction: Direction,
            page: &mut Page,
            _timeout: Duration,
            _max_retries: u32,
        ) -> io::Result<()> {
            let (command, feature, lba_low) = (cdb[14], cdb[4], cdb[8]);
            self.calls.lock().push(Submitted { command, feature, lba_low, direction });
            let drive = self.drive.lock();

            let response = match (command, feature, lba_low) {
                (ATA_CMD_IDENTIFY_DEVICE, _, _) => drive.identify.ok_or_else(|| fail("identify"))?,
                (ATA_CMD_SMART, SMART_READ_VALUES, _) => drive.smart_values.ok_or_else(|| fail("read values"))?,
                (ATA_CMD_SMART, SMART_READ_LOG, SCT_STATUS_REQ_ADDR) => {
                    drive.sct_status.ok_or_else(|| fail("sct status"))?
                }
                (ATA_CMD_SMART, SMART_READ_LOG, SCT_READ_LOG_ADDR) => {
                    if self.selected_table.take() != Some(2) {
                        return Err(fail("no table selected"));
                    }
                    drive.data_table.ok_or_else(|| fail("data table"))?
                }
                (ATA_CMD_SMART, SMART_WRITE_LOG, SCT_STATUS_REQ_ADDR) => {
                    if drive.fail_write_log || direction != Direction::DataOut {
                        return Err(fail("write log"));
                    }
                    if page[0] == 5 && page[2] == 1 {
                        self.selected_table = Some(page[4]);
                    }
                    return Ok(());
                }
                _ => return Err(fail("unknown command")),
            };
            *page = response;
            Ok(())
        }
    }
}
