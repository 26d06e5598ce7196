//! SPI25 protocol implementation
//!
//! This module implements the common SPI flash command sequences
//! as defined by JEDEC.
//!
//! The controller has no timer, so busy waits here poll the flash status
//! register without a bound. A flash that never clears WIP hangs the caller.

use crate::error::{Error, Result};
use crate::programmer::SpiMaster;
use crate::spi::{opcodes, SpiCommand};

/// Read the JEDEC ID from a flash chip
///
/// Returns (manufacturer_id, device_id) on success.
pub fn read_jedec_id<M: SpiMaster + ?Sized>(master: &mut M) -> Result<(u8, u16)> {
    let mut buf = [0u8; 3];
    let mut cmd = SpiCommand::read_reg(opcodes::RDID, &mut buf);
    master.execute(&mut cmd)?;

    let manufacturer = buf[0];
    let device = u16::from_be_bytes([buf[1], buf[2]]);

    Ok((manufacturer, device))
}

/// Read the status register 1
pub fn read_status1<M: SpiMaster + ?Sized>(master: &mut M) -> Result<u8> {
    let mut buf = [0u8; 1];
    let mut cmd = SpiCommand::read_reg(opcodes::RDSR, &mut buf);
    master.execute(&mut cmd)?;
    Ok(buf[0])
}

/// Send the Write Enable command
pub fn write_enable<M: SpiMaster + ?Sized>(master: &mut M) -> Result<()> {
    let mut cmd = SpiCommand::simple(opcodes::WREN);
    master.execute(&mut cmd)
}

/// Issue Reset Enable followed by Reset Device
///
/// Each opcode goes out as its own single-byte command.
pub fn software_reset<M: SpiMaster + ?Sized>(master: &mut M) -> Result<()> {
    master.execute(&mut SpiCommand::simple(opcodes::RSTEN))?;
    master.execute(&mut SpiCommand::simple(opcodes::RST))
}

/// Poll the status register until the Write In Progress bit clears
///
/// Returns the number of polls that saw the flash busy.
pub fn wait_ready<M: SpiMaster + ?Sized>(master: &mut M) -> Result<u32> {
    let mut busy_polls = 0u32;
    while read_status1(master)? & opcodes::SR1_WIP != 0 {
        busy_polls = busy_polls.wrapping_add(1);
    }
    Ok(busy_polls)
}

/// Read data from flash using 3-byte addressing
pub fn read_3b<M: SpiMaster + ?Sized>(master: &mut M, addr: u32, buf: &mut [u8]) -> Result<()> {
    let max_len = master.max_read_len();
    let mut offset = 0;

    while offset < buf.len() {
        let chunk_len = core::cmp::min(max_len, buf.len() - offset);
        let chunk = &mut buf[offset..offset + chunk_len];
        let chunk_addr = addr.wrapping_add(offset as u32);
        let mut cmd = SpiCommand::read_3b(opcodes::READ, chunk_addr, chunk);
        master.execute(&mut cmd)?;
        offset += chunk_len;
    }

    Ok(())
}

/// Read data with FAST_READ (one dummy byte after the address)
pub fn fast_read_3b<M: SpiMaster + ?Sized>(
    master: &mut M,
    addr: u32,
    buf: &mut [u8],
) -> Result<()> {
    let max_len = master.max_read_len();
    for (i, chunk) in buf.chunks_mut(max_len).enumerate() {
        let chunk_addr = addr.wrapping_add((i * max_len) as u32);
        let mut cmd =
            SpiCommand::read_3b(opcodes::FAST_READ, chunk_addr, chunk).with_dummy_cycles(8);
        master.execute(&mut cmd)?;
    }
    Ok(())
}

/// Program a single page (up to page_size bytes)
///
/// The data must not cross a page boundary and must fit in one command.
/// Oversized data is refused before write enable is sent.
pub fn program_page_3b<M: SpiMaster + ?Sized>(
    master: &mut M,
    addr: u32,
    data: &[u8],
) -> Result<()> {
    let capacity = master.max_write_len();
    if data.len() > capacity {
        return Err(Error::BackupOverflow {
            len: data.len(),
            capacity,
        });
    }
    write_enable(master)?;
    let mut cmd = SpiCommand::write_3b(opcodes::PP, addr, data);
    master.execute(&mut cmd)?;
    wait_ready(master).map(|_| ())
}

/// Erase the 4 KiB sector containing `addr`
pub fn erase_sector_4k<M: SpiMaster + ?Sized>(master: &mut M, addr: u32) -> Result<()> {
    write_enable(master)?;
    let mut cmd = SpiCommand::erase_3b(opcodes::SE_20, addr);
    master.execute(&mut cmd)?;
    wait_ready(master).map(|_| ())
}

/// Erase the whole flash
pub fn erase_chip<M: SpiMaster + ?Sized>(master: &mut M) -> Result<()> {
    write_enable(master)?;
    master.execute(&mut SpiCommand::simple(opcodes::CE_C7))?;
    wait_ready(master).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    /// Records the address of every command; reads return zeros
    struct AddressLog {
        max_read: usize,
        addresses: Vec<Option<u32>>,
    }

    impl SpiMaster for AddressLog {
        fn max_read_len(&self) -> usize {
            self.max_read
        }

        fn max_write_len(&self) -> usize {
            16
        }

        fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
            self.addresses.push(cmd.address);
            cmd.read_buf.fill(0);
            Ok(())
        }
    }

    #[test]
    fn test_read_chunks_wrap_at_top_of_address_space() {
        let mut master = AddressLog {
            max_read: 4,
            addresses: Vec::new(),
        };
        let mut buf = [0xAAu8; 8];

        read_3b(&mut master, u32::MAX - 1, &mut buf).unwrap();
        fast_read_3b(&mut master, u32::MAX - 1, &mut buf).unwrap();

        let expected = [Some(u32::MAX - 1), Some(2)];
        assert_eq!(master.addresses[..2], expected);
        assert_eq!(master.addresses[2..], expected);
    }

    #[test]
    fn test_program_rejects_oversized_data_up_front() {
        let mut master = AddressLog {
            max_read: 4,
            addresses: Vec::new(),
        };

        let result = program_page_3b(&mut master, 0, &[0u8; 17]);

        assert_eq!(result, Err(Error::BackupOverflow { len: 17, capacity: 16 }));
        assert!(master.addresses.is_empty());
    }
}
