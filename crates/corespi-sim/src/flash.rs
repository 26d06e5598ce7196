//! Simulated SPI NOR flash
//!
//! The flash decodes commands byte by byte as they are clocked, the way a
//! real part does: the first byte of a selection is the opcode, then come
//! the address bytes, then data. Writes, erases and resets take effect when
//! slave select is released, and leave the part busy for a configurable
//! number of status register reads.

use crate::error::{Result, SimError};
use crate::slave::SimSlave;
use corespi_core::spi::opcodes;

/// Configuration for the simulated flash
#[derive(Debug, Clone)]
pub struct SimFlashConfig {
    /// JEDEC manufacturer ID
    pub manufacturer_id: u8,
    /// JEDEC device ID
    pub device_id: u16,
    /// Flash size in bytes
    pub size: usize,
    /// Page size for programming
    pub page_size: usize,
    /// Sector size for the 4 KiB erase
    pub sector_size: usize,
    /// Status reads that report busy after a software reset
    pub reset_busy_polls: u32,
    /// Status reads that report busy after a page program
    pub program_busy_polls: u32,
    /// Status reads that report busy after an erase
    pub erase_busy_polls: u32,
}

impl Default for SimFlashConfig {
    fn default() -> Self {
        Self {
            manufacturer_id: 0x20, // Micron
            device_id: 0xBA18,     // N25Q128
            size: 1024 * 1024,
            page_size: 256,
            sector_size: 4096,
            reset_busy_polls: 2,
            program_busy_polls: 1,
            erase_busy_polls: 3,
        }
    }
}

impl SimFlashConfig {
    fn validate(&self) -> Result<()> {
        if self.size == 0 || !self.size.is_power_of_two() {
            return Err(SimError::InvalidFlashSize(self.size));
        }
        let fits = |unit: usize| unit.is_power_of_two() && unit <= self.size;
        if !fits(self.page_size) || !fits(self.sector_size) {
            return Err(SimError::InvalidGeometry {
                page: self.page_size,
                sector: self.sector_size,
                size: self.size,
            });
        }
        Ok(())
    }
}

/// Simulated SPI NOR flash
pub struct SimFlash {
    config: SimFlashConfig,
    data: Vec<u8>,
    write_enabled: bool,
    reset_armed: bool,
    busy_polls: u32,
    /// Bytes received in the current selection
    bytes: Vec<u8>,
    /// Opcode of every selection, in order
    commands: Vec<u8>,
}

impl SimFlash {
    /// Create an erased flash with the given configuration
    pub fn new(config: SimFlashConfig) -> Result<Self> {
        config.validate()?;
        let data = vec![0xFF; config.size];
        Ok(Self {
            config,
            data,
            write_enabled: false,
            reset_armed: false,
            busy_polls: 0,
            bytes: Vec::new(),
            commands: Vec::new(),
        })
    }

    /// Create a flash with pre-filled data
    pub fn with_data(config: SimFlashConfig, initial_data: &[u8]) -> Result<Self> {
        let mut flash = Self::new(config)?;
        if initial_data.len() > flash.data.len() {
            return Err(SimError::ImageTooLarge {
                len: initial_data.len(),
                size: flash.data.len(),
            });
        }
        flash.data[..initial_data.len()].copy_from_slice(initial_data);
        Ok(flash)
    }

    /// Flash contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Configuration
    pub fn config(&self) -> &SimFlashConfig {
        &self.config
    }

    /// Opcodes received so far, one per selection
    pub fn commands(&self) -> &[u8] {
        &self.commands
    }

    /// Whether the write enable latch is set
    pub fn write_enabled(&self) -> bool {
        self.write_enabled
    }

    /// Whether a write, erase or reset is still in progress
    pub fn busy(&self) -> bool {
        self.busy_polls > 0
    }

    fn status(&self) -> u8 {
        let mut sr = 0;
        if self.busy() {
            sr |= opcodes::SR1_WIP;
        }
        if self.write_enabled {
            sr |= opcodes::SR1_WEL;
        }
        sr
    }

    /// Address carried in bytes 1..=3 of the current command
    fn address(&self) -> Option<usize> {
        match self.bytes.get(1..4)? {
            [a, b, c] => {
                let addr = u32::from_be_bytes([0, *a, *b, *c]) as usize;
                Some(addr & (self.config.size - 1))
            }
            _ => None,
        }
    }

    fn read_byte(&self, data_index: usize) -> u8 {
        match self.address() {
            Some(addr) => self.data[(addr + data_index) & (self.config.size - 1)],
            None => 0xFF,
        }
    }

    /// Byte shifted out for position `pos` of the current command
    fn respond(&self, pos: usize) -> u8 {
        let Some(&opcode) = self.bytes.first() else {
            return 0xFF;
        };
        if pos == 0 {
            return 0xFF;
        }
        if self.busy() && opcode != opcodes::RDSR {
            return 0xFF;
        }

        match opcode {
            opcodes::RDID => match pos {
                1 => self.config.manufacturer_id,
                2 => (self.config.device_id >> 8) as u8,
                3 => self.config.device_id as u8,
                _ => 0xFF,
            },
            opcodes::RDSR => self.status(),
            opcodes::READ if pos >= 4 => self.read_byte(pos - 4),
            opcodes::FAST_READ if pos >= 5 => self.read_byte(pos - 5),
            _ => 0xFF,
        }
    }

    fn page_program(&mut self) {
        let Some(addr) = self.address() else {
            return;
        };
        let page_size = self.config.page_size;
        let page = addr & !(page_size - 1);
        for (i, &byte) in self.bytes[4..].iter().enumerate() {
            // Programming wraps within the page and can only clear bits
            let offset = page + ((addr + i) & (page_size - 1));
            self.data[offset] &= byte;
        }
        self.busy_polls = self.config.program_busy_polls;
    }

    fn erase(&mut self, len: usize) {
        let Some(addr) = self.address() else {
            return;
        };
        let start = addr & !(len - 1);
        self.data[start..start + len].fill(0xFF);
        self.busy_polls = self.config.erase_busy_polls;
    }

    /// Apply the command that just ended
    fn complete(&mut self) {
        let Some(&opcode) = self.bytes.first() else {
            return;
        };
        self.commands.push(opcode);

        if self.busy() {
            if opcode == opcodes::RDSR {
                self.busy_polls -= 1;
            }
            return;
        }

        let armed = core::mem::take(&mut self.reset_armed);
        match opcode {
            opcodes::WREN => self.write_enabled = true,
            opcodes::WRDI => self.write_enabled = false,
            opcodes::RSTEN => self.reset_armed = true,
            opcodes::RST if armed => {
                log::debug!("sim flash: software reset");
                self.write_enabled = false;
                self.busy_polls = self.config.reset_busy_polls;
            }
            opcodes::PP if self.write_enabled => {
                self.write_enabled = false;
                self.page_program();
            }
            opcodes::SE_20 if self.write_enabled => {
                self.write_enabled = false;
                self.erase(self.config.sector_size);
            }
            opcodes::CE_C7 if self.write_enabled => {
                self.write_enabled = false;
                self.data.fill(0xFF);
                self.busy_polls = self.config.erase_busy_polls;
            }
            opcodes::RDID | opcodes::RDSR | opcodes::READ | opcodes::FAST_READ => {}
            opcodes::PP | opcodes::SE_20 | opcodes::CE_C7 | opcodes::RST => {
                log::debug!("sim flash: {:#04x} ignored", opcode);
            }
            _ => log::debug!("sim flash: unsupported opcode {:#04x}", opcode),
        }
    }
}

impl SimSlave for SimFlash {
    fn select(&mut self) {
        self.bytes.clear();
    }

    fn exchange(&mut self, mosi: u8) -> u8 {
        let pos = self.bytes.len();
        self.bytes.push(mosi);
        self.respond(pos)
    }

    fn deselect(&mut self) {
        self.complete();
        self.bytes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(flash: &mut SimFlash, mosi: &[u8]) -> Vec<u8> {
        flash.select();
        let miso = mosi.iter().map(|&b| flash.exchange(b)).collect();
        flash.deselect();
        miso
    }

    #[test]
    fn test_read_jedec_id() {
        let mut flash = SimFlash::new(SimFlashConfig::default()).unwrap();
        let miso = command(&mut flash, &[opcodes::RDID, 0, 0, 0]);
        assert_eq!(miso, [0xFF, 0x20, 0xBA, 0x18]);
    }

    #[test]
    fn test_program_requires_write_enable() {
        let mut flash = SimFlash::new(SimFlashConfig::default()).unwrap();

        command(&mut flash, &[opcodes::PP, 0x00, 0x10, 0x00, 0x12]);
        assert_eq!(flash.data()[0x1000], 0xFF);

        command(&mut flash, &[opcodes::WREN]);
        assert!(flash.write_enabled());
        command(&mut flash, &[opcodes::PP, 0x00, 0x10, 0x00, 0x12, 0x34]);
        assert_eq!(&flash.data()[0x1000..0x1002], &[0x12, 0x34]);
        assert!(!flash.write_enabled());
        assert!(flash.busy());
    }

    #[test]
    fn test_busy_until_status_polled() {
        let config = SimFlashConfig {
            erase_busy_polls: 2,
            ..Default::default()
        };
        let mut flash = SimFlash::with_data(config, &[0x00; 16]).unwrap();

        command(&mut flash, &[opcodes::WREN]);
        command(&mut flash, &[opcodes::SE_20, 0x00, 0x00, 0x08]);
        assert_eq!(flash.data()[0], 0xFF);

        // Reads are refused while busy
        assert_eq!(command(&mut flash, &[opcodes::READ, 0, 0, 0, 0]), [0xFF; 5]);

        let sr = |flash: &mut SimFlash| command(flash, &[opcodes::RDSR, 0])[1];
        assert_eq!(sr(&mut flash) & opcodes::SR1_WIP, opcodes::SR1_WIP);
        assert_eq!(sr(&mut flash) & opcodes::SR1_WIP, opcodes::SR1_WIP);
        assert_eq!(sr(&mut flash), 0);
    }

    #[test]
    fn test_reset_needs_enable_first() {
        let mut flash = SimFlash::new(SimFlashConfig::default()).unwrap();

        command(&mut flash, &[opcodes::RST]);
        assert!(!flash.busy());

        command(&mut flash, &[opcodes::RSTEN]);
        command(&mut flash, &[opcodes::RST]);
        assert!(flash.busy());
        assert_eq!(flash.commands(), &[opcodes::RST, opcodes::RSTEN, opcodes::RST]);
    }

    #[test]
    fn test_fast_read_skips_dummy_byte() {
        let mut flash = SimFlash::with_data(SimFlashConfig::default(), &[0xA0, 0xA1]).unwrap();
        let miso = command(&mut flash, &[opcodes::FAST_READ, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&miso[5..], &[0xA0, 0xA1]);
    }

    #[test]
    fn test_rejects_bad_geometry() {
        let config = SimFlashConfig {
            size: 3000,
            ..Default::default()
        };
        assert!(matches!(
            SimFlash::new(config),
            Err(SimError::InvalidFlashSize(3000))
        ));

        let image = vec![0u8; 2 * 1024 * 1024];
        assert!(matches!(
            SimFlash::with_data(SimFlashConfig::default(), &image),
            Err(SimError::ImageTooLarge { .. })
        ));
    }
}
