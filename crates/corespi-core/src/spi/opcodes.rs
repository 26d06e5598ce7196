//! SPI NOR flash opcodes issued through the controller
//!
//! Only the 3-byte address, single-line command set is listed: that is all
//! a boot flash behind CoreSPI needs.

/// Set the write enable latch; needed before program and erase
pub const WREN: u8 = 0x06;
/// Clear the write enable latch
pub const WRDI: u8 = 0x04;

/// Status register 1
pub const RDSR: u8 = 0x05;
/// Manufacturer ID followed by a two byte device ID
pub const RDID: u8 = 0x9F;

/// Read at clock rates up to the slow read limit
pub const READ: u8 = 0x03;
/// Read with one dummy byte after the address
pub const FAST_READ: u8 = 0x0B;
/// Program up to one page
pub const PP: u8 = 0x02;
/// Erase the 4 KiB sector containing the address
pub const SE_20: u8 = 0x20;
/// Erase the whole array
pub const CE_C7: u8 = 0xC7;

// Micron/ST parts can come out of reset in a state where they ignore
// standard commands until they see RSTEN followed by RST.

/// Arm a software reset
pub const RSTEN: u8 = 0x66;
/// Perform an armed software reset
pub const RST: u8 = 0x99;

/// RDSR bit 0: program, erase or reset in progress
pub const SR1_WIP: u8 = 0x01;
/// RDSR bit 1: write enable latch
pub const SR1_WEL: u8 = 0x02;
