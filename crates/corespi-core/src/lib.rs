//! corespi-core - Polled transfer engine for the Microsemi CoreSPI master
//!
//! CoreSPI is a soft SPI master with a small fixed-depth FIFO and a separate
//! "last frame" transmit register that makes the hardware drop slave select
//! after the final byte. This crate drives it without interrupts or DMA:
//! every wait is a busy poll of the status register.
//!
//! It is designed to be `no_std` compatible for use in boot loaders.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`)
//! - `alloc` - Enable `RegisterBlock` for boxed register backends
//!
//! # Layers
//!
//! - [`regs`] - register layout and the [`RegisterBlock`](regs::RegisterBlock) access trait
//! - [`recovery`] - receive overflow recovery
//! - [`engine`] - the pipelined transfer state machine
//! - [`slave`] - slave setup, bus claim/release and chip select
//! - [`xfer`] - the two-call write-then-read adapter
//! - [`programmer`] / [`protocol`] - SPI flash commands on top of a slave
//!
//! # Example
//!
//! ```ignore
//! use corespi_core::init::SoftwareReset;
//! use corespi_core::regs::MmioRegisters;
//! use corespi_core::slave::{CoreSpiSlave, SlaveConfig};
//! use corespi_core::xfer::XferFlags;
//!
//! let regs = unsafe { MmioRegisters::new(0x7000_6000 as *mut u8) };
//! let mut slave: CoreSpiSlave<_> =
//!     CoreSpiSlave::setup(regs, &SlaveConfig::new(0, 0), &mut SoftwareReset)?;
//!
//! let mut id = [0u8; 3];
//! slave.xfer(8, Some(&[0x9F]), None, XferFlags::BEGIN)?;
//! slave.xfer(24, None, Some(&mut id), XferFlags::END)?;
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod engine;
pub mod error;
pub mod init;
pub mod programmer;
pub mod protocol;
pub mod recovery;
pub mod regs;
pub mod slave;
pub mod spi;
pub mod xfer;

#[cfg(test)]
mod mock;

pub use error::{ConfigError, Error, Result};
