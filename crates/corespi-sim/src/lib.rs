//! corespi-sim - Software model of the CoreSPI controller
//!
//! This crate provides a register-level model of the CoreSPI master that
//! implements [`RegisterBlock`](corespi_core::regs::RegisterBlock), so the
//! real transfer engine can run without hardware. The model clocks frames
//! out of a bounded FIFO only when STATUS is polled, which lets tests decide
//! exactly when the peripheral makes progress.
//!
//! Slaves hang off the model's slave select line:
//!
//! - [`ScriptedSlave`] answers with a fixed byte sequence per selection
//! - [`SimFlash`] behaves like a small SPI NOR flash

mod controller;
mod error;
mod flash;
mod slave;

pub use controller::{Frame, SimCoreSpi};
pub use error::{Result, SimError};
pub use flash::{SimFlash, SimFlashConfig};
pub use slave::{ScriptedSlave, SimSlave};
