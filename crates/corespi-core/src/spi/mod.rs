//! SPI types and command structures
//!
//! This module provides types for representing SPI flash commands and the
//! JEDEC opcodes the controller tooling issues.

mod command;
pub mod opcodes;

pub use command::{SpiCommand, ADDRESS_LEN, MAX_HEADER_LEN};
pub use opcodes::*;
