//! Protocol implementations
//!
//! This module contains the SPI25 flash command sequences issued through a
//! [`SpiMaster`](crate::programmer::SpiMaster).

mod spi25;

pub use spi25::*;
