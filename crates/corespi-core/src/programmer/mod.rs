//! Programmer traits and abstractions
//!
//! This module defines the command-level trait the SPI flash protocol
//! helpers are written against.

mod traits;

pub use traits::*;
