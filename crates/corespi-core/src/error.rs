//! Error types for corespi-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.
//!
//! Receive overflows never show up here: they are corrected in place by
//! [`recover_from_rx_overflow`](crate::recovery::recover_from_rx_overflow)
//! before every select, deselect and transfer.

use core::fmt;

/// Slave configuration rejected at setup time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// 3-wire (bidirectional data line) operation was requested
    ThreeWire,
    /// The controller was asked to act as an SPI slave
    SlaveMode,
    /// Preamble byte skipping was requested
    Preamble,
    /// Bus/chip-select pair is not addressable by the controller
    InvalidChipSelect {
        /// Requested bus number
        bus: u32,
        /// Requested chip select
        cs: u32,
    },
    /// FIFO depth must be at least one frame
    InvalidFifoDepth,
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Unsupported slave configuration
    Config(ConfigError),
    /// Transfer length in bits is not a whole number of bytes
    InvalidBitLength(u32),
    /// Write phase does not fit in the slave's backup buffer
    BackupOverflow {
        /// Bytes the caller tried to stage
        len: usize,
        /// Capacity of the backup buffer
        capacity: usize,
    },
    /// Caller buffer is shorter than the requested transfer
    BufferTooSmall,
    /// Simultaneous write and read buffers in a single call
    FullDuplexUnsupported,
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ThreeWire => write!(f, "3-wire mode not supported"),
            Self::SlaveMode => write!(f, "slave mode not supported"),
            Self::Preamble => write!(f, "preamble byte skipping not supported"),
            Self::InvalidChipSelect { bus, cs } => {
                write!(f, "invalid chip select {}:{}", bus, cs)
            }
            Self::InvalidFifoDepth => write!(f, "FIFO depth must be non-zero"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration error: {}", e),
            Self::InvalidBitLength(bits) => {
                write!(f, "transfer of {} bits is not a multiple of 8", bits)
            }
            Self::BackupOverflow { len, capacity } => write!(
                f,
                "write phase of {} bytes exceeds backup buffer ({} bytes)",
                len, capacity
            ),
            Self::BufferTooSmall => write!(f, "buffer too small"),
            Self::FullDuplexUnsupported => {
                write!(f, "full-duplex transfers are not supported")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
