//! Error types for the simulator

use thiserror::Error;

/// Errors raised while building a simulated setup
#[derive(Debug, Error)]
pub enum SimError {
    /// The simulated FIFO must hold at least one frame
    #[error("FIFO depth must be at least 1")]
    InvalidFifoDepth,

    /// Flash sizes are powers of two
    #[error("invalid flash size {0:#x}: must be a non-zero power of two")]
    InvalidFlashSize(usize),

    /// The slave select register has eight lines
    #[error("chip select {0} out of range (0-7)")]
    InvalidChipSelect(u32),

    /// Page and sector sizes must divide the flash evenly
    #[error("invalid flash geometry: page {page} / sector {sector} / size {size}")]
    InvalidGeometry {
        /// Page size in bytes
        page: usize,
        /// Sector size in bytes
        sector: usize,
        /// Flash size in bytes
        size: usize,
    },

    /// Initial contents do not fit in the flash
    #[error("image of {len} bytes does not fit in a {size} byte flash")]
    ImageTooLarge {
        /// Image length
        len: usize,
        /// Flash size
        size: usize,
    },
}

/// Result type for simulator construction
pub type Result<T> = std::result::Result<T, SimError>;
