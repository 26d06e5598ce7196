//! CLI command implementations
//!
//! Flash-level commands (`probe`, `read`) are written against the
//! [`SpiMaster`](corespi_core::programmer::SpiMaster) trait. `xfer` talks to
//! the slave handle directly through the two-call exchange interface.

mod list;
mod probe;
mod read;
mod xfer;

pub use list::list_programmers;
pub use probe::run_probe;
pub use read::run_read;
pub use xfer::{parse_hex_bytes, run_xfer};
