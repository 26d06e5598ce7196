//! Programmer trait definitions

use crate::error::Result;
use crate::spi::SpiCommand;

/// Command-level access to a SPI flash
///
/// Each [`execute`](Self::execute) call is one complete flash command with
/// its own chip select cycle. The SPI25 helpers in [`protocol`](crate::protocol)
/// are written against this trait, and
/// [`CoreSpiSlave`](crate::slave::CoreSpiSlave) implements it by staging the
/// encoded command and running one transfer.
pub trait SpiMaster {
    /// Largest `read_buf` a single command may carry
    fn max_read_len(&self) -> usize;

    /// Largest `write_data` a single command may carry
    fn max_write_len(&self) -> usize;

    /// Run one command: select, clock header and write data, clock
    /// `read_buf.len()` response bytes, deselect
    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()>;
}

impl<M: SpiMaster + ?Sized> SpiMaster for &mut M {
    fn max_read_len(&self) -> usize {
        (**self).max_read_len()
    }

    fn max_write_len(&self) -> usize {
        (**self).max_write_len()
    }

    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        (**self).execute(cmd)
    }
}
