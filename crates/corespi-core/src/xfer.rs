//! Half-duplex exchange adapter
//!
//! The host driver model describes one exchange as a pair of calls on the
//! same slave: a write phase carrying the command, then a read phase
//! carrying the response buffer. CoreSPI has to clock both in one transfer
//! so the last frame can go through TX_DATA_LAST, so the write phase is only
//! staged in the backup buffer and the read phase runs the engine.
//!
//! ```ignore
//! slave.xfer(8, Some(&[opcodes::RDSR]), None, XferFlags::BEGIN)?;
//! slave.xfer(8, None, Some(&mut status), XferFlags::END)?;
//! ```

use crate::error::{Error, Result};
use crate::regs::RegisterBlock;
use crate::slave::CoreSpiSlave;
use bitflags::bitflags;

bitflags! {
    /// Transfer boundary flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct XferFlags: u32 {
        /// Assert slave select before this phase
        const BEGIN = 1 << 0;
        /// Release slave select after this phase
        const END   = 1 << 1;
    }
}

impl<R: RegisterBlock, const C: usize> CoreSpiSlave<R, C> {
    /// Perform one phase of a half-duplex exchange
    ///
    /// - `bitlen == 0` only honours [`XferFlags::END`].
    /// - With `dout` alone, `bitlen / 8` bytes are staged in the backup
    ///   buffer; nothing is clocked yet.
    /// - With `din` alone, the staged bytes are sent and `bitlen / 8`
    ///   response bytes are read into `din`.
    ///
    /// Any error terminates the exchange: slave select is released as if
    /// `END` had been passed, the staged bytes are discarded and no data is
    /// transferred.
    pub fn xfer(
        &mut self,
        bitlen: u32,
        dout: Option<&[u8]>,
        din: Option<&mut [u8]>,
        flags: XferFlags,
    ) -> Result<()> {
        let result = self.xfer_phase(bitlen, dout, din, flags);

        if result.is_err() || flags.contains(XferFlags::END) {
            self.cs_deactivate();
        }
        if let Err(e) = result {
            self.discard_staged();
            log::debug!("corespi: exchange aborted: {}", e);
        }
        result
    }

    fn xfer_phase(
        &mut self,
        bitlen: u32,
        dout: Option<&[u8]>,
        din: Option<&mut [u8]>,
        flags: XferFlags,
    ) -> Result<()> {
        if bitlen == 0 {
            return Ok(());
        }
        if bitlen % 8 != 0 {
            return Err(Error::InvalidBitLength(bitlen));
        }
        let len = (bitlen / 8) as usize;

        if flags.contains(XferFlags::BEGIN) {
            self.cs_activate();
        }

        match (dout, din) {
            (Some(dout), None) => {
                let data = dout.get(..len).ok_or(Error::BufferTooSmall)?;
                self.stage(&[data])
            }
            (None, Some(din)) => {
                let resp = din.get_mut(..len).ok_or(Error::BufferTooSmall)?;
                self.transfer_staged(resp);
                Ok(())
            }
            (Some(_), Some(_)) => Err(Error::FullDuplexUnsupported),
            (None, None) => Ok(()),
        }
    }
}
