//! Receive overflow recovery
//!
//! A receive overflow left behind by a previous slave wedges the controller
//! until it is disabled and both FIFOs are flushed. Recovery runs before
//! every select, deselect and transfer; it is the controller's only fault
//! handling and never reports failure.

use crate::regs::{
    RegisterBlock, CMD_RXFIFO_RESET, CMD_TXFIFO_RESET, COMMAND, CTRL1, CTRL1_ENABLE,
    CTRL1_MASTER, INT_ALL, INT_CLEAR, STATUS, STATUS_RX_OVERFLOW,
};

/// Restore the controller after a receive overflow
///
/// Does nothing unless the overflow flag is set in STATUS. Otherwise the core
/// is disabled, both FIFOs are flushed, all interrupts are cleared and the
/// core is re-enabled in master mode.
///
/// Returns `true` if a recovery sequence was issued.
pub fn recover_from_rx_overflow<R: RegisterBlock + ?Sized>(regs: &mut R) -> bool {
    let status = regs.read(STATUS);
    if status & STATUS_RX_OVERFLOW == 0 {
        return false;
    }

    log::warn!("corespi: recovering from RX overflow (status {:#04x})", status);
    regs.write(CTRL1, 0);
    regs.write(COMMAND, CMD_RXFIFO_RESET | CMD_TXFIFO_RESET);
    regs.write(INT_CLEAR, INT_ALL);
    regs.write(CTRL1, CTRL1_ENABLE | CTRL1_MASTER);
    true
}
