//! CoreSPI register file
//!
//! The controller exposes eleven 32-bit registers at fixed byte offsets from
//! its APB base address. Only the low byte of each register carries data;
//! the driver always accesses them as full 32-bit words.
//!
//! Access goes through the [`RegisterBlock`] trait so the transfer engine can
//! run against real memory-mapped hardware ([`MmioRegisters`]) or against a
//! software model of the peripheral.

/// Control register 1: enable, master mode, interrupt enables
pub const CTRL1: usize = 0x00;
/// Interrupt clear register (write 1 to clear)
pub const INT_CLEAR: usize = 0x04;
/// Receive data register (pops the RX FIFO)
pub const RX_DATA: usize = 0x08;
/// Transmit data register (pushes the TX FIFO)
pub const TX_DATA: usize = 0x0C;
/// Masked interrupt status
pub const INT_MASK: usize = 0x10;
/// Raw interrupt status
pub const INT_RAW: usize = 0x14;
/// Control register 2: auxiliary interrupt enables
pub const CTRL2: usize = 0x18;
/// Command register: FIFO resets
pub const COMMAND: usize = 0x1C;
/// Status register
pub const STATUS: usize = 0x20;
/// Slave select register, one bit per slave line
pub const SSEL: usize = 0x24;
/// Transmit data register for the final frame
///
/// A write here transmits the byte and marks it as the last frame of the
/// transfer, after which the hardware deasserts slave select on its own.
pub const TX_DATA_LAST: usize = 0x28;

/// Size of the register window in bytes
pub const REGISTER_WINDOW: usize = 0x2C;

/// CTRL1: core enable
pub const CTRL1_ENABLE: u32 = 0x01;
/// CTRL1: master mode
pub const CTRL1_MASTER: u32 = 0x02;

/// COMMAND: flush the receive FIFO
pub const CMD_RXFIFO_RESET: u32 = 0x01;
/// COMMAND: flush the transmit FIFO
pub const CMD_TXFIFO_RESET: u32 = 0x02;

/// STATUS: receive FIFO is empty
///
/// Data is available to read from [`RX_DATA`] while this bit is clear.
pub const STATUS_RX_EMPTY: u32 = 1 << 2;
/// STATUS: receive FIFO overflowed
pub const STATUS_RX_OVERFLOW: u32 = 1 << 4;

/// INT_CLEAR: every interrupt source
pub const INT_ALL: u32 = 0xFF;

/// Number of slave select lines in [`SSEL`]
pub const MAX_SLAVES: u32 = 8;

/// Default FIFO depth of the synthesized core, in frames
pub const DEFAULT_FIFO_DEPTH: usize = 32;

/// Access to a CoreSPI register file
///
/// `offset` is one of the byte offsets defined in this module. Implementations
/// must perform every access: reads of [`RX_DATA`] and [`STATUS`] have side
/// effects on real hardware and must never be cached or elided.
pub trait RegisterBlock {
    /// Read the register at `offset`
    fn read(&mut self, offset: usize) -> u32;

    /// Write `value` to the register at `offset`
    fn write(&mut self, offset: usize, value: u32);

    /// Read-modify-write helper
    fn modify(&mut self, offset: usize, f: impl FnOnce(u32) -> u32)
    where
        Self: Sized,
    {
        let value = self.read(offset);
        self.write(offset, f(value));
    }
}

impl<T: RegisterBlock + ?Sized> RegisterBlock for &mut T {
    fn read(&mut self, offset: usize) -> u32 {
        (**self).read(offset)
    }

    fn write(&mut self, offset: usize, value: u32) {
        (**self).write(offset, value)
    }
}

// Lets callers pick the register backend at runtime
#[cfg(feature = "alloc")]
impl RegisterBlock for alloc::boxed::Box<dyn RegisterBlock> {
    fn read(&mut self, offset: usize) -> u32 {
        (**self).read(offset)
    }

    fn write(&mut self, offset: usize, value: u32) {
        (**self).write(offset, value)
    }
}

/// Memory-mapped CoreSPI registers
pub struct MmioRegisters {
    base: *mut u32,
}

impl MmioRegisters {
    /// Wrap the register window starting at `base`
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    /// - `base` points to a mapped CoreSPI register window of at least
    ///   [`REGISTER_WINDOW`] bytes, aligned to 4 bytes
    /// - The mapping outlives the returned value
    /// - No other code accesses the same controller concurrently
    pub unsafe fn new(base: *mut u8) -> Self {
        debug_assert!(base as usize & 3 == 0, "unaligned register window");
        Self {
            base: base as *mut u32,
        }
    }
}

impl RegisterBlock for MmioRegisters {
    #[inline]
    fn read(&mut self, offset: usize) -> u32 {
        debug_assert!(offset < REGISTER_WINDOW && offset & 3 == 0);
        // SAFETY: offset is within the window guaranteed by `new`
        unsafe { core::ptr::read_volatile(self.base.add(offset / 4)) }
    }

    #[inline]
    fn write(&mut self, offset: usize, value: u32) {
        debug_assert!(offset < REGISTER_WINDOW && offset & 3 == 0);
        // SAFETY: offset is within the window guaranteed by `new`
        unsafe { core::ptr::write_volatile(self.base.add(offset / 4), value) }
    }
}
