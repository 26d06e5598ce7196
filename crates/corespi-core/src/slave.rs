//! Slave handle, bus control and chip select
//!
//! A [`CoreSpiSlave`] owns the controller's register block for as long as it
//! exists, so at most one transfer can be in flight per controller. It also
//! owns the backup buffer the half-duplex adapter stages write phases in.

use crate::engine;
use crate::error::{ConfigError, Error, Result};
use crate::init::DeviceInit;
use crate::programmer::SpiMaster;
use crate::recovery::recover_from_rx_overflow;
use crate::regs::{
    RegisterBlock, CMD_RXFIFO_RESET, CMD_TXFIFO_RESET, COMMAND, CTRL1, CTRL1_ENABLE,
    CTRL1_MASTER, CTRL2, DEFAULT_FIFO_DEPTH, INT_ALL, INT_CLEAR, MAX_SLAVES, SSEL,
};
use crate::spi::{SpiCommand, ADDRESS_LEN, MAX_HEADER_LEN};
use bitflags::bitflags;
use heapless::Vec;

/// Default capacity of the backup buffer in bytes
pub const DEFAULT_BACKUP_LEN: usize = 128;

/// Default SPI clock requested by callers that do not specify one (1 MHz)
pub const DEFAULT_SPEED_HZ: u32 = 1_000_000;

bitflags! {
    /// SPI mode flags requested by the host driver model
    ///
    /// The bit values follow the host's `SPI_*` mode word. CoreSPI's frame
    /// format is fixed when the core is synthesized, so the clock bits are
    /// recorded but not applied; the last three are refused at setup.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SpiMode: u32 {
        /// Clock phase
        const CPHA      = 1 << 0;
        /// Clock polarity
        const CPOL      = 1 << 1;
        /// Chip select active high
        const CS_HIGH   = 1 << 2;
        /// Least significant bit first
        const LSB_FIRST = 1 << 3;
        /// Shared data line (SI/SO)
        const THREE_WIRE = 1 << 4;
        /// Loopback
        const LOOP      = 1 << 5;
        /// Act as SPI slave
        const SLAVE     = 1 << 6;
        /// Skip preamble bytes
        const PREAMBLE  = 1 << 7;

        /// Mode 0: CPOL=0, CPHA=0
        const MODE_0 = 0;
        /// Mode 1: CPOL=0, CPHA=1
        const MODE_1 = Self::CPHA.bits();
        /// Mode 2: CPOL=1, CPHA=0
        const MODE_2 = Self::CPOL.bits();
        /// Mode 3: CPOL=1, CPHA=1
        const MODE_3 = Self::CPOL.bits() | Self::CPHA.bits();
    }
}

/// Configuration for a slave handle
#[derive(Debug, Clone)]
pub struct SlaveConfig {
    /// Bus number
    pub bus: u32,
    /// Chip select (bit index in the slave select register)
    pub cs: u32,
    /// Requested maximum clock in Hz
    pub max_hz: u32,
    /// Mode flags
    pub mode: SpiMode,
    /// FIFO depth of the synthesized core, in frames
    pub fifo_depth: usize,
}

impl Default for SlaveConfig {
    fn default() -> Self {
        Self {
            bus: 0,
            cs: 0,
            max_hz: DEFAULT_SPEED_HZ,
            mode: SpiMode::MODE_0,
            fifo_depth: DEFAULT_FIFO_DEPTH,
        }
    }
}

impl SlaveConfig {
    /// Create a configuration for the given bus and chip select
    pub fn new(bus: u32, cs: u32) -> Self {
        Self {
            bus,
            cs,
            ..Default::default()
        }
    }

    /// Set the requested clock in Hz
    pub fn with_speed(mut self, max_hz: u32) -> Self {
        self.max_hz = max_hz;
        self
    }

    /// Set the mode flags
    pub fn with_mode(mut self, mode: SpiMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the FIFO depth
    pub fn with_fifo_depth(mut self, depth: usize) -> Self {
        self.fifo_depth = depth;
        self
    }

    fn validate(&self) -> core::result::Result<(), ConfigError> {
        if self.mode.contains(SpiMode::THREE_WIRE) {
            return Err(ConfigError::ThreeWire);
        }
        if self.mode.contains(SpiMode::SLAVE) {
            return Err(ConfigError::SlaveMode);
        }
        if self.mode.contains(SpiMode::PREAMBLE) {
            return Err(ConfigError::Preamble);
        }
        if !cs_is_valid(self.bus, self.cs) {
            return Err(ConfigError::InvalidChipSelect {
                bus: self.bus,
                cs: self.cs,
            });
        }
        if self.fifo_depth == 0 {
            return Err(ConfigError::InvalidFifoDepth);
        }
        Ok(())
    }
}

/// Whether a bus/chip-select pair is addressable
///
/// There is a single controller with one slave select line per bit of SSEL.
pub fn cs_is_valid(bus: u32, cs: u32) -> bool {
    bus == 0 && cs < MAX_SLAVES
}

/// A slave on the CoreSPI bus
///
/// `C` is the capacity of the backup buffer, which bounds the command length
/// of a single exchange.
pub struct CoreSpiSlave<R, const C: usize = DEFAULT_BACKUP_LEN> {
    pub(crate) regs: R,
    bus: u32,
    cs: u32,
    max_hz: u32,
    mode: SpiMode,
    pub(crate) fifo_depth: usize,
    pub(crate) backup: Vec<u8, C>,
}

impl<R: RegisterBlock, const C: usize> CoreSpiSlave<R, C> {
    /// Set up a slave and bring the controller to a known idle state
    ///
    /// Unsupported modes are refused before any register is touched. On
    /// success all slaves are deselected, both FIFOs flushed, pending
    /// interrupts cleared, auxiliary interrupts disabled and the core enabled
    /// in master mode. `init` then runs against the attached device.
    pub fn setup(regs: R, config: &SlaveConfig, init: &mut dyn DeviceInit) -> Result<Self> {
        if let Err(e) = config.validate() {
            log::error!("corespi: {}", e);
            return Err(e.into());
        }

        let mut slave = Self {
            regs,
            bus: config.bus,
            cs: config.cs,
            max_hz: config.max_hz,
            mode: config.mode,
            fifo_depth: config.fifo_depth,
            backup: Vec::new(),
        };

        log::debug!(
            "corespi: setup slave {}:{} (max {} Hz, mode {:?}, FIFO depth {})",
            slave.bus,
            slave.cs,
            slave.max_hz,
            slave.mode,
            slave.fifo_depth
        );

        let regs = &mut slave.regs;
        regs.write(SSEL, 0);
        regs.write(COMMAND, CMD_RXFIFO_RESET | CMD_TXFIFO_RESET);
        regs.write(INT_CLEAR, INT_ALL);
        regs.write(CTRL2, 0);
        regs.write(CTRL1, CTRL1_ENABLE | CTRL1_MASTER);

        init.init(&mut slave)?;
        Ok(slave)
    }

    /// Release the slave and hand back the register block
    pub fn free(self) -> R {
        log::debug!("corespi: free slave {}:{}", self.bus, self.cs);
        self.regs
    }

    /// Bus number
    pub fn bus(&self) -> u32 {
        self.bus
    }

    /// Chip select
    pub fn cs(&self) -> u32 {
        self.cs
    }

    /// Requested maximum clock in Hz
    pub fn max_hz(&self) -> u32 {
        self.max_hz
    }

    /// Mode flags the slave was set up with
    pub fn mode(&self) -> SpiMode {
        self.mode
    }

    /// FIFO depth in frames
    pub fn fifo_depth(&self) -> usize {
        self.fifo_depth
    }

    /// Register block
    pub fn regs(&self) -> &R {
        &self.regs
    }

    /// Mutable register block
    pub fn regs_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    /// Bytes staged by the last write phase
    pub fn backup(&self) -> &[u8] {
        &self.backup
    }

    /// Enable the core in master mode
    pub fn claim_bus(&mut self) {
        self.regs.write(CTRL1, CTRL1_ENABLE | CTRL1_MASTER);
    }

    /// Disable the core
    pub fn release_bus(&mut self) {
        self.regs.write(CTRL1, 0);
    }

    /// Assert this slave's select line
    pub fn cs_activate(&mut self) {
        recover_from_rx_overflow(&mut self.regs);
        self.regs.write(SSEL, 1 << self.cs);
    }

    /// Release every select line
    pub fn cs_deactivate(&mut self) {
        recover_from_rx_overflow(&mut self.regs);
        self.regs.write(SSEL, 0);
    }

    /// Send `cmd` and capture `resp.len()` response bytes
    ///
    /// Slave select must already be asserted.
    pub fn transfer(&mut self, cmd: &[u8], resp: &mut [u8]) {
        engine::transfer(&mut self.regs, self.fifo_depth, cmd, resp);
    }

    /// Run the engine with the staged backup buffer as the command
    pub(crate) fn transfer_staged(&mut self, resp: &mut [u8]) {
        engine::transfer(&mut self.regs, self.fifo_depth, &self.backup, resp);
    }

    pub(crate) fn discard_staged(&mut self) {
        self.backup.clear();
    }

    /// Replace the backup buffer with the concatenation of `parts`
    pub(crate) fn stage(&mut self, parts: &[&[u8]]) -> Result<()> {
        let len: usize = parts.iter().map(|p| p.len()).sum();
        if len > C {
            return Err(Error::BackupOverflow { len, capacity: C });
        }
        self.backup.clear();
        for part in parts {
            // Capacity checked above
            let _ = self.backup.extend_from_slice(part);
        }
        Ok(())
    }
}

impl<R: RegisterBlock, const C: usize> SpiMaster for CoreSpiSlave<R, C> {
    fn max_read_len(&self) -> usize {
        usize::from(u16::MAX)
    }

    fn max_write_len(&self) -> usize {
        C.saturating_sub(1 + ADDRESS_LEN)
    }

    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        let mut header = [0u8; MAX_HEADER_LEN];
        let len = cmd.encode_header(&mut header);
        self.stage(&[&header[..len], cmd.write_data])?;

        self.cs_activate();
        self.transfer_staged(cmd.read_buf);
        self.cs_deactivate();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init::NoDeviceInit;
    use crate::mock::LoopbackRegisters;
    use crate::protocol;
    use crate::regs::{STATUS, TX_DATA_LAST};

    fn setup(regs: LoopbackRegisters) -> CoreSpiSlave<LoopbackRegisters> {
        CoreSpiSlave::setup(regs, &SlaveConfig::default(), &mut NoDeviceInit).unwrap()
    }

    #[test]
    fn test_setup_idle_state() {
        let slave = setup(LoopbackRegisters::new(32));
        assert_eq!(
            slave.regs().writes(),
            &[
                (SSEL, 0),
                (COMMAND, CMD_RXFIFO_RESET | CMD_TXFIFO_RESET),
                (INT_CLEAR, INT_ALL),
                (CTRL2, 0),
                (CTRL1, CTRL1_ENABLE | CTRL1_MASTER),
            ]
        );
    }

    #[test]
    fn test_setup_rejects_unsupported_modes() {
        for (mode, expected) in [
            (SpiMode::THREE_WIRE, ConfigError::ThreeWire),
            (SpiMode::SLAVE | SpiMode::MODE_3, ConfigError::SlaveMode),
            (SpiMode::PREAMBLE, ConfigError::Preamble),
        ] {
            let config = SlaveConfig::default().with_mode(mode);
            let mut regs = LoopbackRegisters::new(32);
            let result = CoreSpiSlave::<_, 16>::setup(&mut regs, &config, &mut NoDeviceInit);

            assert_eq!(result.err(), Some(Error::Config(expected)));
            assert!(regs.writes().is_empty());
        }
    }

    #[test]
    fn test_setup_rejects_bad_chip_select() {
        let config = SlaveConfig::new(0, MAX_SLAVES);
        let result = CoreSpiSlave::<_, 16>::setup(
            LoopbackRegisters::new(32),
            &config,
            &mut NoDeviceInit,
        );
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidChipSelect { bus: 0, cs: 8 }))
        ));

        let config = SlaveConfig::default().with_fifo_depth(0);
        let result = CoreSpiSlave::<_, 16>::setup(
            LoopbackRegisters::new(32),
            &config,
            &mut NoDeviceInit,
        );
        assert_eq!(result.err(), Some(Error::Config(ConfigError::InvalidFifoDepth)));

        assert!(cs_is_valid(0, 7));
        assert!(!cs_is_valid(1, 0));
    }

    #[test]
    fn test_chip_select_bit() {
        let config = SlaveConfig::new(0, 3);
        let mut slave =
            CoreSpiSlave::<_, 16>::setup(LoopbackRegisters::new(32), &config, &mut NoDeviceInit)
                .unwrap();

        slave.cs_activate();
        assert_eq!(slave.regs_mut().read(SSEL), 1 << 3);
        slave.cs_deactivate();
        assert_eq!(slave.regs_mut().read(SSEL), 0);
    }

    #[test]
    fn test_chip_select_recovers_overflow() {
        let mut slave = setup(LoopbackRegisters::new(32));
        slave.regs_mut().inject_overflow();
        slave.regs_mut().clear_log();

        slave.cs_activate();

        let writes = slave.regs().writes();
        assert_eq!(writes.last(), Some(&(SSEL, 1)));
        assert!(writes.contains(&(INT_CLEAR, INT_ALL)));
        assert_eq!(slave.regs_mut().read(STATUS) & crate::regs::STATUS_RX_OVERFLOW, 0);
    }

    #[test]
    fn test_claim_release_bus() {
        let mut slave = setup(LoopbackRegisters::new(32));
        slave.release_bus();
        assert_eq!(slave.regs_mut().read(CTRL1), 0);
        slave.claim_bus();
        assert_eq!(slave.regs_mut().read(CTRL1), CTRL1_ENABLE | CTRL1_MASTER);
    }

    #[test]
    fn test_execute_stages_header() {
        let mut slave = setup(LoopbackRegisters::new(32).with_script(&[0, 0xEF, 0x40, 0x18]));
        let (mfr, dev) = protocol::read_jedec_id(&mut slave).unwrap();

        assert_eq!((mfr, dev), (0xEF, 0x4018));
        assert_eq!(slave.backup(), &[0x9F]);
        assert_eq!(slave.regs().frames().len(), 4);
        assert_eq!(slave.regs().writes().last(), Some(&(SSEL, 0)));
    }

    #[test]
    fn test_execute_rejects_oversized_command() {
        let mut slave = CoreSpiSlave::<_, 8>::setup(
            LoopbackRegisters::new(32),
            &SlaveConfig::default(),
            &mut NoDeviceInit,
        )
        .unwrap();
        slave.regs_mut().clear_log();

        assert_eq!(slave.max_write_len(), 4);

        let data = [0u8; 8];
        let result = protocol::program_page_3b(&mut slave, 0, &data);

        // Refused before WREN, so the write enable latch stays clear
        assert_eq!(result, Err(Error::BackupOverflow { len: 8, capacity: 4 }));
        assert!(slave.regs().frames().is_empty());
        assert!(!slave.regs().writes().iter().any(|(reg, _)| *reg == TX_DATA_LAST));
    }

    #[test]
    fn test_free_returns_registers() {
        let slave = setup(LoopbackRegisters::new(32));
        let regs = slave.free();
        assert_eq!(regs.writes().len(), 5);
    }
}
