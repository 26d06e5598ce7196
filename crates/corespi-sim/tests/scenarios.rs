//! End-to-end exchanges through the slave handle against the simulator

use corespi_core::init::NoDeviceInit;
use corespi_core::recovery::recover_from_rx_overflow;
use corespi_core::regs::{
    RegisterBlock, CMD_RXFIFO_RESET, CMD_TXFIFO_RESET, COMMAND, CTRL1, CTRL1_ENABLE, CTRL1_MASTER,
    INT_ALL, INT_CLEAR, SSEL, STATUS, STATUS_RX_OVERFLOW, TX_DATA, TX_DATA_LAST,
};
use corespi_core::slave::{CoreSpiSlave, SlaveConfig, SpiMode};
use corespi_core::xfer::XferFlags;
use corespi_core::{ConfigError, Error};
use corespi_sim::{ScriptedSlave, SimCoreSpi};

type Slave = CoreSpiSlave<SimCoreSpi<ScriptedSlave>>;

fn setup(sim: SimCoreSpi<ScriptedSlave>) -> Slave {
    let config = SlaveConfig::default().with_fifo_depth(sim.depth());
    let mut slave = CoreSpiSlave::setup(sim, &config, &mut NoDeviceInit).unwrap();
    slave.regs_mut().clear_log();
    slave
}

fn slave(depth: usize, script: &[u8]) -> Slave {
    setup(SimCoreSpi::new(depth, ScriptedSlave::new(script)).unwrap())
}

fn count_writes(sim: &SimCoreSpi<ScriptedSlave>, reg: usize) -> usize {
    sim.writes().iter().filter(|(r, _)| *r == reg).count()
}

#[test]
fn test_command_only_goes_through_last_register() {
    let mut slave = slave(32, &[]);

    slave.cs_activate();
    slave.transfer(&[0x9F], &mut []);
    slave.cs_deactivate();

    let sim = slave.regs();
    assert_eq!(count_writes(sim, TX_DATA), 0);
    assert!(sim.writes().contains(&(TX_DATA_LAST, 0x9F)));
    assert_eq!(count_writes(sim, TX_DATA_LAST), 1);
    assert_eq!(sim.frames().len(), 1);
    assert!(sim.frames()[0].last);
    assert_eq!(sim.slave().transactions(), &[vec![0x9F]]);
}

#[test]
fn test_status_read_through_adapter() {
    let mut slave = slave(32, &[0xFF, 0xAA, 0xBB, 0xCC, 0xDD]);

    slave.xfer(8, Some(&[0x05]), None, XferFlags::BEGIN).unwrap();
    let mut resp = [0u8; 4];
    slave.xfer(32, None, Some(&mut resp), XferFlags::END).unwrap();

    assert_eq!(resp, [0xAA, 0xBB, 0xCC, 0xDD]);

    let sim = slave.regs();
    let lasts: Vec<usize> = sim
        .frames()
        .iter()
        .enumerate()
        .filter(|(_, f)| f.last)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(lasts, [4]);
    assert_eq!(sim.slave().transactions(), &[vec![0x05, 0, 0, 0, 0]]);
    assert!(!sim.line_active());
}

#[test]
fn test_unaligned_bit_length_is_refused() {
    let mut slave = slave(32, &[]);

    let result = slave.xfer(13, Some(&[0x9F, 0x00]), None, XferFlags::BEGIN);

    assert_eq!(result, Err(Error::InvalidBitLength(13)));
    let sim = slave.regs();
    assert_eq!(count_writes(sim, TX_DATA) + count_writes(sim, TX_DATA_LAST), 0);
    assert_eq!(sim.writes().last(), Some(&(SSEL, 0)));
    assert!(sim.frames().is_empty());
}

#[test]
fn test_slave_mode_setup_touches_nothing() {
    let mut sim = SimCoreSpi::new(32, ScriptedSlave::default()).unwrap();
    let config = SlaveConfig::default().with_mode(SpiMode::SLAVE);

    let result = CoreSpiSlave::<_>::setup(&mut sim, &config, &mut NoDeviceInit);

    assert!(matches!(result, Err(Error::Config(ConfigError::SlaveMode))));
    assert!(sim.writes().is_empty());
}

#[test]
fn test_small_fifo_long_transfer() {
    let script: Vec<u8> = (0x40..0x4A).collect();
    let sim = SimCoreSpi::new(4, ScriptedSlave::new(&script))
        .unwrap()
        .with_stall(3);
    let mut slave = setup(sim);

    let cmd = [0x0B, 0x00, 0x10];
    let mut resp = [0u8; 7];
    slave.cs_activate();
    slave.transfer(&cmd, &mut resp);
    slave.cs_deactivate();

    assert_eq!(resp, script[3..]);
    let sim = slave.regs();
    assert_eq!(sim.frames().len(), 10);
    assert!(sim.max_transit() <= 4);
    assert_eq!(sim.dropped(), 0);
}

#[test]
fn test_pending_overflow_is_cleared_before_transfer() {
    let mut slave = slave(8, &[0x00, 0x5A]);
    slave.regs_mut().inject_overflow();

    slave.cs_activate();
    let mut resp = [0u8; 1];
    slave.transfer(&[0x05], &mut resp);
    slave.cs_deactivate();

    assert_eq!(resp, [0x5A]);
    assert_eq!(slave.regs_mut().read(STATUS) & STATUS_RX_OVERFLOW, 0);
}

#[test]
fn test_overflow_recovery_sequence() {
    let mut sim = SimCoreSpi::new(32, ScriptedSlave::default()).unwrap();
    sim.write(CTRL1, CTRL1_ENABLE | CTRL1_MASTER);
    sim.inject_overflow();
    sim.clear_log();

    assert!(recover_from_rx_overflow(&mut sim));

    assert_eq!(
        sim.writes(),
        &[
            (CTRL1, 0),
            (COMMAND, CMD_RXFIFO_RESET | CMD_TXFIFO_RESET),
            (INT_CLEAR, INT_ALL),
            (CTRL1, CTRL1_ENABLE | CTRL1_MASTER),
        ]
    );
    assert_eq!(sim.read(STATUS) & STATUS_RX_OVERFLOW, 0);
    assert_eq!(sim.read(CTRL1), CTRL1_ENABLE | CTRL1_MASTER);
}

#[test]
fn test_overflow_recovery_without_overflow() {
    let mut sim = SimCoreSpi::new(32, ScriptedSlave::default()).unwrap();
    sim.write(CTRL1, CTRL1_ENABLE | CTRL1_MASTER);
    sim.write(SSEL, 1);
    sim.clear_log();

    assert!(!recover_from_rx_overflow(&mut sim));

    assert!(sim.writes().is_empty());
    assert_eq!(sim.read(CTRL1), CTRL1_ENABLE | CTRL1_MASTER);
    assert_eq!(sim.read(SSEL), 1);
}

#[test]
fn test_wrong_chip_select_sees_idle_line() {
    let sim = SimCoreSpi::new(32, ScriptedSlave::new(&[0x00, 0x42]))
        .unwrap()
        .with_chip_select(3)
        .unwrap();
    let config = SlaveConfig::new(0, 2);
    let mut slave: CoreSpiSlave<_> =
        CoreSpiSlave::setup(sim, &config, &mut NoDeviceInit).unwrap();

    let mut resp = [0u8; 1];
    slave.xfer(8, Some(&[0x05]), None, XferFlags::BEGIN).unwrap();
    slave.xfer(8, None, Some(&mut resp), XferFlags::END).unwrap();

    assert_eq!(resp, [0xFF]);
    assert!(slave.regs().slave().transactions().is_empty());
}
