//! Attached-device initialization
//!
//! Some flash parts need a command sequence before they answer normally.
//! The board picks a [`DeviceInit`] strategy and hands it to
//! [`CoreSpiSlave::setup`](crate::slave::CoreSpiSlave::setup), which runs it
//! once the controller is in its idle state.

use crate::error::Result;
use crate::programmer::SpiMaster;
use crate::protocol;

/// Initialization run against the attached device at setup time
pub trait DeviceInit {
    /// Bring the attached device into a usable state
    fn init(&mut self, master: &mut dyn SpiMaster) -> Result<()>;
}

/// Device needs no initialization
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDeviceInit;

impl DeviceInit for NoDeviceInit {
    fn init(&mut self, _master: &mut dyn SpiMaster) -> Result<()> {
        Ok(())
    }
}

/// Software reset (RSTEN, RST), then wait for the device to report ready
///
/// Needed by Micron/ST parts. The ready wait has no timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareReset;

impl DeviceInit for SoftwareReset {
    fn init(&mut self, master: &mut dyn SpiMaster) -> Result<()> {
        protocol::software_reset(master)?;
        let busy = protocol::wait_ready(master)?;
        log::debug!("corespi: device ready after reset ({} busy polls)", busy);
        Ok(())
    }
}
