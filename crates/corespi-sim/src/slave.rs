//! Simulated SPI slaves

/// A device attached to the simulated slave select line
///
/// The controller calls [`select`](Self::select) when the line goes active,
/// [`exchange`](Self::exchange) once per clocked frame while it is active and
/// [`deselect`](Self::deselect) when it drops again, either because the
/// final frame went out or because SSEL was cleared.
pub trait SimSlave {
    /// Slave select asserted
    fn select(&mut self) {}

    /// Shift one byte in and return the byte shifted out
    fn exchange(&mut self, mosi: u8) -> u8;

    /// Slave select released
    fn deselect(&mut self) {}
}

impl<S: SimSlave + ?Sized> SimSlave for Box<S> {
    fn select(&mut self) {
        (**self).select()
    }

    fn exchange(&mut self, mosi: u8) -> u8 {
        (**self).exchange(mosi)
    }

    fn deselect(&mut self) {
        (**self).deselect()
    }
}

/// Slave that answers every selection with the same byte sequence
///
/// Frame `i` of a selection is answered with `script[i]`, or with the idle
/// byte once the script is exhausted. Every selection's MOSI bytes are
/// recorded.
#[derive(Debug, Clone)]
pub struct ScriptedSlave {
    script: Vec<u8>,
    idle: u8,
    index: usize,
    transactions: Vec<Vec<u8>>,
}

impl ScriptedSlave {
    /// Create a slave answering with `script`
    pub fn new(script: &[u8]) -> Self {
        Self {
            script: script.to_vec(),
            idle: 0xFF,
            index: 0,
            transactions: Vec::new(),
        }
    }

    /// Byte returned once the script runs out (default 0xFF)
    pub fn with_idle(mut self, idle: u8) -> Self {
        self.idle = idle;
        self
    }

    /// MOSI bytes seen, one entry per selection
    pub fn transactions(&self) -> &[Vec<u8>] {
        &self.transactions
    }
}

impl Default for ScriptedSlave {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl SimSlave for ScriptedSlave {
    fn select(&mut self) {
        self.index = 0;
        self.transactions.push(Vec::new());
    }

    fn exchange(&mut self, mosi: u8) -> u8 {
        if let Some(current) = self.transactions.last_mut() {
            current.push(mosi);
        }
        let miso = self.script.get(self.index).copied().unwrap_or(self.idle);
        self.index += 1;
        miso
    }
}
