//! Register-level CoreSPI model
//!
//! The model keeps the controller's two FIFOs, its overflow flag and the
//! slave select output. Frames are only clocked while the core is enabled,
//! and at most one per STATUS read; an availability function decides on
//! which polls the shift register is free. Writing a frame through
//! TX_DATA_LAST releases slave select once that frame has been shifted.

use crate::error::{Result, SimError};
use crate::slave::SimSlave;
use corespi_core::regs::{
    RegisterBlock, CMD_RXFIFO_RESET, CMD_TXFIFO_RESET, COMMAND, CTRL1, CTRL1_ENABLE, INT_CLEAR,
    MAX_SLAVES, REGISTER_WINDOW, RX_DATA, SSEL, STATUS, STATUS_RX_EMPTY, STATUS_RX_OVERFLOW,
    TX_DATA, TX_DATA_LAST,
};
use std::collections::VecDeque;

const NREGS: usize = REGISTER_WINDOW / 4;

/// One clocked frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Byte shifted out
    pub mosi: u8,
    /// Byte shifted in
    pub miso: u8,
    /// Written through TX_DATA_LAST
    pub last: bool,
    /// Slave select was active while the frame was clocked
    pub selected: bool,
}

/// Simulated CoreSPI controller with one slave attached
pub struct SimCoreSpi<S> {
    regs: [u32; NREGS],
    depth: usize,
    tx: VecDeque<(u8, bool)>,
    rx: VecDeque<u8>,
    overflow: bool,
    line_active: bool,
    slave: S,
    cs: u32,
    ready: Box<dyn FnMut(u64) -> bool>,
    polls: u64,
    frames: Vec<Frame>,
    writes: Vec<(usize, u32)>,
    max_transit: usize,
    dropped: usize,
}

impl<S: SimSlave> SimCoreSpi<S> {
    /// Create a controller with a `depth` frame FIFO and `slave` on line 0
    pub fn new(depth: usize, slave: S) -> Result<Self> {
        if depth == 0 {
            return Err(SimError::InvalidFifoDepth);
        }
        Ok(Self {
            regs: [0; NREGS],
            depth,
            tx: VecDeque::with_capacity(depth),
            rx: VecDeque::with_capacity(depth),
            overflow: false,
            line_active: false,
            slave,
            cs: 0,
            ready: Box::new(|_| true),
            polls: 0,
            frames: Vec::new(),
            writes: Vec::new(),
            max_transit: 0,
            dropped: 0,
        })
    }

    /// Attach the slave to select line `cs` instead of line 0
    pub fn with_chip_select(mut self, cs: u32) -> Result<Self> {
        if cs >= MAX_SLAVES {
            return Err(SimError::InvalidChipSelect(cs));
        }
        self.cs = cs;
        Ok(self)
    }

    /// Decide per STATUS poll whether a frame can be clocked
    ///
    /// `ready` receives the zero-based poll number.
    pub fn with_availability(mut self, ready: impl FnMut(u64) -> bool + 'static) -> Self {
        self.ready = Box::new(ready);
        self
    }

    /// Clock one frame every `stall + 1` polls
    pub fn with_stall(self, stall: u64) -> Self {
        self.with_availability(move |poll| poll % (stall + 1) == stall)
    }

    /// Attached slave
    pub fn slave(&self) -> &S {
        &self.slave
    }

    /// Mutable attached slave
    pub fn slave_mut(&mut self) -> &mut S {
        &mut self.slave
    }

    /// Detach and return the slave
    pub fn into_slave(self) -> S {
        self.slave
    }

    /// FIFO depth in frames
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Every frame clocked so far
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Register writes in order
    pub fn writes(&self) -> &[(usize, u32)] {
        &self.writes
    }

    /// Number of STATUS polls so far
    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// Highest number of frames held in both FIFOs at once
    pub fn max_transit(&self) -> usize {
        self.max_transit
    }

    /// Frames lost to a full TX or RX FIFO
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Whether the slave select line is currently active
    pub fn line_active(&self) -> bool {
        self.line_active
    }

    /// Raise the receive overflow flag
    pub fn inject_overflow(&mut self) {
        self.overflow = true;
    }

    /// Forget recorded frames, writes and transit history
    pub fn clear_log(&mut self) {
        self.frames.clear();
        self.writes.clear();
        self.max_transit = 0;
        self.dropped = 0;
    }

    fn enabled(&self) -> bool {
        self.regs[CTRL1 / 4] & CTRL1_ENABLE != 0
    }

    fn status(&self) -> u32 {
        let mut status = 0;
        if self.rx.is_empty() {
            status |= STATUS_RX_EMPTY;
        }
        if self.overflow {
            status |= STATUS_RX_OVERFLOW;
        }
        status
    }

    fn poll(&mut self) {
        let poll = self.polls;
        self.polls += 1;

        if !self.enabled() || self.tx.is_empty() || !(self.ready)(poll) {
            return;
        }
        if let Some((mosi, last)) = self.tx.pop_front() {
            self.clock(mosi, last);
        }
    }

    fn clock(&mut self, mosi: u8, last: bool) {
        let selected = self.regs[SSEL / 4] & (1 << self.cs) != 0;
        if selected && !self.line_active {
            self.line_active = true;
            self.slave.select();
        }

        let miso = if self.line_active {
            self.slave.exchange(mosi)
        } else {
            0xFF
        };
        self.frames.push(Frame {
            mosi,
            miso,
            last,
            selected: self.line_active,
        });

        if self.rx.len() >= self.depth {
            log::trace!("sim: RX FIFO full, frame {} lost", self.frames.len() - 1);
            self.overflow = true;
            self.dropped += 1;
        } else {
            self.rx.push_back(miso);
        }

        if last && self.line_active {
            self.line_active = false;
            self.slave.deselect();
        }
    }

    fn push(&mut self, value: u32, last: bool) {
        if self.tx.len() >= self.depth {
            log::trace!("sim: TX FIFO full, write of {:#04x} lost", value as u8);
            self.dropped += 1;
            return;
        }
        self.tx.push_back((value as u8, last));
        self.max_transit = self.max_transit.max(self.tx.len() + self.rx.len());
    }

    fn write_ssel(&mut self, value: u32) {
        self.regs[SSEL / 4] = value;
        if value & (1 << self.cs) == 0 && self.line_active {
            self.line_active = false;
            self.slave.deselect();
        }
    }
}

impl<S: SimSlave> RegisterBlock for SimCoreSpi<S> {
    fn read(&mut self, offset: usize) -> u32 {
        match offset {
            STATUS => {
                self.poll();
                self.status()
            }
            RX_DATA => self.rx.pop_front().map_or(0, u32::from),
            _ => self.regs.get(offset / 4).copied().unwrap_or(0),
        }
    }

    fn write(&mut self, offset: usize, value: u32) {
        self.writes.push((offset, value));
        match offset {
            TX_DATA => self.push(value, false),
            TX_DATA_LAST => self.push(value, true),
            COMMAND => {
                if value & CMD_RXFIFO_RESET != 0 {
                    self.rx.clear();
                }
                if value & CMD_TXFIFO_RESET != 0 {
                    self.tx.clear();
                }
            }
            INT_CLEAR => {
                if value & 0xFF != 0 {
                    self.overflow = false;
                }
            }
            SSEL => self.write_ssel(value),
            _ => {
                if let Some(reg) = self.regs.get_mut(offset / 4) {
                    *reg = value;
                }
            }
        }
    }
}
