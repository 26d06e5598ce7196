//! Loopback register model for unit tests
//!
//! Clocks at most one frame per STATUS poll while the core is enabled. The
//! slave answers with a scripted byte per frame index, or echoes MOSI once
//! the script runs out.

use crate::regs::*;
use std::collections::VecDeque;
use std::vec::Vec;

const NREGS: usize = REGISTER_WINDOW / 4;

pub(crate) struct LoopbackRegisters {
    regs: [u32; NREGS],
    depth: usize,
    tx: VecDeque<(u8, bool)>,
    rx: VecDeque<u8>,
    overflow: bool,
    script: Vec<u8>,
    stall: usize,
    polls: usize,
    frames: Vec<(u8, bool)>,
    writes: Vec<(usize, u32)>,
    max_transit: usize,
}

impl LoopbackRegisters {
    pub(crate) fn new(depth: usize) -> Self {
        Self {
            regs: [0; NREGS],
            depth,
            tx: VecDeque::new(),
            rx: VecDeque::new(),
            overflow: false,
            script: Vec::new(),
            stall: 0,
            polls: 0,
            frames: Vec::new(),
            writes: Vec::new(),
            max_transit: 0,
        }
    }

    /// MISO bytes, one per clocked frame
    pub(crate) fn with_script(mut self, script: &[u8]) -> Self {
        self.script = Vec::from(script);
        self
    }

    /// Idle polls between two clocked frames
    pub(crate) fn with_stall(mut self, stall: usize) -> Self {
        self.stall = stall;
        self
    }

    pub(crate) fn inject_overflow(&mut self) {
        self.overflow = true;
    }

    pub(crate) fn clear_log(&mut self) {
        self.writes.clear();
    }

    pub(crate) fn writes(&self) -> &[(usize, u32)] {
        &self.writes
    }

    pub(crate) fn frames(&self) -> &[(u8, bool)] {
        &self.frames
    }

    pub(crate) fn max_transit(&self) -> usize {
        self.max_transit
    }

    pub(crate) fn snapshot(&self) -> ([u32; NREGS], bool) {
        (self.regs, self.overflow)
    }

    fn clock(&mut self) {
        self.polls += 1;
        if self.regs[CTRL1 / 4] & CTRL1_ENABLE == 0 || self.tx.is_empty() {
            return;
        }
        if self.polls % (self.stall + 1) != 0 {
            return;
        }
        let Some((mosi, last)) = self.tx.pop_front() else {
            return;
        };
        let miso = self.script.get(self.frames.len()).copied().unwrap_or(mosi);
        self.frames.push((mosi, last));
        if self.rx.len() >= self.depth {
            self.overflow = true;
        } else {
            self.rx.push_back(miso);
        }
    }
}

impl RegisterBlock for LoopbackRegisters {
    fn read(&mut self, offset: usize) -> u32 {
        match offset {
            STATUS => {
                self.clock();
                let mut status = 0;
                if self.rx.is_empty() {
                    status |= STATUS_RX_EMPTY;
                }
                if self.overflow {
                    status |= STATUS_RX_OVERFLOW;
                }
                status
            }
            RX_DATA => self.rx.pop_front().map_or(0, u32::from),
            _ => self.regs[offset / 4],
        }
    }

    fn write(&mut self, offset: usize, value: u32) {
        self.writes.push((offset, value));
        match offset {
            TX_DATA | TX_DATA_LAST => {
                self.tx.push_back((value as u8, offset == TX_DATA_LAST));
                self.max_transit = self.max_transit.max(self.tx.len() + self.rx.len());
            }
            COMMAND => {
                if value & CMD_RXFIFO_RESET != 0 {
                    self.rx.clear();
                }
                if value & CMD_TXFIFO_RESET != 0 {
                    self.tx.clear();
                }
            }
            INT_CLEAR => self.overflow = false,
            _ => self.regs[offset / 4] = value,
        }
    }
}
