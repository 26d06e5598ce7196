//! Pipelined half-duplex transfer engine
//!
//! A transfer clocks `cmd.len() + resp.len()` frames. The command goes out
//! first and everything received while it is being sent is discarded; zero
//! filler bytes are then clocked to pull the response out of the slave. The
//! final frame is always written through [`TX_DATA_LAST`] so the controller
//! deasserts slave select by itself once it has been shifted out.
//!
//! The controller only buffers [`depth`](Transfer::depth) frames, so the
//! engine never lets more than that many frames be in flight (sent but not
//! yet read back). Nothing here sleeps or times out: every wait is a poll of
//! the STATUS register, and a controller that stops clocking hangs the
//! engine.
//!
//! The transfer is an explicit state machine. [`transfer`] drives it to
//! completion; [`Transfer::step`] advances it one poll at a time.

use crate::recovery::recover_from_rx_overflow;
use crate::regs::{
    RegisterBlock, CMD_RXFIFO_RESET, CMD_TXFIFO_RESET, COMMAND, CTRL1, CTRL1_ENABLE, RX_DATA,
    STATUS, STATUS_RX_EMPTY, TX_DATA, TX_DATA_LAST,
};

/// Transfer phase
///
/// Phases are listed in the order a transfer moves through them. Any phase
/// whose work is already complete is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Not started; the next step flushes the FIFOs and preloads the TX FIFO
    /// with the core disabled
    Preload,
    /// Sending the rest of the command, discarding its echo
    EchoDrain,
    /// Command sent, still discarding echo that lags behind in the RX FIFO
    FillerDrain,
    /// Clocking filler bytes and capturing the response
    ResponseCapture,
    /// Waiting for room to send the final frame
    FinalFrame,
    /// Everything sent, reading the remaining response bytes
    Tail,
    /// All frames sent and received
    Done,
}

impl Phase {
    fn next(self) -> Self {
        match self {
            Self::Preload => Self::EchoDrain,
            Self::EchoDrain => Self::FillerDrain,
            Self::FillerDrain => Self::ResponseCapture,
            Self::ResponseCapture => Self::FinalFrame,
            Self::FinalFrame => Self::Tail,
            Self::Tail | Self::Done => Self::Done,
        }
    }
}

/// One command/response exchange in progress
pub struct Transfer<'a> {
    cmd: &'a [u8],
    resp: &'a mut [u8],
    depth: usize,
    sent: usize,
    received: usize,
    phase: Phase,
}

impl<'a> Transfer<'a> {
    /// Prepare a transfer of `cmd` followed by `resp.len()` response bytes
    ///
    /// `depth` is the controller's FIFO depth in frames.
    pub fn new(cmd: &'a [u8], resp: &'a mut [u8], depth: usize) -> Self {
        debug_assert!(depth > 0, "FIFO depth must be non-zero");
        Self {
            cmd,
            resp,
            depth: depth.max(1),
            sent: 0,
            received: 0,
            phase: Phase::Preload,
        }
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Total number of frames in this transfer
    pub fn total(&self) -> usize {
        self.cmd.len() + self.resp.len()
    }

    /// Frames written to the TX FIFO so far
    pub fn sent(&self) -> usize {
        self.sent
    }

    /// Frames read back from the RX FIFO so far
    pub fn received(&self) -> usize {
        self.received
    }

    /// Frames sent but not yet read back
    pub fn transit(&self) -> usize {
        self.sent - self.received
    }

    /// FIFO depth bounding [`transit`](Self::transit)
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Response buffer
    pub fn response(&self) -> &[u8] {
        self.resp
    }

    /// Run the transfer to completion
    pub fn run<R: RegisterBlock + ?Sized>(mut self, regs: &mut R) {
        while self.step(regs) != Phase::Done {}
    }

    /// Advance the transfer by one poll and return the phase it is now in
    ///
    /// The first call performs the preload. Every later call pushes at most
    /// one frame and reads at most one frame.
    pub fn step<R: RegisterBlock + ?Sized>(&mut self, regs: &mut R) -> Phase {
        match self.phase {
            Phase::Preload => self.preload(regs),
            Phase::EchoDrain => {
                if self.has_room() {
                    self.push(regs);
                }
                self.poll(regs, false);
            }
            Phase::FillerDrain => {
                if self.has_room() && self.sent < self.last() {
                    self.push(regs);
                }
                self.poll(regs, false);
            }
            Phase::ResponseCapture | Phase::FinalFrame => {
                if self.has_room() {
                    self.push(regs);
                }
                self.poll(regs, true);
            }
            Phase::Tail => self.poll(regs, true),
            Phase::Done => {}
        }
        self.advance();
        self.phase
    }

    fn last(&self) -> usize {
        self.total() - 1
    }

    fn has_room(&self) -> bool {
        self.transit() < self.depth
    }

    fn preload<R: RegisterBlock + ?Sized>(&mut self, regs: &mut R) {
        if self.total() == 0 {
            self.phase = Phase::Done;
            return;
        }

        log::trace!(
            "corespi: transfer cmd={} resp={} depth={}",
            self.cmd.len(),
            self.resp.len(),
            self.depth
        );

        regs.write(COMMAND, CMD_RXFIFO_RESET | CMD_TXFIFO_RESET);
        recover_from_rx_overflow(regs);

        // Hold the core while the TX FIFO fills so the frames go out back to back
        let ctrl = regs.read(CTRL1);
        regs.write(CTRL1, ctrl & !CTRL1_ENABLE);

        let preload = self.total().min(self.depth);
        while self.sent < preload {
            self.push(regs);
        }

        let ctrl = regs.read(CTRL1);
        regs.write(CTRL1, ctrl | CTRL1_ENABLE);

        self.phase = Phase::EchoDrain;
    }

    /// Write the next frame: command byte or filler, last frame through TX_DATA_LAST
    fn push<R: RegisterBlock + ?Sized>(&mut self, regs: &mut R) {
        let value = self.cmd.get(self.sent).copied().unwrap_or(0);
        let reg = if self.sent == self.last() {
            TX_DATA_LAST
        } else {
            TX_DATA
        };
        regs.write(reg, u32::from(value));
        self.sent += 1;
    }

    fn poll<R: RegisterBlock + ?Sized>(&mut self, regs: &mut R, capture: bool) {
        if self.transit() == 0 || regs.read(STATUS) & STATUS_RX_EMPTY != 0 {
            return;
        }
        let value = regs.read(RX_DATA) as u8;
        if capture {
            self.resp[self.received - self.cmd.len()] = value;
        }
        self.received += 1;
    }

    /// Skip forward past every phase whose exit condition already holds
    fn advance(&mut self) {
        loop {
            let finished = match self.phase {
                Phase::Preload | Phase::Done => return,
                Phase::EchoDrain => self.sent >= self.cmd.len(),
                Phase::FillerDrain => self.received >= self.cmd.len(),
                Phase::ResponseCapture => self.sent >= self.last(),
                Phase::FinalFrame => self.sent == self.total(),
                Phase::Tail => self.received == self.total(),
            };
            if !finished {
                return;
            }
            self.phase = self.phase.next();
            log::trace!(
                "corespi: -> {:?} (sent {}, received {})",
                self.phase,
                self.sent,
                self.received
            );
        }
    }
}

/// Send `cmd`, then clock `resp.len()` filler bytes and capture the reply
///
/// The command-phase echo is discarded. An empty transfer does not touch the
/// controller. Slave select is not changed here; see
/// [`CoreSpiSlave::cs_activate`](crate::slave::CoreSpiSlave::cs_activate).
pub fn transfer<R: RegisterBlock + ?Sized>(
    regs: &mut R,
    depth: usize,
    cmd: &[u8],
    resp: &mut [u8],
) {
    Transfer::new(cmd, resp, depth).run(regs);
}
