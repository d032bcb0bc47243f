//! Recording loopback engine for unit tests

use alloc::vec::Vec;

use super::mpsse::Decoder;
use super::{SerialEngine, TapState};
use crate::error::{Error, Result};

/// One TCK pulse as seen on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Pulse {
    pub tms: bool,
    pub tdi: bool,
}

/// Decodes MPSSE traffic clock by clock, echoes TDI back as TDO and
/// follows the TAP graph independently of the controller under test.
pub(crate) struct LoopbackEngine {
    pub pulses: Vec<Pulse>,
    pub visited: Vec<TapState>,
    pub state: TapState,
    pub transfers: usize,
    pub fail: bool,
}

impl LoopbackEngine {
    pub fn new() -> Self {
        Self {
            pulses: Vec::new(),
            visited: Vec::new(),
            state: TapState::TestLogicReset,
            transfers: 0,
            fail: false,
        }
    }

    pub fn clear(&mut self) {
        self.pulses.clear();
        self.visited.clear();
        self.transfers = 0;
    }

    fn clock(&mut self, tms: bool, tdi: bool) -> bool {
        self.pulses.push(Pulse { tms, tdi });
        self.state = self.state.next(tms);
        self.visited.push(self.state);
        tdi
    }
}

impl SerialEngine for LoopbackEngine {
    fn transfer(&mut self, commands: &[u8], read_len: usize) -> Result<Vec<u8>> {
        if self.fail {
            return Err(Error::TransferFailed);
        }
        self.transfers += 1;
        let mut out = Vec::with_capacity(read_len);
        for op in Decoder::new(commands) {
            op?.clock_with(&mut out, |tms, tdi| self.clock(tms, tdi));
        }
        Ok(out)
    }
}
