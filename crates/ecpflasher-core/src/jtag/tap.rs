//! TAP controller and bit-shift engine

use alloc::vec;
use alloc::vec::Vec;

use super::mpsse::CommandBuffer;
use super::state::RESET_CLOCKS;
use super::{SerialEngine, TapState};
use crate::error::{Error, Result};

/// Drives the TAP of a single target through a [`SerialEngine`]
///
/// The controller owns the engine and the tracked TAP state. Every public
/// operation is encoded into one command buffer and flushed as a single
/// transfer before it returns.
pub struct TapController<E: SerialEngine> {
    engine: E,
    state: TapState,
}

impl<E: SerialEngine> TapController<E> {
    /// Wrap `engine`. No I/O happens until [`init`](Self::init).
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            state: TapState::TestLogicReset,
        }
    }

    /// Run the engine's platform hook and force the TAP into Test-Logic-Reset
    pub fn init(&mut self) -> Result<()> {
        self.engine.platform_init()?;
        self.reset()
    }

    /// Clock five TMS=1 pulses regardless of the tracked state
    pub fn reset(&mut self) -> Result<()> {
        let mut cmd = CommandBuffer::new();
        cmd.clock_tms(core::iter::repeat(true).take(RESET_CLOCKS), false);
        self.flush(cmd)?;
        self.state = TapState::TestLogicReset;
        log::trace!("TAP reset");
        Ok(())
    }

    /// Tracked TAP state
    pub fn current_state(&self) -> TapState {
        self.state
    }

    /// Move to `target` along the shortest path.
    ///
    /// Nothing is clocked when already there. Test-Logic-Reset is always
    /// reached with five TMS=1 pulses.
    pub fn go_to_state(&mut self, target: TapState) -> Result<()> {
        if self.state == target {
            return Ok(());
        }
        if target == TapState::TestLogicReset {
            return self.reset();
        }

        let path = self.state.path_to(target);
        let mut cmd = CommandBuffer::new();
        cmd.clock_tms(path.iter(), false);
        self.flush(cmd)?;
        log::trace!("TAP {} -> {} ({} clocks)", self.state, target, path.len());
        self.state = target;
        Ok(())
    }

    /// Clock one TCK pulse with the given TMS level
    pub fn step(&mut self, tms: bool) -> Result<()> {
        let mut cmd = CommandBuffer::new();
        cmd.clock_tms([tms], false);
        self.flush(cmd)?;
        self.state_ack(tms);
        Ok(())
    }

    /// Record a transition that was clocked as part of another command
    pub fn state_ack(&mut self, tms: bool) {
        self.state = self.state.next(tms);
    }

    /// Clock `cycles` TCK pulses with TMS=0 and no data.
    ///
    /// Must only be called from a state that TMS=0 does not leave
    /// (Run-Test/Idle, Shift or Pause).
    pub fn wait(&mut self, cycles: u32) -> Result<()> {
        assert!(
            self.state.is_stable(),
            "idle clocks in unstable TAP state {}",
            self.state
        );
        if cycles == 0 {
            return Ok(());
        }
        let mut cmd = CommandBuffer::new();
        cmd.clock_tms(core::iter::repeat(false).take(cycles as usize), false);
        self.flush(cmd)?;
        Ok(())
    }

    /// Shift `bit_count` bits of `input` through the selected register and
    /// store the captured bits in `output`, both LSB first.
    ///
    /// With `must_end` the last bit is clocked with TMS=1 and the TAP moves
    /// to the matching Exit1 state; otherwise it stays in the Shift state.
    /// The bits of a partial final byte above `bit_count` are cleared.
    pub fn tap_shift(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        bit_count: usize,
        must_end: bool,
    ) -> Result<()> {
        let captured = self.shift(input, bit_count, must_end)?;
        assert!(
            output.len() >= captured.len(),
            "output buffer of {} bytes for a {} bit shift",
            output.len(),
            bit_count
        );
        output[..captured.len()].copy_from_slice(&captured);
        Ok(())
    }

    /// Like [`tap_shift`](Self::tap_shift), overwriting `data` with the
    /// captured bits
    pub fn shift_in_place(&mut self, data: &mut [u8], bit_count: usize, must_end: bool) -> Result<()> {
        let captured = self.shift(data, bit_count, must_end)?;
        data[..captured.len()].copy_from_slice(&captured);
        Ok(())
    }

    /// Shift `bit_count` bits and return the `ceil(bit_count / 8)` captured bytes
    pub fn shift(&mut self, input: &[u8], bit_count: usize, must_end: bool) -> Result<Vec<u8>> {
        assert!(bit_count > 0, "shift of zero bits");
        let nbytes = bit_count.div_ceil(8);
        assert!(
            input.len() >= nbytes,
            "input buffer of {} bytes for a {} bit shift",
            input.len(),
            bit_count
        );
        assert!(
            self.state.is_shift(),
            "register shift in TAP state {}",
            self.state
        );

        // Everything but the exit bit goes out as whole bytes plus a tail
        let body = if must_end { bit_count - 1 } else { bit_count };
        let full = body / 8;
        let rem = (body % 8) as u8;
        let last = bit_count - 1;

        let mut cmd = CommandBuffer::new();
        if full > 0 {
            cmd.shift_bytes(&input[..full]);
        }
        if rem > 0 {
            cmd.shift_bits(input[full], rem);
        }
        if must_end {
            let tdi = input[last / 8] & (1 << (last % 8)) != 0;
            cmd.clock_tms_read(true, tdi);
        }
        let response = self.flush(cmd)?;

        let mut output = vec![0u8; nbytes];
        output[..full].copy_from_slice(&response[..full]);
        let mut pos = full;
        if rem > 0 {
            output[full] = response[pos] >> (8 - rem);
            pos += 1;
        }
        if must_end {
            if response[pos] & 0x80 != 0 {
                output[last / 8] |= 1 << (last % 8);
            }
            self.state_ack(true);
        }

        log::trace!(
            "shifted {} bits{} now in {}",
            bit_count,
            if must_end { " with exit," } else { "," },
            self.state
        );
        Ok(output)
    }

    /// Borrow the engine
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutably borrow the engine
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Release the engine
    pub fn into_inner(self) -> E {
        self.engine
    }

    /// Sleep via the engine
    pub fn delay_us(&mut self, us: u32) {
        self.engine.delay_us(us)
    }

    fn flush(&mut self, mut cmd: CommandBuffer) -> Result<Vec<u8>> {
        if cmd.is_empty() {
            return Ok(Vec::new());
        }
        let read_len = cmd.read_len();
        if read_len > 0 {
            cmd.send_immediate();
        }
        let response = self.engine.transfer(cmd.as_bytes(), read_len)?;
        if response.len() != read_len {
            log::debug!(
                "engine returned {} bytes, expected {}",
                response.len(),
                read_len
            );
            return Err(Error::InvalidResponse);
        }
        Ok(response)
    }
}
