//! SPI over JTAG
//!
//! In background SPI mode the FPGA routes Shift-DR to its configuration
//! flash: chip select is asserted while the TAP sits in Shift-DR and
//! released when it leaves. The TAP shifts LSB first while SPI NOR
//! expects MSB first, so every byte is bit-reversed on the way out and
//! again on the way back.

use crate::error::Result;
use crate::jtag::{SerialEngine, TapController, TapState};

/// Reverse the bit order of a byte
#[inline]
pub fn bit_reverse(byte: u8) -> u8 {
    byte.reverse_bits()
}

fn reverse_all(data: &mut [u8]) {
    for byte in data.iter_mut() {
        *byte = bit_reverse(*byte);
    }
}

/// Full-duplex transfer that ends the SPI transaction.
///
/// Enters Shift-DR only if not already there, so a preceding [`send`]
/// and this call form one chip-select frame. `data` is replaced with
/// the bytes clocked in.
pub fn xfer<E: SerialEngine>(tap: &mut TapController<E>, data: &mut [u8]) -> Result<()> {
    if data.is_empty() {
        return Ok(());
    }
    reverse_all(data);
    if tap.current_state() != TapState::ShiftDr {
        tap.go_to_state(TapState::ShiftDr)?;
    }
    tap.shift_in_place(data, data.len() * 8, true)?;
    reverse_all(data);
    Ok(())
}

/// Full-duplex transfer that keeps chip select asserted.
///
/// The TAP is left in Shift-DR. `data` is replaced with the bytes
/// clocked in.
pub fn send<E: SerialEngine>(tap: &mut TapController<E>, data: &mut [u8]) -> Result<()> {
    if data.is_empty() {
        return Ok(());
    }
    reverse_all(data);
    tap.go_to_state(TapState::ShiftDr)?;
    tap.shift_in_place(data, data.len() * 8, false)?;
    reverse_all(data);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jtag::testing::LoopbackEngine;
    use alloc::vec::Vec;

    #[test]
    fn test_bit_reverse_involution() {
        for x in 0..=255u8 {
            assert_eq!(bit_reverse(bit_reverse(x)), x);
        }
    }

    #[test]
    fn test_bit_reverse_values() {
        assert_eq!(bit_reverse(0x01), 0x80);
        assert_eq!(bit_reverse(0x80), 0x01);
        assert_eq!(bit_reverse(0xA5), 0xA5);
        assert_eq!(bit_reverse(0x0F), 0xF0);
        assert_eq!(bit_reverse(0x9F), 0xF9);
    }

    fn controller() -> TapController<LoopbackEngine> {
        let mut tap = TapController::new(LoopbackEngine::new());
        tap.init().unwrap();
        tap.go_to_state(TapState::RunTestIdle).unwrap();
        tap.engine_mut().clear();
        tap
    }

    #[test]
    fn test_xfer_sends_msb_first() {
        let mut tap = controller();
        let mut data = [0x9F];
        xfer(&mut tap, &mut data).unwrap();

        // Idle -> Shift-DR is three clocks, then the eight data bits
        let tdi: Vec<bool> = tap.engine().pulses[3..].iter().map(|p| p.tdi).collect();
        assert_eq!(tdi, [true, false, false, true, true, true, true, true]);
        // Loopback returns what was sent
        assert_eq!(data, [0x9F]);
        assert_eq!(tap.current_state(), TapState::Exit1Dr);
    }

    #[test]
    fn test_send_keeps_frame_open() {
        let mut tap = controller();
        let mut header = [0x02, 0x00, 0x01, 0x00];
        send(&mut tap, &mut header).unwrap();
        assert_eq!(tap.current_state(), TapState::ShiftDr);
        assert_eq!(header, [0x02, 0x00, 0x01, 0x00]);

        tap.engine_mut().clear();
        let mut payload = [0xDE, 0xAD];
        xfer(&mut tap, &mut payload).unwrap();
        // No state moves between the two halves of the frame
        assert_eq!(tap.engine().pulses.len(), 16);
        assert_eq!(tap.current_state(), TapState::Exit1Dr);
        assert_eq!(payload, [0xDE, 0xAD]);
    }

    #[test]
    fn test_xfer_from_exit_reenters_shift() {
        let mut tap = controller();
        xfer(&mut tap, &mut [0x06]).unwrap();
        tap.engine_mut().clear();
        xfer(&mut tap, &mut [0x05, 0x00]).unwrap();
        // Exit1 -> Pause -> Exit2 -> Shift
        assert_eq!(tap.engine().pulses.len(), 3 + 16);
    }

    #[test]
    fn test_empty_transfer_is_noop() {
        let mut tap = controller();
        xfer(&mut tap, &mut []).unwrap();
        send(&mut tap, &mut []).unwrap();
        assert_eq!(tap.engine().transfers, 0);
    }
}
