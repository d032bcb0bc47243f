//! Read command implementation

use ecpflasher_core::flash;
use ecpflasher_core::jtag::{SerialEngine, TapController};

use super::device;
use super::progress::IndicatifProgress;
use crate::error::CliError;

/// Read `size` bytes of flash starting at `offset`
pub fn run_read<E: SerialEngine>(
    tap: &mut TapController<E>,
    offset: u32,
    size: u32,
) -> Result<Vec<u8>, CliError> {
    let target = device::identify(tap)?;
    device::show_status(tap, target.family, device::verbose())?;
    let id = device::open_flash(tap)?;
    device::check_fits(&id, offset, size as usize)?;

    let mut progress = IndicatifProgress::new();
    Ok(flash::read(tap, offset, size as usize, &mut progress)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecpflasher_dummy::DummyEngine;

    #[test]
    fn test_read_window() {
        let mut tap = TapController::new(DummyEngine::new_default());
        tap.init().unwrap();
        tap.engine_mut().fpga_mut().flash_mut().data_mut()[0x10_0000..0x10_0004]
            .copy_from_slice(&[1, 2, 3, 4]);
        let data = run_read(&mut tap, 0x10_0001, 0x2_0000).unwrap();
        assert_eq!(data.len(), 0x2_0000);
        assert_eq!(data[..4], [2, 3, 4, 0xFF]);
    }
}
