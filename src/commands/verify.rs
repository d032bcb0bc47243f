//! Verify command implementation

use ecpflasher_core::flash;
use ecpflasher_core::jtag::{SerialEngine, TapController};

use super::device;
use super::progress::IndicatifProgress;
use crate::error::CliError;

/// Compare flash contents at `offset` with `expected`
pub fn run_verify<E: SerialEngine>(
    tap: &mut TapController<E>,
    expected: &[u8],
    offset: u32,
) -> Result<(), CliError> {
    let target = device::identify(tap)?;
    device::show_status(tap, target.family, device::verbose())?;
    let id = device::open_flash(tap)?;
    device::check_fits(&id, offset, expected.len())?;

    let mut progress = IndicatifProgress::new();
    flash::verify(tap, offset, expected, &mut progress)?;
    println!("VERIFY OK");
    Ok(())
}
