//! Erase command implementation

use ecpflasher_core::flash::{self, EraseBlock};
use ecpflasher_core::jtag::{SerialEngine, TapController};

use super::device;
use super::progress::IndicatifProgress;
use super::write::unprotect;
use crate::error::CliError;

/// What `erase` clears
#[derive(Debug, Clone, Copy)]
pub struct EraseOptions {
    pub offset: u32,
    /// Ignored for a bulk erase
    pub size: u32,
    pub erase_block: EraseBlock,
    pub bulk_erase: bool,
    pub disable_protection: bool,
}

/// Erase the blocks covering `offset..offset + size`, or the whole chip
pub fn run_erase<E: SerialEngine>(
    tap: &mut TapController<E>,
    opts: &EraseOptions,
) -> Result<(), CliError> {
    let target = device::identify(tap)?;
    device::show_status(tap, target.family, device::verbose())?;
    let id = device::open_flash(tap)?;

    if opts.disable_protection {
        unprotect(tap)?;
    }

    let mut progress = IndicatifProgress::new();
    if opts.bulk_erase {
        flash::erase_chip(tap, &mut progress)?;
    } else {
        device::check_fits(&id, opts.offset, opts.size as usize)?;
        flash::erase_range(tap, opts.offset, opts.size as usize, opts.erase_block, &mut progress)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecpflasher_dummy::DummyEngine;

    #[test]
    fn test_erase_rounds_to_blocks() {
        let mut tap = TapController::new(DummyEngine::new_default());
        tap.init().unwrap();
        tap.engine_mut().fpga_mut().flash_mut().data_mut().fill(0);

        let opts = EraseOptions {
            offset: 0x9000,
            size: 0x8000,
            erase_block: EraseBlock::Block32K,
            bulk_erase: false,
            disable_protection: false,
        };
        run_erase(&mut tap, &opts).unwrap();

        let data = tap.engine().fpga().flash().data();
        assert_eq!(data[0x7FFF], 0);
        assert!(data[0x8000..0x1_8000].iter().all(|&b| b == 0xFF));
        assert_eq!(data[0x1_8000], 0);
    }

    #[test]
    fn test_bulk_erase() {
        let mut tap = TapController::new(DummyEngine::new_default());
        tap.init().unwrap();
        tap.engine_mut().fpga_mut().flash_mut().data_mut()[0xF0_0000] = 0;
        let opts = EraseOptions {
            offset: 0,
            size: 0,
            erase_block: EraseBlock::default(),
            bulk_erase: true,
            disable_protection: false,
        };
        run_erase(&mut tap, &opts).unwrap();
        assert!(tap.engine().fpga().flash().data().iter().all(|&b| b == 0xFF));
    }
}
