//! Write command implementation

use ecpflasher_core::flash::{self, protocol, EraseBlock};
use ecpflasher_core::jtag::{SerialEngine, TapController};

use super::device;
use super::progress::IndicatifProgress;
use crate::error::CliError;

/// How `write` prepares, programs and checks the flash
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    pub offset: u32,
    pub erase_block: EraseBlock,
    pub bulk_erase: bool,
    pub no_erase: bool,
    pub disable_protection: bool,
    pub verify: bool,
    pub interleaved_verify: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            offset: 0,
            erase_block: EraseBlock::default(),
            bulk_erase: false,
            no_erase: false,
            disable_protection: false,
            verify: true,
            interleaved_verify: false,
        }
    }
}

/// Clear block protection, reporting a flash that refuses
pub(super) fn unprotect<E: SerialEngine>(tap: &mut TapController<E>) -> Result<(), CliError> {
    let sr1 = protocol::disable_protection(tap)?;
    if sr1 != 0 {
        eprintln!(
            "failed to disable protection, SR now equal to 0x{:02x} (expected 0x00)",
            sr1
        );
    }
    Ok(())
}

/// Program `data` into the configuration flash
pub fn run_write<E: SerialEngine>(
    tap: &mut TapController<E>,
    data: &[u8],
    opts: &WriteOptions,
) -> Result<(), CliError> {
    let target = device::identify(tap)?;
    device::show_status(tap, target.family, device::verbose())?;
    let id = device::open_flash(tap)?;
    device::check_fits(&id, opts.offset, data.len())?;
    println!("file size: {}", data.len());

    if opts.disable_protection {
        unprotect(tap)?;
    }

    let mut progress = IndicatifProgress::new();
    if !opts.no_erase {
        if opts.bulk_erase {
            flash::erase_chip(tap, &mut progress)?;
        } else {
            flash::erase_range(tap, opts.offset, data.len(), opts.erase_block, &mut progress)?;
        }
    }

    let interleaved = opts.verify && opts.interleaved_verify;
    flash::program(tap, opts.offset, data, interleaved, &mut progress)?;

    if opts.verify && !interleaved {
        flash::verify(tap, opts.offset, data, &mut progress)?;
    }
    if opts.verify {
        println!("VERIFY OK");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecpflasher_dummy::{DummyConfig, DummyEngine, FlashConfig};

    fn controller(flash: FlashConfig) -> TapController<DummyEngine> {
        let mut tap = TapController::new(DummyEngine::new(DummyConfig {
            flash,
            ..Default::default()
        }));
        tap.init().unwrap();
        tap
    }

    fn image(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i ^ (i >> 8)) as u8).collect()
    }

    #[test]
    fn test_write_and_verify() {
        let mut tap = controller(FlashConfig::default());
        let data = image(70_000);
        let opts = WriteOptions {
            offset: 0x2_0000,
            ..Default::default()
        };
        tap.engine_mut().fpga_mut().flash_mut().data_mut()[0x3_0000..0x3_0010].fill(0);
        run_write(&mut tap, &data, &opts).unwrap();

        let flash = tap.engine().fpga().flash();
        assert_eq!(&flash.data()[0x2_0000..0x2_0000 + data.len()], &data[..]);
        // Only the two 64 KiB blocks touched by the image were erased
        assert_eq!(flash.history.iter().filter(|&&op| op == 0xD8).count(), 2);
    }

    #[test]
    fn test_write_interleaved_with_small_blocks() {
        let mut tap = controller(FlashConfig::default());
        let data = image(5000);
        let opts = WriteOptions {
            offset: 0x1234,
            erase_block: EraseBlock::Sector4K,
            interleaved_verify: true,
            ..Default::default()
        };
        run_write(&mut tap, &data, &opts).unwrap();
        let flash = tap.engine().fpga().flash();
        assert_eq!(&flash.data()[0x1234..0x1234 + data.len()], &data[..]);
        assert_eq!(flash.history.iter().filter(|&&op| op == 0x20).count(), 2);
    }

    #[test]
    fn test_write_without_erase_fails_verify() {
        let mut tap = controller(FlashConfig::default());
        tap.engine_mut().fpga_mut().flash_mut().data_mut()[0x10] = 0x00;
        let opts = WriteOptions {
            no_erase: true,
            ..Default::default()
        };
        let err = run_write(&mut tap, &[0xA5; 32], &opts).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.to_string(), "verify failed at 0x000010");
    }

    #[test]
    fn test_write_protected_flash() {
        let protected = FlashConfig {
            status1: 0x1C,
            ..Default::default()
        };
        let mut tap = controller(protected.clone());
        assert!(run_write(&mut tap, &[0x00; 16], &WriteOptions::default()).is_err());

        let mut tap = controller(protected);
        let opts = WriteOptions {
            bulk_erase: true,
            disable_protection: true,
            ..Default::default()
        };
        run_write(&mut tap, &[0x00; 16], &opts).unwrap();
        assert_eq!(tap.engine().fpga().flash().status1(), 0);
    }

    #[test]
    fn test_write_past_end_rejected() {
        let mut tap = controller(FlashConfig {
            device_id: 0x4014, // 1 MiB
            size: 1 << 20,
            ..Default::default()
        });
        let opts = WriteOptions {
            offset: 0xF_FF00,
            ..Default::default()
        };
        let err = run_write(&mut tap, &[0; 512], &opts).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }
}
