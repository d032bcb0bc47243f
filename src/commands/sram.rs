//! SRAM configuration command

use ecpflasher_core::jtag::{SerialEngine, TapController};
use ecpflasher_core::lattice::{self, BseError};

use super::{device, progress};
use crate::error::CliError;

/// Load `bitstream` into configuration SRAM and check that the FPGA came up
pub fn run_sram<E: SerialEngine>(
    tap: &mut TapController<E>,
    bitstream: &[u8],
) -> Result<(), CliError> {
    let target = device::identify(tap)?;
    device::show_status(tap, target.family, device::verbose())?;

    log::info!("reset..");
    lattice::sram_prepare(tap)?;
    device::show_status(tap, target.family, device::verbose())?;

    log::info!("programming..");
    let pb = progress::byte_bar(bitstream.len() as u64, "Programming");
    let result = lattice::program_sram(tap, bitstream, |sent| pb.set_position(sent as u64));
    if result.is_err() {
        pb.abandon();
    }
    result?;
    pb.finish();

    let status = device::show_status(tap, target.family, device::verbose())?;
    if !status.done() {
        let reason = match status.bse_error() {
            BseError::None => "DONE not set".to_string(),
            err => err.to_string(),
        };
        return Err(CliError::Config(reason));
    }
    println!("Configuration done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecpflasher_dummy::DummyEngine;

    fn controller() -> TapController<DummyEngine> {
        let mut tap = TapController::new(DummyEngine::new_default());
        tap.init().unwrap();
        tap
    }

    #[test]
    fn test_sram_loads_bitstream() {
        let mut tap = controller();
        let bitstream: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        run_sram(&mut tap, &bitstream).unwrap();
        assert_eq!(tap.engine().fpga().sram(), &bitstream[..]);
    }

    #[test]
    fn test_sram_reports_bse_error() {
        let mut tap = controller();
        tap.engine_mut().fpga_mut().set_bse_error(Some(4));
        let err = run_sram(&mut tap, &[0xFF; 64]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.to_string(), "configuration failed: PRMB Error - preamble error");
    }
}
