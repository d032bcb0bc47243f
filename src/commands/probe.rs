//! Probe command implementation

use ecpflasher_core::flash::opcodes::SR1_BP_MASK;
use ecpflasher_core::flash::protocol;
use ecpflasher_core::jtag::{SerialEngine, TapController};

use super::device;
use crate::error::CliError;

/// Identify the FPGA, then its flash, and dump both status registers
pub fn run_probe<E: SerialEngine>(tap: &mut TapController<E>) -> Result<(), CliError> {
    let target = device::identify(tap)?;
    device::show_status(tap, target.family, device::verbose())?;

    device::open_flash(tap)?;
    let sr1 = protocol::read_status1(tap)?;
    let sr2 = protocol::read_status2(tap)?;
    println!("SR1: 0x{:02X}  SR2: 0x{:02X}", sr1, sr2);
    if sr1 & SR1_BP_MASK != 0 {
        println!("Block protection is enabled (use --disable-protection to clear it)");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecpflasher_dummy::DummyEngine;

    #[test]
    fn test_probe_opens_bridge() {
        let mut tap = TapController::new(DummyEngine::new_default());
        tap.init().unwrap();
        run_probe(&mut tap).unwrap();
        let fpga = tap.engine().fpga();
        assert!(fpga.spi_routed());
        // JEDEC ID, SR1, SR2 after the reset frames
        assert!(fpga.flash().history.ends_with(&[0x9F, 0x05, 0x35]));
    }
}
