//! Status command implementation

use ecpflasher_core::jtag::{SerialEngine, TapController};
use ecpflasher_core::lattice::Status;

use super::device;
use crate::error::CliError;

/// Print the IDCODE and the fully decoded status register
pub fn run_status<E: SerialEngine>(tap: &mut TapController<E>) -> Result<Status, CliError> {
    let target = device::identify(tap)?;
    device::show_status(tap, target.family, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecpflasher_dummy::{DummyConfig, DummyEngine};

    #[test]
    fn test_status_width_follows_family() {
        let mut tap = TapController::new(DummyEngine::new(DummyConfig {
            idcode: 0x010F4043,
            ..Default::default()
        }));
        tap.init().unwrap();
        let status = run_status(&mut tap).unwrap();
        assert!(matches!(status, Status::Nx(_)));
        assert!(status.done());
    }
}
