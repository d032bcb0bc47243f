//! Steps shared by every command: identify the FPGA, reach its flash

use ecpflasher_core::flash::{protocol, JedecId};
use ecpflasher_core::jtag::{SerialEngine, TapController};
use ecpflasher_core::lattice::{self, Device, Family, Status};

use crate::error::CliError;

/// The FPGA found on the chain
#[derive(Debug, Clone, Copy)]
pub struct Target {
    pub idcode: u32,
    pub device: Option<&'static Device>,
    pub family: Family,
}

/// Read and print the IDCODE.
///
/// Unknown parts are reported but not rejected; they are treated as ECP5.
pub fn identify<E: SerialEngine>(tap: &mut TapController<E>) -> Result<Target, CliError> {
    let idcode = lattice::read_idcode(tap)?;
    let device = lattice::lookup(idcode);
    match device {
        Some(dev) => println!("IDCODE: 0x{:08x} ({})", idcode, dev.name),
        None => {
            println!("IDCODE: 0x{:08x} does not match a known device", idcode);
            log::warn!("assuming the ECP5 status register layout");
        }
    }
    Ok(Target {
        idcode,
        device,
        family: device.map(|d| d.family).unwrap_or(Family::Ecp5),
    })
}

/// Read and print the status register, decoded when `detailed`
pub fn show_status<E: SerialEngine>(
    tap: &mut TapController<E>,
    family: Family,
    detailed: bool,
) -> Result<Status, CliError> {
    let status = lattice::read_status(tap, family)?;
    if detailed {
        println!("{:#}", status);
    } else {
        println!("{}", status);
    }
    Ok(status)
}

/// Whether the per-field status breakdown should be printed
pub fn verbose() -> bool {
    log::log_enabled!(log::Level::Debug)
}

/// Release the flash from the FPGA, open the background SPI bridge and
/// read the JEDEC ID
pub fn open_flash<E: SerialEngine>(tap: &mut TapController<E>) -> Result<JedecId, CliError> {
    log::info!("reset..");
    lattice::release_spi(tap)?;
    protocol::reset(tap)?;
    let id = protocol::read_jedec_id(tap)?;
    println!("flash ID: {}", id);
    if matches!(id.manufacturer, 0x00 | 0xFF) {
        log::warn!("no flash answered on the background SPI port");
    }
    Ok(id)
}

/// Reject ranges that run past the end of the flash, when its size is known
pub fn check_fits(id: &JedecId, offset: u32, len: usize) -> Result<(), CliError> {
    if let Some(capacity) = id.capacity() {
        if offset as usize + len > capacity {
            return Err(CliError::Usage(format!(
                "0x{:X} bytes at 0x{:X} do not fit in a {} KiB flash",
                len,
                offset,
                capacity >> 10
            )));
        }
    }
    Ok(())
}
