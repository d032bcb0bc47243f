//! Lattice ECP5/NX device command layer
//!
//! Composes TAP moves and register shifts into the configuration
//! instructions: identification, status, SRAM configuration and the
//! background SPI bridge to the configuration flash.

mod command;
mod device;
mod status;

pub use command::{Command, BACKGROUND_SPI_KEY};
pub use device::{lookup, Device, Family, DEVICES};
pub use status::{AuthMode, BseError, ConfigTarget, Ecp5Status, NxStatus, Status};

use crate::error::Result;
use crate::jtag::{SerialEngine, TapController, TapState};
use crate::spi;

/// Idle clocks after each configuration instruction
pub const SETTLE_CLOCKS: u32 = 32;

/// Bitstream bytes per Shift-DR burst during SRAM configuration
pub const BURST_CHUNK_SIZE: usize = 16 * 1024;

fn shift_ir<E: SerialEngine>(tap: &mut TapController<E>, cmd: Command) -> Result<()> {
    tap.go_to_state(TapState::ShiftIr)?;
    tap.shift(&[cmd.opcode()], 8, true)?;
    Ok(())
}

/// Load `cmd`, go to Run-Test/Idle and let it settle
pub fn command<E: SerialEngine>(tap: &mut TapController<E>, cmd: Command) -> Result<()> {
    log::trace!("instruction {:?}", cmd);
    shift_ir(tap, cmd)?;
    tap.go_to_state(TapState::RunTestIdle)?;
    tap.wait(SETTLE_CLOCKS)
}

/// Load `cmd` with an 8-bit operand, go to Run-Test/Idle and let it settle
pub fn command8<E: SerialEngine>(tap: &mut TapController<E>, cmd: Command, param: u8) -> Result<()> {
    log::trace!("instruction {:?} ({:#04x})", cmd, param);
    shift_ir(tap, cmd)?;
    tap.go_to_state(TapState::ShiftDr)?;
    tap.shift(&[param], 8, true)?;
    tap.go_to_state(TapState::RunTestIdle)?;
    tap.wait(SETTLE_CLOCKS)
}

/// Read a 32-bit register selected by `cmd`
fn read_reg32<E: SerialEngine>(tap: &mut TapController<E>, cmd: Command) -> Result<u32> {
    shift_ir(tap, cmd)?;
    tap.go_to_state(TapState::ShiftDr)?;
    let data = tap.shift(&[0u8; 4], 32, true)?;
    Ok(u32::from_le_bytes([data[0], data[1], data[2], data[3]]))
}

/// Read the 32-bit IDCODE
pub fn read_idcode<E: SerialEngine>(tap: &mut TapController<E>) -> Result<u32> {
    let idcode = read_reg32(tap, Command::ReadId)?;
    match lookup(idcode) {
        Some(dev) => log::debug!("IDCODE 0x{:08x} ({})", idcode, dev.name),
        None => log::debug!("IDCODE 0x{:08x} does not match a known device", idcode),
    }
    Ok(idcode)
}

/// Read the 32-bit USERCODE
pub fn read_usercode<E: SerialEngine>(tap: &mut TapController<E>) -> Result<u32> {
    read_reg32(tap, Command::Usercode)
}

/// Read the configuration status register of a `family` device
pub fn read_status<E: SerialEngine>(tap: &mut TapController<E>, family: Family) -> Result<Status> {
    shift_ir(tap, Command::LscReadStatus)?;
    tap.go_to_state(TapState::ShiftDr)?;
    let data = tap.shift(&[0u8; 8], family.status_bits(), true)?;
    let status = match family {
        Family::Ecp5 => Status::Ecp5(Ecp5Status::from_bits_retain(u32::from_le_bytes([
            data[0], data[1], data[2], data[3],
        ]))),
        Family::Nx => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&data[..8]);
            Status::Nx(NxStatus::from_bits_retain(u64::from_le_bytes(raw)))
        }
    };
    log::debug!("{}", status);
    Ok(status)
}

/// Route Shift-DR to the configuration flash
pub fn enter_spi_background<E: SerialEngine>(tap: &mut TapController<E>) -> Result<()> {
    shift_ir(tap, Command::LscBackgroundSpi)?;
    tap.go_to_state(TapState::ShiftDr)?;
    tap.shift(&BACKGROUND_SPI_KEY, 16, true)?;
    // The bridge only opens once the TAP has passed through Run-Test/Idle
    tap.go_to_state(TapState::RunTestIdle)
}

/// Stop the FPGA driving the flash and open the background SPI bridge
pub fn release_spi<E: SerialEngine>(tap: &mut TapController<E>) -> Result<()> {
    command8(tap, Command::IscEnable, 0)?;
    command8(tap, Command::IscErase, 0)?;
    command8(tap, Command::IscDisable, 0)?;
    enter_spi_background(tap)
}

/// Clear the SRAM configuration and prepare for a bitstream burst
pub fn sram_prepare<E: SerialEngine>(tap: &mut TapController<E>) -> Result<()> {
    command8(tap, Command::IscEnable, 0)?;
    command8(tap, Command::IscErase, 0)?;
    command8(tap, Command::LscResetCrc, 0)
}

/// Stream `bitstream` into configuration SRAM.
///
/// Call [`sram_prepare`] first. `on_chunk` is told how many bytes have
/// been sent after each burst. Finishes with ISC_DISABLE, which starts
/// the device if the bitstream was accepted.
pub fn program_sram<E: SerialEngine, F: FnMut(usize)>(
    tap: &mut TapController<E>,
    bitstream: &[u8],
    mut on_chunk: F,
) -> Result<()> {
    command(tap, Command::LscBitstreamBurst)?;
    let mut buf = alloc::vec![0u8; BURST_CHUNK_SIZE];
    let mut sent = 0;
    for chunk in bitstream.chunks(BURST_CHUNK_SIZE) {
        let buf = &mut buf[..chunk.len()];
        for (dst, src) in buf.iter_mut().zip(chunk) {
            *dst = spi::bit_reverse(*src);
        }
        log::debug!("sending {} bytes", chunk.len());
        tap.go_to_state(TapState::ShiftDr)?;
        tap.shift(buf, chunk.len() * 8, false)?;
        sent += chunk.len();
        on_chunk(sent);
    }
    command(tap, Command::IscDisable)
}

/// Reboot the FPGA from flash
pub fn refresh<E: SerialEngine>(tap: &mut TapController<E>) -> Result<()> {
    log::info!("rebooting FPGA");
    command(tap, Command::LscRefresh)
}
