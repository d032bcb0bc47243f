//! ecpflasher-dummy - Emulated FPGA and configuration flash for testing
//!
//! [`DummyEngine`] implements `SerialEngine` by interpreting the MPSSE
//! command stream itself: every TCK pulse is fed to an emulated ECP5/NX
//! TAP, which in turn drives an in-memory SPI NOR flash through the
//! background SPI bridge. It is useful for testing and development
//! without real hardware.

mod flash;
mod fpga;

pub use flash::{DummyFlash, FlashConfig};
pub use fpga::DummyFpga;

use ecpflasher_core::error::{Error, Result};
use ecpflasher_core::jtag::mpsse::{Decoder, Op};
use ecpflasher_core::jtag::SerialEngine;
use ecpflasher_core::lattice::{self, Family};

/// Configuration for the dummy programmer
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// IDCODE reported by the FPGA
    pub idcode: u32,
    /// Attached configuration flash
    pub flash: FlashConfig,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            idcode: 0x41111043, // LFE5U-25
            flash: FlashConfig::default(),
        }
    }
}

impl DummyConfig {
    /// Family implied by the IDCODE; unknown parts behave like ECP5
    pub fn family(&self) -> Family {
        lattice::lookup(self.idcode)
            .map(|d| d.family)
            .unwrap_or(Family::Ecp5)
    }
}

/// MPSSE interpreter in front of a [`DummyFpga`]
pub struct DummyEngine {
    fpga: DummyFpga,
    transfers: usize,
    clocks: u64,
}

impl DummyEngine {
    /// Create an engine with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        let family = config.family();
        let flash = DummyFlash::new(config.flash);
        Self {
            fpga: DummyFpga::new(config.idcode, family, flash),
            transfers: 0,
            clocks: 0,
        }
    }

    /// Create an engine with the default configuration (LFE5U-25, W25Q128)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// The emulated FPGA
    pub fn fpga(&self) -> &DummyFpga {
        &self.fpga
    }

    /// Mutable access to the emulated FPGA
    pub fn fpga_mut(&mut self) -> &mut DummyFpga {
        &mut self.fpga
    }

    /// Number of `transfer` calls so far
    pub fn transfers(&self) -> usize {
        self.transfers
    }

    /// Number of TCK pulses so far
    pub fn clocks(&self) -> u64 {
        self.clocks
    }

    fn clock(&mut self, tms: bool, tdi: bool) -> bool {
        self.clocks += 1;
        self.fpga.clock(tms, tdi)
    }
}

impl SerialEngine for DummyEngine {
    fn transfer(&mut self, commands: &[u8], read_len: usize) -> Result<Vec<u8>> {
        self.transfers += 1;
        let mut out = Vec::with_capacity(read_len);
        for op in Decoder::new(commands) {
            let op = op?;
            match op {
                Op::Tms { .. } | Op::Bytes(_) | Op::Bits { .. } => {
                    op.clock_with(&mut out, |tms, tdi| self.clock(tms, tdi));
                }
                Op::SendImmediate => {}
                other => log::trace!("dummy: {:?}", other),
            }
        }

        if out.len() != read_len {
            log::error!(
                "dummy: command stream produced {} bytes, {} expected",
                out.len(),
                read_len
            );
            return Err(Error::InvalidResponse);
        }
        Ok(out)
    }
}

fn parse_u32(value: &str) -> Result<u32> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|_| Error::InvalidParameter)
}

/// Parse programmer options
///
/// Keys: `idcode`, `jedec` (three hex bytes, e.g. `ef4018`), `size`
/// (bytes), `busy` (status polls reporting busy after each write) and
/// `sr1` (initial status register 1).
pub fn parse_options(options: &[(&str, &str)]) -> Result<DummyConfig> {
    let mut config = DummyConfig::default();

    for (key, value) in options {
        match *key {
            "idcode" => config.idcode = parse_u32(value)?,
            "jedec" => {
                let id = u32::from_str_radix(value, 16).map_err(|_| Error::InvalidParameter)?;
                if value.len() != 6 {
                    return Err(Error::InvalidParameter);
                }
                config.flash.manufacturer_id = (id >> 16) as u8;
                config.flash.device_id = id as u16;
            }
            "size" => {
                let size = parse_u32(value)? as usize;
                if !size.is_power_of_two() || size < 64 * 1024 {
                    return Err(Error::InvalidParameter);
                }
                config.flash.size = size;
            }
            "busy" => config.flash.busy_polls = parse_u32(value)?,
            "sr1" => {
                config.flash.status1 =
                    u8::try_from(parse_u32(value)?).map_err(|_| Error::InvalidParameter)?;
            }
            _ => {
                log::warn!("Unknown dummy option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecpflasher_core::flash::{self, protocol, EraseBlock, NoProgress};
    use ecpflasher_core::jtag::{TapController, TapState};
    use ecpflasher_core::lattice::{BseError, Command, Status};

    fn controller(config: DummyConfig) -> TapController<DummyEngine> {
        let mut tap = TapController::new(DummyEngine::new(config));
        tap.init().unwrap();
        tap
    }

    fn flash_controller(config: DummyConfig) -> TapController<DummyEngine> {
        let mut tap = controller(config);
        lattice::release_spi(&mut tap).unwrap();
        protocol::reset(&mut tap).unwrap();
        tap
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + (i >> 8)) as u8).collect()
    }

    #[test]
    fn test_probe() {
        let mut tap = controller(DummyConfig::default());
        assert_eq!(lattice::read_idcode(&mut tap).unwrap(), 0x41111043);
        assert_eq!(lattice::read_usercode(&mut tap).unwrap(), 0xFFFF_FFFF);

        let status = lattice::read_status(&mut tap, Family::Ecp5).unwrap();
        assert!(matches!(status, Status::Ecp5(_)));
        assert!(status.done());
        assert_eq!(status.bse_error(), BseError::None);
        assert_eq!(tap.engine().fpga().state(), tap.current_state());
    }

    #[test]
    fn test_one_transfer_per_shift() {
        let mut tap = controller(DummyConfig::default());
        let before = tap.engine().transfers();
        tap.go_to_state(TapState::ShiftIr).unwrap();
        tap.shift(&[0xE0], 8, true).unwrap();
        tap.go_to_state(TapState::ShiftDr).unwrap();
        let id = tap.shift(&[0; 4], 32, true).unwrap();
        assert_eq!(id, 0x41111043u32.to_le_bytes());
        // One move to Shift-IR, one IR scan, one move to Shift-DR, one DR scan
        assert_eq!(tap.engine().transfers() - before, 4);
    }

    #[test]
    fn test_nx_status_is_64_bits() {
        let mut tap = controller(DummyConfig {
            idcode: 0x110F1043,
            ..Default::default()
        });
        tap.engine_mut().fpga_mut().set_bse_error(Some(9));
        lattice::sram_prepare(&mut tap).unwrap();
        lattice::program_sram(&mut tap, &[0xFF, 0xFF, 0xBD, 0xB3], |_| {}).unwrap();

        let status = lattice::read_status(&mut tap, Family::Nx).unwrap();
        let Status::Nx(bits) = status else {
            panic!("expected an NX status");
        };
        assert_eq!(status.bse_error(), BseError::AuthSetup);
        assert!(!status.done());
        assert_eq!(bits.bits(), tap.engine().fpga().status());
    }

    #[test]
    fn test_sram_programming() {
        let mut tap = controller(DummyConfig::default());
        let bitstream = pattern(40_000);
        let mut reports = Vec::new();

        lattice::sram_prepare(&mut tap).unwrap();
        assert!(!lattice::read_status(&mut tap, Family::Ecp5).unwrap().done());
        lattice::program_sram(&mut tap, &bitstream, |n| reports.push(n)).unwrap();

        assert_eq!(reports, [16384, 32768, 40000]);
        assert_eq!(tap.engine().fpga().sram(), &bitstream[..]);
        let status = lattice::read_status(&mut tap, Family::Ecp5).unwrap();
        assert!(status.done());
        assert_eq!(status.bse_error(), BseError::None);
    }

    #[test]
    fn test_sram_rejected_bitstream() {
        let mut tap = controller(DummyConfig::default());
        tap.engine_mut().fpga_mut().set_bse_error(Some(3));
        lattice::sram_prepare(&mut tap).unwrap();
        lattice::program_sram(&mut tap, &[1, 2, 3], |_| {}).unwrap();

        let status = lattice::read_status(&mut tap, Family::Ecp5).unwrap();
        assert!(!status.done());
        assert_eq!(status.bse_error(), BseError::Crc);
    }

    #[test]
    fn test_background_spi_jedec_id() {
        let mut tap = flash_controller(DummyConfig::default());
        assert!(tap.engine().fpga().spi_routed());
        let id = protocol::read_jedec_id(&mut tap).unwrap();
        assert_eq!(id.manufacturer, 0xEF);
        assert_eq!(id.device, 0x4018);
        assert_eq!(id.capacity(), Some(16 << 20));
    }

    #[test]
    fn test_flash_locked_without_key() {
        let mut tap = controller(DummyConfig::default());
        lattice::command(&mut tap, Command::LscBackgroundSpi).unwrap();
        let id = protocol::read_jedec_id(&mut tap).unwrap();
        assert_eq!((id.manufacturer, id.device), (0, 0));
        assert!(tap.engine().fpga().flash().history.is_empty());
    }

    #[test]
    fn test_erase_program_verify_read() {
        let mut tap = flash_controller(DummyConfig {
            flash: FlashConfig {
                busy_polls: 3,
                ..Default::default()
            },
            ..Default::default()
        });
        let offset = 0x1_0180;
        let data = pattern(20_000);
        tap.engine_mut().fpga_mut().flash_mut().data_mut()[0x1_0000] = 0x00;

        flash::erase_range(&mut tap, offset, data.len(), EraseBlock::Sector4K, &mut NoProgress)
            .unwrap();
        assert_eq!(tap.engine().fpga().flash().data()[0x1_0000], 0xFF);

        flash::program(&mut tap, offset, &data, true, &mut NoProgress).unwrap();
        flash::verify(&mut tap, offset, &data, &mut NoProgress).unwrap();

        let stored = &tap.engine().fpga().flash().data()[offset as usize..][..data.len()];
        assert_eq!(stored, &data[..]);
        let read = flash::read(&mut tap, offset - 0x80, data.len() + 0x80, &mut NoProgress).unwrap();
        assert!(read[..0x80].iter().all(|&b| b == 0xFF));
        assert_eq!(&read[0x80..], &data[..]);
        assert_eq!(tap.current_state(), TapState::RunTestIdle);
    }

    #[test]
    fn test_verify_mismatch_address() {
        let mut tap = flash_controller(DummyConfig::default());
        let data = pattern(10_000);
        tap.engine_mut().fpga_mut().flash_mut().data_mut()[0x2000..0x2000 + data.len()]
            .copy_from_slice(&data);
        tap.engine_mut().fpga_mut().flash_mut().data_mut()[0x2000 + 9000] ^= 0x10;

        let err = flash::verify(&mut tap, 0x2000, &data, &mut NoProgress).unwrap_err();
        assert_eq!(err, Error::VerifyMismatch { addr: 0x2000 + 9000 });
        // The read frame is closed and the flash still answers
        assert_eq!(protocol::read_jedec_id(&mut tap).unwrap().manufacturer, 0xEF);
    }

    #[test]
    fn test_chip_erase() {
        let mut tap = flash_controller(DummyConfig::default());
        tap.engine_mut().fpga_mut().flash_mut().data_mut()[0xABCDE] = 0x12;
        flash::erase_chip(&mut tap, &mut NoProgress).unwrap();
        assert!(tap.engine().fpga().flash().data().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_disable_protection() {
        let mut tap = flash_controller(DummyConfig {
            flash: FlashConfig {
                status1: 0x1C,
                ..Default::default()
            },
            ..Default::default()
        });
        assert_eq!(protocol::read_status1(&mut tap).unwrap(), 0x1C);

        // Protected: the program is dropped and the interleaved read-back fails
        let err = flash::program(&mut tap, 0, &[0x00], true, &mut NoProgress).unwrap_err();
        assert_eq!(err, Error::VerifyMismatch { addr: 0 });

        assert_eq!(protocol::disable_protection(&mut tap).unwrap(), 0);
        flash::program(&mut tap, 0, &[0x00], true, &mut NoProgress).unwrap();
    }

    #[test]
    fn test_wait_ready_timeout() {
        let mut tap = flash_controller(DummyConfig {
            flash: FlashConfig {
                busy_polls: 100,
                ..Default::default()
            },
            ..Default::default()
        });
        protocol::write_enable(&mut tap).unwrap();
        protocol::bulk_erase(&mut tap).unwrap();
        assert_eq!(protocol::wait_ready(&mut tap, 1, 10), Err(Error::Timeout));
        protocol::wait_ready(&mut tap, 1, 1000).unwrap();
    }

    #[test]
    fn test_refresh_closes_bridge() {
        let mut tap = flash_controller(DummyConfig::default());
        lattice::refresh(&mut tap).unwrap();
        assert_eq!(tap.engine().fpga().refreshes(), 1);
        assert!(!tap.engine().fpga().spi_routed());
        assert!(lattice::read_status(&mut tap, Family::Ecp5).unwrap().done());
    }

    #[test]
    fn test_malformed_stream() {
        let mut engine = DummyEngine::new_default();
        assert_eq!(engine.transfer(&[0x4B, 0x07, 0x00], 0), Err(Error::MalformedCommand));
        assert_eq!(engine.transfer(&[0x39, 0x01], 0), Err(Error::MalformedCommand));
        assert_eq!(engine.transfer(&[0x6B, 0x00, 0x00], 0), Err(Error::InvalidResponse));
    }

    #[test]
    fn test_parse_options() {
        let config = parse_options(&[
            ("idcode", "0x110F1043"),
            ("jedec", "c22018"),
            ("busy", "4"),
            ("sr1", "0x1c"),
        ])
        .unwrap();
        assert_eq!(config.idcode, 0x110F1043);
        assert_eq!(config.family(), Family::Nx);
        assert_eq!(config.flash.manufacturer_id, 0xC2);
        assert_eq!(config.flash.device_id, 0x2018);
        assert_eq!(config.flash.busy_polls, 4);
        assert_eq!(config.flash.status1, 0x1C);

        assert!(parse_options(&[("idcode", "xyz")]).is_err());
        assert!(parse_options(&[("size", "1000")]).is_err());
        assert!(parse_options(&[("sr1", "0x100")]).is_err());
    }
}
