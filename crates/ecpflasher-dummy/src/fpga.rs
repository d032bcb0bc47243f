//! ECP5/NX configuration logic seen through its TAP
//!
//! Follows the TAP graph one clock at a time, latches the 8-bit IR on
//! Update-IR, loads DR on Capture-DR and acts on the configuration
//! instructions the programmer uses. With background SPI unlocked,
//! Shift-DR is wired to the flash and chip select follows the TAP.

use ecpflasher_core::jtag::TapState;
use ecpflasher_core::lattice::{Command, Family, BACKGROUND_SPI_KEY};

use crate::flash::DummyFlash;

const STATUS_DONE: u64 = 1 << 8;
const STATUS_ISC_ENABLE: u64 = 1 << 9;
/// Value loaded into the IR shift register on Capture-IR
const IR_CAPTURE: u8 = 0x01;

/// Emulated FPGA
pub struct DummyFpga {
    idcode: u32,
    usercode: u32,
    family: Family,
    state: TapState,

    ir: u8,
    ir_shift: u8,
    dr_out: u64,
    dr_in: u64,
    dr_in_bits: usize,

    status: u64,
    bse_error: Option<u8>,
    spi_unlocked: bool,
    flash: DummyFlash,

    burst: Vec<u8>,
    burst_byte: u8,
    burst_bits: u8,
    sram: Vec<u8>,
    refreshes: usize,
}

impl DummyFpga {
    /// Create an FPGA with the given identity, attached to `flash`.
    ///
    /// It powers up configured, with DONE set.
    pub fn new(idcode: u32, family: Family, flash: DummyFlash) -> Self {
        Self {
            idcode,
            usercode: 0xFFFF_FFFF,
            family,
            state: TapState::TestLogicReset,
            ir: Command::ReadId.opcode(),
            ir_shift: 0,
            dr_out: 0,
            dr_in: 0,
            dr_in_bits: 0,
            status: STATUS_DONE,
            bse_error: None,
            spi_unlocked: false,
            flash,
            burst: Vec::new(),
            burst_byte: 0,
            burst_bits: 0,
            sram: Vec::new(),
            refreshes: 0,
        }
    }

    /// Make the bitstream engine reject every burst with `code`
    pub fn set_bse_error(&mut self, code: Option<u8>) {
        self.bse_error = code;
    }

    /// Current TAP state
    pub fn state(&self) -> TapState {
        self.state
    }

    /// Latched instruction
    pub fn ir(&self) -> u8 {
        self.ir
    }

    /// Raw status register
    pub fn status(&self) -> u64 {
        self.status
    }

    /// Whether Shift-DR currently reaches the flash
    pub fn spi_routed(&self) -> bool {
        self.spi_unlocked && self.ir == Command::LscBackgroundSpi.opcode()
    }

    /// Bitstream accepted by the last burst, MSB-first bytes
    pub fn sram(&self) -> &[u8] {
        &self.sram
    }

    /// Number of LSC_REFRESH instructions executed
    pub fn refreshes(&self) -> usize {
        self.refreshes
    }

    /// Attached flash
    pub fn flash(&self) -> &DummyFlash {
        &self.flash
    }

    /// Mutable access to the attached flash
    pub fn flash_mut(&mut self) -> &mut DummyFlash {
        &mut self.flash
    }

    /// One TCK rising edge; returns TDO
    pub fn clock(&mut self, tms: bool, tdi: bool) -> bool {
        let tdo = match self.state {
            TapState::ShiftIr => {
                let out = self.ir_shift & 1 != 0;
                self.ir_shift = (self.ir_shift >> 1) | ((tdi as u8) << 7);
                out
            }
            TapState::ShiftDr if self.spi_routed() => self.flash.clock(tdi),
            TapState::ShiftDr => self.shift_dr(tdi),
            _ => false,
        };

        let prev = self.state;
        let next = prev.next(tms);
        self.state = next;
        if prev != next {
            self.transition(prev, next);
        } else if next == TapState::TestLogicReset {
            self.tap_reset();
        }
        tdo
    }

    fn shift_dr(&mut self, tdi: bool) -> bool {
        let out = self.dr_out & 1 != 0;
        self.dr_out >>= 1;
        if self.dr_in_bits < 64 {
            self.dr_in |= (tdi as u64) << self.dr_in_bits;
        }
        self.dr_in_bits += 1;

        if self.ir == Command::LscBitstreamBurst.opcode() {
            self.burst_byte = (self.burst_byte << 1) | tdi as u8;
            self.burst_bits += 1;
            if self.burst_bits == 8 {
                self.burst.push(self.burst_byte);
                self.burst_byte = 0;
                self.burst_bits = 0;
            }
        }
        out
    }

    fn tap_reset(&mut self) {
        self.ir = Command::ReadId.opcode();
        self.spi_unlocked = false;
    }

    fn transition(&mut self, prev: TapState, next: TapState) {
        if prev == TapState::ShiftDr && self.spi_routed() {
            self.flash.deselect();
        }
        match next {
            TapState::TestLogicReset => self.tap_reset(),
            TapState::CaptureIr => self.ir_shift = IR_CAPTURE,
            TapState::UpdateIr => {
                self.ir = self.ir_shift;
                self.spi_unlocked = false;
                self.execute();
            }
            TapState::CaptureDr => {
                self.dr_in = 0;
                self.dr_in_bits = 0;
                self.dr_out = self.capture();
            }
            TapState::ShiftDr if self.spi_routed() => self.flash.select(),
            TapState::UpdateDr => self.update_dr(),
            _ => {}
        }
    }

    fn capture(&self) -> u64 {
        match self.ir {
            ir if ir == Command::ReadId.opcode() => self.idcode as u64,
            ir if ir == Command::Usercode.opcode() => self.usercode as u64,
            ir if ir == Command::LscReadStatus.opcode() => match self.family {
                Family::Ecp5 => self.status & 0xFFFF_FFFF,
                Family::Nx => self.status,
            },
            _ => 0,
        }
    }

    /// Instructions that act as soon as they are latched
    fn execute(&mut self) {
        let ir = self.ir;
        log::trace!("dummy fpga: IR 0x{:02X}", ir);
        if ir == Command::IscEnable.opcode() {
            self.status |= STATUS_ISC_ENABLE;
        } else if ir == Command::IscErase.opcode() {
            self.status &= !STATUS_DONE;
            self.sram.clear();
        } else if ir == Command::IscDisable.opcode() {
            self.status &= !STATUS_ISC_ENABLE;
            if !self.sram.is_empty() {
                self.status |= STATUS_DONE;
            }
        } else if ir == Command::LscBitstreamBurst.opcode() {
            self.burst.clear();
            self.burst_byte = 0;
            self.burst_bits = 0;
        } else if ir == Command::LscRefresh.opcode() {
            self.refreshes += 1;
            self.status |= STATUS_DONE;
        }
    }

    fn update_dr(&mut self) {
        let ir = self.ir;
        if ir == Command::LscBackgroundSpi.opcode() && !self.spi_unlocked {
            let key = u16::from_le_bytes(BACKGROUND_SPI_KEY) as u64;
            if self.dr_in_bits >= 16 && self.dr_in & 0xFFFF == key {
                log::debug!("dummy fpga: background SPI unlocked");
                self.spi_unlocked = true;
            } else {
                log::warn!("dummy fpga: wrong background SPI key 0x{:04X}", self.dr_in & 0xFFFF);
            }
        } else if ir == Command::LscBitstreamBurst.opcode() {
            let (shift, mask) = match self.family {
                Family::Ecp5 => (23, 0b111u64),
                Family::Nx => (24, 0b1111u64),
            };
            self.status &= !(mask << shift);
            match self.bse_error {
                Some(code) => {
                    log::warn!("dummy fpga: bitstream rejected with code {}", code);
                    self.status |= (code as u64 & mask) << shift;
                }
                None => {
                    log::debug!("dummy fpga: {} byte bitstream", self.burst.len());
                    self.sram = core::mem::take(&mut self.burst);
                }
            }
        }
    }
}
