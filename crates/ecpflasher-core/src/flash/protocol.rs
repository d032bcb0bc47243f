//! SPI NOR command primitives over the background SPI port
//!
//! Every function here expects the FPGA to already route Shift-DR to the
//! flash (see [`lattice::enter_spi_background`](crate::lattice::enter_spi_background)).

use core::fmt;

use super::opcodes;
use crate::error::{Error, Result};
use crate::jtag::{SerialEngine, TapController, TapState};
use crate::spi;

/// JEDEC manufacturer and device ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JedecId {
    /// Manufacturer ID
    pub manufacturer: u8,
    /// Device ID (memory type << 8 | capacity)
    pub device: u16,
}

impl JedecId {
    /// Capacity in bytes, decoded from the usual `2^n` capacity byte
    pub fn capacity(&self) -> Option<usize> {
        let n = (self.device & 0xFF) as u32;
        if (10..=31).contains(&n) {
            Some(1usize << n)
        } else {
            None
        }
    }
}

impl fmt::Display for JedecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:02X} 0x{:02X} 0x{:02X}",
            self.manufacturer,
            self.device >> 8,
            self.device & 0xFF
        )
    }
}

/// Erase granularity for block erases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EraseBlock {
    /// 4 KiB sector erase
    Sector4K,
    /// 32 KiB block erase
    Block32K,
    /// 64 KiB block erase
    #[default]
    Block64K,
}

impl EraseBlock {
    /// Pick a block kind by size in KiB (4, 32 or 64)
    pub fn from_kib(kib: u32) -> Option<Self> {
        match kib {
            4 => Some(Self::Sector4K),
            32 => Some(Self::Block32K),
            64 => Some(Self::Block64K),
            _ => None,
        }
    }

    /// Block size in bytes
    pub fn size(self) -> usize {
        match self {
            Self::Sector4K => 4 << 10,
            Self::Block32K => 32 << 10,
            Self::Block64K => 64 << 10,
        }
    }

    /// Erase opcode
    pub fn opcode(self) -> u8 {
        match self {
            Self::Sector4K => opcodes::SE_20,
            Self::Block32K => opcodes::BE_52,
            Self::Block64K => opcodes::BE_D8,
        }
    }
}

fn command_with_addr(opcode: u8, addr: u32) -> [u8; 4] {
    [opcode, (addr >> 16) as u8, (addr >> 8) as u8, addr as u8]
}

/// Bring the flash out of continuous-read and QPI modes.
///
/// Clocks 64 ones, then 2 ones, then 8 ones, each as its own
/// chip-select frame.
pub fn reset<E: SerialEngine>(tap: &mut TapController<E>) -> Result<()> {
    let ones = [0xFFu8; 8];
    for bits in [64, 2, 8] {
        tap.go_to_state(TapState::ShiftDr)?;
        tap.shift(&ones, bits, true)?;
    }
    log::debug!("flash reset");
    Ok(())
}

/// Read the JEDEC ID
pub fn read_jedec_id<E: SerialEngine>(tap: &mut TapController<E>) -> Result<JedecId> {
    let mut buf = [opcodes::RDID, 0, 0, 0];
    spi::xfer(tap, &mut buf)?;
    Ok(JedecId {
        manufacturer: buf[1],
        device: ((buf[2] as u16) << 8) | buf[3] as u16,
    })
}

/// Read status register 1
pub fn read_status1<E: SerialEngine>(tap: &mut TapController<E>) -> Result<u8> {
    let mut buf = [opcodes::RDSR, 0];
    spi::xfer(tap, &mut buf)?;
    Ok(buf[1])
}

/// Read status register 2
pub fn read_status2<E: SerialEngine>(tap: &mut TapController<E>) -> Result<u8> {
    let mut buf = [opcodes::RDSR2, 0];
    spi::xfer(tap, &mut buf)?;
    Ok(buf[1])
}

/// Send Write Enable
pub fn write_enable<E: SerialEngine>(tap: &mut TapController<E>) -> Result<()> {
    spi::xfer(tap, &mut [opcodes::WREN])?;
    log::trace!("write enable");
    Ok(())
}

/// Write status register 1 (caller sends Write Enable first)
pub fn write_status1<E: SerialEngine>(tap: &mut TapController<E>, value: u8) -> Result<()> {
    spi::xfer(tap, &mut [opcodes::WRSR, value])
}

/// Start a chip erase (caller sends Write Enable first and waits after)
pub fn bulk_erase<E: SerialEngine>(tap: &mut TapController<E>) -> Result<()> {
    log::debug!("bulk erase");
    spi::xfer(tap, &mut [opcodes::CE_C7])
}

/// Start a block erase at `addr` (caller sends Write Enable first and waits after)
pub fn erase_block<E: SerialEngine>(
    tap: &mut TapController<E>,
    block: EraseBlock,
    addr: u32,
) -> Result<()> {
    log::debug!("erase {} KiB block at 0x{:06X}", block.size() >> 10, addr);
    spi::xfer(tap, &mut command_with_addr(block.opcode(), addr))
}

/// Program up to one page at `addr` (caller sends Write Enable first and waits after)
///
/// The write must not cross a page boundary.
pub fn page_program<E: SerialEngine>(
    tap: &mut TapController<E>,
    addr: u32,
    data: &[u8],
) -> Result<()> {
    let page_room = opcodes::PAGE_SIZE - (addr as usize % opcodes::PAGE_SIZE);
    assert!(
        !data.is_empty() && data.len() <= page_room,
        "page program of {} bytes at 0x{:06X}",
        data.len(),
        addr
    );
    log::trace!("program {} bytes at 0x{:06X}", data.len(), addr);

    spi::send(tap, &mut command_with_addr(opcodes::PP, addr))?;
    let mut payload = [0u8; opcodes::PAGE_SIZE];
    payload[..data.len()].copy_from_slice(data);
    spi::xfer(tap, &mut payload[..data.len()])
}

/// Send a Read Data command and keep the frame open for [`continue_read`]
pub fn start_read<E: SerialEngine>(tap: &mut TapController<E>, addr: u32) -> Result<()> {
    log::trace!("start read at 0x{:06X}", addr);
    spi::send(tap, &mut command_with_addr(opcodes::READ, addr))
}

/// Clock the next `buf.len()` bytes of an open read into `buf`
pub fn continue_read<E: SerialEngine>(tap: &mut TapController<E>, buf: &mut [u8]) -> Result<()> {
    buf.fill(0);
    spi::send(tap, buf)
}

/// Close an open read frame by leaving Shift-DR
pub fn finish_read<E: SerialEngine>(tap: &mut TapController<E>) -> Result<()> {
    tap.go_to_state(TapState::RunTestIdle)
}

/// Poll status register 1 every `poll_delay_us` until the flash reports
/// ready on three consecutive reads.
///
/// Returns [`Error::Timeout`] after `timeout_us` worth of polls.
pub fn wait_ready<E: SerialEngine>(
    tap: &mut TapController<E>,
    poll_delay_us: u32,
    timeout_us: u32,
) -> Result<()> {
    let max_polls = if poll_delay_us > 0 {
        timeout_us / poll_delay_us
    } else {
        timeout_us
    };

    let mut ready_count = 0;
    for _ in 0..max_polls {
        let status = read_status1(tap)?;
        if status & opcodes::SR1_WIP == 0 {
            ready_count += 1;
            if ready_count == 3 {
                return Ok(());
            }
        } else {
            ready_count = 0;
        }
        tap.delay_us(poll_delay_us);
    }

    log::warn!("flash still busy after {} us", timeout_us);
    Err(Error::Timeout)
}

/// Clear status register 1 so no blocks are write protected.
///
/// Returns the value read back afterwards; anything other than zero
/// means the flash refused the write.
pub fn disable_protection<E: SerialEngine>(tap: &mut TapController<E>) -> Result<u8> {
    write_enable(tap)?;
    write_status1(tap, 0x00)?;
    wait_ready(tap, POLL_DELAY_US, STATUS_WRITE_TIMEOUT_US)?;
    let sr1 = read_status1(tap)?;
    if sr1 != 0 {
        log::warn!("failed to disable protection, SR1 is 0x{:02X}", sr1);
    }
    Ok(sr1)
}

/// Status polling interval
pub const POLL_DELAY_US: u32 = 1_000;
/// Upper bound for a status register write
pub const STATUS_WRITE_TIMEOUT_US: u32 = 1_000_000;
/// Upper bound for a page program
pub const PROGRAM_TIMEOUT_US: u32 = 1_000_000;
/// Upper bound for a 64 KiB block erase
pub const BLOCK_ERASE_TIMEOUT_US: u32 = 10_000_000;
/// Upper bound for a full chip erase
pub const CHIP_ERASE_TIMEOUT_US: u32 = 400_000_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erase_block_kinds() {
        assert_eq!(EraseBlock::from_kib(4), Some(EraseBlock::Sector4K));
        assert_eq!(EraseBlock::from_kib(32).map(EraseBlock::size), Some(32768));
        assert_eq!(EraseBlock::from_kib(64).map(EraseBlock::opcode), Some(0xD8));
        assert_eq!(EraseBlock::from_kib(16), None);
        assert_eq!(EraseBlock::default(), EraseBlock::Block64K);
    }

    #[test]
    fn test_jedec_id_display_and_capacity() {
        let id = JedecId {
            manufacturer: 0xEF,
            device: 0x4018,
        };
        assert_eq!(alloc::format!("{}", id), "0xEF 0x40 0x18");
        assert_eq!(id.capacity(), Some(16 << 20));
    }

    #[test]
    fn test_command_with_addr() {
        assert_eq!(command_with_addr(0x02, 0x123456), [0x02, 0x12, 0x34, 0x56]);
    }
}
