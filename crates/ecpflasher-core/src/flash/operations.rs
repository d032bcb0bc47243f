//! Erase, program, verify and read workflows

use alloc::vec;
use alloc::vec::Vec;

use super::opcodes::{MAX_3B_SIZE, PAGE_SIZE};
use super::protocol::{self, EraseBlock};
use crate::error::{Error, Result};
use crate::jtag::{SerialEngine, TapController};

/// Bytes moved per read frame chunk and per program/verify block
pub const READ_BLOCK_SIZE: usize = PAGE_SIZE * 32;

/// Callback for progress reporting during flash operations
pub trait Progress {
    /// Called when starting erase operations
    fn erasing(&mut self, blocks_to_erase: usize, bytes_to_erase: usize);

    /// Called after each block is erased
    fn erase_progress(&mut self, blocks_erased: usize, bytes_erased: usize);

    /// Called when starting write operations
    fn writing(&mut self, bytes_to_write: usize);

    /// Called to update write progress
    fn write_progress(&mut self, bytes_written: usize);

    /// Called when starting a read or verify pass
    fn reading(&mut self, total_bytes: usize);

    /// Called to update read progress
    fn read_progress(&mut self, bytes_read: usize);

    /// Called when the current pass is finished
    fn complete(&mut self);
}

/// A no-op progress reporter
pub struct NoProgress;

impl Progress for NoProgress {
    fn erasing(&mut self, _blocks_to_erase: usize, _bytes_to_erase: usize) {}
    fn erase_progress(&mut self, _blocks_erased: usize, _bytes_erased: usize) {}
    fn writing(&mut self, _bytes_to_write: usize) {}
    fn write_progress(&mut self, _bytes_written: usize) {}
    fn reading(&mut self, _total_bytes: usize) {}
    fn read_progress(&mut self, _bytes_read: usize) {}
    fn complete(&mut self) {}
}

fn check_range(offset: u32, len: usize) -> Result<()> {
    match (offset as usize).checked_add(len) {
        Some(end) if end <= MAX_3B_SIZE => Ok(()),
        _ => {
            log::error!(
                "range 0x{:X}+0x{:X} exceeds 3-byte addressing",
                offset,
                len
            );
            Err(Error::InvalidParameter)
        }
    }
}

/// Erase every `block` sized, aligned block touching `offset..offset + len`
pub fn erase_range<E: SerialEngine, P: Progress>(
    tap: &mut TapController<E>,
    offset: u32,
    len: usize,
    block: EraseBlock,
    progress: &mut P,
) -> Result<()> {
    check_range(offset, len)?;
    let size = block.size();
    let mask = size - 1;
    let begin = offset as usize & !mask;
    let end = (offset as usize + len + mask) & !mask;
    let blocks = (end - begin) / size;

    log::info!(
        "erasing 0x{:06X}..0x{:06X} in {} KiB blocks",
        begin,
        end,
        size >> 10
    );
    progress.erasing(blocks, end - begin);
    for (i, addr) in (begin..end).step_by(size).enumerate() {
        protocol::write_enable(tap)?;
        protocol::erase_block(tap, block, addr as u32)?;
        if log::log_enabled!(log::Level::Debug) {
            let sr1 = protocol::read_status1(tap)?;
            log::debug!("SR1 after erase at 0x{:06X}: 0x{:02X}", addr, sr1);
        }
        protocol::wait_ready(tap, protocol::POLL_DELAY_US, protocol::BLOCK_ERASE_TIMEOUT_US)?;
        progress.erase_progress(i + 1, (i + 1) * size);
    }
    progress.complete();
    Ok(())
}

/// Erase the whole chip
pub fn erase_chip<E: SerialEngine, P: Progress>(
    tap: &mut TapController<E>,
    progress: &mut P,
) -> Result<()> {
    log::info!("erasing whole flash");
    progress.erasing(1, 0);
    protocol::write_enable(tap)?;
    protocol::bulk_erase(tap)?;
    protocol::wait_ready(tap, protocol::POLL_DELAY_US, protocol::CHIP_ERASE_TIMEOUT_US)?;
    progress.erase_progress(1, 0);
    progress.complete();
    Ok(())
}

/// Program `data` at `offset` with page-sized writes.
///
/// The target range must already be erased. With `interleaved_verify`
/// each block is read back right after it is written.
pub fn program<E: SerialEngine, P: Progress>(
    tap: &mut TapController<E>,
    offset: u32,
    data: &[u8],
    interleaved_verify: bool,
    progress: &mut P,
) -> Result<()> {
    check_range(offset, data.len())?;
    log::info!("programming {} bytes at 0x{:06X}", data.len(), offset);
    progress.writing(data.len());

    let mut readback = vec![0u8; READ_BLOCK_SIZE];
    for (i, block) in data.chunks(READ_BLOCK_SIZE).enumerate() {
        let block_addr = offset as usize + i * READ_BLOCK_SIZE;
        let mut pos = 0;
        while pos < block.len() {
            let addr = block_addr + pos;
            let n = (PAGE_SIZE - addr % PAGE_SIZE).min(block.len() - pos);
            protocol::write_enable(tap)?;
            protocol::page_program(tap, addr as u32, &block[pos..pos + n])?;
            protocol::wait_ready(tap, protocol::POLL_DELAY_US, protocol::PROGRAM_TIMEOUT_US)?;
            pos += n;
            progress.write_progress(i * READ_BLOCK_SIZE + pos);
        }

        if interleaved_verify {
            let readback = &mut readback[..block.len()];
            protocol::start_read(tap, block_addr as u32)?;
            protocol::continue_read(tap, readback)?;
            protocol::finish_read(tap)?;
            compare(block_addr, block, readback)?;
        }
    }
    progress.complete();
    Ok(())
}

fn compare(base: usize, expected: &[u8], actual: &[u8]) -> Result<()> {
    match expected.iter().zip(actual).position(|(a, b)| a != b) {
        None => Ok(()),
        Some(i) => {
            let addr = (base + i) as u32;
            log::error!(
                "verify mismatch at 0x{:06X}: expected 0x{:02X}, found 0x{:02X}",
                addr,
                expected[i],
                actual[i]
            );
            Err(Error::VerifyMismatch { addr })
        }
    }
}

/// Compare flash contents at `offset` with `expected`
pub fn verify<E: SerialEngine, P: Progress>(
    tap: &mut TapController<E>,
    offset: u32,
    expected: &[u8],
    progress: &mut P,
) -> Result<()> {
    check_range(offset, expected.len())?;
    log::info!("verifying {} bytes at 0x{:06X}", expected.len(), offset);
    progress.reading(expected.len());

    let mut buf = vec![0u8; READ_BLOCK_SIZE];
    protocol::start_read(tap, offset)?;
    let mut done = 0;
    for chunk in expected.chunks(READ_BLOCK_SIZE) {
        let buf = &mut buf[..chunk.len()];
        protocol::continue_read(tap, buf)?;
        if let Err(e) = compare(offset as usize + done, chunk, buf) {
            protocol::finish_read(tap)?;
            return Err(e);
        }
        done += chunk.len();
        progress.read_progress(done);
    }
    protocol::finish_read(tap)?;
    progress.complete();
    Ok(())
}

/// Read `len` bytes starting at `offset`
pub fn read<E: SerialEngine, P: Progress>(
    tap: &mut TapController<E>,
    offset: u32,
    len: usize,
    progress: &mut P,
) -> Result<Vec<u8>> {
    check_range(offset, len)?;
    log::info!("reading {} bytes at 0x{:06X}", len, offset);
    progress.reading(len);

    let mut out = vec![0u8; len];
    protocol::start_read(tap, offset)?;
    let mut done = 0;
    for chunk in out.chunks_mut(READ_BLOCK_SIZE) {
        protocol::continue_read(tap, chunk)?;
        done += chunk.len();
        progress.read_progress(done);
    }
    protocol::finish_read(tap)?;
    progress.complete();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_range() {
        assert_eq!(check_range(0, MAX_3B_SIZE), Ok(()));
        assert_eq!(check_range(1, MAX_3B_SIZE), Err(Error::InvalidParameter));
        assert_eq!(check_range(u32::MAX, usize::MAX), Err(Error::InvalidParameter));
    }

    #[test]
    fn test_compare_reports_absolute_address() {
        assert_eq!(compare(0x1000, &[1, 2, 3], &[1, 2, 3]), Ok(()));
        assert_eq!(
            compare(0x1000, &[1, 2, 3], &[1, 9, 3]),
            Err(Error::VerifyMismatch { addr: 0x1001 })
        );
    }
}
