//! Serial Transfer Engine trait
//!
//! The engine owns the physical link (USB handle, clock divider, latency
//! timer). The TAP controller only needs one operation from it: send an
//! MPSSE command stream and collect the bytes it produces.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::error::Result;

/// A byte-oriented MPSSE transport
///
/// Implementations must be ready for JTAG traffic (MPSSE mode, clocks and
/// pin directions set) before the first [`transfer`](Self::transfer).
pub trait SerialEngine {
    /// Send `commands` and return exactly `read_len` response bytes.
    ///
    /// Blocks until the response has arrived. Any I/O failure is returned
    /// as an error and is not retried.
    fn transfer(&mut self, commands: &[u8], read_len: usize) -> Result<Vec<u8>>;

    /// Board specific setup run once before the TAP is reset.
    ///
    /// The default does nothing.
    fn platform_init(&mut self) -> Result<()> {
        Ok(())
    }

    /// Sleep for at least `us` microseconds.
    ///
    /// Used by polling loops between status reads. The default returns
    /// immediately, which suits emulated engines.
    fn delay_us(&mut self, us: u32) {
        let _ = us;
    }
}

impl<E: SerialEngine + ?Sized> SerialEngine for &mut E {
    fn transfer(&mut self, commands: &[u8], read_len: usize) -> Result<Vec<u8>> {
        (**self).transfer(commands, read_len)
    }

    fn platform_init(&mut self) -> Result<()> {
        (**self).platform_init()
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}

impl<E: SerialEngine + ?Sized> SerialEngine for Box<E> {
    fn transfer(&mut self, commands: &[u8], read_len: usize) -> Result<Vec<u8>> {
        (**self).transfer(commands, read_len)
    }

    fn platform_init(&mut self) -> Result<()> {
        (**self).platform_init()
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}
