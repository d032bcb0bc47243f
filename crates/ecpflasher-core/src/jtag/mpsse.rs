//! FTDI MPSSE command encoding for JTAG
//!
//! Every TAP operation is expressed as a run of MPSSE commands that is
//! accumulated in a [`CommandBuffer`] and handed to the serial engine in
//! one transfer. [`Decoder`] walks the same stream back into [`Op`]s and
//! is used by emulated engines.

use alloc::vec::Vec;

use crate::error::{Error, Result};

// ============================================================================
// Data shifting (TCK/TDI/TDO)
// ============================================================================

/// Clock bytes in and out, LSB first, TDI changes on the falling edge
pub const SHIFT_BYTES_INOUT: u8 = 0x39;
/// Clock 1..=8 bits in and out, LSB first, TDI changes on the falling edge
pub const SHIFT_BITS_INOUT: u8 = 0x3B;

// ============================================================================
// TMS clocking
// ============================================================================

/// Clock TMS bits, LSB first, no read. Data bit 7 is held on TDI
pub const CLOCK_TMS: u8 = 0x4B;
/// Clock TMS bits and sample TDO
pub const CLOCK_TMS_READ: u8 = 0x6B;

// ============================================================================
// Setup
// ============================================================================

/// Set data bits low byte (value, direction)
pub const SET_BITS_LOW: u8 = 0x80;
/// Set the TCK divisor
pub const TCK_DIVISOR: u8 = 0x86;
/// Flush the device's reply buffer back to the host
pub const SEND_IMMEDIATE: u8 = 0x87;
/// Disable the /5 prescaler (60 MHz base clock)
pub const DISABLE_CLK_DIV5: u8 = 0x8A;
/// Enable the /5 prescaler (12 MHz base clock)
pub const ENABLE_CLK_DIV5: u8 = 0x8B;

/// Maximum TMS bits carried by one TMS command
pub const MAX_TMS_BITS: usize = 7;
/// Maximum bytes carried by one byte shift command
pub const MAX_SHIFT_BYTES: usize = 65536;

/// Low byte pin value after init: TMS high, TCK/TDI low
pub const PINS_INIT_VALUE: u8 = 0x08;
/// Low byte pin directions: TCK, TDI, TMS out; TDO in
pub const PINS_INIT_DIRECTION: u8 = 0x0B;

/// Accumulates MPSSE commands for a single logical operation
#[derive(Debug, Default, Clone)]
pub struct CommandBuffer {
    buf: Vec<u8>,
    read_len: usize,
}

impl CommandBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoded command bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Number of response bytes the queued commands will produce
    pub fn read_len(&self) -> usize {
        self.read_len
    }

    /// True when nothing has been queued
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Queue TMS levels, split into commands of at most [`MAX_TMS_BITS`].
    /// Returns the number of clocks queued.
    pub fn clock_tms<I>(&mut self, tms: I, tdi: bool) -> usize
    where
        I: IntoIterator<Item = bool>,
    {
        let mut chunk = 0u8;
        let mut n = 0usize;
        let mut total = 0usize;
        for bit in tms {
            if bit {
                chunk |= 1 << n;
            }
            n += 1;
            total += 1;
            if n == MAX_TMS_BITS {
                self.push_tms(CLOCK_TMS, chunk, n, tdi);
                chunk = 0;
                n = 0;
            }
        }
        if n > 0 {
            self.push_tms(CLOCK_TMS, chunk, n, tdi);
        }
        total
    }

    /// Queue one TMS clock that also samples TDO (one response byte, bit 7)
    pub fn clock_tms_read(&mut self, tms: bool, tdi: bool) {
        self.push_tms(CLOCK_TMS_READ, tms as u8, 1, tdi);
        self.read_len += 1;
    }

    fn push_tms(&mut self, opcode: u8, bits: u8, len: usize, tdi: bool) {
        debug_assert!((1..=MAX_TMS_BITS).contains(&len));
        let data = (bits & 0x7F) | if tdi { 0x80 } else { 0 };
        self.buf.extend_from_slice(&[opcode, (len - 1) as u8, data]);
    }

    /// Queue whole bytes through TDI with TDO capture, TMS held low
    pub fn shift_bytes(&mut self, data: &[u8]) {
        for chunk in data.chunks(MAX_SHIFT_BYTES) {
            let len = (chunk.len() - 1) as u16;
            self.buf.push(SHIFT_BYTES_INOUT);
            self.buf.extend_from_slice(&len.to_le_bytes());
            self.buf.extend_from_slice(chunk);
            self.read_len += chunk.len();
        }
    }

    /// Queue the low `len` bits (1..=8) of `data` with TDO capture
    pub fn shift_bits(&mut self, data: u8, len: u8) {
        assert!((1..=8).contains(&len), "bit shift of {} bits", len);
        self.buf.extend_from_slice(&[SHIFT_BITS_INOUT, len - 1, data]);
        self.read_len += 1;
    }

    /// Ask the device to return pending reads without waiting for latency
    pub fn send_immediate(&mut self) {
        self.buf.push(SEND_IMMEDIATE);
    }

    /// Queue the pin and clock setup for JTAG: /5 prescaler on, divisor
    /// `clkdiv` (TCK = 6 MHz / clkdiv), TCK/TDI/TMS as outputs
    pub fn jtag_setup(&mut self, clkdiv: u32) {
        assert!(
            (1..=65536).contains(&clkdiv),
            "clock divider {} out of range",
            clkdiv
        );
        let div = ((clkdiv - 1) as u16).to_le_bytes();
        self.buf.extend_from_slice(&[
            ENABLE_CLK_DIV5,
            TCK_DIVISOR,
            div[0],
            div[1],
            SET_BITS_LOW,
            PINS_INIT_VALUE,
            PINS_INIT_DIRECTION,
        ]);
    }
}

/// One decoded MPSSE command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op<'a> {
    /// TMS clocks; `bits` holds `len` levels LSB first
    Tms {
        /// TMS levels
        bits: u8,
        /// Number of clocks (1..=7)
        len: u8,
        /// TDI level held during the clocks
        tdi: bool,
        /// Whether TDO is sampled
        read: bool,
    },
    /// Whole-byte TDI/TDO shift
    Bytes(&'a [u8]),
    /// Partial-byte TDI/TDO shift of the low `len` bits
    Bits {
        /// TDI bits, LSB first
        data: u8,
        /// Number of clocks (1..=8)
        len: u8,
    },
    /// Flush pending reads
    SendImmediate,
    /// Raw TCK divisor value
    Divisor(u16),
    /// Prescaler enable/disable
    ClockDiv5(bool),
    /// Low byte pin setup
    SetBitsLow {
        /// Pin levels
        value: u8,
        /// Pin directions (1 = output)
        direction: u8,
    },
}

impl Op<'_> {
    /// Run this command one TCK pulse at a time through
    /// `clock(tms, tdi) -> tdo`, appending the bytes the adapter would
    /// return to `out`. Commands that do not clock are ignored.
    pub fn clock_with(&self, out: &mut Vec<u8>, mut clock: impl FnMut(bool, bool) -> bool) {
        match *self {
            Op::Tms {
                bits,
                len,
                tdi,
                read,
            } => {
                let mut r = 0u8;
                for i in 0..len {
                    let tdo = clock(bits & (1 << i) != 0, tdi);
                    r = (r >> 1) | ((tdo as u8) << 7);
                }
                if read {
                    out.push(r);
                }
            }
            Op::Bytes(data) => {
                for &byte in data {
                    let mut r = 0u8;
                    for i in 0..8 {
                        let tdo = clock(false, byte & (1 << i) != 0);
                        r |= (tdo as u8) << i;
                    }
                    out.push(r);
                }
            }
            Op::Bits { data, len } => {
                let mut r = 0u8;
                for i in 0..len {
                    let tdo = clock(false, data & (1 << i) != 0);
                    r = (r >> 1) | ((tdo as u8) << 7);
                }
                out.push(r);
            }
            _ => {}
        }
    }
}

/// Iterator over the commands in an MPSSE byte stream
pub struct Decoder<'a> {
    data: &'a [u8],
}

impl<'a> Decoder<'a> {
    /// Decode `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.data.len() < n {
            return Err(Error::MalformedCommand);
        }
        let (head, tail) = self.data.split_at(n);
        self.data = tail;
        Ok(head)
    }

    fn decode_one(&mut self) -> Result<Op<'a>> {
        let opcode = self.take(1)?[0];
        let op = match opcode {
            CLOCK_TMS | CLOCK_TMS_READ => {
                let args = self.take(2)?;
                if args[0] as usize >= MAX_TMS_BITS {
                    return Err(Error::MalformedCommand);
                }
                Op::Tms {
                    bits: args[1] & 0x7F,
                    len: args[0] + 1,
                    tdi: args[1] & 0x80 != 0,
                    read: opcode == CLOCK_TMS_READ,
                }
            }
            SHIFT_BYTES_INOUT => {
                let len = u16::from_le_bytes([self.take(1)?[0], self.take(1)?[0]]) as usize + 1;
                Op::Bytes(self.take(len)?)
            }
            SHIFT_BITS_INOUT => {
                let args = self.take(2)?;
                if args[0] > 7 {
                    return Err(Error::MalformedCommand);
                }
                Op::Bits {
                    data: args[1],
                    len: args[0] + 1,
                }
            }
            SEND_IMMEDIATE => Op::SendImmediate,
            TCK_DIVISOR => {
                let args = self.take(2)?;
                Op::Divisor(u16::from_le_bytes([args[0], args[1]]))
            }
            ENABLE_CLK_DIV5 => Op::ClockDiv5(true),
            DISABLE_CLK_DIV5 => Op::ClockDiv5(false),
            SET_BITS_LOW => {
                let args = self.take(2)?;
                Op::SetBitsLow {
                    value: args[0],
                    direction: args[1],
                }
            }
            other => {
                log::debug!("unsupported MPSSE opcode 0x{:02x}", other);
                return Err(Error::MalformedCommand);
            }
        };
        Ok(op)
    }
}

impl<'a> Iterator for Decoder<'a> {
    type Item = Result<Op<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.is_empty() {
            return None;
        }
        let op = self.decode_one();
        if op.is_err() {
            self.data = &[];
        }
        Some(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_tms_chunks_of_seven() {
        let mut cmd = CommandBuffer::new();
        let n = cmd.clock_tms(core::iter::repeat(true).take(9), false);
        assert_eq!(n, 9);
        assert_eq!(cmd.as_bytes(), &[0x4B, 6, 0x7F, 0x4B, 1, 0x03]);
        assert_eq!(cmd.read_len(), 0);
    }

    #[test]
    fn test_tms_carries_tdi_in_bit7() {
        let mut cmd = CommandBuffer::new();
        cmd.clock_tms([true, false], true);
        assert_eq!(cmd.as_bytes(), &[0x4B, 1, 0x81]);
    }

    #[test]
    fn test_tms_read() {
        let mut cmd = CommandBuffer::new();
        cmd.clock_tms_read(true, false);
        assert_eq!(cmd.as_bytes(), &[0x6B, 0, 0x01]);
        assert_eq!(cmd.read_len(), 1);
    }

    #[test]
    fn test_shift_bytes_length_field() {
        let mut cmd = CommandBuffer::new();
        cmd.shift_bytes(&[0xAA, 0x55, 0x01]);
        assert_eq!(cmd.as_bytes(), &[0x39, 2, 0, 0xAA, 0x55, 0x01]);
        assert_eq!(cmd.read_len(), 3);
    }

    #[test]
    fn test_shift_bytes_splits_large_runs() {
        let data = vec![0u8; MAX_SHIFT_BYTES + 10];
        let mut cmd = CommandBuffer::new();
        cmd.shift_bytes(&data);
        assert_eq!(cmd.read_len(), MAX_SHIFT_BYTES + 10);
        let ops: Vec<_> = Decoder::new(cmd.as_bytes())
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(ops.len(), 2);
        assert!(matches!(ops[0], Op::Bytes(d) if d.len() == MAX_SHIFT_BYTES));
        assert!(matches!(ops[1], Op::Bytes(d) if d.len() == 10));
    }

    #[test]
    fn test_jtag_setup() {
        let mut cmd = CommandBuffer::new();
        cmd.jtag_setup(30);
        assert_eq!(cmd.as_bytes(), &[0x8B, 0x86, 29, 0, 0x80, 0x08, 0x0B]);
    }

    #[test]
    #[should_panic]
    fn test_jtag_setup_rejects_zero_divider() {
        CommandBuffer::new().jtag_setup(0);
    }

    #[test]
    fn test_decoder_round_trip() {
        let mut cmd = CommandBuffer::new();
        cmd.clock_tms([false, true, true], false);
        cmd.shift_bits(0x05, 3);
        cmd.send_immediate();
        let ops: Vec<_> = Decoder::new(cmd.as_bytes())
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(
            ops,
            [
                Op::Tms {
                    bits: 0b110,
                    len: 3,
                    tdi: false,
                    read: false
                },
                Op::Bits { data: 0x05, len: 3 },
                Op::SendImmediate,
            ]
        );
    }

    #[test]
    fn test_decoder_rejects_truncated_stream() {
        let mut ops = Decoder::new(&[0x39, 4, 0, 1, 2]);
        assert_eq!(ops.next(), Some(Err(Error::MalformedCommand)));
        assert_eq!(ops.next(), None);
    }

    #[test]
    fn test_decoder_rejects_unknown_opcode() {
        let mut ops = Decoder::new(&[0x12]);
        assert_eq!(ops.next(), Some(Err(Error::MalformedCommand)));
    }

    #[test]
    fn test_clock_with_response_layout() {
        let mut out = Vec::new();
        let mut tms = Vec::new();

        // Byte shifts answer LSB first
        Op::Bytes(&[0x2D]).clock_with(&mut out, |m, d| {
            tms.push(m);
            d
        });
        assert_eq!(out, [0x2D]);

        // Bit shifts and TMS reads fill the response from the top
        out.clear();
        Op::Bits { data: 0x05, len: 3 }.clock_with(&mut out, |_, d| d);
        assert_eq!(out, [0xA0]);

        out.clear();
        let tms_read = Op::Tms {
            bits: 0x01,
            len: 1,
            tdi: true,
            read: true,
        };
        tms_read.clock_with(&mut out, |m, d| {
            tms.push(m);
            d
        });
        assert_eq!(out, [0x80]);
        assert_eq!(tms, [false; 8].iter().copied().chain([true]).collect::<Vec<_>>());

        out.clear();
        let mut clocks = 0;
        Op::Tms {
            bits: 0,
            len: 5,
            tdi: false,
            read: false,
        }
        .clock_with(&mut out, |_, _| {
            clocks += 1;
            false
        });
        Op::SendImmediate.clock_with(&mut out, |_, _| unreachable!());
        assert_eq!(clocks, 5);
        assert!(out.is_empty());
    }
}
