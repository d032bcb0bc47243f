//! Configuration flash access
//!
//! The ECP5/NX configuration flash sits behind the FPGA's background SPI
//! port. [`protocol`] holds the single-command primitives, [`operations`]
//! the block-level erase/program/verify/read loops built from them.

pub mod opcodes;
pub mod operations;
pub mod protocol;

pub use operations::{erase_chip, erase_range, program, read, verify, NoProgress, Progress};
pub use protocol::{EraseBlock, JedecId};
