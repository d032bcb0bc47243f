//! ecpflasher-core - JTAG engine and device command layer for Lattice FPGAs
//!
//! This crate drives a JTAG Test Access Port through an FTDI MPSSE style
//! serial engine and builds the ECP5/NX configuration flows on top of it.
//! It is `no_std` (with `alloc`) so the same engine can run against real
//! hardware, an emulator, or a recording test double.
//!
//! # Layers
//!
//! - [`jtag`] - TAP state tables, MPSSE command buffer, and the
//!   [`TapController`](jtag::TapController) that owns the engine
//! - [`spi`] - SPI-over-JTAG framing with per-byte bit reversal
//! - [`flash`] - SPI NOR command set and erase/program/verify workflows
//! - [`lattice`] - ECP5/NX instructions, device table and status decoding
//!
//! # Features
//!
//! - `std` - Implement `std::error::Error` for [`Error`]
//!
//! # Example
//!
//! ```ignore
//! use ecpflasher_core::{jtag::TapController, lattice};
//!
//! fn identify<E: ecpflasher_core::jtag::SerialEngine>(engine: E) {
//!     let mut tap = TapController::new(engine);
//!     tap.init().unwrap();
//!     let idcode = lattice::read_idcode(&mut tap).unwrap();
//!     println!("IDCODE 0x{:08x}", idcode);
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod error;
pub mod flash;
pub mod jtag;
pub mod lattice;
pub mod spi;

pub use error::{Error, Result};
