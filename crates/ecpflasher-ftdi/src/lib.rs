//! ecpflasher-ftdi - FTDI MPSSE serial engine for JTAG
//!
//! Opens an FT2232H (or FT232H) through libftdi1, switches it to MPSSE
//! mode and exposes it as an `ecpflasher_core::jtag::SerialEngine`.
//!
//! # Example
//!
//! ```no_run
//! use ecpflasher_core::jtag::TapController;
//! use ecpflasher_ftdi::{Ftdi, FtdiConfig, FtdiInterface};
//!
//! let config = FtdiConfig::default()
//!     .interface(FtdiInterface::B)
//!     .divider(30)?;
//! let mut tap = TapController::new(Ftdi::open(&config)?);
//! tap.init()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Programmer Options
//!
//! - `port=<A|B|C|D>` - Channel to use (default: A)
//! - `divider=<N>` - Clock divider 1-65536 (default: 1)
//! - `device=i:<vid>:<pid>` - Open this VID/PID instead of 0403:6010/0403:6014
//!
//! # JTAG Clock Speed
//!
//! TCK is derived from the 12 MHz base clock (/5 prescaler enabled):
//!
//! ```text
//! TCK = 6 MHz / divider
//! ```
//!
//! | Divider | TCK      |
//! |---------|----------|
//! | 1       | 6 MHz    |
//! | 2       | 3 MHz    |
//! | 6       | 1 MHz    |
//! | 30      | 200 kHz  |

mod device;
mod error;
mod protocol;

pub use device::{parse_options, Ftdi, FtdiConfig};
pub use error::{FtdiError, Result};
pub use protocol::{DeviceSelector, FtdiInterface, DEFAULT_DEVICES, FTDI_VID};
