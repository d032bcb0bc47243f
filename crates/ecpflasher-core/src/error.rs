//! Error types for ecpflasher-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate. Contract violations (zero-length shifts, short
//! buffers, shifting outside a Shift state) are not errors; they panic.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Engine errors
    /// The serial engine failed to complete a transfer
    TransferFailed,
    /// No programmer device could be found or opened
    DeviceNotFound,
    /// The serial engine returned a response of the wrong length
    InvalidResponse,
    /// A command stream could not be decoded
    MalformedCommand,

    // Operation errors
    /// A bounded polling loop gave up
    Timeout,
    /// Read-back data differs from the expected data
    VerifyMismatch {
        /// Absolute flash address of the first differing byte
        addr: u32,
    },

    /// A parameter is outside the range the operation accepts
    InvalidParameter,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransferFailed => write!(f, "serial transfer failed"),
            Self::DeviceNotFound => write!(f, "programmer device not found"),
            Self::InvalidResponse => write!(f, "unexpected response length from serial engine"),
            Self::MalformedCommand => write!(f, "malformed MPSSE command stream"),
            Self::Timeout => write!(f, "operation timed out"),
            Self::VerifyMismatch { addr } => {
                write!(f, "verify failed: data mismatch at 0x{:08X}", addr)
            }
            Self::InvalidParameter => write!(f, "invalid parameter"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
