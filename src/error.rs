//! CLI error type and exit status classification

use ecpflasher_core::Error as CoreError;
use thiserror::Error;

/// Errors reported by the command line tool
#[derive(Debug, Error)]
pub enum CliError {
    /// Bad arguments or an operation that cannot fit the flash
    #[error("{0}")]
    Usage(String),

    /// Input or output file problem
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The programmer could not be opened
    #[error("{0}")]
    Programmer(String),

    /// JTAG or flash communication failed
    #[error("{0}")]
    Hardware(CoreError),

    /// The FPGA rejected a bitstream
    #[error("configuration failed: {0}")]
    Config(String),

    /// Flash contents differ from the file
    #[error("verify failed at 0x{addr:06X}")]
    Verify { addr: u32 },
}

impl CliError {
    /// Process exit status for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) | Self::Io { .. } => 1,
            Self::Programmer(_) | Self::Hardware(_) | Self::Config(_) => 2,
            Self::Verify { .. } => 3,
        }
    }
}

impl From<CoreError> for CliError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::VerifyMismatch { addr } => Self::Verify { addr },
            CoreError::InvalidParameter => Self::Usage(e.to_string()),
            other => Self::Hardware(other),
        }
    }
}
