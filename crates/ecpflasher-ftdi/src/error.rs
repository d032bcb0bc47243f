//! Error types for the FTDI engine

use std::fmt;

/// Result type for FTDI operations
pub type Result<T> = std::result::Result<T, FtdiError>;

/// Errors that can occur during FTDI operations
#[derive(Debug)]
pub enum FtdiError {
    /// Failed to open device
    OpenFailed(String),

    /// USB transfer failed
    TransferFailed(String),

    /// Failed to configure device
    ConfigFailed(String),

    /// Invalid channel/port specification
    InvalidChannel(String),

    /// Invalid device selector string
    InvalidSelector(String),

    /// Invalid parameter
    InvalidParameter(String),
}

impl fmt::Display for FtdiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FtdiError::OpenFailed(s) => write!(f, "Failed to open device: {}", s),
            FtdiError::TransferFailed(s) => write!(f, "USB transfer failed: {}", s),
            FtdiError::ConfigFailed(s) => write!(f, "Failed to configure device: {}", s),
            FtdiError::InvalidChannel(s) => write!(f, "Invalid channel: {}", s),
            FtdiError::InvalidSelector(s) => write!(f, "Invalid device selector: {}", s),
            FtdiError::InvalidParameter(s) => write!(f, "Invalid parameter: {}", s),
        }
    }
}

impl std::error::Error for FtdiError {}

impl From<FtdiError> for ecpflasher_core::Error {
    fn from(e: FtdiError) -> Self {
        match e {
            FtdiError::OpenFailed(_) => ecpflasher_core::Error::DeviceNotFound,
            FtdiError::InvalidChannel(_)
            | FtdiError::InvalidSelector(_)
            | FtdiError::InvalidParameter(_) => ecpflasher_core::Error::InvalidParameter,
            FtdiError::TransferFailed(_) | FtdiError::ConfigFailed(_) => {
                ecpflasher_core::Error::TransferFailed
            }
        }
    }
}
