//! USB identifiers, channels and device selectors

use crate::error::{FtdiError, Result};

// ============================================================================
// USB VID/PID constants
// ============================================================================

/// FTDI vendor ID
pub const FTDI_VID: u16 = 0x0403;

/// FT2232H product ID (dual channel)
pub const FTDI_FT2232H_PID: u16 = 0x6010;

/// FT232H product ID (single channel)
pub const FTDI_FT232H_PID: u16 = 0x6014;

/// Devices tried in order when no selector is given
pub const DEFAULT_DEVICES: &[(u16, u16)] = &[
    (FTDI_VID, FTDI_FT2232H_PID),
    (FTDI_VID, FTDI_FT232H_PID),
];

/// Latency timer while the engine is open (ms)
pub const LATENCY_TIMER_MS: u8 = 1;

/// libftdi's power-on latency timer, restored on close when the
/// original value could not be read (ms)
pub const DEFAULT_LATENCY_TIMER_MS: u8 = 16;

/// FTDI interface/channel selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FtdiInterface {
    /// Channel A (default)
    #[default]
    A,
    /// Channel B
    B,
    /// Channel C
    C,
    /// Channel D
    D,
}

impl FtdiInterface {
    /// Parse interface from character
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(FtdiInterface::A),
            'B' => Some(FtdiInterface::B),
            'C' => Some(FtdiInterface::C),
            'D' => Some(FtdiInterface::D),
            _ => None,
        }
    }

    /// Parse a channel given as a letter or as an index 0-3
    pub fn parse(s: &str) -> Result<Self> {
        let mut chars = s.chars();
        let parsed = match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_digit() => c
                .to_digit(10)
                .and_then(|i| Self::from_index(i as u8)),
            (Some(c), None) => Self::from_char(c),
            _ => None,
        };
        parsed.ok_or_else(|| {
            FtdiError::InvalidChannel(format!(
                "Invalid channel '{}': must be A, B, C, D or 0-3",
                s
            ))
        })
    }

    /// Interface from index 0-3
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(FtdiInterface::A),
            1 => Some(FtdiInterface::B),
            2 => Some(FtdiInterface::C),
            3 => Some(FtdiInterface::D),
            _ => None,
        }
    }

    /// Get the interface index (0-3)
    pub fn index(&self) -> u8 {
        match self {
            FtdiInterface::A => 0,
            FtdiInterface::B => 1,
            FtdiInterface::C => 2,
            FtdiInterface::D => 3,
        }
    }

    /// Get the channel letter
    pub fn letter(&self) -> char {
        match self {
            FtdiInterface::A => 'A',
            FtdiInterface::B => 'B',
            FtdiInterface::C => 'C',
            FtdiInterface::D => 'D',
        }
    }
}

/// A specific USB device to open instead of the defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSelector {
    /// Vendor ID
    pub vendor_id: u16,
    /// Product ID
    pub product_id: u16,
}

impl DeviceSelector {
    /// Parse `i:<vendor>:<product>` (IDs in hex or decimal, `0x` prefix allowed)
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || {
            FtdiError::InvalidSelector(format!(
                "'{}': expected i:<vendor>:<product>, e.g. i:0x0403:0x6010",
                s
            ))
        };
        let mut parts = s.split(':');
        if parts.next() != Some("i") {
            return Err(invalid());
        }
        let vendor_id = parts.next().and_then(parse_id).ok_or_else(invalid)?;
        let product_id = parts.next().and_then(parse_id).ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self {
            vendor_id,
            product_id,
        })
    }
}

fn parse_id(s: &str) -> Option<u16> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}
