//! FTDI MPSSE device implementation
//!
//! This module provides the `Ftdi` struct that opens an FT2232H/FT232H,
//! puts it into MPSSE mode for JTAG and implements `SerialEngine`.

use std::io::{Read, Write};
use std::time::Duration;

use ecpflasher_core::error::Result as CoreResult;
use ecpflasher_core::jtag::mpsse::CommandBuffer;
use ecpflasher_core::jtag::SerialEngine;
use ftdi::{find_by_vid_pid, BitMode, Device, Interface};

use crate::error::{FtdiError, Result};
use crate::protocol::*;

/// Base TCK frequency with the /5 prescaler and a divisor of 1
const BASE_TCK_HZ: u32 = 6_000_000;

/// Configuration for opening an FTDI device
#[derive(Debug, Clone)]
pub struct FtdiConfig {
    /// Interface/channel to use (A, B, C, D)
    pub interface: FtdiInterface,
    /// Clock divider (1-65536); TCK = 6 MHz / divider
    pub divider: u32,
    /// Specific device to open; the default list is tried otherwise
    pub selector: Option<DeviceSelector>,
}

impl Default for FtdiConfig {
    fn default() -> Self {
        FtdiConfig {
            interface: FtdiInterface::default(),
            divider: 1,
            selector: None,
        }
    }
}

impl FtdiConfig {
    /// Set the interface/channel
    pub fn interface(mut self, interface: FtdiInterface) -> Self {
        self.interface = interface;
        self
    }

    /// Set the clock divider
    pub fn divider(mut self, divider: u32) -> Result<Self> {
        if !(1..=65536).contains(&divider) {
            return Err(FtdiError::InvalidParameter(format!(
                "Invalid clock divider {}: must be between 1 and 65536",
                divider
            )));
        }
        self.divider = divider;
        Ok(self)
    }

    /// Set the device selector
    pub fn selector(mut self, selector: DeviceSelector) -> Self {
        self.selector = Some(selector);
        self
    }

    /// TCK frequency in kHz
    pub fn tck_khz(&self) -> f64 {
        BASE_TCK_HZ as f64 / self.divider as f64 / 1000.0
    }
}

/// FTDI MPSSE serial engine
///
/// Owns the libftdi handle for the lifetime of the JTAG session. Dropping
/// it restores the latency timer and leaves MPSSE mode.
pub struct Ftdi {
    /// libftdi device context
    device: Device,
    /// Latency timer found on open, put back on close
    saved_latency: Option<u8>,
}

/// Latency timer value to write back when closing the device
fn latency_on_close(saved: Option<u8>) -> u8 {
    saved.unwrap_or(DEFAULT_LATENCY_TIMER_MS)
}

impl Ftdi {
    /// Open an FTDI device with the given configuration
    pub fn open(config: &FtdiConfig) -> Result<Self> {
        let interface = match config.interface {
            FtdiInterface::A => Interface::A,
            FtdiInterface::B => Interface::B,
            FtdiInterface::C => Interface::C,
            FtdiInterface::D => Interface::D,
        };

        let candidates: Vec<(u16, u16)> = match config.selector {
            Some(sel) => vec![(sel.vendor_id, sel.product_id)],
            None => DEFAULT_DEVICES.to_vec(),
        };

        let mut last_err = String::from("no candidate devices");
        let mut opened = None;
        for (vid, pid) in candidates {
            log::debug!("Looking for FTDI device VID={:04X} PID={:04X}", vid, pid);
            match find_by_vid_pid(vid, pid).interface(interface).open() {
                Ok(device) => {
                    log::debug!("Opened FTDI device VID={:04X} PID={:04X}", vid, pid);
                    opened = Some(device);
                    break;
                }
                Err(e) => last_err = format!("{:04X}:{:04X}: {}", vid, pid, e),
            }
        }
        let device = opened.ok_or(FtdiError::OpenFailed(last_err))?;

        let mut ftdi = Ftdi {
            device,
            saved_latency: None,
        };
        ftdi.init_mpsse(config)?;

        log::info!(
            "FTDI channel {} configured for JTAG at {:.1} kHz",
            config.interface.letter(),
            config.tck_khz()
        );
        Ok(ftdi)
    }

    /// Reset the chip, enter MPSSE mode and set up clocks and pins
    fn init_mpsse(&mut self, config: &FtdiConfig) -> Result<()> {
        self.device
            .usb_reset()
            .map_err(|e| FtdiError::ConfigFailed(format!("USB reset failed: {}", e)))?;
        self.device
            .usb_purge_buffers()
            .map_err(|e| FtdiError::ConfigFailed(format!("Purge failed: {}", e)))?;
        match self.device.latency_timer() {
            Ok(latency) => {
                log::debug!("Saved latency timer: {} ms", latency);
                self.saved_latency = Some(latency);
            }
            Err(e) => log::warn!("Could not read latency timer: {}", e),
        }
        self.device
            .set_latency_timer(LATENCY_TIMER_MS)
            .map_err(|e| FtdiError::ConfigFailed(format!("Set latency timer failed: {}", e)))?;
        self.device
            .set_bitmode(0xFF, BitMode::Mpsse)
            .map_err(|e| FtdiError::ConfigFailed(format!("Set MPSSE mode failed: {}", e)))?;
        self.device
            .usb_purge_buffers()
            .map_err(|e| FtdiError::ConfigFailed(format!("Purge failed: {}", e)))?;

        log::debug!("Setting clock divider to {}", config.divider);
        let mut cmd = CommandBuffer::new();
        cmd.jtag_setup(config.divider);
        self.send(cmd.as_bytes())
    }

    /// Send data to the FTDI device
    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.device
            .write_all(data)
            .map_err(|e| FtdiError::TransferFailed(format!("Write failed: {}", e)))?;
        log::trace!("Sent {} bytes", data.len());
        Ok(())
    }

    /// Receive data from the FTDI device
    fn recv(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let mut total = 0;

        while total < len {
            match self.device.read(&mut buf[total..]) {
                Ok(0) => {
                    // No data available, wait a bit
                    std::thread::sleep(Duration::from_micros(100));
                }
                Ok(n) => {
                    total += n;
                }
                Err(e) => {
                    return Err(FtdiError::TransferFailed(format!("Read failed: {}", e)));
                }
            }
        }

        log::trace!("Received {} bytes", total);
        Ok(buf)
    }

    fn restore(&mut self) -> Result<()> {
        self.device
            .set_latency_timer(latency_on_close(self.saved_latency))
            .map_err(|e| FtdiError::ConfigFailed(format!("Restore latency timer failed: {}", e)))?;
        self.device
            .set_bitmode(0, BitMode::Reset)
            .map_err(|e| FtdiError::ConfigFailed(format!("Reset bitmode failed: {}", e)))
    }
}

impl Drop for Ftdi {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            log::warn!("Failed to restore FTDI state on close: {}", e);
        }
        // Device will be closed automatically when dropped
    }
}

impl SerialEngine for Ftdi {
    fn transfer(&mut self, commands: &[u8], read_len: usize) -> CoreResult<Vec<u8>> {
        let result = self.send(commands).and_then(|_| {
            if read_len > 0 {
                self.recv(read_len)
            } else {
                Ok(Vec::new())
            }
        });
        result.map_err(|e| {
            log::error!("{}", e);
            e.into()
        })
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(Duration::from_micros(us as u64));
    }
}

/// Parse programmer options
///
/// Keys: `port`/`channel` (A-D or 0-3), `divider` (1-65536),
/// `device` (`i:<vendor>:<product>`).
pub fn parse_options(options: &[(&str, &str)]) -> Result<FtdiConfig> {
    let mut config = FtdiConfig::default();

    for (key, value) in options {
        match *key {
            "port" | "channel" | "interface" => {
                config = config.interface(FtdiInterface::parse(value)?);
            }
            "divider" | "divisor" => {
                let divider: u32 = value.parse().map_err(|_| {
                    FtdiError::InvalidParameter(format!("Invalid clock divider '{}'", value))
                })?;
                config = config.divider(divider)?;
            }
            "device" => {
                config = config.selector(DeviceSelector::parse(value)?);
            }
            _ => {
                log::warn!("Unknown FTDI option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_on_close() {
        assert_eq!(latency_on_close(Some(2)), 2);
        assert_eq!(latency_on_close(Some(LATENCY_TIMER_MS)), LATENCY_TIMER_MS);
        assert_eq!(latency_on_close(None), DEFAULT_LATENCY_TIMER_MS);
    }

    #[test]
    fn test_divider_bounds() {
        assert!(FtdiConfig::default().divider(0).is_err());
        assert!(FtdiConfig::default().divider(65537).is_err());
        assert_eq!(FtdiConfig::default().divider(65536).unwrap().divider, 65536);
    }

    #[test]
    fn test_tck_frequency() {
        let config = FtdiConfig::default().divider(30).unwrap();
        assert!((config.tck_khz() - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_options() {
        let config = parse_options(&[
            ("port", "B"),
            ("divider", "4"),
            ("device", "i:0x0403:0x6014"),
        ])
        .unwrap();
        assert_eq!(config.interface, FtdiInterface::B);
        assert_eq!(config.divider, 4);
        assert_eq!(
            config.selector,
            Some(DeviceSelector {
                vendor_id: 0x0403,
                product_id: 0x6014
            })
        );

        assert!(parse_options(&[("divider", "x")]).is_err());
        assert!(parse_options(&[("port", "E")]).is_err());
    }
}
