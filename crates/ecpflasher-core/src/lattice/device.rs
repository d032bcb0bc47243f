//! Known ECP5 and NX devices

use core::fmt;

/// Device family; decides the status register width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// ECP5 (32-bit status)
    Ecp5,
    /// Nexus platform: CrossLink-NX, Certus-NX, CertusPro-NX (64-bit status)
    Nx,
}

impl Family {
    /// Width of the LSC_READ_STATUS register in bits
    pub fn status_bits(self) -> usize {
        match self {
            Self::Ecp5 => 32,
            Self::Nx => 64,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ecp5 => write!(f, "ECP5"),
            Self::Nx => write!(f, "NX"),
        }
    }
}

/// A device identified by its IDCODE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Device {
    /// Part name
    pub name: &'static str,
    /// JTAG IDCODE
    pub idcode: u32,
    /// Family
    pub family: Family,
}

const fn dev(name: &'static str, idcode: u32, family: Family) -> Device {
    Device {
        name,
        idcode,
        family,
    }
}

/// All supported devices
pub static DEVICES: &[Device] = &[
    dev("LFE5U-12", 0x21111043, Family::Ecp5),
    dev("LFE5U-25", 0x41111043, Family::Ecp5),
    dev("LFE5U-45", 0x41112043, Family::Ecp5),
    dev("LFE5U-85", 0x41113043, Family::Ecp5),
    dev("LFE5UM-25", 0x01111043, Family::Ecp5),
    dev("LFE5UM-45", 0x01112043, Family::Ecp5),
    dev("LFE5UM-85", 0x01113043, Family::Ecp5),
    dev("LFE5UM5G-25", 0x81111043, Family::Ecp5),
    dev("LFE5UM5G-45", 0x81112043, Family::Ecp5),
    dev("LFE5UM5G-85", 0x81113043, Family::Ecp5),
    // CrossLink-NX
    dev("LIFCL-17", 0x010F0043, Family::Nx),
    dev("LIFCL-40-ES", 0x010F1043, Family::Nx),
    dev("LIFCL-40", 0x110F1043, Family::Nx),
    // Certus-NX
    dev("LFD2NX-17", 0x310F0043, Family::Nx),
    dev("LFD2NX-40", 0x310F1043, Family::Nx),
    // CertusPro-NX
    dev("LFCPNX-100", 0x010F4043, Family::Nx),
];

/// Find a device by IDCODE
pub fn lookup(idcode: u32) -> Option<&'static Device> {
    DEVICES.iter().find(|d| d.idcode == idcode)
}
