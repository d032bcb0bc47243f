//! Configuration status register decoding
//!
//! `{}` prints the raw register, `{:#}` adds one line per field.

use bitflags::bitflags;
use core::fmt;

bitflags! {
    /// ECP5 status register (32 bits)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Ecp5Status: u32 {
        /// Transparent mode
        const TRANSPARENT      = 1 << 0;
        /// Config target bits (0 = SRAM, otherwise eFuse)
        const CONFIG_TARGET    = 0b111 << 1;
        /// JTAG active
        const JTAG_ACTIVE      = 1 << 4;
        /// Password protection
        const PWD_PROTECTION   = 1 << 5;
        /// Decryption enabled
        const DECRYPT_ENABLE   = 1 << 7;
        /// Configuration DONE
        const DONE             = 1 << 8;
        /// ISC mode enabled
        const ISC_ENABLE       = 1 << 9;
        /// Configuration memory writable
        const WRITE_ENABLE     = 1 << 10;
        /// Configuration memory readable
        const READ_ENABLE      = 1 << 11;
        /// Busy
        const BUSY             = 1 << 12;
        /// Failure
        const FAIL             = 1 << 13;
        /// Feature row is OTP
        const FEATURE_OTP      = 1 << 14;
        /// Only encrypted bitstreams accepted
        const DECRYPT_ONLY     = 1 << 15;
        /// Password enabled
        const PWD_ENABLE       = 1 << 16;
        /// Encrypted preamble seen
        const ENCRYPT_PREAMBLE = 1 << 20;
        /// Standard preamble seen
        const STD_PREAMBLE     = 1 << 21;
        /// SPI master boot failure 1
        const SPIM_FAIL1       = 1 << 22;
        /// Bitstream engine error code
        const BSE_ERROR        = 0b111 << 23;
        /// Execution error
        const EXECUTION_ERROR  = 1 << 26;
        /// ID error
        const ID_ERROR         = 1 << 27;
        /// Invalid command
        const INVALID_COMMAND  = 1 << 28;
        /// SED error
        const SED_ERROR        = 1 << 29;
        /// Bypass mode
        const BYPASS_MODE      = 1 << 30;
        /// Flow through mode
        const FLOW_THROUGH     = 1 << 31;
    }
}

bitflags! {
    /// NX status register (64 bits)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NxStatus: u64 {
        /// Transparent mode
        const TRANSPARENT      = 1 << 0;
        /// Config target field
        const CONFIG_TARGET    = 0b111 << 1;
        /// JTAG active
        const JTAG_ACTIVE      = 1 << 4;
        /// Password protection
        const PWD_PROTECTION   = 1 << 5;
        /// OTP
        const OTP              = 1 << 6;
        /// Configuration DONE
        const DONE             = 1 << 8;
        /// ISC mode enabled
        const ISC_ENABLE       = 1 << 9;
        /// Configuration memory writable
        const WRITE_ENABLE     = 1 << 10;
        /// Configuration memory readable
        const READ_ENABLE      = 1 << 11;
        /// Busy
        const BUSY             = 1 << 12;
        /// Failure
        const FAIL             = 1 << 13;
        /// Only encrypted bitstreams accepted
        const DECRYPT_ONLY     = 1 << 15;
        /// Password enabled
        const PWD_ENABLE       = 1 << 16;
        /// Password protects all
        const PWD_ALL          = 1 << 17;
        /// CID enabled
        const CID_EN           = 1 << 18;
        /// Encrypted preamble seen
        const ENCRYPT_PREAMBLE = 1 << 21;
        /// Standard preamble seen
        const STD_PREAMBLE     = 1 << 22;
        /// SPI master boot failure 1
        const SPIM_FAIL1       = 1 << 23;
        /// Bitstream engine error code
        const BSE_ERROR        = 0b1111 << 24;
        /// Execution error
        const EXECUTION_ERROR  = 1 << 28;
        /// ID error
        const ID_ERROR         = 1 << 29;
        /// Invalid command
        const INVALID_COMMAND  = 1 << 30;
        /// Watchdog busy
        const WDT_BUSY         = 1 << 31;
        /// Dry run DONE
        const DRY_RUN_DONE     = 1 << 33;
        /// Bitstream engine error code of the previous bitstream
        const BSE_ERROR1       = 0b1111 << 34;
        /// Bypass mode
        const BYPASS_MODE      = 1 << 38;
        /// Flow through mode
        const FLOW_THROUGH     = 1 << 39;
        /// SFDP timeout
        const SFDP_TIMEOUT     = 1 << 42;
        /// Key destroy pass
        const KEY_DESTROY_PASS = 1 << 43;
        /// INITN pin level
        const INITN            = 1 << 44;
        /// I3C parity error 2
        const I3C_PARITY_ERR2  = 1 << 45;
        /// Init bus ID error
        const INIT_BUS_ID_ERR  = 1 << 46;
        /// I3C parity error 1
        const I3C_PARITY_ERR1  = 1 << 47;
        /// Authentication mode field
        const AUTH_MODE        = 0b11 << 48;
        /// Authentication done
        const AUTH_DONE        = 1 << 50;
        /// Dry run authentication done
        const DRY_RUN_AUTH_DONE = 1 << 51;
        /// JTAG port locked
        const JTAG_LOCKED      = 1 << 52;
        /// Slave SPI port locked
        const SSPI_LOCKED      = 1 << 53;
        /// I2C/I3C port locked
        const I2C_LOCKED       = 1 << 54;
        /// Public read lock
        const PUB_READ_LOCK    = 1 << 55;
        /// Public write lock
        const PUB_WRITE_LOCK   = 1 << 56;
        /// Feature read lock
        const FEA_READ_LOCK    = 1 << 57;
        /// Feature write lock
        const FEA_WRITE_LOCK   = 1 << 58;
        /// AES key read lock
        const AES_READ_LOCK    = 1 << 59;
        /// AES key write lock
        const AES_WRITE_LOCK   = 1 << 60;
        /// Password read lock
        const PWD_READ_LOCK    = 1 << 61;
        /// Password write lock
        const PWD_WRITE_LOCK   = 1 << 62;
        /// Global lock
        const GLOBAL_LOCK      = 1 << 63;
    }
}

/// Bitstream engine error code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BseError {
    /// No error
    None,
    /// IDCODE in the bitstream does not match
    Id,
    /// Illegal command
    Cmd,
    /// CRC error
    Crc,
    /// Preamble error
    Preamble,
    /// Configuration aborted by the user
    Abort,
    /// Data overflow
    Overflow,
    /// Bitstream larger than the SRAM array
    Sdm,
    /// Authentication error (NX)
    Auth,
    /// Authentication setup error (NX)
    AuthSetup,
    /// Bitstream engine timeout (NX)
    Timeout,
    /// Reserved code
    Reserved(u8),
}

impl BseError {
    /// Decode a raw error code
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::None,
            1 => Self::Id,
            2 => Self::Cmd,
            3 => Self::Crc,
            4 => Self::Preamble,
            5 => Self::Abort,
            6 => Self::Overflow,
            7 => Self::Sdm,
            8 => Self::Auth,
            9 => Self::AuthSetup,
            10 => Self::Timeout,
            other => Self::Reserved(other),
        }
    }
}

impl fmt::Display for BseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "No Error"),
            Self::Id => write!(f, "ID Error"),
            Self::Cmd => write!(f, "CMD Error - illegal command"),
            Self::Crc => write!(f, "CRC Error"),
            Self::Preamble => write!(f, "PRMB Error - preamble error"),
            Self::Abort => write!(f, "ABRT Error - configuration aborted by the user"),
            Self::Overflow => write!(f, "OVFL Error - data overflow error"),
            Self::Sdm => write!(f, "SDM Error - bitstream pass the size of SRAM array"),
            Self::Auth => write!(f, "Authentication Error"),
            Self::AuthSetup => write!(f, "Authentication Setup Error"),
            Self::Timeout => write!(f, "Bitstream Engine Timeout Error"),
            Self::Reserved(code) => write!(f, "Reserved ({})", code),
        }
    }
}

/// Where configuration is loaded from (NX encoding; ECP5 only has SRAM and eFuse)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigTarget {
    /// SRAM
    Sram,
    /// eFuse (ECP5)
    Efuse,
    /// eFuse normal (NX)
    EfuseNormal,
    /// eFuse pseudo (NX)
    EfusePseudo,
    /// eFuse safe (NX)
    EfuseSafe,
    /// Unassigned code
    Invalid(u8),
}

impl fmt::Display for ConfigTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sram => write!(f, "SRAM"),
            Self::Efuse => write!(f, "eFuse"),
            Self::EfuseNormal => write!(f, "EFUSE Normal"),
            Self::EfusePseudo => write!(f, "EFUSE Pseudo"),
            Self::EfuseSafe => write!(f, "EFUSE Safe"),
            Self::Invalid(code) => write!(f, "Invalid ({})", code),
        }
    }
}

/// NX bitstream authentication mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// No authentication
    None,
    /// ECDSA
    Ecdsa,
    /// HMAC
    Hmac,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "No Auth"),
            Self::Ecdsa => write!(f, "ECDSA"),
            Self::Hmac => write!(f, "HMAC"),
        }
    }
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "Yes"
    } else {
        "No"
    }
}

impl Ecp5Status {
    /// Configuration target
    pub fn config_target(&self) -> ConfigTarget {
        if self.intersects(Self::CONFIG_TARGET) {
            ConfigTarget::Efuse
        } else {
            ConfigTarget::Sram
        }
    }

    /// Bitstream engine error
    pub fn bse_error(&self) -> BseError {
        BseError::from_code(((self.bits() >> 23) & 0b111) as u8)
    }
}

impl fmt::Display for Ecp5Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ECP5 Status Register: 0x{:08x}", self.bits())?;
        if !f.alternate() {
            return Ok(());
        }
        let flags: &[(&str, Self)] = &[
            ("Transparent Mode", Self::TRANSPARENT),
            ("JTAG Active", Self::JTAG_ACTIVE),
            ("PWD Protection", Self::PWD_PROTECTION),
            ("Decrypt Enable", Self::DECRYPT_ENABLE),
            ("DONE", Self::DONE),
            ("ISC Enable", Self::ISC_ENABLE),
            ("Write Enable", Self::WRITE_ENABLE),
            ("Read Enable", Self::READ_ENABLE),
            ("Busy Flag", Self::BUSY),
            ("Fail Flag", Self::FAIL),
            ("Feature OTP", Self::FEATURE_OTP),
            ("Decrypt Only", Self::DECRYPT_ONLY),
            ("PWD Enable", Self::PWD_ENABLE),
            ("Encrypt Preamble", Self::ENCRYPT_PREAMBLE),
            ("Std Preamble", Self::STD_PREAMBLE),
            ("SPIm Fail 1", Self::SPIM_FAIL1),
            ("Execution Error", Self::EXECUTION_ERROR),
            ("ID Error", Self::ID_ERROR),
            ("Invalid Command", Self::INVALID_COMMAND),
            ("SED Error", Self::SED_ERROR),
            ("Bypass Mode", Self::BYPASS_MODE),
            ("Flow Through Mode", Self::FLOW_THROUGH),
        ];
        write!(f, "\n  {:<20}{}", "Config Target:", self.config_target())?;
        for (name, flag) in flags {
            write!(f, "\n  {:<20}{}", alloc::format!("{}:", name), yes_no(self.contains(*flag)))?;
        }
        write!(f, "\n  {:<20}{}", "BSE Error Code:", self.bse_error())
    }
}

impl NxStatus {
    /// Configuration target
    pub fn config_target(&self) -> ConfigTarget {
        match ((self.bits() >> 1) & 0b111) as u8 {
            0 => ConfigTarget::Sram,
            1 => ConfigTarget::EfuseNormal,
            2 => ConfigTarget::EfusePseudo,
            3 => ConfigTarget::EfuseSafe,
            other => ConfigTarget::Invalid(other),
        }
    }

    /// Bitstream engine error of the current bitstream
    pub fn bse_error(&self) -> BseError {
        BseError::from_code(((self.bits() >> 24) & 0b1111) as u8)
    }

    /// Bitstream engine error of the previous bitstream
    pub fn previous_bse_error(&self) -> BseError {
        BseError::from_code(((self.bits() >> 34) & 0b1111) as u8)
    }

    /// Authentication mode
    pub fn auth_mode(&self) -> AuthMode {
        match (self.bits() >> 48) & 0b11 {
            0b01 => AuthMode::Ecdsa,
            0b10 => AuthMode::Hmac,
            _ => AuthMode::None,
        }
    }
}

impl fmt::Display for NxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NX Status Register: 0x{:016x}", self.bits())?;
        if !f.alternate() {
            return Ok(());
        }
        let flags: &[(&str, Self)] = &[
            ("Transparent Mode", Self::TRANSPARENT),
            ("JTAG Active", Self::JTAG_ACTIVE),
            ("PWD Protection", Self::PWD_PROTECTION),
            ("OTP", Self::OTP),
            ("DONE", Self::DONE),
            ("ISC Enable", Self::ISC_ENABLE),
            ("Write Enable", Self::WRITE_ENABLE),
            ("Read Enable", Self::READ_ENABLE),
            ("Busy Flag", Self::BUSY),
            ("Fail Flag", Self::FAIL),
            ("Decrypt Only", Self::DECRYPT_ONLY),
            ("PWD Enable", Self::PWD_ENABLE),
            ("PWD All", Self::PWD_ALL),
            ("CID EN", Self::CID_EN),
            ("Encrypt Preamble", Self::ENCRYPT_PREAMBLE),
            ("Std Preamble", Self::STD_PREAMBLE),
            ("SPIm Fail 1", Self::SPIM_FAIL1),
            ("Execution Error", Self::EXECUTION_ERROR),
            ("ID Error", Self::ID_ERROR),
            ("Invalid Command", Self::INVALID_COMMAND),
            ("WDT Busy", Self::WDT_BUSY),
            ("Dry Run DONE", Self::DRY_RUN_DONE),
            ("Bypass Mode", Self::BYPASS_MODE),
            ("Flow Through Mode", Self::FLOW_THROUGH),
            ("SFDP Timeout", Self::SFDP_TIMEOUT),
            ("Key Destroy Pass", Self::KEY_DESTROY_PASS),
            ("INITN", Self::INITN),
            ("I3C Parity Error 2", Self::I3C_PARITY_ERR2),
            ("Init Bus ID Error", Self::INIT_BUS_ID_ERR),
            ("I3C Parity Error 1", Self::I3C_PARITY_ERR1),
            ("Auth Done", Self::AUTH_DONE),
            ("Dry Run Auth Done", Self::DRY_RUN_AUTH_DONE),
            ("JTAG Locked", Self::JTAG_LOCKED),
            ("SSPI Locked", Self::SSPI_LOCKED),
            ("I2C/I3C Locked", Self::I2C_LOCKED),
            ("PUB Read Lock", Self::PUB_READ_LOCK),
            ("PUB Write Lock", Self::PUB_WRITE_LOCK),
            ("FEA Read Lock", Self::FEA_READ_LOCK),
            ("FEA Write Lock", Self::FEA_WRITE_LOCK),
            ("AES Read Lock", Self::AES_READ_LOCK),
            ("AES Write Lock", Self::AES_WRITE_LOCK),
            ("PWD Read Lock", Self::PWD_READ_LOCK),
            ("PWD Write Lock", Self::PWD_WRITE_LOCK),
            ("Global Lock", Self::GLOBAL_LOCK),
        ];
        write!(f, "\n  {:<20}{}", "Config Target:", self.config_target())?;
        for (name, flag) in flags {
            write!(f, "\n  {:<20}{}", alloc::format!("{}:", name), yes_no(self.contains(*flag)))?;
        }
        write!(f, "\n  {:<20}{}", "BSE Error Code:", self.bse_error())?;
        write!(f, "\n  {:<20}{}", "BSE Error 1 Code:", self.previous_bse_error())?;
        write!(f, "\n  {:<20}{}", "Auth Mode:", self.auth_mode())
    }
}

/// Status register of either family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// ECP5 register
    Ecp5(Ecp5Status),
    /// NX register
    Nx(NxStatus),
}

impl Status {
    /// Configuration DONE
    pub fn done(&self) -> bool {
        match self {
            Self::Ecp5(s) => s.contains(Ecp5Status::DONE),
            Self::Nx(s) => s.contains(NxStatus::DONE),
        }
    }

    /// Bitstream engine error
    pub fn bse_error(&self) -> BseError {
        match self {
            Self::Ecp5(s) => s.bse_error(),
            Self::Nx(s) => s.bse_error(),
        }
    }

    /// Raw register value
    pub fn bits(&self) -> u64 {
        match self {
            Self::Ecp5(s) => s.bits() as u64,
            Self::Nx(s) => s.bits(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ecp5(s) => fmt::Display::fmt(s, f),
            Self::Nx(s) => fmt::Display::fmt(s, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn test_ecp5_fields() {
        let s = Ecp5Status::from_bits_retain((1 << 8) | (3 << 23));
        assert!(s.contains(Ecp5Status::DONE));
        assert!(!s.contains(Ecp5Status::BUSY));
        assert_eq!(s.bse_error(), BseError::Crc);
        assert_eq!(s.config_target(), ConfigTarget::Sram);
        assert_eq!(
            Ecp5Status::from_bits_retain(1 << 1).config_target(),
            ConfigTarget::Efuse
        );
    }

    #[test]
    fn test_nx_fields() {
        let s = NxStatus::from_bits_retain((9 << 24) | (1u64 << 34) | (0b10u64 << 48) | (2 << 1));
        assert_eq!(s.bse_error(), BseError::AuthSetup);
        assert_eq!(s.previous_bse_error(), BseError::Id);
        assert_eq!(s.auth_mode(), AuthMode::Hmac);
        assert_eq!(s.config_target(), ConfigTarget::EfusePseudo);
    }

    #[test]
    fn test_display_short_and_verbose() {
        let s = Status::Ecp5(Ecp5Status::from_bits_retain(0x0000_0100));
        assert_eq!(format!("{}", s), "ECP5 Status Register: 0x00000100");
        let verbose = format!("{:#}", s);
        assert!(verbose.contains("DONE:"));
        assert!(verbose.lines().any(|l| l.starts_with("  DONE:") && l.ends_with("Yes")));
        assert!(verbose.contains("BSE Error Code:     No Error"));

        let s = Status::Nx(NxStatus::from_bits_retain(1 << 63));
        assert_eq!(
            format!("{}", s),
            "NX Status Register: 0x8000000000000000"
        );
        assert!(format!("{:#}", s)
            .lines()
            .any(|l| l.starts_with("  Global Lock:") && l.ends_with("Yes")));
    }

    #[test]
    fn test_status_accessors() {
        let s = Status::Nx(NxStatus::from_bits_retain(1 << 8));
        assert!(s.done());
        assert_eq!(s.bits(), 0x100);
    }
}
