//! ECP5/NX JTAG instruction opcodes (8-bit IR)

/// Configuration instructions understood by ECP5 and NX devices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// No operation
    IscNoop = 0xFF,
    /// Read the 32-bit IDCODE
    ReadId = 0xE0,
    /// Read the 32-bit USERCODE
    Usercode = 0xC0,
    /// Read the configuration status register
    LscReadStatus = 0x3C,
    /// Read the 1-bit busy flag
    LscCheckBusy = 0xF0,
    /// Reconfigure from flash, as if PROGRAMN were toggled
    LscRefresh = 0x79,
    /// Enter offline configuration mode
    IscEnable = 0xC6,
    /// Enter transparent configuration mode
    IscEnableX = 0x74,
    /// Leave configuration mode
    IscDisable = 0x26,
    /// Program the USERCODE register
    IscProgramUsercode = 0xC2,
    /// Erase the selected configuration array
    IscErase = 0x0E,
    /// Program the DONE bit
    IscProgramDone = 0x5E,
    /// Program the security bit
    IscProgramSecurity = 0xCE,
    /// Initialise the frame address register
    LscInitAddress = 0x46,
    /// Write the 16-bit frame address register
    LscWriteAddress = 0xB4,
    /// Stream a whole bitstream as the operand
    LscBitstreamBurst = 0x7A,
    /// Write frames and post-increment the address
    LscProgIncrRti = 0x82,
    /// Encrypt, then write frames
    LscProgIncrEnc = 0xB6,
    /// Decompress, then write frames
    LscProgIncrCmp = 0xB8,
    /// Decompress and encrypt, then write frames
    LscProgIncrCne = 0xBA,
    /// Read back frames and post-increment the address
    LscVerifyIncrRti = 0x6A,
    /// Modify control register 0
    LscProgCtrl0 = 0x22,
    /// Read control register 0
    LscReadCtrl0 = 0x20,
    /// Reset the 16-bit frame CRC
    LscResetCrc = 0x3B,
    /// Read the 16-bit frame CRC
    LscReadCrc = 0x60,
    /// Program the 32-bit SED CRC
    LscProgSedCrc = 0xA2,
    /// Read the 32-bit SED CRC
    LscReadSedCrc = 0xA4,
    /// Program the 64-bit password
    LscProgPassword = 0xF1,
    /// Read the 64-bit password
    LscReadPassword = 0xF2,
    /// Shift in the password to unlock reconfiguration
    LscShiftPassword = 0xBC,
    /// Program the 128-bit cipher key
    LscProgCipherKey = 0xF3,
    /// Read the 128-bit cipher key
    LscReadCipherKey = 0xF4,
    /// Program the feature row
    LscProgFeature = 0xE4,
    /// Read the feature row
    LscReadFeature = 0xE7,
    /// Program the feature bits
    LscProgFeabits = 0xF8,
    /// Read the feature bits
    LscReadFeabits = 0xFB,
    /// Program OTP bits
    LscProgOtp = 0xF9,
    /// Read OTP bits
    LscReadOtp = 0xFA,
    /// Route Shift-DR to the configuration SPI flash
    LscBackgroundSpi = 0x3A,
}

impl Command {
    /// IR opcode
    pub fn opcode(self) -> u8 {
        self as u8
    }
}

/// Unlock key shifted into DR after [`Command::LscBackgroundSpi`], LSB first
pub const BACKGROUND_SPI_KEY: [u8; 2] = [0xFE, 0x68];
