//! SPI NOR flash opcodes used through the FPGA's background SPI port
//!
//! 3-byte addressing only; the ECP5 configuration flashes this tool
//! targets are at most 16 MiB.

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - required before any write/erase operation
pub const WREN: u8 = 0x06;

// ============================================================================
// Status register operations
// ============================================================================

/// Read Status Register 1
pub const RDSR: u8 = 0x05;
/// Read Status Register 2
pub const RDSR2: u8 = 0x35;
/// Write Status Register 1
pub const WRSR: u8 = 0x01;

// ============================================================================
// Identification
// ============================================================================

/// Read JEDEC ID (manufacturer + device ID)
pub const RDID: u8 = 0x9F;

// ============================================================================
// Read / program
// ============================================================================

/// Read Data (3-byte address)
pub const READ: u8 = 0x03;
/// Page Program (3-byte address)
pub const PP: u8 = 0x02;

// ============================================================================
// Erase
// ============================================================================

/// Sector Erase 4KB
pub const SE_20: u8 = 0x20;
/// Block Erase 32KB
pub const BE_52: u8 = 0x52;
/// Block Erase 64KB
pub const BE_D8: u8 = 0xD8;
/// Chip Erase
pub const CE_C7: u8 = 0xC7;

// ============================================================================
// Status register bits
// ============================================================================

/// SR1: Write In Progress
pub const SR1_WIP: u8 = 1 << 0;
/// SR1: Write Enable Latch
pub const SR1_WEL: u8 = 1 << 1;
/// SR1: Block Protect bits BP0-BP2
pub const SR1_BP_MASK: u8 = 0b0001_1100;
/// SR1: Top/Bottom protect
pub const SR1_TB: u8 = 1 << 5;
/// SR1: Sector protect
pub const SR1_SEC: u8 = 1 << 6;
/// SR1: Status Register Protect 0
pub const SR1_SRP0: u8 = 1 << 7;

/// SR2: Status Register Protect 1
pub const SR2_SRP1: u8 = 1 << 0;
/// SR2: Quad Enable
pub const SR2_QE: u8 = 1 << 1;
/// SR2: Security register lock bits LB1-LB3
pub const SR2_LB_MASK: u8 = 0b0011_1000;
/// SR2: Complement protect
pub const SR2_CMP: u8 = 1 << 6;
/// SR2: Suspend status
pub const SR2_SUS: u8 = 1 << 7;

// ============================================================================
// Geometry
// ============================================================================

/// Page program granularity
pub const PAGE_SIZE: usize = 256;
/// Largest address reachable with 3-byte addressing
pub const MAX_3B_SIZE: usize = 1 << 24;
