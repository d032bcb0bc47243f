//! Bit-serial SPI NOR flash emulator
//!
//! Sees the raw MOSI stream of each chip-select frame, answers reads on
//! MISO as the bytes arrive and applies write commands when the frame
//! ends.

use ecpflasher_core::flash::opcodes;

/// Configuration for the emulated flash
#[derive(Debug, Clone)]
pub struct FlashConfig {
    /// JEDEC manufacturer ID
    pub manufacturer_id: u8,
    /// JEDEC device ID
    pub device_id: u16,
    /// Flash size in bytes
    pub size: usize,
    /// Status reads that report busy after each write or erase
    pub busy_polls: u32,
    /// Initial value of status register 1
    pub status1: u8,
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self {
            manufacturer_id: 0xEF, // Winbond
            device_id: 0x4018,     // W25Q128JV
            size: 16 * 1024 * 1024,
            busy_polls: 1,
            status1: 0,
        }
    }
}

/// Emulated SPI NOR flash
pub struct DummyFlash {
    config: FlashConfig,
    data: Vec<u8>,
    status1: u8,
    status2: u8,
    write_enabled: bool,
    busy_remaining: u32,

    selected: bool,
    frame: Vec<u8>,
    mosi: u8,
    miso: u8,
    bit: u8,
    read_addr: usize,
    /// Completed frames, by opcode; useful for asserting command order
    pub history: Vec<u8>,
}

impl DummyFlash {
    /// Create an erased flash
    pub fn new(config: FlashConfig) -> Self {
        let data = vec![0xFF; config.size];
        Self {
            status1: config.status1,
            config,
            data,
            status2: 0,
            write_enabled: false,
            busy_remaining: 0,
            selected: false,
            frame: Vec::new(),
            mosi: 0,
            miso: 0xFF,
            bit: 0,
            read_addr: 0,
            history: Vec::new(),
        }
    }

    /// Flash contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable flash contents
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Status register 1 as stored (without WIP/WEL)
    pub fn status1(&self) -> u8 {
        self.status1
    }

    /// Configuration
    pub fn config(&self) -> &FlashConfig {
        &self.config
    }

    /// Assert chip select
    pub fn select(&mut self) {
        self.selected = true;
        self.frame.clear();
        self.mosi = 0;
        self.bit = 0;
        self.miso = 0xFF;
    }

    /// Clock one bit: sample `mosi`, return the MISO level
    pub fn clock(&mut self, mosi: bool) -> bool {
        if !self.selected {
            return true;
        }
        let out = self.miso & 0x80 != 0;
        self.miso <<= 1;
        self.mosi = (self.mosi << 1) | mosi as u8;
        self.bit += 1;
        if self.bit == 8 {
            self.frame.push(self.mosi);
            self.mosi = 0;
            self.bit = 0;
            self.miso = self.respond();
        }
        out
    }

    fn live_status1(&self) -> u8 {
        let mut sr = self.status1;
        if self.write_enabled {
            sr |= opcodes::SR1_WEL;
        }
        if self.busy_remaining > 0 {
            sr |= opcodes::SR1_WIP;
        }
        sr
    }

    /// Byte to shift out after the frame's latest byte
    fn respond(&mut self) -> u8 {
        let n = self.frame.len();
        match self.frame[0] {
            opcodes::RDID => match n {
                1 => self.config.manufacturer_id,
                2 => (self.config.device_id >> 8) as u8,
                3 => self.config.device_id as u8,
                _ => 0xFF,
            },
            opcodes::RDSR => self.live_status1(),
            opcodes::RDSR2 => self.status2,
            opcodes::READ if n >= 4 && self.busy_remaining == 0 => {
                if n == 4 {
                    self.read_addr = self.frame_addr();
                }
                let byte = self.data[self.read_addr % self.data.len()];
                self.read_addr += 1;
                byte
            }
            _ => 0xFF,
        }
    }

    fn frame_addr(&self) -> usize {
        ((self.frame[1] as usize) << 16) | ((self.frame[2] as usize) << 8) | self.frame[3] as usize
    }

    /// Release chip select and execute the frame
    pub fn deselect(&mut self) {
        if !self.selected {
            return;
        }
        self.selected = false;
        let Some(&opcode) = self.frame.first() else {
            return;
        };
        self.history.push(opcode);

        if opcode == opcodes::RDSR {
            self.busy_remaining = self.busy_remaining.saturating_sub(1);
            return;
        }
        if self.busy_remaining > 0 && opcode != opcodes::RDSR2 {
            log::warn!("dummy flash: opcode 0x{:02X} while busy, ignored", opcode);
            return;
        }

        match opcode {
            opcodes::WREN => self.write_enabled = true,
            opcodes::WRSR if self.frame.len() >= 2 => {
                if self.take_write_enable() {
                    self.status1 = self.frame[1] & !(opcodes::SR1_WIP | opcodes::SR1_WEL);
                    self.start_busy();
                }
            }
            opcodes::PP if self.frame.len() >= 5 => {
                if self.take_write_enable() && self.unprotected() {
                    let addr = self.frame_addr() % self.data.len();
                    let page = addr & !(opcodes::PAGE_SIZE - 1);
                    for (i, &b) in self.frame[4..].iter().enumerate() {
                        let a = page + (addr + i) % opcodes::PAGE_SIZE;
                        self.data[a] &= b;
                    }
                    self.start_busy();
                }
            }
            opcodes::SE_20 | opcodes::BE_52 | opcodes::BE_D8 if self.frame.len() >= 4 => {
                let size = match opcode {
                    opcodes::SE_20 => 4 << 10,
                    opcodes::BE_52 => 32 << 10,
                    _ => 64 << 10,
                };
                if self.take_write_enable() && self.unprotected() {
                    let start = (self.frame_addr() & !(size - 1)) % self.data.len();
                    let end = (start + size).min(self.data.len());
                    self.data[start..end].fill(0xFF);
                    self.start_busy();
                }
            }
            opcodes::CE_C7 => {
                if self.take_write_enable() && self.unprotected() {
                    self.data.fill(0xFF);
                    self.start_busy();
                }
            }
            _ => log::trace!("dummy flash: frame 0x{:02X} ({} bytes)", opcode, self.frame.len()),
        }
    }

    fn take_write_enable(&mut self) -> bool {
        let enabled = self.write_enabled;
        self.write_enabled = false;
        if !enabled {
            log::warn!("dummy flash: write without WREN, ignored");
        }
        enabled
    }

    fn unprotected(&self) -> bool {
        let protected = self.status1 & opcodes::SR1_BP_MASK != 0;
        if protected {
            log::warn!("dummy flash: block protection set, write ignored");
        }
        !protected
    }

    fn start_busy(&mut self) {
        self.busy_remaining = self.config.busy_polls;
    }
}
