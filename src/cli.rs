//! CLI argument parsing

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Default length for `read`
pub const DEFAULT_READ_SIZE: u32 = 256 * 1024;

/// Parse a size or offset: decimal or `0x` hex, with an optional `k` or `M` suffix
pub fn parse_size(s: &str) -> Result<u32, String> {
    let (digits, multiplier) = match s.as_bytes().last() {
        Some(b'k' | b'K') => (&s[..s.len() - 1], 1024),
        Some(b'M') => (&s[..s.len() - 1], 1024 * 1024),
        _ => (s, 1),
    };
    let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))?
    } else {
        digits
            .parse::<u32>()
            .map_err(|e| format!("Invalid number: {}", e))?
    };
    value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("Value too large: {}", s))
}

fn parse_divider(s: &str) -> Result<u32, String> {
    let divider: u32 = s.parse().map_err(|e| format!("Invalid divider: {}", e))?;
    if !(1..=65536).contains(&divider) {
        return Err("Divider must be between 1 and 65536".into());
    }
    Ok(divider)
}

fn parse_erase_block(s: &str) -> Result<u32, String> {
    match s {
        "4" => Ok(4),
        "32" => Ok(32),
        "64" => Ok(64),
        _ => Err("Erase block size must be 4, 32 or 64 (KiB)".into()),
    }
}

#[derive(Parser)]
#[command(name = "ecpflasher")]
#[command(author, version, about = "JTAG programmer for Lattice ECP5 and NX FPGAs", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Programmer to use (ftdi or dummy), with options as name:key=value,...
    #[arg(short, long, default_value = "ftdi", global = true)]
    pub programmer: String,

    /// FTDI device to open, as i:<vendor>:<product>
    #[arg(short = 'd', long, global = true)]
    pub device: Option<String>,

    /// FTDI channel (A, B, C or D)
    #[arg(short = 'I', long, global = true)]
    pub interface: Option<String>,

    /// TCK divider, 1-65536; TCK = 6 MHz / divider
    #[arg(short = 'k', long, value_parser = parse_divider, global = true)]
    pub divider: Option<u32>,

    /// Slow clock (same as -k 30)
    #[arg(short, long, global = true, conflicts_with = "divider")]
    pub slow: bool,

    /// Reboot the FPGA from flash when done
    #[arg(short = 'a', long, global = true)]
    pub reinit: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Effective TCK divider, if one was requested
    pub fn tck_divider(&self) -> Option<u32> {
        if self.slow {
            Some(30)
        } else {
            self.divider
        }
    }
}

/// Erase options shared by `write` and `erase`
#[derive(Args, Debug, Clone)]
pub struct EraseArgs {
    /// Erase block size in KiB (4, 32 or 64)
    #[arg(long, value_parser = parse_erase_block, default_value = "64")]
    pub erase_block: u32,

    /// Erase the whole chip instead of the touched blocks
    #[arg(long, conflicts_with = "erase_block")]
    pub bulk_erase: bool,

    /// Clear the flash block protection bits first
    #[arg(long)]
    pub disable_protection: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Identify the FPGA and its configuration flash
    Probe,

    /// Show the FPGA IDCODE and decoded status register
    Status,

    /// Load a bitstream into configuration SRAM
    Sram {
        /// Bitstream file, or - for stdin
        input: PathBuf,
    },

    /// Write a bitstream to the configuration flash
    Write {
        /// Input file, or - for stdin
        input: PathBuf,

        /// Flash offset
        #[arg(long, value_parser = parse_size, default_value = "0")]
        offset: u32,

        #[command(flatten)]
        erase: EraseArgs,

        /// Do not erase before writing
        #[arg(long, conflicts_with = "bulk_erase")]
        no_erase: bool,

        /// Skip verification
        #[arg(long)]
        no_verify: bool,

        /// Verify each block right after writing it
        #[arg(long, conflicts_with = "no_verify")]
        interleaved_verify: bool,
    },

    /// Read the configuration flash to a file
    Read {
        /// Output file, or - for stdout
        output: PathBuf,

        /// Flash offset
        #[arg(long, value_parser = parse_size, default_value = "0")]
        offset: u32,

        /// Number of bytes to read
        #[arg(long, value_parser = parse_size, default_value_t = DEFAULT_READ_SIZE)]
        size: u32,
    },

    /// Compare the configuration flash with a file
    Verify {
        /// Input file, or - for stdin
        input: PathBuf,

        /// Flash offset
        #[arg(long, value_parser = parse_size, default_value = "0")]
        offset: u32,
    },

    /// Erase part or all of the configuration flash
    Erase {
        /// Flash offset
        #[arg(long, value_parser = parse_size, default_value = "0")]
        offset: u32,

        /// Number of bytes to erase
        #[arg(long, value_parser = parse_size, required_unless_present = "bulk_erase")]
        size: Option<u32>,

        #[command(flatten)]
        erase: EraseArgs,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("4096"), Ok(4096));
        assert_eq!(parse_size("0x100"), Ok(256));
        assert_eq!(parse_size("64k"), Ok(65536));
        assert_eq!(parse_size("0x10k"), Ok(16 * 1024));
        assert_eq!(parse_size("2M"), Ok(2 << 20));
        assert!(parse_size("").is_err());
        assert!(parse_size("12q").is_err());
        assert!(parse_size("8192M").is_err());
    }

    #[test]
    fn test_global_options() {
        let cli = Cli::try_parse_from([
            "ecpflasher", "-p", "dummy", "-I", "B", "-k", "4", "-a", "-vv", "probe",
        ])
        .unwrap();
        assert_eq!(cli.programmer, "dummy");
        assert_eq!(cli.interface.as_deref(), Some("B"));
        assert_eq!(cli.tck_divider(), Some(4));
        assert!(cli.reinit);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Probe));

        let cli = Cli::try_parse_from(["ecpflasher", "-s", "status"]).unwrap();
        assert_eq!(cli.tck_divider(), Some(30));
        assert_eq!(cli.programmer, "ftdi");
    }

    #[test]
    fn test_write_options() {
        let cli = Cli::try_parse_from([
            "ecpflasher",
            "write",
            "top.bit",
            "--offset",
            "1M",
            "--erase-block",
            "4",
            "--interleaved-verify",
        ])
        .unwrap();
        let Commands::Write {
            offset,
            erase,
            no_erase,
            interleaved_verify,
            ..
        } = cli.command
        else {
            panic!("expected write");
        };
        assert_eq!(offset, 1 << 20);
        assert_eq!(erase.erase_block, 4);
        assert!(!erase.bulk_erase && !no_erase && interleaved_verify);
    }

    #[test]
    fn test_read_defaults() {
        let cli = Cli::try_parse_from(["ecpflasher", "read", "-"]).unwrap();
        let Commands::Read { offset, size, .. } = cli.command else {
            panic!("expected read");
        };
        assert_eq!((offset, size), (0, DEFAULT_READ_SIZE));
    }

    #[test]
    fn test_conflicts_rejected() {
        for args in [
            &["ecpflasher", "-s", "-k", "2", "probe"][..],
            &["ecpflasher", "-k", "0", "probe"],
            &["ecpflasher", "write", "a", "--bulk-erase", "--no-erase"],
            &["ecpflasher", "write", "a", "--no-verify", "--interleaved-verify"],
            &["ecpflasher", "write", "a", "--erase-block", "16"],
            &["ecpflasher", "erase"],
            &["ecpflasher", "erase", "--bulk-erase", "--erase-block", "4"],
        ] {
            assert!(Cli::try_parse_from(args).is_err(), "{:?}", args);
        }
        assert!(Cli::try_parse_from(["ecpflasher", "erase", "--bulk-erase"]).is_ok());
    }
}
