//! ecpflasher - JTAG programmer for Lattice ECP5 and NX FPGAs
//!
//! Talks to the FPGA's TAP through an FTDI MPSSE adapter. The FPGA can be
//! configured directly (SRAM), or its configuration flash can be read,
//! erased and written through the background SPI bridge.
//!
//! # Architecture
//!
//! - `ecpflasher-core` holds the TAP state machine, the batched shift
//!   engine and everything built on it, generic over a `SerialEngine`
//! - `ecpflasher-ftdi` is the libftdi backed engine
//! - `ecpflasher-dummy` interprets the MPSSE stream against an emulated
//!   FPGA and flash
//!
//! This binary parses arguments, reads input files, opens the engine and
//! dispatches to `commands`.

mod cli;
mod commands;
mod error;
mod programmers;

use clap::Parser;
use cli::{Cli, Commands, EraseArgs};
use commands::{EraseOptions, WriteOptions};
use ecpflasher_core::flash::EraseBlock;
use ecpflasher_core::jtag::{SerialEngine, TapController};
use ecpflasher_core::lattice;
use error::CliError;
use programmers::JtagOptions;
use std::io::{Read, Write};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // Initialize logger; -v raises the default level
    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&cli) {
        Ok(()) => {
            log::info!("Bye.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

/// Read a whole input file, `-` meaning stdin
fn read_input(path: &Path) -> Result<Vec<u8>, CliError> {
    let mut data = Vec::new();
    let result = if path == Path::new("-") {
        std::io::stdin().lock().read_to_end(&mut data)
    } else {
        std::fs::File::open(path).and_then(|mut f| f.read_to_end(&mut data))
    };
    result.map_err(|source| CliError::Io {
        path: display(path),
        source,
    })?;
    log::debug!("read {} bytes from {}", data.len(), path.display());
    Ok(data)
}

/// Write `data` to a file, `-` meaning stdout
fn write_output(path: &Path, data: &[u8]) -> Result<(), CliError> {
    let result = if path == Path::new("-") {
        let mut out = std::io::stdout().lock();
        out.write_all(data).and_then(|_| out.flush())
    } else {
        std::fs::write(path, data)
    };
    result.map_err(|source| CliError::Io {
        path: display(path),
        source,
    })
}

fn erase_block(args: &EraseArgs) -> EraseBlock {
    EraseBlock::from_kib(args.erase_block).unwrap_or_default()
}

fn run(cli: &Cli) -> Result<(), CliError> {
    // Input files are read before any hardware is touched
    let input = match &cli.command {
        Commands::Sram { input } | Commands::Write { input, .. } | Commands::Verify { input, .. } => {
            let data = read_input(input)?;
            if data.is_empty() {
                return Err(CliError::Usage(format!("{} is empty", input.display())));
            }
            data
        }
        _ => Vec::new(),
    };

    let jtag = JtagOptions {
        device: cli.device.clone(),
        interface: cli.interface.clone(),
        divider: cli.tck_divider(),
    };
    let engine = programmers::open(&cli.programmer, &jtag)?;

    log::info!("init..");
    let mut tap = TapController::new(engine);
    tap.init()?;

    execute(&mut tap, &cli.command, &input)?;

    if cli.reinit {
        lattice::refresh(&mut tap)?;
    }
    Ok(())
}

fn execute<E: SerialEngine>(
    tap: &mut TapController<E>,
    command: &Commands,
    input: &[u8],
) -> Result<(), CliError> {
    match command {
        Commands::Probe => commands::run_probe(tap),
        Commands::Status => commands::run_status(tap).map(|_| ()),
        Commands::Sram { .. } => commands::run_sram(tap, input),
        Commands::Write {
            offset,
            erase,
            no_erase,
            no_verify,
            interleaved_verify,
            ..
        } => {
            let opts = WriteOptions {
                offset: *offset,
                erase_block: erase_block(erase),
                bulk_erase: erase.bulk_erase,
                no_erase: *no_erase,
                disable_protection: erase.disable_protection,
                verify: !no_verify,
                interleaved_verify: *interleaved_verify,
            };
            commands::run_write(tap, input, &opts)
        }
        Commands::Read {
            output,
            offset,
            size,
        } => {
            let data = commands::run_read(tap, *offset, *size)?;
            write_output(output, &data)
        }
        Commands::Verify { offset, .. } => commands::run_verify(tap, input, *offset),
        Commands::Erase {
            offset,
            size,
            erase,
        } => {
            let opts = EraseOptions {
                offset: *offset,
                size: size.unwrap_or(0),
                erase_block: erase_block(erase),
                bulk_erase: erase.bulk_erase,
                disable_protection: erase.disable_protection,
            };
            commands::run_erase(tap, &opts)
        }
    }
}
