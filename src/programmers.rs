//! Programmer registration and dispatch
//!
//! A programmer string is a backend name, optionally followed by options:
//! `ftdi`, `ftdi:port=B,divider=4`, `dummy:idcode=0x110F1043`.

use ecpflasher_core::jtag::SerialEngine;

use crate::error::CliError;

/// Information about a programmer
pub struct ProgrammerInfo {
    /// Name used on the command line
    pub name: &'static str,
    /// Short description
    pub description: &'static str,
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "ftdi")]
    programmers.push(ProgrammerInfo {
        name: "ftdi",
        description: "FTDI MPSSE JTAG (FT2232H/FT232H) (port=<A-D>,divider=<n>,device=i:<vid>:<pid>)",
    });

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        description: "Emulated FPGA and flash for testing (idcode=,jedec=,size=,busy=,sr1=)",
    });

    programmers
}

/// Generate help text listing all available programmers
pub fn programmer_help() -> String {
    let programmers = available_programmers();

    if programmers.is_empty() {
        return "No programmers available (recompile with programmer features enabled)".to_string();
    }

    let mut help = String::from("Available programmers:\n");
    for p in &programmers {
        help.push_str(&format!("  {:8} - {}\n", p.name, p.description));
    }
    help
}

/// Parse a programmer string into name and options
///
/// Format: "name" or "name:option1=value1,option2=value2"
pub fn parse_programmer_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    if let Some((name, opts)) = s.split_once(':') {
        let options: Vec<_> = opts
            .split(',')
            .filter_map(|opt| opt.split_once('='))
            .collect();
        (name, options)
    } else {
        (s, Vec::new())
    }
}

/// JTAG options given as separate command line flags
///
/// These apply to the FTDI backend and take precedence over the same keys
/// in the programmer string.
#[derive(Debug, Default, Clone)]
pub struct JtagOptions {
    /// `i:<vendor>:<product>`
    pub device: Option<String>,
    /// Channel letter or index
    pub interface: Option<String>,
    /// TCK divider
    pub divider: Option<u32>,
}

impl JtagOptions {
    fn merged<'a>(&'a self, divider: &'a str, options: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
        let mut merged = options.to_vec();
        if let Some(device) = &self.device {
            merged.push(("device", device));
        }
        if let Some(interface) = &self.interface {
            merged.push(("port", interface));
        }
        if self.divider.is_some() {
            merged.push(("divider", divider));
        }
        merged
    }
}

/// Open the programmer named by `programmer`
#[allow(unused_variables)]
pub fn open(programmer: &str, jtag: &JtagOptions) -> Result<Box<dyn SerialEngine>, CliError> {
    let (name, options) = parse_programmer_string(programmer);

    match name {
        #[cfg(feature = "ftdi")]
        "ftdi" => {
            use ecpflasher_ftdi::{parse_options, Ftdi};

            let divider = jtag.divider.map(|d| d.to_string()).unwrap_or_default();
            let options = jtag.merged(&divider, &options);
            let config = parse_options(&options)
                .map_err(|e| CliError::Usage(format!("Invalid FTDI parameters: {}", e)))?;

            log::info!("Opening FTDI programmer...");
            let ftdi = Ftdi::open(&config).map_err(|e| {
                CliError::Programmer(format!(
                    "Failed to open FTDI device: {}\n\
                     Make sure the device is connected and you have permissions.\n\
                     You may need to unbind the kernel ftdi_sio driver:\n\
                     echo -n '<bus>-<port>' | sudo tee /sys/bus/usb/drivers/ftdi_sio/unbind",
                    e
                ))
            })?;
            Ok(Box::new(ftdi))
        }

        #[cfg(feature = "dummy")]
        "dummy" => {
            use ecpflasher_dummy::{parse_options, DummyEngine};

            let config = parse_options(&options)
                .map_err(|e| CliError::Usage(format!("Invalid dummy parameters: {}", e)))?;
            log::info!("Using emulated FPGA (IDCODE 0x{:08x})", config.idcode);
            Ok(Box::new(DummyEngine::new(config)))
        }

        _ => Err(CliError::Usage(format!(
            "Unknown programmer: {}\n\n{}",
            name,
            programmer_help()
        ))),
    }
}
