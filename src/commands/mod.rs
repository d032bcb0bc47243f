//! CLI command implementations
//!
//! Every command runs against an already reset `TapController`, whatever
//! engine sits behind it, so the same code drives real hardware and the
//! emulated FPGA used in tests. File handling stays in `main`.

mod device;
mod erase;
mod probe;
mod progress;
mod read;
mod sram;
mod status;
mod verify;
mod write;

pub use erase::{run_erase, EraseOptions};
pub use probe::run_probe;
pub use read::run_read;
pub use sram::run_sram;
pub use status::run_status;
pub use verify::run_verify;
pub use write::{run_write, WriteOptions};
