//! JTAG TAP driver
//!
//! [`TapController`] tracks the TAP state of a single target and turns
//! state moves and register shifts into batched MPSSE transfers on a
//! [`SerialEngine`].

mod engine;
pub mod mpsse;
mod state;
mod tap;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::SerialEngine;
pub use state::{TapState, TmsPath, MAX_PATH_LEN, RESET_CLOCKS};
pub use tap::TapController;
