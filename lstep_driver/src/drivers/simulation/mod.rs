//! Simulation driver: in-process substitute for the vendor library.
//!
//! Implements the same entry-point surface as the native binding over a
//! small software axis model, for development and testing without a
//! physical controller.

mod driver;
mod state;

pub use driver::SimulationDriver;
pub use state::{
    ERR_AXIS_NOT_CONFIGURED, ERR_INVALID_HANDLE, ERR_NO_CONFIG, ERR_NOT_CONNECTED,
    ERR_UNKNOWN_COMMAND, VERSION_RESPONSE,
};
