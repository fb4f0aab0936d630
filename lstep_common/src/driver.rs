//! Controller driver trait and error types.
//!
//! This module defines:
//! - `ControllerDriver` trait - Interface for pluggable controller backends
//! - `DriverError` enum - Error types for driver operations
//! - `DriverFactory` type alias - Factory function type
//!
//! The trait mirrors the vendor library's exported entry-point surface one
//! method per export, so a software substitute can stand in for the real
//! library behind the same seam.

use crate::config::ControllerConfig;
use crate::types::{Axis, AxisVector, CommandTimeouts, ConnectionParams, ControllerHandle};
use std::path::Path;
use thiserror::Error;

/// Error types for driver operations.
#[derive(Debug, Clone, Error)]
pub enum DriverError {
    /// Vendor shared library could not be loaded
    #[error("Failed to load controller library: {0}")]
    LibraryLoad(String),

    /// An exported entry point is missing from the vendor library
    #[error("Entry point '{symbol}' not found in controller library: {reason}")]
    MissingSymbol {
        /// Exported name that failed to resolve
        symbol: &'static str,
        /// Loader error text
        reason: String,
    },

    /// The controller reported a non-success status code.
    ///
    /// The code is vendor-defined and carried unchanged; this layer never
    /// interprets it.
    #[error("Controller returned status code {0}")]
    Command(i32),

    /// A text argument cannot cross the boundary
    #[error("Text argument contains an interior NUL byte: {0:?}")]
    InvalidText(String),

    /// Driver not found in the registry
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    /// State persistence error
    #[error("State persistence error: {0}")]
    PersistenceError(String),
}

impl DriverError {
    /// Native status code carried by this error, if it is a controller
    /// status rather than a driver-side failure.
    pub fn status_code(&self) -> Option<i32> {
        match self {
            DriverError::Command(code) => Some(*code),
            _ => None,
        }
    }
}

/// Factory function type for creating driver instances.
pub type DriverFactory = fn(&ControllerConfig) -> Result<Box<dyn ControllerDriver>, DriverError>;

/// Trait defining the vendor entry-point surface of the LSTEP controller.
///
/// Every method forwards to exactly one exported entry point. Values the
/// native library produces through output-reference parameters (positions,
/// read-back vectors, raw-command responses) appear here as `Ok` payloads;
/// the integer status code every entry point returns is folded into the
/// `Result`, with non-success codes carried unchanged in
/// [`DriverError::Command`]. No retries, no interpretation, no argument
/// validation — the driver is a transparent conduit.
///
/// # Call model
///
/// Single-threaded, synchronous and blocking: each method returns when the
/// native call returns. The driver adds no locking of its own; if a caller
/// intends to invoke [`stop_axes`](ControllerDriver::stop_axes) from a
/// second thread while a blocking move is in flight, the vendor library
/// itself must tolerate that.
pub trait ControllerDriver: Send {
    /// Returns the driver's unique identifier (e.g., "native", "simulation").
    fn name(&self) -> &'static str;

    /// Returns the driver's semantic version.
    fn version(&self) -> &'static str;

    // ─── Lifecycle ──────────────────────────────────────────────────────

    /// Allocate a new controller handle (`LSX_CreateLSID`).
    ///
    /// The handle identifies one controller session and is passed to every
    /// other call. It is not reused after [`disconnect`](Self::disconnect).
    fn create_handle(&mut self) -> Result<ControllerHandle, DriverError>;

    /// Load a vendor configuration file for the controller (`LSX_LoadConfig`).
    ///
    /// The file is opaque to this layer and forwarded by path. The path is
    /// transcoded to NUL-terminated 8-bit text before crossing the boundary.
    fn load_config(&mut self, handle: ControllerHandle, path: &Path) -> Result<(), DriverError>;

    /// Send the loaded configuration parameters to the controller
    /// (`LSX_SetControlPars`).
    fn apply_config(&mut self, handle: ControllerHandle) -> Result<(), DriverError>;

    /// Connect using the parameters from the loaded configuration file
    /// (`LSX_Connect`).
    fn connect(&mut self, handle: ControllerHandle) -> Result<(), DriverError>;

    /// Connect with explicit interface parameters (`LSX_ConnectSimple`).
    fn connect_with(
        &mut self,
        handle: ControllerHandle,
        params: &ConnectionParams,
    ) -> Result<(), DriverError>;

    /// Disconnect from the controller (`LSX_Disconnect`).
    fn disconnect(&mut self, handle: ControllerHandle) -> Result<(), DriverError>;

    // ─── Configuration ──────────────────────────────────────────────────

    /// Configure the vendor-side command timeouts (`LSX_SetCommandTimeout`).
    fn set_command_timeouts(
        &mut self,
        handle: ControllerHandle,
        timeouts: CommandTimeouts,
    ) -> Result<(), DriverError>;

    /// Show or hide the vendor command-list window (`LSX_SetShowCmdList`).
    fn set_show_command_list(
        &mut self,
        handle: ControllerHandle,
        visible: bool,
    ) -> Result<(), DriverError>;

    /// Set per-axis velocities (`LSX_SetVel`).
    fn set_velocity(
        &mut self,
        handle: ControllerHandle,
        velocity: AxisVector,
    ) -> Result<(), DriverError>;

    /// Read back the per-axis velocities (`LSX_GetVel`).
    fn velocity(&mut self, handle: ControllerHandle) -> Result<AxisVector, DriverError>;

    // ─── Raw command passthrough ────────────────────────────────────────

    /// Send a free-form command string to the controller (`LSX_SendString`),
    /// for functionality not covered by a typed entry point.
    ///
    /// The native call writes an integer response into caller-supplied
    /// storage only when `expect_line` is set; accordingly this returns
    /// `Some(response)` iff `expect_line`, `None` otherwise.
    fn send_command(
        &mut self,
        handle: ControllerHandle,
        command: &str,
        max_len: i32,
        expect_line: bool,
        timeout_ms: i32,
    ) -> Result<Option<i32>, DriverError>;

    // ─── Calibration / reference ────────────────────────────────────────

    /// Drive all axes toward their lower limit switch and re-zero at the
    /// stopped position (`LSX_Calibrate`).
    fn calibrate(&mut self, handle: ControllerHandle) -> Result<(), DriverError>;

    /// Drive all axes toward their upper limit switch without re-zeroing
    /// (`LSX_RMeasure`).
    fn find_reference(&mut self, handle: ControllerHandle) -> Result<(), DriverError>;

    // ─── Position query / set ───────────────────────────────────────────

    /// Current position of all axes (`LSX_GetPos`). Axes not physically
    /// present report `0.0`.
    fn position(&mut self, handle: ControllerHandle) -> Result<AxisVector, DriverError>;

    /// Current position of one axis (`LSX_GetPosSingleAxis`). An axis
    /// outside the controller's configured count yields the controller's
    /// status code, never a guessed value.
    fn axis_position(&mut self, handle: ControllerHandle, axis: Axis)
    -> Result<f64, DriverError>;

    /// Redefine the current location as the given coordinates (`LSX_SetPos`).
    ///
    /// This shifts the origin of the coordinate frame; it does not move.
    fn set_position(
        &mut self,
        handle: ControllerHandle,
        position: AxisVector,
    ) -> Result<(), DriverError>;

    // ─── Motion ─────────────────────────────────────────────────────────

    /// Linearly-interpolated move of all axes to absolute coordinates
    /// (`LSX_MoveAbs`). With `wait` the call blocks until motion completes;
    /// without it the call returns once motion is issued.
    fn move_absolute(
        &mut self,
        handle: ControllerHandle,
        target: AxisVector,
        wait: bool,
    ) -> Result<(), DriverError>;

    /// Absolute move of a single axis (`LSX_MoveAbsSingleAxis`).
    fn move_absolute_axis(
        &mut self,
        handle: ControllerHandle,
        axis: Axis,
        target: f64,
        wait: bool,
    ) -> Result<(), DriverError>;

    /// Relative move of all axes (`LSX_MoveRel`).
    fn move_relative(
        &mut self,
        handle: ControllerHandle,
        offset: AxisVector,
        wait: bool,
    ) -> Result<(), DriverError>;

    /// Relative move of a single axis (`LSX_MoveRelSingleAxis`).
    fn move_relative_axis(
        &mut self,
        handle: ControllerHandle,
        axis: Axis,
        offset: f64,
        wait: bool,
    ) -> Result<(), DriverError>;

    /// Store a relative displacement for repeated moves (`LSX_SetDistance`).
    ///
    /// Paired with [`repeat_relative_move`](Self::repeat_relative_move):
    /// the stored vector is controller-side session state, so the same
    /// displacement can be re-issued without re-marshalling four floats.
    fn set_relative_distance(
        &mut self,
        handle: ControllerHandle,
        distance: AxisVector,
    ) -> Result<(), DriverError>;

    /// Re-issue the stored relative displacement (`LSX_MoveRelShort`).
    fn repeat_relative_move(&mut self, handle: ControllerHandle) -> Result<(), DriverError>;

    /// Read back the stored relative displacement (`LSX_GetDistance`).
    fn relative_distance(&mut self, handle: ControllerHandle)
    -> Result<AxisVector, DriverError>;

    /// Asynchronously interrupt any in-flight motion (`LSX_StopAxes`).
    /// Safe to call at any time, including when no motion is in progress.
    fn stop_axes(&mut self, handle: ControllerHandle) -> Result<(), DriverError>;
}
