//! Session state for the simulation driver.
//!
//! This module holds the software axis model and per-handle session state:
//! - `SimAxis` - One axis with travel limits and an origin offset
//! - `Session` - Everything one controller handle remembers
//! - `StatePersistence` - Axis state saved across runs (bincode)
//!
//! Positions are kept in two frames. `travel` is the mechanical position
//! between the limit switches; `origin` is the offset subtracted from it to
//! produce the coordinates callers see. Calibrating and redefining the
//! current location only ever touch `origin`/`travel`, which keeps the
//! "re-zeroing shifts the frame, it does not move" semantics exact.

use lstep_common::driver::DriverError;
use lstep_common::types::{AxisVector, CommandTimeouts};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// Status codes the simulated controller reports, in the vendor's numbering
// style. Opaque to the driver layer; surfaced unchanged to callers.

/// Handle was never allocated by this controller.
pub const ERR_INVALID_HANDLE: i32 = 4001;
/// Operation requires an established connection.
pub const ERR_NOT_CONNECTED: i32 = 4002;
/// Axis index is beyond the configured axis count.
pub const ERR_AXIS_NOT_CONFIGURED: i32 = 4003;
/// No (or unreadable) vendor configuration file.
pub const ERR_NO_CONFIG: i32 = 4004;
/// Raw command not understood by the controller.
pub const ERR_UNKNOWN_COMMAND: i32 = 4005;

/// Response written for the `?ver` raw command.
pub const VERSION_RESPONSE: i32 = 230;

/// Default lower travel limit.
pub(crate) const DEFAULT_LOWER_LIMIT: f64 = 0.0;
/// Default upper travel limit.
pub(crate) const DEFAULT_UPPER_LIMIT: f64 = 200.0;
/// Default per-axis velocity on a fresh session.
pub(crate) const DEFAULT_VELOCITY: f64 = 10.0;

/// One simulated axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct SimAxis {
    /// Mechanical position between the limit switches
    pub travel: f64,
    /// Offset subtracted from `travel` to produce reported coordinates
    pub origin: f64,
    /// Lower limit switch position
    pub lower_limit: f64,
    /// Upper limit switch position
    pub upper_limit: f64,
}

impl SimAxis {
    /// New axis at mechanical zero with the given travel range.
    pub fn new(lower_limit: f64, upper_limit: f64) -> Self {
        Self {
            travel: 0.0_f64.clamp(lower_limit, upper_limit),
            origin: 0.0,
            lower_limit,
            upper_limit,
        }
    }

    /// Position in the caller's coordinate frame.
    pub fn reported(&self) -> f64 {
        self.travel - self.origin
    }

    /// Move to an absolute target in the caller's frame. The limit switch
    /// halts the mechanics at the end of travel.
    pub fn move_to(&mut self, target: f64) {
        self.travel = (self.origin + target).clamp(self.lower_limit, self.upper_limit);
    }

    /// Move by an offset from the current position.
    pub fn move_by(&mut self, offset: f64) {
        self.travel = (self.travel + offset).clamp(self.lower_limit, self.upper_limit);
    }

    /// Redefine the current location as `value`, shifting the frame origin.
    pub fn rezero(&mut self, value: f64) {
        self.origin = self.travel - value;
    }

    /// Run to the lower limit switch and re-zero there.
    pub fn calibrate(&mut self) {
        self.travel = self.lower_limit;
        self.origin = self.lower_limit;
    }

    /// Run to the upper limit switch without re-zeroing.
    pub fn reference(&mut self) {
        self.travel = self.upper_limit;
    }
}

/// Everything one controller handle remembers.
#[derive(Debug, Clone)]
pub(crate) struct Session {
    /// Connection established
    pub connected: bool,
    /// Vendor configuration file loaded via `load_config`
    pub config_path: Option<PathBuf>,
    /// Configuration parameters sent to the controller
    pub config_applied: bool,
    /// Configured axes
    pub axes: Vec<SimAxis>,
    /// Stored relative displacement for repeated moves
    pub distance: AxisVector,
    /// Per-axis velocities
    pub velocity: AxisVector,
    /// Vendor-side command timeouts (held for fidelity; moves complete
    /// instantaneously here, so nothing consults them)
    #[allow(dead_code)]
    pub timeouts: CommandTimeouts,
    /// Command-list window visibility (held, never rendered)
    #[allow(dead_code)]
    pub show_command_list: bool,
}

impl Session {
    /// Fresh session with `axis_count` axes sharing one travel range.
    pub fn new(axis_count: usize, lower_limit: f64, upper_limit: f64) -> Self {
        Self {
            connected: false,
            config_path: None,
            config_applied: false,
            axes: (0..axis_count)
                .map(|_| SimAxis::new(lower_limit, upper_limit))
                .collect(),
            distance: AxisVector::ZERO,
            velocity: AxisVector::new(
                DEFAULT_VELOCITY,
                DEFAULT_VELOCITY,
                DEFAULT_VELOCITY,
                DEFAULT_VELOCITY,
            ),
            timeouts: CommandTimeouts::default(),
            show_command_list: false,
        }
    }
}

/// Persisted axis state for the entire simulated controller.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub(crate) struct PersistedState {
    /// Version of state format (for migration)
    pub version: u32,
    /// Axis states
    pub axes: Vec<SimAxis>,
}

impl PersistedState {
    /// Current state format version.
    pub const CURRENT_VERSION: u32 = 1;
}

/// State persistence manager.
pub(crate) struct StatePersistence {
    /// Path to state file
    path: PathBuf,
}

impl StatePersistence {
    /// Create a new persistence manager.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Save state to file.
    pub fn save(&self, state: &PersistedState) -> Result<(), DriverError> {
        debug!("Saving simulated axis state to {:?}", self.path);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                DriverError::PersistenceError(format!("Failed to create directory: {}", e))
            })?;
        }

        let file = File::create(&self.path).map_err(|e| {
            DriverError::PersistenceError(format!("Failed to create state file: {}", e))
        })?;
        let writer = BufWriter::new(file);
        bincode::serialize_into(writer, state).map_err(|e| {
            DriverError::PersistenceError(format!("Failed to serialize state: {}", e))
        })?;

        info!("Saved state for {} axes to {:?}", state.axes.len(), self.path);
        Ok(())
    }

    /// Load state from file. Returns `Ok(None)` if no usable state exists.
    pub fn load(&self) -> Result<Option<PersistedState>, DriverError> {
        if !self.path.exists() {
            debug!("State file {:?} does not exist, starting fresh", self.path);
            return Ok(None);
        }

        let file = File::open(&self.path).map_err(|e| {
            DriverError::PersistenceError(format!("Failed to open state file: {}", e))
        })?;
        let reader = BufReader::new(file);
        let state: PersistedState = bincode::deserialize_from(reader).map_err(|e| {
            DriverError::PersistenceError(format!("Failed to deserialize state: {}", e))
        })?;

        if state.version != PersistedState::CURRENT_VERSION {
            warn!(
                "State file version {} does not match current version {}, ignoring",
                state.version,
                PersistedState::CURRENT_VERSION
            );
            return Ok(None);
        }

        Ok(Some(state))
    }
}
