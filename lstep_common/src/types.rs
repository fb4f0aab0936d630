//! Controller data types.
//!
//! This module defines the data structures shared by all driver backends:
//! - `Axis` / `AxisVector` - Axis addressing and four-axis value tuples
//! - `ControllerHandle` - Opaque controller identifier
//! - `ConnectionParams` - Explicit connection parameters
//! - `CommandTimeouts` - Vendor-side command timeout triple

use crate::consts::{
    DEFAULT_BAUD_RATE, DEFAULT_CALIBRATE_TIMEOUT_MS, DEFAULT_GENERAL_TIMEOUT_MS,
    DEFAULT_INTERFACE_TYPE, DEFAULT_MOVE_TIMEOUT_MS, DEFAULT_PORT, MAX_AXES,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Addressable controller axis.
///
/// The discriminants match the vendor's 1-based axis numbering
/// (1 = X, 2 = Y, 3 = Z, 4 = A). Whether a given axis is actually
/// present depends on the controller's configured axis count; querying
/// an absent axis is reported by the controller as a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// First axis (vendor index 1)
    X = 1,
    /// Second axis (vendor index 2)
    Y = 2,
    /// Third axis (vendor index 3)
    Z = 3,
    /// Fourth axis (vendor index 4)
    A = 4,
}

impl Axis {
    /// All axes in vendor order.
    pub const ALL: [Axis; MAX_AXES] = [Axis::X, Axis::Y, Axis::Z, Axis::A];

    /// Vendor-facing 1-based index.
    pub fn index(self) -> i32 {
        self as i32
    }

    /// Axis for a 1-based vendor index, if in range.
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            1 => Some(Axis::X),
            2 => Some(Axis::Y),
            3 => Some(Axis::Z),
            4 => Some(Axis::A),
            _ => None,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "X"),
            Axis::Y => write!(f, "Y"),
            Axis::Z => write!(f, "Z"),
            Axis::A => write!(f, "A"),
        }
    }
}

/// Four-axis value tuple.
///
/// Used for positions, velocities and relative distances. Components for
/// axes the controller does not have configured read `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AxisVector {
    /// X component
    #[serde(default)]
    pub x: f64,
    /// Y component
    #[serde(default)]
    pub y: f64,
    /// Z component
    #[serde(default)]
    pub z: f64,
    /// A component
    #[serde(default)]
    pub a: f64,
}

impl AxisVector {
    /// The all-zero vector.
    pub const ZERO: AxisVector = AxisVector {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        a: 0.0,
    };

    /// Build a vector from four components.
    pub fn new(x: f64, y: f64, z: f64, a: f64) -> Self {
        Self { x, y, z, a }
    }

    /// Component for the given axis.
    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
            Axis::A => self.a,
        }
    }

    /// Replace the component for the given axis.
    pub fn set(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
            Axis::A => self.a = value,
        }
    }
}

impl fmt::Display for AxisVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "X={:.4} Y={:.4} Z={:.4} A={:.4}",
            self.x, self.y, self.z, self.a
        )
    }
}

/// Opaque controller identifier.
///
/// Allocated by the vendor library when a handle is created and passed as
/// the first argument to nearly every other call. A handle is owned by one
/// session for its lifetime and is not reused after disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControllerHandle(i32);

impl ControllerHandle {
    /// Wrap a raw identifier returned by the vendor library.
    pub fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Raw identifier for the native call.
    pub fn raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for ControllerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Default function for interface_type
fn default_interface_type() -> i32 {
    DEFAULT_INTERFACE_TYPE
}

/// Default function for port
fn default_port() -> String {
    DEFAULT_PORT.to_string()
}

/// Default function for baud_rate
fn default_baud_rate() -> i32 {
    DEFAULT_BAUD_RATE
}

/// Explicit connection parameters.
///
/// Used by connects that bypass the vendor configuration file and name the
/// interface directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// Interface type (vendor-defined numbering, 1 = RS-232).
    #[serde(default = "default_interface_type")]
    pub interface_type: i32,

    /// Serial port name (e.g. "COM1" or "/dev/ttyUSB0").
    #[serde(default = "default_port")]
    pub port: String,

    /// Baud rate for serial interfaces.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: i32,

    /// Show the vendor protocol window while connected.
    #[serde(default)]
    pub show_protocol_window: bool,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            interface_type: DEFAULT_INTERFACE_TYPE,
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            show_protocol_window: false,
        }
    }
}

/// Default function for general_ms
fn default_general_timeout() -> i32 {
    DEFAULT_GENERAL_TIMEOUT_MS
}

/// Default function for move_ms
fn default_move_timeout() -> i32 {
    DEFAULT_MOVE_TIMEOUT_MS
}

/// Default function for calibrate_ms
fn default_calibrate_timeout() -> i32 {
    DEFAULT_CALIBRATE_TIMEOUT_MS
}

/// Vendor-side command timeout triple, in milliseconds.
///
/// Configured once after connecting and held by the vendor library, not by
/// the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTimeouts {
    /// Response wait time for general API calls.
    #[serde(default = "default_general_timeout")]
    pub general_ms: i32,

    /// Timeout for positioning calls.
    #[serde(default = "default_move_timeout")]
    pub move_ms: i32,

    /// Timeout for calibration calls.
    #[serde(default = "default_calibrate_timeout")]
    pub calibrate_ms: i32,
}

impl Default for CommandTimeouts {
    fn default() -> Self {
        Self {
            general_ms: DEFAULT_GENERAL_TIMEOUT_MS,
            move_ms: DEFAULT_MOVE_TIMEOUT_MS,
            calibrate_ms: DEFAULT_CALIBRATE_TIMEOUT_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_index_round_trip() {
        for axis in Axis::ALL {
            assert_eq!(Axis::from_index(axis.index()), Some(axis));
        }
        assert_eq!(Axis::from_index(0), None);
        assert_eq!(Axis::from_index(5), None);
    }

    #[test]
    fn axis_vector_get_set() {
        let mut v = AxisVector::ZERO;
        v.set(Axis::Y, 12.5);
        v.set(Axis::A, -3.0);
        assert_eq!(v.get(Axis::X), 0.0);
        assert_eq!(v.get(Axis::Y), 12.5);
        assert_eq!(v.get(Axis::Z), 0.0);
        assert_eq!(v.get(Axis::A), -3.0);
    }

    #[test]
    fn connection_params_defaults() {
        let params = ConnectionParams::default();
        assert_eq!(params.interface_type, DEFAULT_INTERFACE_TYPE);
        assert_eq!(params.baud_rate, DEFAULT_BAUD_RATE);
        assert!(!params.show_protocol_window);
    }

    #[test]
    fn command_timeouts_defaults() {
        let timeouts = CommandTimeouts::default();
        assert_eq!(timeouts.general_ms, DEFAULT_GENERAL_TIMEOUT_MS);
        assert_eq!(timeouts.move_ms, DEFAULT_MOVE_TIMEOUT_MS);
        assert_eq!(timeouts.calibrate_ms, DEFAULT_CALIBRATE_TIMEOUT_MS);
    }
}
