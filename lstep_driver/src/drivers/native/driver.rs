//! Marshalling implementation of [`ControllerDriver`] over the resolved
//! entry-point table.
//!
//! Rules applied uniformly at the boundary:
//! - every text argument is transcoded to a NUL-terminated 8-bit `CString`;
//!   interior NUL bytes are rejected, never truncated
//! - `bool` arguments widen to the vendor's 4-byte `BOOL`
//! - output parameters are stack-allocated scalars passed by mutable
//!   pointer and read back only after the call reports success
//! - the returned status code is folded into the `Result` unchanged

use super::symbols::{EntryPoints, LsxBool, LsxStatus};
use libc::{c_double, c_int};
use libloading::Library;
use lstep_common::config::ControllerConfig;
use lstep_common::consts::STATUS_OK;
use lstep_common::driver::{ControllerDriver, DriverError};
use lstep_common::types::{Axis, AxisVector, CommandTimeouts, ConnectionParams, ControllerHandle};
use std::ffi::CString;
use std::path::Path;
use tracing::{debug, info, trace};

/// Map a native status code onto the `Result` channel.
fn check(rc: LsxStatus) -> Result<(), DriverError> {
    if rc == STATUS_OK {
        Ok(())
    } else {
        Err(DriverError::Command(rc))
    }
}

/// Widen a `bool` to the vendor's 4-byte `BOOL`.
fn to_lsx_bool(value: bool) -> LsxBool {
    value as LsxBool
}

/// Transcode text for the boundary. Interior NUL bytes cannot be
/// represented in a NUL-terminated string and are a marshalling error.
fn to_c_text(text: &str) -> Result<CString, DriverError> {
    CString::new(text).map_err(|_| DriverError::InvalidText(text.to_string()))
}

/// Transcode a path for the boundary.
fn to_c_path(path: &Path) -> Result<CString, DriverError> {
    to_c_text(&path.to_string_lossy())
}

/// FFI driver over the vendor controller library.
///
/// Owns the loaded `Library` so the resolved function pointers in the
/// entry-point table stay valid for the driver's lifetime.
pub struct NativeDriver {
    /// Resolved entry points
    api: EntryPoints,
    /// Loaded vendor library; must outlive `api`
    _library: Library,
}

impl NativeDriver {
    /// Load the vendor library from `path` and resolve all entry points.
    ///
    /// # Errors
    /// Returns `DriverError::LibraryLoad` if the library cannot be loaded
    /// and `DriverError::MissingSymbol` naming the first export that fails
    /// to resolve.
    pub fn load(path: &Path) -> Result<Self, DriverError> {
        let library = unsafe { Library::new(path) }
            .map_err(|e| DriverError::LibraryLoad(format!("{}: {}", path.display(), e)))?;
        let api = EntryPoints::resolve(&library)?;
        info!("Loaded controller library {}", path.display());
        Ok(Self {
            api,
            _library: library,
        })
    }

    /// Factory for the driver registry.
    pub fn factory(config: &ControllerConfig) -> Result<Box<dyn ControllerDriver>, DriverError> {
        Ok(Box::new(Self::load(&config.library_path)?))
    }
}

impl ControllerDriver for NativeDriver {
    fn name(&self) -> &'static str {
        "native"
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn create_handle(&mut self) -> Result<ControllerHandle, DriverError> {
        let mut id: c_int = 0;
        check(unsafe { (self.api.create_lsid)(&mut id) })?;
        debug!("Created controller handle {}", id);
        Ok(ControllerHandle::new(id))
    }

    fn load_config(&mut self, handle: ControllerHandle, path: &Path) -> Result<(), DriverError> {
        let c_path = to_c_path(path)?;
        debug!("Loading vendor configuration {}", path.display());
        check(unsafe { (self.api.load_config)(handle.raw(), c_path.as_ptr()) })
    }

    fn apply_config(&mut self, handle: ControllerHandle) -> Result<(), DriverError> {
        check(unsafe { (self.api.set_control_pars)(handle.raw()) })
    }

    fn connect(&mut self, handle: ControllerHandle) -> Result<(), DriverError> {
        info!("Connecting controller handle {}", handle);
        check(unsafe { (self.api.connect)(handle.raw()) })
    }

    fn connect_with(
        &mut self,
        handle: ControllerHandle,
        params: &ConnectionParams,
    ) -> Result<(), DriverError> {
        let port = to_c_text(&params.port)?;
        info!(
            "Connecting controller handle {} via {} at {} baud",
            handle, params.port, params.baud_rate
        );
        check(unsafe {
            (self.api.connect_simple)(
                handle.raw(),
                params.interface_type,
                port.as_ptr(),
                params.baud_rate,
                to_lsx_bool(params.show_protocol_window),
            )
        })
    }

    fn disconnect(&mut self, handle: ControllerHandle) -> Result<(), DriverError> {
        info!("Disconnecting controller handle {}", handle);
        check(unsafe { (self.api.disconnect)(handle.raw()) })
    }

    fn set_command_timeouts(
        &mut self,
        handle: ControllerHandle,
        timeouts: CommandTimeouts,
    ) -> Result<(), DriverError> {
        check(unsafe {
            (self.api.set_command_timeout)(
                handle.raw(),
                timeouts.general_ms,
                timeouts.move_ms,
                timeouts.calibrate_ms,
            )
        })
    }

    fn set_show_command_list(
        &mut self,
        handle: ControllerHandle,
        visible: bool,
    ) -> Result<(), DriverError> {
        check(unsafe { (self.api.set_show_cmd_list)(handle.raw(), to_lsx_bool(visible)) })
    }

    fn set_velocity(
        &mut self,
        handle: ControllerHandle,
        velocity: AxisVector,
    ) -> Result<(), DriverError> {
        check(unsafe {
            (self.api.set_vel)(handle.raw(), velocity.x, velocity.y, velocity.z, velocity.a)
        })
    }

    fn velocity(&mut self, handle: ControllerHandle) -> Result<AxisVector, DriverError> {
        let mut x: c_double = 0.0;
        let mut y: c_double = 0.0;
        let mut z: c_double = 0.0;
        let mut a: c_double = 0.0;
        check(unsafe { (self.api.get_vel)(handle.raw(), &mut x, &mut y, &mut z, &mut a) })?;
        Ok(AxisVector::new(x, y, z, a))
    }

    fn send_command(
        &mut self,
        handle: ControllerHandle,
        command: &str,
        max_len: i32,
        expect_line: bool,
        timeout_ms: i32,
    ) -> Result<Option<i32>, DriverError> {
        let text = to_c_text(command)?;
        let mut response: c_int = 0;
        debug!("Sending raw command {:?}", command);
        check(unsafe {
            (self.api.send_string)(
                handle.raw(),
                text.as_ptr(),
                &mut response,
                max_len,
                to_lsx_bool(expect_line),
                timeout_ms,
            )
        })?;
        // The native call writes a response only when a line is expected.
        Ok(expect_line.then_some(response))
    }

    fn calibrate(&mut self, handle: ControllerHandle) -> Result<(), DriverError> {
        info!("Calibrating all axes (lower limit switches)");
        check(unsafe { (self.api.calibrate)(handle.raw()) })
    }

    fn find_reference(&mut self, handle: ControllerHandle) -> Result<(), DriverError> {
        info!("Measuring reference (upper limit switches)");
        check(unsafe { (self.api.rmeasure)(handle.raw()) })
    }

    fn position(&mut self, handle: ControllerHandle) -> Result<AxisVector, DriverError> {
        let mut x: c_double = 0.0;
        let mut y: c_double = 0.0;
        let mut z: c_double = 0.0;
        let mut a: c_double = 0.0;
        check(unsafe { (self.api.get_pos)(handle.raw(), &mut x, &mut y, &mut z, &mut a) })?;
        let position = AxisVector::new(x, y, z, a);
        trace!("Position query: {}", position);
        Ok(position)
    }

    fn axis_position(
        &mut self,
        handle: ControllerHandle,
        axis: Axis,
    ) -> Result<f64, DriverError> {
        let mut value: c_double = 0.0;
        check(unsafe {
            (self.api.get_pos_single_axis)(handle.raw(), axis.index(), &mut value)
        })?;
        trace!("Axis {} position query: {}", axis, value);
        Ok(value)
    }

    fn set_position(
        &mut self,
        handle: ControllerHandle,
        position: AxisVector,
    ) -> Result<(), DriverError> {
        debug!("Redefining current location as {}", position);
        check(unsafe {
            (self.api.set_pos)(handle.raw(), position.x, position.y, position.z, position.a)
        })
    }

    fn move_absolute(
        &mut self,
        handle: ControllerHandle,
        target: AxisVector,
        wait: bool,
    ) -> Result<(), DriverError> {
        debug!("Absolute move to {} (wait={})", target, wait);
        check(unsafe {
            (self.api.move_abs)(
                handle.raw(),
                target.x,
                target.y,
                target.z,
                target.a,
                to_lsx_bool(wait),
            )
        })
    }

    fn move_absolute_axis(
        &mut self,
        handle: ControllerHandle,
        axis: Axis,
        target: f64,
        wait: bool,
    ) -> Result<(), DriverError> {
        debug!("Absolute move of axis {} to {} (wait={})", axis, target, wait);
        check(unsafe {
            (self.api.move_abs_single_axis)(handle.raw(), axis.index(), target, to_lsx_bool(wait))
        })
    }

    fn move_relative(
        &mut self,
        handle: ControllerHandle,
        offset: AxisVector,
        wait: bool,
    ) -> Result<(), DriverError> {
        debug!("Relative move by {} (wait={})", offset, wait);
        check(unsafe {
            (self.api.move_rel)(
                handle.raw(),
                offset.x,
                offset.y,
                offset.z,
                offset.a,
                to_lsx_bool(wait),
            )
        })
    }

    fn move_relative_axis(
        &mut self,
        handle: ControllerHandle,
        axis: Axis,
        offset: f64,
        wait: bool,
    ) -> Result<(), DriverError> {
        debug!("Relative move of axis {} by {} (wait={})", axis, offset, wait);
        check(unsafe {
            (self.api.move_rel_single_axis)(handle.raw(), axis.index(), offset, to_lsx_bool(wait))
        })
    }

    fn set_relative_distance(
        &mut self,
        handle: ControllerHandle,
        distance: AxisVector,
    ) -> Result<(), DriverError> {
        check(unsafe {
            (self.api.set_distance)(handle.raw(), distance.x, distance.y, distance.z, distance.a)
        })
    }

    fn repeat_relative_move(&mut self, handle: ControllerHandle) -> Result<(), DriverError> {
        debug!("Repeating stored relative move");
        check(unsafe { (self.api.move_rel_short)(handle.raw()) })
    }

    fn relative_distance(
        &mut self,
        handle: ControllerHandle,
    ) -> Result<AxisVector, DriverError> {
        let mut x: c_double = 0.0;
        let mut y: c_double = 0.0;
        let mut z: c_double = 0.0;
        let mut a: c_double = 0.0;
        check(unsafe { (self.api.get_distance)(handle.raw(), &mut x, &mut y, &mut z, &mut a) })?;
        Ok(AxisVector::new(x, y, z, a))
    }

    fn stop_axes(&mut self, handle: ControllerHandle) -> Result<(), DriverError> {
        info!("Stopping all axes");
        check(unsafe { (self.api.stop_axes)(handle.raw()) })
    }
}
