//! Simulation driver implementation.
//!
//! The `SimulationDriver` implements the `ControllerDriver` trait over the
//! software axis model in [`state`](super::state), so everything above the
//! trait seam can run against it unchanged.
//!
//! Differences from real hardware, by construction:
//! - moves complete instantaneously, so the `wait` flag has no observable
//!   effect and the position cached after a `wait = false` move already is
//!   the final resting position
//! - the vendor configuration file is checked for existence and remembered,
//!   but its contents are not interpreted

use super::state::{
    DEFAULT_LOWER_LIMIT, DEFAULT_UPPER_LIMIT, ERR_AXIS_NOT_CONFIGURED, ERR_INVALID_HANDLE,
    ERR_NO_CONFIG, ERR_NOT_CONNECTED, ERR_UNKNOWN_COMMAND, PersistedState, Session,
    StatePersistence, VERSION_RESPONSE,
};
use lstep_common::config::ControllerConfig;
use lstep_common::consts::MAX_AXES;
use lstep_common::driver::{ControllerDriver, DriverError};
use lstep_common::types::{Axis, AxisVector, CommandTimeouts, ConnectionParams, ControllerHandle};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// In-process substitute for the vendor controller library.
pub struct SimulationDriver {
    /// Active sessions keyed by raw handle
    sessions: HashMap<i32, Session>,
    /// Next handle to allocate
    next_handle: i32,
    /// Axes per new session
    axis_count: usize,
    /// Lower travel limit for new sessions
    lower_limit: f64,
    /// Upper travel limit for new sessions
    upper_limit: f64,
    /// Axis state persisted across runs, if configured
    persistence: Option<StatePersistence>,
}

impl SimulationDriver {
    /// Create a simulated controller with four axes and default travel
    /// limits.
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            next_handle: 1,
            axis_count: MAX_AXES,
            lower_limit: DEFAULT_LOWER_LIMIT,
            upper_limit: DEFAULT_UPPER_LIMIT,
            persistence: None,
        }
    }

    /// Limit new sessions to `count` configured axes (1..=4).
    pub fn with_axis_count(mut self, count: usize) -> Self {
        self.axis_count = count.clamp(1, MAX_AXES);
        self
    }

    /// Use the given travel range for all axes of new sessions.
    pub fn with_travel_limits(mut self, lower: f64, upper: f64) -> Self {
        self.lower_limit = lower;
        self.upper_limit = upper;
        self
    }

    /// Persist axis state to `path` on disconnect and restore it on
    /// connect.
    pub fn with_state_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.persistence = Some(StatePersistence::new(path));
        self
    }

    /// Factory for the driver registry.
    pub fn factory(config: &ControllerConfig) -> Result<Box<dyn ControllerDriver>, DriverError> {
        let mut driver = Self::new();
        if let Some(path) = &config.state_file {
            driver = driver.with_state_file(path);
        }
        Ok(Box::new(driver))
    }

    fn session_mut(&mut self, handle: ControllerHandle) -> Result<&mut Session, DriverError> {
        self.sessions
            .get_mut(&handle.raw())
            .ok_or(DriverError::Command(ERR_INVALID_HANDLE))
    }

    fn connected_mut(&mut self, handle: ControllerHandle) -> Result<&mut Session, DriverError> {
        let session = self.session_mut(handle)?;
        if !session.connected {
            return Err(DriverError::Command(ERR_NOT_CONNECTED));
        }
        Ok(session)
    }

    /// Restore persisted axis state into a freshly connected session.
    fn restore_axes(persistence: Option<&StatePersistence>, session: &mut Session) {
        let Some(persistence) = persistence else {
            return;
        };
        match persistence.load() {
            Ok(Some(state)) if state.axes.len() == session.axes.len() => {
                info!("Restored state for {} axes", state.axes.len());
                session.axes = state.axes;
            }
            Ok(Some(state)) => {
                warn!(
                    "Persisted state has {} axes, session has {}; ignoring",
                    state.axes.len(),
                    session.axes.len()
                );
            }
            Ok(None) => {
                debug!("No persisted state to restore");
            }
            Err(e) => {
                warn!("Failed to load persisted state: {}", e);
            }
        }
    }
}

impl Default for SimulationDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerDriver for SimulationDriver {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn create_handle(&mut self) -> Result<ControllerHandle, DriverError> {
        let raw = self.next_handle;
        self.next_handle += 1;
        self.sessions.insert(
            raw,
            Session::new(self.axis_count, self.lower_limit, self.upper_limit),
        );
        debug!("Created simulated controller handle {}", raw);
        Ok(ControllerHandle::new(raw))
    }

    fn load_config(&mut self, handle: ControllerHandle, path: &Path) -> Result<(), DriverError> {
        // The vendor library reads the file itself; here only its
        // existence is checked before the path is remembered.
        let exists = path.is_file();
        let session = self.session_mut(handle)?;
        if !exists {
            return Err(DriverError::Command(ERR_NO_CONFIG));
        }
        session.config_path = Some(path.to_path_buf());
        session.config_applied = false;
        debug!("Loaded vendor configuration {}", path.display());
        Ok(())
    }

    fn apply_config(&mut self, handle: ControllerHandle) -> Result<(), DriverError> {
        let session = self.session_mut(handle)?;
        if session.config_path.is_none() {
            return Err(DriverError::Command(ERR_NO_CONFIG));
        }
        session.config_applied = true;
        Ok(())
    }

    fn connect(&mut self, handle: ControllerHandle) -> Result<(), DriverError> {
        let session = self.session_mut(handle)?;
        if session.config_path.is_none() {
            // Plain connect takes its parameters from the loaded file.
            return Err(DriverError::Command(ERR_NO_CONFIG));
        }
        session.connected = true;
        info!(
            "Simulated controller {} connected (parameters applied: {})",
            handle, session.config_applied
        );
        let persistence = self.persistence.as_ref();
        if let Some(session) = self.sessions.get_mut(&handle.raw()) {
            Self::restore_axes(persistence, session);
        }
        Ok(())
    }

    fn connect_with(
        &mut self,
        handle: ControllerHandle,
        params: &ConnectionParams,
    ) -> Result<(), DriverError> {
        self.session_mut(handle)?.connected = true;
        info!(
            "Simulated controller {} connected via {} at {} baud",
            handle, params.port, params.baud_rate
        );
        let persistence = self.persistence.as_ref();
        if let Some(session) = self.sessions.get_mut(&handle.raw()) {
            Self::restore_axes(persistence, session);
        }
        Ok(())
    }

    fn disconnect(&mut self, handle: ControllerHandle) -> Result<(), DriverError> {
        let session = self.session_mut(handle)?;
        let was_connected = session.connected;
        session.connected = false;
        let axes = session.axes.clone();

        if was_connected {
            if let Some(persistence) = &self.persistence {
                let state = PersistedState {
                    version: PersistedState::CURRENT_VERSION,
                    axes,
                };
                if let Err(e) = persistence.save(&state) {
                    warn!("Failed to save state: {}", e);
                }
            }
        }
        info!("Simulated controller {} disconnected", handle);
        Ok(())
    }

    fn set_command_timeouts(
        &mut self,
        handle: ControllerHandle,
        timeouts: CommandTimeouts,
    ) -> Result<(), DriverError> {
        self.session_mut(handle)?.timeouts = timeouts;
        Ok(())
    }

    fn set_show_command_list(
        &mut self,
        handle: ControllerHandle,
        visible: bool,
    ) -> Result<(), DriverError> {
        self.connected_mut(handle)?.show_command_list = visible;
        Ok(())
    }

    fn set_velocity(
        &mut self,
        handle: ControllerHandle,
        velocity: AxisVector,
    ) -> Result<(), DriverError> {
        self.connected_mut(handle)?.velocity = velocity;
        Ok(())
    }

    fn velocity(&mut self, handle: ControllerHandle) -> Result<AxisVector, DriverError> {
        Ok(self.connected_mut(handle)?.velocity)
    }

    fn send_command(
        &mut self,
        handle: ControllerHandle,
        command: &str,
        _max_len: i32,
        expect_line: bool,
        _timeout_ms: i32,
    ) -> Result<Option<i32>, DriverError> {
        self.connected_mut(handle)?;
        debug!("Simulated raw command {:?}", command);
        if !expect_line {
            // Transfer-only: the status reflects the transfer, not the
            // command, so nothing is read back.
            return Ok(None);
        }
        match command {
            "?ver" => Ok(Some(VERSION_RESPONSE)),
            "?status" => Ok(Some(0)),
            _ => Err(DriverError::Command(ERR_UNKNOWN_COMMAND)),
        }
    }

    fn calibrate(&mut self, handle: ControllerHandle) -> Result<(), DriverError> {
        let session = self.connected_mut(handle)?;
        for axis in &mut session.axes {
            axis.calibrate();
        }
        info!("Simulated calibrate complete, all axes re-zeroed");
        Ok(())
    }

    fn find_reference(&mut self, handle: ControllerHandle) -> Result<(), DriverError> {
        let session = self.connected_mut(handle)?;
        for axis in &mut session.axes {
            axis.reference();
        }
        info!("Simulated reference measure complete");
        Ok(())
    }

    fn position(&mut self, handle: ControllerHandle) -> Result<AxisVector, DriverError> {
        let session = self.connected_mut(handle)?;
        let mut position = AxisVector::ZERO;
        for (axis, sim) in Axis::ALL.iter().zip(&session.axes) {
            position.set(*axis, sim.reported());
        }
        // Axes beyond the configured count stay 0.0.
        Ok(position)
    }

    fn axis_position(
        &mut self,
        handle: ControllerHandle,
        axis: Axis,
    ) -> Result<f64, DriverError> {
        let session = self.connected_mut(handle)?;
        let index = (axis.index() - 1) as usize;
        session
            .axes
            .get(index)
            .map(|sim| sim.reported())
            .ok_or(DriverError::Command(ERR_AXIS_NOT_CONFIGURED))
    }

    fn set_position(
        &mut self,
        handle: ControllerHandle,
        position: AxisVector,
    ) -> Result<(), DriverError> {
        let session = self.connected_mut(handle)?;
        for (axis, sim) in Axis::ALL.iter().zip(&mut session.axes) {
            sim.rezero(position.get(*axis));
        }
        Ok(())
    }

    fn move_absolute(
        &mut self,
        handle: ControllerHandle,
        target: AxisVector,
        _wait: bool,
    ) -> Result<(), DriverError> {
        let session = self.connected_mut(handle)?;
        for (axis, sim) in Axis::ALL.iter().zip(&mut session.axes) {
            sim.move_to(target.get(*axis));
        }
        Ok(())
    }

    fn move_absolute_axis(
        &mut self,
        handle: ControllerHandle,
        axis: Axis,
        target: f64,
        _wait: bool,
    ) -> Result<(), DriverError> {
        let session = self.connected_mut(handle)?;
        let index = (axis.index() - 1) as usize;
        session
            .axes
            .get_mut(index)
            .map(|sim| sim.move_to(target))
            .ok_or(DriverError::Command(ERR_AXIS_NOT_CONFIGURED))
    }

    fn move_relative(
        &mut self,
        handle: ControllerHandle,
        offset: AxisVector,
        _wait: bool,
    ) -> Result<(), DriverError> {
        let session = self.connected_mut(handle)?;
        for (axis, sim) in Axis::ALL.iter().zip(&mut session.axes) {
            sim.move_by(offset.get(*axis));
        }
        Ok(())
    }

    fn move_relative_axis(
        &mut self,
        handle: ControllerHandle,
        axis: Axis,
        offset: f64,
        _wait: bool,
    ) -> Result<(), DriverError> {
        let session = self.connected_mut(handle)?;
        let index = (axis.index() - 1) as usize;
        session
            .axes
            .get_mut(index)
            .map(|sim| sim.move_by(offset))
            .ok_or(DriverError::Command(ERR_AXIS_NOT_CONFIGURED))
    }

    fn set_relative_distance(
        &mut self,
        handle: ControllerHandle,
        distance: AxisVector,
    ) -> Result<(), DriverError> {
        self.connected_mut(handle)?.distance = distance;
        Ok(())
    }

    fn repeat_relative_move(&mut self, handle: ControllerHandle) -> Result<(), DriverError> {
        let session = self.connected_mut(handle)?;
        let distance = session.distance;
        for (axis, sim) in Axis::ALL.iter().zip(&mut session.axes) {
            sim.move_by(distance.get(*axis));
        }
        Ok(())
    }

    fn relative_distance(
        &mut self,
        handle: ControllerHandle,
    ) -> Result<AxisVector, DriverError> {
        Ok(self.connected_mut(handle)?.distance)
    }

    fn stop_axes(&mut self, handle: ControllerHandle) -> Result<(), DriverError> {
        // Motion is instantaneous here, so there is never anything in
        // flight; the call still requires a live connection.
        self.connected_mut(handle)?;
        debug!("Simulated stop, no motion in flight");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected_driver() -> (SimulationDriver, ControllerHandle) {
        let mut driver = SimulationDriver::new();
        let handle = driver.create_handle().expect("handle");
        driver
            .connect_with(handle, &ConnectionParams::default())
            .expect("connect");
        (driver, handle)
    }

    #[test]
    fn handles_are_distinct() {
        let mut driver = SimulationDriver::new();
        let first = driver.create_handle().expect("first");
        let second = driver.create_handle().expect("second");
        assert_ne!(first, second);
    }

    #[test]
    fn unknown_handle_reports_vendor_code() {
        let mut driver = SimulationDriver::new();
        let bogus = ControllerHandle::new(77);
        let err = driver.connect_with(bogus, &ConnectionParams::default());
        assert!(matches!(err, Err(DriverError::Command(ERR_INVALID_HANDLE))));
    }

    #[test]
    fn motion_requires_connection() {
        let mut driver = SimulationDriver::new();
        let handle = driver.create_handle().expect("handle");
        let err = driver.move_absolute(handle, AxisVector::new(1.0, 0.0, 0.0, 0.0), true);
        assert!(matches!(err, Err(DriverError::Command(ERR_NOT_CONNECTED))));
    }

    #[test]
    fn plain_connect_needs_loaded_config() {
        let mut driver = SimulationDriver::new();
        let handle = driver.create_handle().expect("handle");
        let err = driver.connect(handle);
        assert!(matches!(err, Err(DriverError::Command(ERR_NO_CONFIG))));
    }

    #[test]
    fn plain_connect_after_load_and_apply() {
        let mut driver = SimulationDriver::new();
        let handle = driver.create_handle().expect("handle");

        let config = tempfile::NamedTempFile::new().expect("config file");
        driver.load_config(handle, config.path()).expect("load");
        driver.apply_config(handle).expect("apply");
        driver.connect(handle).expect("connect");
        assert_eq!(driver.position(handle).expect("pos"), AxisVector::ZERO);
    }

    #[test]
    fn load_config_missing_file() {
        let mut driver = SimulationDriver::new();
        let handle = driver.create_handle().expect("handle");
        let err = driver.load_config(handle, Path::new("/nonexistent/table.ini"));
        assert!(matches!(err, Err(DriverError::Command(ERR_NO_CONFIG))));
    }

    #[test]
    fn set_position_round_trips_negative_values() {
        let (mut driver, handle) = connected_driver();
        let frame = AxisVector::new(-5.0, 0.25, 12.0, -0.5);
        driver.set_position(handle, frame).expect("set");
        assert_eq!(driver.position(handle).expect("get"), frame);
    }

    #[test]
    fn single_axis_matches_vector() {
        let (mut driver, handle) = connected_driver();
        driver
            .move_absolute(handle, AxisVector::new(10.0, 20.0, 30.0, 40.0), true)
            .expect("move");
        let position = driver.position(handle).expect("pos");
        for axis in Axis::ALL {
            assert_eq!(
                driver.axis_position(handle, axis).expect("axis pos"),
                position.get(axis)
            );
        }
    }

    #[test]
    fn unconfigured_axis_reports_vendor_code() {
        let mut driver = SimulationDriver::new().with_axis_count(2);
        let handle = driver.create_handle().expect("handle");
        driver
            .connect_with(handle, &ConnectionParams::default())
            .expect("connect");

        // Full-vector query reports zero for absent axes.
        driver
            .move_absolute(handle, AxisVector::new(5.0, 6.0, 7.0, 8.0), true)
            .expect("move");
        let position = driver.position(handle).expect("pos");
        assert_eq!(position.z, 0.0);
        assert_eq!(position.a, 0.0);

        // Single-axis query reports the controller's code.
        let err = driver.axis_position(handle, Axis::Z);
        assert!(matches!(
            err,
            Err(DriverError::Command(ERR_AXIS_NOT_CONFIGURED))
        ));
    }

    #[test]
    fn stored_distance_equals_direct_relative_move() {
        let (mut driver, handle) = connected_driver();
        let start = AxisVector::new(50.0, 50.0, 50.0, 50.0);
        let step = AxisVector::new(1.5, -2.0, 0.0, 3.0);

        driver.move_absolute(handle, start, true).expect("move");
        driver.move_relative(handle, step, true).expect("rel");
        let direct = driver.position(handle).expect("pos");

        driver.move_absolute(handle, start, true).expect("move back");
        driver.set_relative_distance(handle, step).expect("set dist");
        assert_eq!(driver.relative_distance(handle).expect("get dist"), step);
        driver.repeat_relative_move(handle).expect("repeat");
        assert_eq!(driver.position(handle).expect("pos"), direct);
    }

    #[test]
    fn calibrate_rezeros_everything() {
        let (mut driver, handle) = connected_driver();
        driver
            .move_absolute(handle, AxisVector::new(12.0, 34.0, 56.0, 78.0), true)
            .expect("move");
        driver
            .set_position(handle, AxisVector::new(1.0, 1.0, 1.0, 1.0))
            .expect("shift frame");
        driver.calibrate(handle).expect("calibrate");
        assert_eq!(driver.position(handle).expect("pos"), AxisVector::ZERO);
    }

    #[test]
    fn reference_reaches_upper_travel() {
        let (mut driver, handle) = connected_driver();
        driver.calibrate(handle).expect("calibrate");
        driver.find_reference(handle).expect("reference");
        let position = driver.position(handle).expect("pos");
        assert_eq!(
            position,
            AxisVector::new(200.0, 200.0, 200.0, 200.0),
            "upper limit in the calibrated frame is the full travel range"
        );
    }

    #[test]
    fn raw_command_contract() {
        let (mut driver, handle) = connected_driver();
        assert_eq!(
            driver.send_command(handle, "?ver", 64, true, 100).unwrap(),
            Some(VERSION_RESPONSE)
        );
        // Without an expected line nothing is read back, even for
        // commands the controller does not know.
        assert_eq!(
            driver.send_command(handle, "!nop", 64, false, 100).unwrap(),
            None
        );
        let err = driver.send_command(handle, "?bogus", 64, true, 100);
        assert!(matches!(
            err,
            Err(DriverError::Command(ERR_UNKNOWN_COMMAND))
        ));
    }

    #[test]
    fn state_persists_across_driver_instances() {
        let dir = tempfile::tempdir().expect("temp dir");
        let state_file = dir.path().join("controller.state");
        let target = AxisVector::new(33.0, 44.0, 55.0, 66.0);

        let mut first = SimulationDriver::new().with_state_file(&state_file);
        let handle = first.create_handle().expect("handle");
        first
            .connect_with(handle, &ConnectionParams::default())
            .expect("connect");
        first.move_absolute(handle, target, true).expect("move");
        first.disconnect(handle).expect("disconnect");

        let mut second = SimulationDriver::new().with_state_file(&state_file);
        let handle = second.create_handle().expect("handle");
        second
            .connect_with(handle, &ConnectionParams::default())
            .expect("connect");
        assert_eq!(second.position(handle).expect("pos"), target);
    }
}
