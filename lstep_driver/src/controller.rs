//! Stateful controller session.
//!
//! `Controller` owns one handle for its lifetime, auto-connects from a
//! [`ControllerConfig`] at construction, and keeps a cached copy of the
//! four-axis position vector so per-axis reads cost nothing.
//!
//! # Position cache
//!
//! The cache is seeded by a query at connect time and refreshed after every
//! motion-inducing operation: [`calibrate`](Controller::calibrate),
//! [`find_reference`](Controller::find_reference), the four move methods
//! and [`repeat_relative_move`](Controller::repeat_relative_move). Pure
//! queries and [`set_position`](Controller::set_position) leave it alone;
//! after redefining the frame, or after a `wait = false` move has finished
//! on the hardware, call [`refresh_position`](Controller::refresh_position)
//! to resynchronize. After a `wait = true` move the cache always equals
//! what a fresh query would return.
//!
//! # Call model
//!
//! Every method is a synchronous, blocking native call; no locking is
//! added. Invoking [`stop_axes`](Controller::stop_axes) from a second
//! thread while a blocking move is in flight is only safe if the vendor
//! library tolerates concurrent access — that is the caller's
//! responsibility, not this type's.

use lstep_common::config::ControllerConfig;
use lstep_common::driver::{ControllerDriver, DriverError};
use lstep_common::types::{Axis, AxisVector, CommandTimeouts, ControllerHandle};
use tracing::{debug, info, warn};

/// One connected controller session with a cached position vector.
pub struct Controller {
    /// Backend performing the actual calls
    driver: Box<dyn ControllerDriver>,
    /// Handle owned by this session
    handle: ControllerHandle,
    /// Last position observed after connect or a motion operation
    position: AxisVector,
    /// Whether `disconnect` still has to run
    connected: bool,
}

impl Controller {
    /// Connect a controller session through the given driver.
    ///
    /// Runs the full bring-up sequence: allocate a handle, forward and
    /// apply the vendor configuration file if one is configured, connect
    /// (with explicit parameters when `config.connection` is given, from
    /// the vendor configuration otherwise), hand over the command
    /// timeouts, apply the optional velocity and command-list-window
    /// settings, and seed the position cache with a first query.
    pub fn connect(
        mut driver: Box<dyn ControllerDriver>,
        config: &ControllerConfig,
    ) -> Result<Self, DriverError> {
        let handle = driver.create_handle()?;

        if let Some(vendor_config) = &config.vendor_config {
            driver.load_config(handle, vendor_config)?;
            driver.apply_config(handle)?;
        }

        match &config.connection {
            Some(params) => driver.connect_with(handle, params)?,
            None => driver.connect(handle)?,
        }

        driver.set_command_timeouts(handle, config.timeouts)?;
        if let Some(velocity) = config.velocity {
            driver.set_velocity(handle, velocity)?;
        }
        if config.show_command_list {
            driver.set_show_command_list(handle, true)?;
        }

        let position = driver.position(handle)?;
        info!(
            "Controller session up (driver {}, handle {}), position {}",
            driver.name(),
            handle,
            position
        );

        Ok(Self {
            driver,
            handle,
            position,
            connected: true,
        })
    }

    /// Handle owned by this session.
    pub fn handle(&self) -> ControllerHandle {
        self.handle
    }

    /// Name of the backing driver.
    pub fn driver_name(&self) -> &'static str {
        self.driver.name()
    }

    /// Cached position vector. No native round-trip.
    pub fn position(&self) -> AxisVector {
        self.position
    }

    /// Cached position of one axis. No native round-trip.
    pub fn axis_position(&self, axis: Axis) -> f64 {
        self.position.get(axis)
    }

    /// Query the controller and refresh the cache.
    pub fn refresh_position(&mut self) -> Result<AxisVector, DriverError> {
        self.position = self.driver.position(self.handle)?;
        Ok(self.position)
    }

    // ─── Configuration ──────────────────────────────────────────────────

    /// Configure the vendor-side command timeouts.
    pub fn set_command_timeouts(&mut self, timeouts: CommandTimeouts) -> Result<(), DriverError> {
        self.driver.set_command_timeouts(self.handle, timeouts)
    }

    /// Show or hide the vendor command-list window.
    pub fn set_show_command_list(&mut self, visible: bool) -> Result<(), DriverError> {
        self.driver.set_show_command_list(self.handle, visible)
    }

    /// Set per-axis velocities.
    pub fn set_velocity(&mut self, velocity: AxisVector) -> Result<(), DriverError> {
        self.driver.set_velocity(self.handle, velocity)
    }

    /// Read back the per-axis velocities.
    pub fn velocity(&mut self) -> Result<AxisVector, DriverError> {
        self.driver.velocity(self.handle)
    }

    // ─── Raw command passthrough ────────────────────────────────────────

    /// Send a free-form command string; `Some(response)` iff `expect_line`.
    pub fn send_command(
        &mut self,
        command: &str,
        max_len: i32,
        expect_line: bool,
        timeout_ms: i32,
    ) -> Result<Option<i32>, DriverError> {
        self.driver
            .send_command(self.handle, command, max_len, expect_line, timeout_ms)
    }

    // ─── Calibration / reference ────────────────────────────────────────

    /// Calibrate all axes (lower limit switches, re-zero), then refresh
    /// the position cache.
    pub fn calibrate(&mut self) -> Result<(), DriverError> {
        self.driver.calibrate(self.handle)?;
        self.refresh_position()?;
        Ok(())
    }

    /// Measure the reference position (upper limit switches), then refresh
    /// the position cache.
    pub fn find_reference(&mut self) -> Result<(), DriverError> {
        self.driver.find_reference(self.handle)?;
        self.refresh_position()?;
        Ok(())
    }

    // ─── Position set ───────────────────────────────────────────────────

    /// Redefine the current location as `position`, shifting the origin of
    /// the coordinate frame. This is not a move, and it deliberately does
    /// not touch the cache — call
    /// [`refresh_position`](Self::refresh_position) afterwards if the
    /// cached value is needed in the new frame.
    pub fn set_position(&mut self, position: AxisVector) -> Result<(), DriverError> {
        self.driver.set_position(self.handle, position)
    }

    // ─── Motion ─────────────────────────────────────────────────────────

    /// Move all axes to absolute coordinates, then refresh the cache.
    ///
    /// With `wait = false` the refreshed value is the position at
    /// call-return time, not necessarily the final resting position.
    pub fn move_absolute(&mut self, target: AxisVector, wait: bool) -> Result<(), DriverError> {
        self.driver.move_absolute(self.handle, target, wait)?;
        self.refresh_position()?;
        Ok(())
    }

    /// Move one axis to an absolute coordinate, then refresh the cache.
    pub fn move_absolute_axis(
        &mut self,
        axis: Axis,
        target: f64,
        wait: bool,
    ) -> Result<(), DriverError> {
        self.driver
            .move_absolute_axis(self.handle, axis, target, wait)?;
        self.refresh_position()?;
        Ok(())
    }

    /// Move all axes by a relative offset, then refresh the cache.
    pub fn move_relative(&mut self, offset: AxisVector, wait: bool) -> Result<(), DriverError> {
        self.driver.move_relative(self.handle, offset, wait)?;
        self.refresh_position()?;
        Ok(())
    }

    /// Move one axis by a relative offset, then refresh the cache.
    pub fn move_relative_axis(
        &mut self,
        axis: Axis,
        offset: f64,
        wait: bool,
    ) -> Result<(), DriverError> {
        self.driver
            .move_relative_axis(self.handle, axis, offset, wait)?;
        self.refresh_position()?;
        Ok(())
    }

    /// Store a relative displacement for repeated moves.
    pub fn set_relative_distance(&mut self, distance: AxisVector) -> Result<(), DriverError> {
        self.driver.set_relative_distance(self.handle, distance)
    }

    /// Re-issue the stored relative displacement, then refresh the cache.
    pub fn repeat_relative_move(&mut self) -> Result<(), DriverError> {
        self.driver.repeat_relative_move(self.handle)?;
        self.refresh_position()?;
        Ok(())
    }

    /// Read back the stored relative displacement.
    pub fn relative_distance(&mut self) -> Result<AxisVector, DriverError> {
        self.driver.relative_distance(self.handle)
    }

    /// Interrupt any in-flight motion. Does not refresh the cache; the
    /// axes may still be decelerating when this returns.
    pub fn stop_axes(&mut self) -> Result<(), DriverError> {
        self.driver.stop_axes(self.handle)
    }

    // ─── Teardown ───────────────────────────────────────────────────────

    /// Disconnect from the controller. Idempotent; the handle is not
    /// reused afterwards.
    pub fn disconnect(&mut self) -> Result<(), DriverError> {
        if self.connected {
            self.driver.disconnect(self.handle)?;
            self.connected = false;
            debug!("Controller session {} closed", self.handle);
        }
        Ok(())
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        if self.connected {
            if let Err(e) = self.driver.disconnect(self.handle) {
                warn!("Disconnect during drop failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulation::SimulationDriver;
    use lstep_common::types::ConnectionParams;

    fn sim_config() -> ControllerConfig {
        ControllerConfig {
            driver: "simulation".to_string(),
            connection: Some(ConnectionParams::default()),
            ..ControllerConfig::default()
        }
    }

    fn connect_sim() -> Controller {
        Controller::connect(Box::new(SimulationDriver::new()), &sim_config())
            .expect("connect simulated controller")
    }

    #[test]
    fn connect_seeds_position_cache() {
        let controller = connect_sim();
        assert_eq!(controller.position(), AxisVector::ZERO);
    }

    #[test]
    fn connect_applies_velocity_from_config() {
        let mut config = sim_config();
        config.velocity = Some(AxisVector::new(2.0, 4.0, 6.0, 8.0));
        let mut controller = Controller::connect(Box::new(SimulationDriver::new()), &config)
            .expect("connect");
        assert_eq!(
            controller.velocity().expect("velocity"),
            AxisVector::new(2.0, 4.0, 6.0, 8.0)
        );
    }

    #[test]
    fn set_position_leaves_cache_until_refresh() {
        let mut controller = connect_sim();
        controller
            .set_position(AxisVector::new(5.0, 5.0, 5.0, 5.0))
            .expect("set position");

        // Documented contract: the cache still holds the pre-set value.
        assert_eq!(controller.position(), AxisVector::ZERO);

        let refreshed = controller.refresh_position().expect("refresh");
        assert_eq!(refreshed, AxisVector::new(5.0, 5.0, 5.0, 5.0));
        assert_eq!(controller.position(), refreshed);
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mut controller = connect_sim();
        controller.disconnect().expect("first disconnect");
        controller.disconnect().expect("second disconnect");
    }

    #[test]
    fn motion_error_leaves_cache_intact() {
        let driver = SimulationDriver::new().with_axis_count(2);
        let mut controller =
            Controller::connect(Box::new(driver), &sim_config()).expect("connect");
        controller
            .move_absolute(AxisVector::new(3.0, 4.0, 0.0, 0.0), true)
            .expect("move");

        let before = controller.position();
        let err = controller.move_absolute_axis(Axis::A, 10.0, true);
        assert!(err.is_err());
        assert_eq!(controller.position(), before);
    }
}
