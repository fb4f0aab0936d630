//! Controller integration tests.
//!
//! Exercises the full session layer (bring-up, position cache, motion,
//! raw commands, error propagation) against the simulation driver, which
//! implements the same entry-point surface as the vendor library.

use lstep_common::config::ControllerConfig;
use lstep_common::driver::DriverError;
use lstep_common::types::{Axis, AxisVector, ConnectionParams};
use lstep_driver::drivers::simulation::{ERR_AXIS_NOT_CONFIGURED, VERSION_RESPONSE};
use lstep_driver::{Controller, DriverRegistry, SimulationDriver};

/// Helper: configuration selecting the simulation driver with explicit
/// connection parameters.
fn sim_config() -> ControllerConfig {
    ControllerConfig {
        driver: "simulation".to_string(),
        connection: Some(ConnectionParams::default()),
        ..ControllerConfig::default()
    }
}

/// Helper: connected controller over a fresh simulated backend.
fn connect_sim() -> Controller {
    Controller::connect(Box::new(SimulationDriver::new()), &sim_config())
        .expect("connect simulated controller")
}

#[test]
fn set_position_round_trips() {
    let mut controller = connect_sim();

    for frame in [
        AxisVector::new(1.0, 2.0, 3.0, 4.0),
        AxisVector::new(-10.0, 0.0, 0.125, -0.25),
        AxisVector::ZERO,
    ] {
        controller.set_position(frame).expect("set position");
        let read_back = controller.refresh_position().expect("refresh");
        assert_eq!(read_back, frame);
    }
}

#[test]
fn axis_position_matches_vector_components() {
    let mut controller = connect_sim();
    controller
        .move_absolute(AxisVector::new(10.0, 20.0, 30.0, 40.0), true)
        .expect("move");

    let position = controller.position();
    for axis in Axis::ALL {
        assert_eq!(controller.axis_position(axis), position.get(axis));
    }
}

#[test]
fn stored_distance_matches_single_relative_move() {
    let mut controller = connect_sim();
    let start = AxisVector::new(50.0, 50.0, 50.0, 50.0);
    let step = AxisVector::new(2.5, -1.0, 0.0, 4.0);

    controller.move_absolute(start, true).expect("move to start");
    controller.move_relative(step, true).expect("direct move");
    let direct = controller.position();

    controller.move_absolute(start, true).expect("back to start");
    controller.set_relative_distance(step).expect("set distance");
    assert_eq!(
        controller.relative_distance().expect("read distance"),
        step
    );
    controller.repeat_relative_move().expect("repeat");
    assert_eq!(controller.position(), direct);
}

#[test]
fn repeat_relative_move_accumulates() {
    let mut controller = connect_sim();
    controller
        .move_absolute(AxisVector::new(10.0, 10.0, 10.0, 10.0), true)
        .expect("move to start");
    controller
        .set_relative_distance(AxisVector::new(5.0, 0.0, 0.0, 0.0))
        .expect("set distance");

    controller.repeat_relative_move().expect("first repeat");
    controller.repeat_relative_move().expect("second repeat");
    controller.repeat_relative_move().expect("third repeat");

    assert_eq!(
        controller.position(),
        AxisVector::new(25.0, 10.0, 10.0, 10.0)
    );
}

#[test]
fn cache_equals_fresh_query_after_blocking_motion() {
    let mut controller = connect_sim();

    controller
        .move_absolute(AxisVector::new(12.0, 7.0, 3.0, 1.0), true)
        .expect("absolute move");
    assert_eq!(
        controller.position(),
        controller.refresh_position().expect("fresh query")
    );

    controller
        .move_relative_axis(Axis::Y, -2.5, true)
        .expect("relative axis move");
    assert_eq!(
        controller.position(),
        controller.refresh_position().expect("fresh query")
    );

    controller.find_reference().expect("reference");
    assert_eq!(
        controller.position(),
        controller.refresh_position().expect("fresh query")
    );
}

#[test]
fn calibrate_rezeros_all_axes() {
    let mut controller = connect_sim();

    controller
        .move_absolute(AxisVector::new(90.0, 80.0, 70.0, 60.0), true)
        .expect("move somewhere");
    controller
        .set_position(AxisVector::new(-3.0, 14.0, 0.0, 2.0))
        .expect("shift the frame");

    controller.calibrate().expect("calibrate");
    assert_eq!(controller.position(), AxisVector::ZERO);
    assert_eq!(
        controller.refresh_position().expect("fresh query"),
        AxisVector::ZERO
    );
}

#[test]
fn worked_example_absolute_then_relative() {
    let mut controller = connect_sim();
    controller.calibrate().expect("start at zero");

    controller
        .move_absolute(AxisVector::new(10.0, 5.0, 0.0, 0.0), true)
        .expect("absolute move");
    assert_eq!(controller.position(), AxisVector::new(10.0, 5.0, 0.0, 0.0));

    controller
        .move_relative(AxisVector::new(-2.0, 0.0, 0.0, 0.0), true)
        .expect("relative move");
    assert_eq!(controller.position(), AxisVector::new(8.0, 5.0, 0.0, 0.0));
}

#[test]
fn native_status_codes_propagate_unchanged() {
    let driver = SimulationDriver::new().with_axis_count(2);
    let mut controller =
        Controller::connect(Box::new(driver), &sim_config()).expect("connect");

    let err = controller
        .move_absolute_axis(Axis::A, 1.0, true)
        .expect_err("axis A is not configured");
    match err {
        DriverError::Command(code) => assert_eq!(code, ERR_AXIS_NOT_CONFIGURED),
        other => panic!("expected a controller status code, got {other:?}"),
    }
    assert_eq!(err.status_code(), Some(ERR_AXIS_NOT_CONFIGURED));
}

#[test]
fn raw_command_response_gated_on_expect_line() {
    let mut controller = connect_sim();
    assert_eq!(
        controller
            .send_command("?ver", 64, true, 1000)
            .expect("version query"),
        Some(VERSION_RESPONSE)
    );
    assert_eq!(
        controller
            .send_command("!nop", 64, false, 1000)
            .expect("fire and forget"),
        None
    );
}

#[test]
fn registry_builds_working_session() {
    let registry = DriverRegistry::with_default_drivers();
    let config = sim_config();
    let driver = registry
        .create_driver("simulation", &config)
        .expect("create driver");
    let mut controller = Controller::connect(driver, &config).expect("connect");
    controller
        .move_absolute(AxisVector::new(1.0, 1.0, 1.0, 1.0), true)
        .expect("move");
    assert_eq!(controller.position(), AxisVector::new(1.0, 1.0, 1.0, 1.0));
}

#[test]
fn position_survives_reconnect_with_state_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let state_file = dir.path().join("controller.state");
    let parked = AxisVector::new(42.0, 17.0, 5.0, 0.5);

    let mut config = sim_config();
    config.state_file = Some(state_file);

    let registry = DriverRegistry::with_default_drivers();

    {
        let driver = registry
            .create_driver("simulation", &config)
            .expect("create driver");
        let mut controller = Controller::connect(driver, &config).expect("connect");
        controller.move_absolute(parked, true).expect("move");
        controller.disconnect().expect("disconnect");
    }

    let driver = registry
        .create_driver("simulation", &config)
        .expect("create driver again");
    let controller = Controller::connect(driver, &config).expect("reconnect");
    assert_eq!(controller.position(), parked);
}

#[test]
fn vendor_config_bring_up_sequence() {
    // Plain connect (no explicit connection parameters) requires a loaded
    // vendor configuration file.
    let vendor_config = tempfile::NamedTempFile::new().expect("vendor config");

    let config = ControllerConfig {
        driver: "simulation".to_string(),
        connection: None,
        vendor_config: Some(vendor_config.path().to_path_buf()),
        ..ControllerConfig::default()
    };

    let mut controller =
        Controller::connect(Box::new(SimulationDriver::new()), &config).expect("connect");
    controller.calibrate().expect("calibrate");
    assert_eq!(controller.position(), AxisVector::ZERO);
}
