//! # LSTEP Control CLI
//!
//! Command-line control for LSTEP axis-positioning controllers.
//!
//! # Usage
//!
//! ```bash
//! # Print the current position (simulation driver)
//! lstep_ctl --config controller.toml -s status
//!
//! # Calibrate, then move to absolute coordinates
//! lstep_ctl --config controller.toml calibrate
//! lstep_ctl --config controller.toml move-abs --x 10.0 --y 5.0
//!
//! # Issue a non-blocking move and watch the position until Ctrl-C
//! lstep_ctl --config controller.toml move-abs --x 90 --no-wait
//! lstep_ctl --config controller.toml status --watch
//!
//! # Raw command passthrough
//! lstep_ctl --config controller.toml send "?ver" --expect-line
//! ```

use clap::{Parser, Subcommand};
use lstep_common::config::{ConfigError, ControllerConfig};
use lstep_common::consts::DEFAULT_CONFIG_PATH;
use lstep_common::types::{Axis, AxisVector};
use lstep_driver::{Controller, DriverRegistry};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// LSTEP control - command-line client for LSTEP positioning controllers
#[derive(Parser, Debug)]
#[command(name = "lstep_ctl")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Command-line control for LSTEP axis-positioning controllers")]
#[command(long_about = None)]
struct Args {
    /// Path to controller configuration file (controller.toml)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Force the simulation driver (ignores the configured driver)
    #[arg(short = 's', long)]
    simulate: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current position and velocities
    Status {
        /// Poll and print the position until interrupted (Ctrl-C stops
        /// the axes before exiting)
        #[arg(long)]
        watch: bool,

        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },

    /// Drive all axes to their lower limit switch and re-zero there
    Calibrate,

    /// Drive all axes to their upper limit switch (no re-zero)
    Reference,

    /// Move all axes to absolute coordinates
    MoveAbs {
        /// Target X coordinate
        #[arg(long, default_value_t = 0.0)]
        x: f64,
        /// Target Y coordinate
        #[arg(long, default_value_t = 0.0)]
        y: f64,
        /// Target Z coordinate
        #[arg(long, default_value_t = 0.0)]
        z: f64,
        /// Target A coordinate
        #[arg(long, default_value_t = 0.0)]
        a: f64,
        /// Return once motion is issued instead of waiting for completion
        #[arg(long)]
        no_wait: bool,
    },

    /// Move all axes by a relative offset
    MoveRel {
        /// X offset
        #[arg(long, default_value_t = 0.0)]
        x: f64,
        /// Y offset
        #[arg(long, default_value_t = 0.0)]
        y: f64,
        /// Z offset
        #[arg(long, default_value_t = 0.0)]
        z: f64,
        /// A offset
        #[arg(long, default_value_t = 0.0)]
        a: f64,
        /// Return once motion is issued instead of waiting for completion
        #[arg(long)]
        no_wait: bool,
    },

    /// Move a single axis
    MoveAxis {
        /// Axis to move (x, y, z or a)
        #[arg(value_parser = parse_axis)]
        axis: Axis,
        /// Target coordinate (or offset with --relative)
        value: f64,
        /// Treat the value as an offset from the current position
        #[arg(long)]
        relative: bool,
        /// Return once motion is issued instead of waiting for completion
        #[arg(long)]
        no_wait: bool,
    },

    /// Stop all axes immediately
    Stop,

    /// Send a raw command string to the controller
    Send {
        /// Command text to forward
        command: String,
        /// Read back an integer response line
        #[arg(long)]
        expect_line: bool,
        /// Maximum response length accepted by the controller
        #[arg(long, default_value_t = 64)]
        max_len: i32,
        /// Response timeout in milliseconds
        #[arg(long, default_value_t = 1000)]
        timeout_ms: i32,
    },
}

/// Axis names accepted on the command line.
fn parse_axis(value: &str) -> Result<Axis, String> {
    match value.to_ascii_lowercase().as_str() {
        "x" | "1" => Ok(Axis::X),
        "y" | "2" => Ok(Axis::Y),
        "z" | "3" => Ok(Axis::Z),
        "a" | "4" => Ok(Axis::A),
        other => Err(format!("unknown axis '{other}' (expected x, y, z or a)")),
    }
}

/// Status snapshot for `status --json`.
#[derive(Debug, Serialize)]
struct StatusReport {
    driver: String,
    position: AxisVector,
    velocity: AxisVector,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("lstep_ctl failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    setup_tracing(&args);

    let config = load_controller_config(&args)?;
    let driver_name = if args.simulate {
        info!("Simulation mode enabled");
        "simulation".to_string()
    } else {
        config.driver.clone()
    };

    let registry = DriverRegistry::with_default_drivers();
    let driver = registry.create_driver(&driver_name, &config)?;
    let mut controller = Controller::connect(driver, &config)?;

    match args.command {
        Command::Status { watch, json } => {
            if watch {
                watch_position(&mut controller)?;
            } else {
                print_status(&mut controller, json)?;
            }
        }
        Command::Calibrate => {
            controller.calibrate()?;
            println!("calibrated, position {}", controller.position());
        }
        Command::Reference => {
            controller.find_reference()?;
            println!("reference measured, position {}", controller.position());
        }
        Command::MoveAbs { x, y, z, a, no_wait } => {
            controller.move_absolute(AxisVector::new(x, y, z, a), !no_wait)?;
            println!("position {}", controller.position());
        }
        Command::MoveRel { x, y, z, a, no_wait } => {
            controller.move_relative(AxisVector::new(x, y, z, a), !no_wait)?;
            println!("position {}", controller.position());
        }
        Command::MoveAxis {
            axis,
            value,
            relative,
            no_wait,
        } => {
            if relative {
                controller.move_relative_axis(axis, value, !no_wait)?;
            } else {
                controller.move_absolute_axis(axis, value, !no_wait)?;
            }
            println!("position {}", controller.position());
        }
        Command::Stop => {
            controller.stop_axes()?;
            println!("stopped, position {}", controller.refresh_position()?);
        }
        Command::Send {
            command,
            expect_line,
            max_len,
            timeout_ms,
        } => {
            match controller.send_command(&command, max_len, expect_line, timeout_ms)? {
                Some(response) => println!("response {}", response),
                None => println!("sent"),
            }
        }
    }

    controller.disconnect()?;
    Ok(())
}

/// Load the controller configuration. With `--simulate`, a missing file
/// falls back to defaults so the simulated controller works out of the box.
fn load_controller_config(args: &Args) -> Result<ControllerConfig, ConfigError> {
    match ControllerConfig::load(&args.config) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound) if args.simulate => {
            warn!(
                "No configuration at {:?}, using defaults for simulation",
                args.config
            );
            Ok(ControllerConfig::default())
        }
        Err(e) => Err(e),
    }
}

/// Print a one-shot status snapshot.
fn print_status(
    controller: &mut Controller,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let position = controller.refresh_position()?;
    let velocity = controller.velocity()?;
    if json {
        let report = StatusReport {
            driver: controller.driver_name().to_string(),
            position,
            velocity,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("driver   {}", controller.driver_name());
        println!("position {}", position);
        println!("velocity {}", velocity);
    }
    Ok(())
}

/// Poll and print the position until Ctrl-C, then stop the axes.
fn watch_position(controller: &mut Controller) -> Result<(), Box<dyn std::error::Error>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || {
        info!("Received interrupt");
        flag.store(false, Ordering::SeqCst);
    })?;

    while running.load(Ordering::SeqCst) {
        println!("{}", controller.refresh_position()?);
        std::thread::sleep(Duration::from_millis(250));
    }

    // Stopping is safe even when nothing is moving.
    controller.stop_axes()?;
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
