//! # LSTEP Driver Library
//!
//! Driver for LSTEP axis-positioning controllers with a pluggable backend
//! architecture. Backends implement the `ControllerDriver` trait defined in
//! `lstep_common::driver`.
//!
//! # Module Structure
//!
//! - [`controller`] - Stateful controller session with cached position
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Driver implementations (native FFI, simulation)
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                  lstep_driver (single crate)                  │
//! │  ┌──────────────┐    ┌──────────────┐    ┌─────────────────┐  │
//! │  │  Controller  │───►│  Driver      │───►│ ControllerDriver│  │
//! │  │  (session +  │    │  Registry    │    │ trait object    │  │
//! │  │   cache)     │    └──────────────┘    └────────┬────────┘  │
//! │  └──────────────┘                                 │           │
//! │                        ┌──────────────────────────┴───────┐   │
//! │                        ▼                                  ▼   │
//! │              ┌──────────────────┐            ┌──────────────┐ │
//! │              │  NativeDriver    │            │ Simulation   │ │
//! │              │  (vendor library │            │ Driver       │ │
//! │              │   via dlopen)    │            │ (in-process) │ │
//! │              └──────────────────┘            └──────────────┘ │
//! └───────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod controller;
pub mod driver_registry;
pub mod drivers;

// Re-export key types for convenience
pub use crate::controller::Controller;
pub use crate::driver_registry::DriverRegistry;
pub use crate::drivers::native::NativeDriver;
pub use crate::drivers::simulation::SimulationDriver;
