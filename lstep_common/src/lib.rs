//! LSTEP Common Library
//!
//! This crate provides the shared types and configuration loading utilities
//! for the LSTEP driver workspace. The driver implementations live in
//! `lstep_driver`; everything they agree on — axis addressing, the
//! controller handle, connection parameters, the `ControllerDriver` trait —
//! is defined here.
//!
//! # Module Structure
//!
//! - [`consts`] - Axis counts, default connection parameters, status codes
//! - [`types`] - Axis addressing, four-axis vectors, handles, parameters
//! - [`config`] - TOML configuration loading and validation
//! - [`driver`] - The `ControllerDriver` trait and driver error types

pub mod config;
pub mod consts;
pub mod driver;
pub mod types;
