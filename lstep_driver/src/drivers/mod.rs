//! Driver implementations.
//!
//! - [`native`] - FFI binding to the vendor shared library
//! - [`simulation`] - In-process substitute for development and testing

pub mod native;
pub mod simulation;
