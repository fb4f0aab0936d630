//! Native driver: FFI binding to the vendor controller library.
//!
//! Loads the `lstep64` shared library by path, resolves every exported
//! entry point by exact name at load time, and marshals all arguments
//! across the boundary. The binary contract (parameter layout, byte widths,
//! text encoding) is fixed by the vendor header and pinned in
//! [`symbols`].

mod driver;
mod symbols;

pub use driver::NativeDriver;
