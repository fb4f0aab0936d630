//! Entry-point table for the vendor controller library.
//!
//! Every exported `LSX_*` function is resolved once at load time into a
//! plain function pointer. The pointers stay valid for as long as the
//! `Library` they were resolved from is alive; `NativeDriver` owns both.
//!
//! Conventions fixed by the vendor header:
//! - `extern "system"` calling convention (stdcall on 32-bit Windows,
//!   C everywhere else)
//! - status code as the return value, `0` = success
//! - outputs written through caller-supplied pointers
//! - `BOOL` is a 4-byte integer, `0`/`1`
//! - text as NUL-terminated 8-bit strings

use libc::{c_char, c_double, c_int};
use libloading::{Library, Symbol};
use lstep_common::driver::DriverError;
use static_assertions::const_assert_eq;
use std::mem::size_of;

/// Status code returned by every entry point.
pub(crate) type LsxStatus = c_int;

/// Vendor `BOOL`: a 4-byte integer, not a 1-byte C `bool`.
pub(crate) type LsxBool = c_int;

// Byte widths the wire contract assumes.
const_assert_eq!(size_of::<LsxBool>(), 4);
const_assert_eq!(size_of::<c_int>(), 4);
const_assert_eq!(size_of::<c_double>(), 8);

/// Resolved entry points of the vendor library.
#[allow(clippy::type_complexity)]
pub(crate) struct EntryPoints {
    pub create_lsid: unsafe extern "system" fn(*mut c_int) -> LsxStatus,
    pub load_config: unsafe extern "system" fn(c_int, *const c_char) -> LsxStatus,
    pub set_control_pars: unsafe extern "system" fn(c_int) -> LsxStatus,
    pub connect: unsafe extern "system" fn(c_int) -> LsxStatus,
    pub connect_simple:
        unsafe extern "system" fn(c_int, c_int, *const c_char, c_int, LsxBool) -> LsxStatus,
    pub disconnect: unsafe extern "system" fn(c_int) -> LsxStatus,
    pub set_command_timeout: unsafe extern "system" fn(c_int, c_int, c_int, c_int) -> LsxStatus,
    pub send_string: unsafe extern "system" fn(
        c_int,
        *const c_char,
        *mut c_int,
        c_int,
        LsxBool,
        c_int,
    ) -> LsxStatus,
    pub set_show_cmd_list: unsafe extern "system" fn(c_int, LsxBool) -> LsxStatus,
    pub calibrate: unsafe extern "system" fn(c_int) -> LsxStatus,
    pub rmeasure: unsafe extern "system" fn(c_int) -> LsxStatus,
    pub get_pos: unsafe extern "system" fn(
        c_int,
        *mut c_double,
        *mut c_double,
        *mut c_double,
        *mut c_double,
    ) -> LsxStatus,
    pub get_pos_single_axis: unsafe extern "system" fn(c_int, c_int, *mut c_double) -> LsxStatus,
    pub set_pos:
        unsafe extern "system" fn(c_int, c_double, c_double, c_double, c_double) -> LsxStatus,
    pub move_abs: unsafe extern "system" fn(
        c_int,
        c_double,
        c_double,
        c_double,
        c_double,
        LsxBool,
    ) -> LsxStatus,
    pub move_abs_single_axis:
        unsafe extern "system" fn(c_int, c_int, c_double, LsxBool) -> LsxStatus,
    pub move_rel: unsafe extern "system" fn(
        c_int,
        c_double,
        c_double,
        c_double,
        c_double,
        LsxBool,
    ) -> LsxStatus,
    pub move_rel_single_axis:
        unsafe extern "system" fn(c_int, c_int, c_double, LsxBool) -> LsxStatus,
    pub set_distance:
        unsafe extern "system" fn(c_int, c_double, c_double, c_double, c_double) -> LsxStatus,
    pub move_rel_short: unsafe extern "system" fn(c_int) -> LsxStatus,
    pub get_distance: unsafe extern "system" fn(
        c_int,
        *mut c_double,
        *mut c_double,
        *mut c_double,
        *mut c_double,
    ) -> LsxStatus,
    pub set_vel:
        unsafe extern "system" fn(c_int, c_double, c_double, c_double, c_double) -> LsxStatus,
    pub get_vel: unsafe extern "system" fn(
        c_int,
        *mut c_double,
        *mut c_double,
        *mut c_double,
        *mut c_double,
    ) -> LsxStatus,
    pub stop_axes: unsafe extern "system" fn(c_int) -> LsxStatus,
}

/// Resolve one export, copying the function pointer out of the loader's
/// symbol wrapper.
fn resolve<T: Copy>(library: &Library, symbol: &'static str) -> Result<T, DriverError> {
    let found: Symbol<'_, T> = unsafe { library.get(symbol.as_bytes()) }.map_err(|e| {
        DriverError::MissingSymbol {
            symbol,
            reason: e.to_string(),
        }
    })?;
    Ok(*found)
}

impl EntryPoints {
    /// Resolve the complete entry-point table.
    ///
    /// Fails with the offending export name if any entry point is missing,
    /// so a mismatched library version is caught at load time rather than
    /// at first use.
    pub(crate) fn resolve(library: &Library) -> Result<Self, DriverError> {
        Ok(Self {
            create_lsid: resolve(library, "LSX_CreateLSID")?,
            load_config: resolve(library, "LSX_LoadConfig")?,
            set_control_pars: resolve(library, "LSX_SetControlPars")?,
            connect: resolve(library, "LSX_Connect")?,
            connect_simple: resolve(library, "LSX_ConnectSimple")?,
            disconnect: resolve(library, "LSX_Disconnect")?,
            set_command_timeout: resolve(library, "LSX_SetCommandTimeout")?,
            send_string: resolve(library, "LSX_SendString")?,
            set_show_cmd_list: resolve(library, "LSX_SetShowCmdList")?,
            calibrate: resolve(library, "LSX_Calibrate")?,
            rmeasure: resolve(library, "LSX_RMeasure")?,
            get_pos: resolve(library, "LSX_GetPos")?,
            get_pos_single_axis: resolve(library, "LSX_GetPosSingleAxis")?,
            set_pos: resolve(library, "LSX_SetPos")?,
            move_abs: resolve(library, "LSX_MoveAbs")?,
            move_abs_single_axis: resolve(library, "LSX_MoveAbsSingleAxis")?,
            move_rel: resolve(library, "LSX_MoveRel")?,
            move_rel_single_axis: resolve(library, "LSX_MoveRelSingleAxis")?,
            set_distance: resolve(library, "LSX_SetDistance")?,
            move_rel_short: resolve(library, "LSX_MoveRelShort")?,
            get_distance: resolve(library, "LSX_GetDistance")?,
            set_vel: resolve(library, "LSX_SetVel")?,
            get_vel: resolve(library, "LSX_GetVel")?,
            stop_axes: resolve(library, "LSX_StopAxes")?,
        })
    }
}
