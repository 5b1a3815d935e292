//! Runtime binding to the Wooting `wooting-rgb-control` library.
//!
//! Symbols are resolved once at load and kept as plain `extern "C"` function
//! pointers next to the owning [`Library`], so per-tick calls are direct. The
//! vendor API takes unsigned ints for row/column/channels and returns a bool
//! acknowledgement per call.

use crate::{KeyboardError, RgbKeyboard};
use libloading::Library;
use std::ffi::c_uint;
use std::path::Path;
use tracing::info;

/// Library name the Wooting SDK ships under on Windows.
pub const WOOTING_RGB_LIBRARY: &str = "wooting-rgb-control.dll";

type BoolFn = unsafe extern "C" fn() -> bool;
type SetSingleFn = unsafe extern "C" fn(c_uint, c_uint, c_uint, c_uint, c_uint) -> bool;
type AutoUpdateFn = unsafe extern "C" fn(bool) -> bool;

/// Wooting keyboard driven through the vendor RGB control library.
pub struct WootingKeyboard {
    // Keeps the resolved function pointers below valid.
    _library: Library,
    kbd_connected: BoolFn,
    rgb_reset: BoolFn,
    array_set_single: SetSingleFn,
    array_update_keyboard: BoolFn,
    array_auto_update: AutoUpdateFn,
}

impl WootingKeyboard {
    /// Load the RGB control library and resolve every symbol the HUD uses.
    ///
    /// # Errors
    ///
    /// [`KeyboardError::Load`] when the library is missing or any symbol
    /// cannot be resolved. The caller reports this and exits; there is no
    /// degraded mode without a device.
    pub fn load(path: &Path) -> Result<Self, KeyboardError> {
        // SAFETY: loading runs the library's initialization; the Wooting SDK
        // has no load-time side effects beyond setting up its device table.
        let library = unsafe { Library::new(path)? };

        // SAFETY: symbol names and signatures match the vendor header
        // (wooting-rgb-sdk); the pointers are copied out while `library`
        // stays alive in the returned struct.
        let keyboard = unsafe {
            Self {
                kbd_connected: *library.get(b"wooting_rgb_kbd_connected")?,
                rgb_reset: *library.get(b"wooting_rgb_reset")?,
                array_set_single: *library.get(b"wooting_rgb_array_set_single")?,
                array_update_keyboard: *library.get(b"wooting_rgb_array_update_keyboard")?,
                array_auto_update: *library.get(b"wooting_rgb_array_auto_update")?,
                _library: library,
            }
        };

        info!("Loaded Wooting RGB control library from {}", path.display());
        Ok(keyboard)
    }
}

impl RgbKeyboard for WootingKeyboard {
    fn is_connected(&mut self) -> bool {
        // SAFETY: pointer resolved in `load`, library still alive.
        unsafe { (self.kbd_connected)() }
    }

    fn reset(&mut self) -> Result<(), KeyboardError> {
        // SAFETY: as above.
        if unsafe { (self.rgb_reset)() } {
            Ok(())
        } else {
            Err(KeyboardError::CommandRejected { op: "reset" })
        }
    }

    fn set_key(&mut self, row: u8, col: u8, r: u8, g: u8, b: u8) -> Result<(), KeyboardError> {
        // SAFETY: as above.
        let accepted = unsafe {
            (self.array_set_single)(
                c_uint::from(row),
                c_uint::from(col),
                c_uint::from(r),
                c_uint::from(g),
                c_uint::from(b),
            )
        };
        if accepted {
            Ok(())
        } else {
            Err(KeyboardError::CommandRejected { op: "set_key" })
        }
    }

    fn set_auto_update(&mut self, enabled: bool) -> Result<(), KeyboardError> {
        // SAFETY: as above.
        if unsafe { (self.array_auto_update)(enabled) } {
            Ok(())
        } else {
            Err(KeyboardError::CommandRejected { op: "auto_update" })
        }
    }

    fn flush(&mut self) -> Result<(), KeyboardError> {
        // SAFETY: as above.
        if unsafe { (self.array_update_keyboard)() } {
            Ok(())
        } else {
            Err(KeyboardError::CommandRejected { op: "flush" })
        }
    }
}
