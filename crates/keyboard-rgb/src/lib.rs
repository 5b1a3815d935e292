//! Per-key RGB keyboard capability surface.
//!
//! The HUD loop only depends on the [`RgbKeyboard`] trait; the one concrete
//! implementation, [`WootingKeyboard`], binds the vendor's
//! `wooting-rgb-control` library at an explicit initialization step so a
//! missing library is a reportable failure rather than a load-time crash.

#![deny(static_mut_refs)]

#[cfg(feature = "mock")]
pub mod mock;
pub mod wooting;

pub use wooting::WootingKeyboard;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyboardError {
    /// The RGB control library could not be loaded or lacks a symbol.
    #[error("failed to load RGB control library: {0}")]
    Load(#[from] libloading::Error),
    /// The device acknowledged the call but refused it.
    #[error("keyboard rejected {op} command")]
    CommandRejected { op: &'static str },
}

/// Capability set of a per-key RGB keyboard.
///
/// Key writes address the logical 6×21 grid; `flush` makes the staged writes
/// visible on the device as one frame. All operations except the connectivity
/// probe report failure as a value; callers decide whether that is fatal.
pub trait RgbKeyboard {
    /// Whether the physical device is currently attached.
    fn is_connected(&mut self) -> bool;

    /// Restore the manufacturer's own lighting.
    ///
    /// # Errors
    /// [`KeyboardError::CommandRejected`] when the device refuses the reset.
    fn reset(&mut self) -> Result<(), KeyboardError>;

    /// Stage one key color in the device-side array.
    ///
    /// # Errors
    /// [`KeyboardError::CommandRejected`] when the device refuses the write.
    fn set_key(&mut self, row: u8, col: u8, r: u8, g: u8, b: u8) -> Result<(), KeyboardError>;

    /// Toggle the device's automatic array flushing. The HUD drives frames
    /// explicitly, so this is switched off once at startup.
    ///
    /// # Errors
    /// [`KeyboardError::CommandRejected`] when the device refuses the change.
    fn set_auto_update(&mut self, enabled: bool) -> Result<(), KeyboardError>;

    /// Apply all staged key writes as one visible frame.
    ///
    /// # Errors
    /// [`KeyboardError::CommandRejected`] when the device refuses the update.
    fn flush(&mut self) -> Result<(), KeyboardError>;
}
