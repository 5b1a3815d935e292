//! Recording keyboard double for lifecycle tests (feature `mock`).

use crate::{KeyboardError, RgbKeyboard};

/// One recorded device operation, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOp {
    SetKey { row: u8, col: u8, rgb: (u8, u8, u8) },
    Flush,
    Reset,
    AutoUpdate(bool),
}

/// Scriptable keyboard that records every operation.
#[derive(Debug, Default)]
pub struct MockKeyboard {
    /// Recorded operations in call order.
    pub ops: Vec<MockOp>,
    /// Result of the next connectivity probes; starts connected.
    pub disconnected: bool,
    /// Make `reset` report a device refusal.
    pub fail_reset: bool,
}

impl MockKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resets(&self) -> usize {
        self.ops.iter().filter(|op| **op == MockOp::Reset).count()
    }

    pub fn flushes(&self) -> usize {
        self.ops.iter().filter(|op| **op == MockOp::Flush).count()
    }

    pub fn set_keys(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, MockOp::SetKey { .. }))
            .count()
    }
}

impl RgbKeyboard for MockKeyboard {
    fn is_connected(&mut self) -> bool {
        !self.disconnected
    }

    fn reset(&mut self) -> Result<(), KeyboardError> {
        self.ops.push(MockOp::Reset);
        if self.fail_reset {
            Err(KeyboardError::CommandRejected { op: "reset" })
        } else {
            Ok(())
        }
    }

    fn set_key(&mut self, row: u8, col: u8, r: u8, g: u8, b: u8) -> Result<(), KeyboardError> {
        self.ops.push(MockOp::SetKey {
            row,
            col,
            rgb: (r, g, b),
        });
        Ok(())
    }

    fn set_auto_update(&mut self, enabled: bool) -> Result<(), KeyboardError> {
        self.ops.push(MockOp::AutoUpdate(enabled));
        Ok(())
    }

    fn flush(&mut self) -> Result<(), KeyboardError> {
        self.ops.push(MockOp::Flush);
        Ok(())
    }
}
