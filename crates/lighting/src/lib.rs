//! Color model and fixed keyboard layout for the TrackGlow ambient HUD.
//!
//! The addressable surface is the Wooting per-key RGB grid: 6 rows by up to
//! 21 columns, row 0 being the Esc/function row. All mapping policy lives in
//! [`mapper`]; this module holds the color type, the palette and the grid
//! constants shared with the device layer.

#![deny(static_mut_refs)]

pub mod mapper;

pub use mapper::{VehicleClass, map_to_keys};

/// Number of key rows on the addressable grid.
pub const GRID_ROWS: u8 = 6;

/// Number of key columns on the addressable grid.
pub const GRID_COLS: u8 = 21;

/// An RGB triple with in-place brightness scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Scale every channel by `brightness`, truncating toward zero.
    ///
    /// The factor is clamped to [0, 1], so scaling never raises a channel and
    /// a factor of zero always yields black.
    pub fn scale_brightness(&mut self, brightness: f32) {
        let factor = brightness.clamp(0.0, 1.0);
        self.r = (f32::from(self.r) * factor) as u8;
        self.g = (f32::from(self.g) * factor) as u8;
        self.b = (f32::from(self.b) * factor) as u8;
    }

    pub fn is_off(&self) -> bool {
        *self == OFF
    }
}

/// Unlit key.
pub const OFF: Rgb = Rgb::new(0, 0, 0);
/// Neutral white, used for headlights and slipping wheels.
pub const WHITE: Rgb = Rgb::new(255, 255, 255);
/// Matrix base fill while the vehicle is submerged.
pub const IN_WATER: Rgb = Rgb::new(0, 0, 255);
/// Turbo bar accent.
pub const TURBO: Rgb = Rgb::new(0, 255, 255);

/// One key color update addressed on the logical grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyAssignment {
    pub row: u8,
    pub col: u8,
    pub color: Rgb,
}

impl KeyAssignment {
    pub const fn new(row: u8, col: u8, color: Rgb) -> Self {
        Self { row, col, color }
    }
}

/// All-off pattern across the full grid, the baseline written on race start.
pub fn full_grid_off() -> Vec<KeyAssignment> {
    let mut keys = Vec::with_capacity(usize::from(GRID_ROWS) * usize::from(GRID_COLS));
    for row in 0..GRID_ROWS {
        for col in 0..GRID_COLS {
            keys.push(KeyAssignment::new(row, col, OFF));
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_zero_is_black() {
        let mut c = Rgb::new(255, 127, 31);
        c.scale_brightness(0.0);
        assert_eq!(c, OFF);
    }

    #[test]
    fn test_scale_one_is_identity() {
        let mut c = Rgb::new(255, 127, 31);
        c.scale_brightness(1.0);
        assert_eq!(c, Rgb::new(255, 127, 31));
    }

    #[test]
    fn test_scale_truncates_toward_zero() {
        let mut c = Rgb::new(255, 31, 1);
        c.scale_brightness(0.5);
        // 127.5, 15.5, 0.5 all truncate.
        assert_eq!(c, Rgb::new(127, 15, 0));
    }

    #[test]
    fn test_out_of_range_factor_clamped() {
        let mut c = Rgb::new(10, 20, 30);
        c.scale_brightness(2.0);
        assert_eq!(c, Rgb::new(10, 20, 30));
        c.scale_brightness(-1.0);
        assert_eq!(c, OFF);
    }

    #[test]
    fn test_full_grid_off_covers_every_key() {
        let keys = full_grid_off();
        assert_eq!(keys.len(), 126);
        assert!(keys.iter().all(|k| k.color.is_off()));
        assert!(keys.iter().any(|k| k.row == 5 && k.col == 20));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(200))]

        /// Scaling by a larger factor never yields a dimmer channel, and
        /// scaling never brightens.
        #[test]
        fn prop_brightness_monotonic(
            r in any::<u8>(),
            g in any::<u8>(),
            b in any::<u8>(),
            f1 in 0.0f32..=1.0f32,
            f2 in 0.0f32..=1.0f32,
        ) {
            let (lo, hi) = if f1 <= f2 { (f1, f2) } else { (f2, f1) };
            let mut dim = Rgb::new(r, g, b);
            let mut bright = Rgb::new(r, g, b);
            dim.scale_brightness(lo);
            bright.scale_brightness(hi);
            prop_assert!(dim.r <= bright.r);
            prop_assert!(dim.g <= bright.g);
            prop_assert!(dim.b <= bright.b);
            prop_assert!(bright.r <= r && bright.g <= g && bright.b <= b);
        }
    }
}
