//! Per-frame mapping from a telemetry snapshot to key colors.
//!
//! Pure policy, no device calls: one [`map_to_keys`] invocation per tick
//! while the player is in a race. Regions and thresholds are fixed:
//!
//! - function row (F1–F12): engine RPM bar in the vehicle accent color
//! - number row: current gear, reverse on Backspace
//! - Ins/Home/Del/End cluster: per-wheel contact/slip indicators
//! - Esc: headlights
//! - arrow-cluster neighborhood: gas, brake, steer left/right
//! - main matrix: in-water fill with a bottom-up turbo bar overlay
//!
//! Every grid cell is written at most once per call, so the returned
//! assignments can be pushed to the device in any order.

use crate::{IN_WATER, KeyAssignment, OFF, Rgb, TURBO, WHITE};
use trackglow_telemetry_maniaplanet::TelemetrySnapshot;

/// Row/column of the RPM bar (F1–F12).
const RPM_ROW: u8 = 0;
const RPM_FIRST_COL: u8 = 2;
/// Number of keys in the RPM bar.
pub const RPM_KEYS: u32 = 12;

/// Gear display columns on the number row, indexed by gear.
/// Gear 0 (reverse) sits on Backspace, gears 1..=12 on the digit keys.
const GEAR_ROW: u8 = 1;
const GEAR_KEY_COLS: [u8; 13] = [13, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];

/// Wheel indicator keys, in the game's wheel order
/// (front-left, front-right, rear-right, rear-left).
const WHEEL_KEYS: [(u8, u8); 4] = [(1, 15), (1, 16), (2, 16), (2, 15)];

const HEADLIGHT_KEY: (u8, u8) = (0, 0);
const GAS_KEY: (u8, u8) = (4, 15);
const STEER_LEFT_KEY: (u8, u8) = (5, 14);
const BRAKE_KEY: (u8, u8) = (5, 15);
const STEER_RIGHT_KEY: (u8, u8) = (5, 16);

/// Main matrix extent: columns 0..14 of rows 2..6.
const MATRIX_COLS: u8 = 14;
const MATRIX_FIRST_ROW: u8 = 2;
const MATRIX_LAST_ROW: u8 = 5;

/// The turbo bar spans the four matrix rows but the ratio is scaled by 8, so
/// a half-full turbo already fills the whole matrix.
const TURBO_BAR_SCALE: f32 = 8.0;

/// Vehicle family recognized from the player model name; drives the accent
/// color and the RPM range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleClass {
    Canyon,
    Stadium,
    Valley,
    Lagoon,
    Unknown,
}

impl VehicleClass {
    /// Classify a player model name ("StadiumCar64" → Stadium).
    pub fn from_model(model: &str) -> Self {
        if model.contains("CanyonCar") {
            Self::Canyon
        } else if model.contains("StadiumCar") {
            Self::Stadium
        } else if model.contains("ValleyCar") {
            Self::Valley
        } else if model.contains("LagoonCar") {
            Self::Lagoon
        } else {
            Self::Unknown
        }
    }

    /// Accent color for this vehicle family; neutral white when unrecognized.
    pub fn accent(self) -> Rgb {
        match self {
            Self::Canyon => Rgb::new(255, 15, 0),
            Self::Stadium => Rgb::new(0, 255, 31),
            Self::Valley => Rgb::new(64, 255, 0),
            Self::Lagoon => Rgb::new(0, 127, 255),
            Self::Unknown => WHITE,
        }
    }

    /// Upper end of the engine RPM range for this family.
    pub fn max_rpm(self) -> f32 {
        match self {
            Self::Stadium => 11_000.0,
            _ => 10_000.0,
        }
    }
}

/// Brightness of bar key `index` for a bar filled to `ratio` keys.
///
/// A key more than one unit below the fill level is fully lit, the key at the
/// boundary gets the fractional excess, everything above is off.
fn fill_level(ratio: f32, index: u32) -> f32 {
    (ratio - index as f32).clamp(0.0, 1.0)
}

/// Map one telemetry snapshot to the full set of key colors for this frame.
pub fn map_to_keys(snapshot: &TelemetrySnapshot) -> Vec<KeyAssignment> {
    let vehicle = &snapshot.vehicle;
    let class = VehicleClass::from_model(&snapshot.game.player_model);
    let accent = class.accent();

    let mut keys = Vec::with_capacity(90);

    // RPM bar across the function keys.
    let rpm_ratio = vehicle.engine_rpm / class.max_rpm() * RPM_KEYS as f32;
    for i in 0..RPM_KEYS {
        let mut color = accent;
        color.scale_brightness(fill_level(rpm_ratio, i));
        keys.push(KeyAssignment::new(RPM_ROW, RPM_FIRST_COL + i as u8, color));
    }

    // Gear display: exactly the key matching the current gear is lit.
    for (i, &col) in GEAR_KEY_COLS.iter().enumerate() {
        let color = if i as i32 == vehicle.engine_cur_gear {
            accent
        } else {
            OFF
        };
        keys.push(KeyAssignment::new(GEAR_ROW, col, color));
    }

    // Wheel indicators: white while slipping, accent otherwise, brightness
    // tracking suspension compression.
    let damper_range = vehicle.wheels_damper_range_max - vehicle.wheels_damper_range_min;
    for (i, &(row, col)) in WHEEL_KEYS.iter().enumerate() {
        let mut color = if vehicle.wheels_slipping[i] {
            WHITE
        } else {
            accent
        };
        if !vehicle.wheels_slipping[i] {
            let compression = if damper_range > 0.0 {
                (vehicle.wheels_damper_range_max - vehicle.wheels_damper_length[i]) / damper_range
            } else {
                0.0
            };
            color.scale_brightness(compression);
        }
        keys.push(KeyAssignment::new(row, col, color));
    }

    // Headlights on Esc.
    let headlights = if vehicle.is_lights_on { WHITE } else { OFF };
    keys.push(KeyAssignment::new(
        HEADLIGHT_KEY.0,
        HEADLIGHT_KEY.1,
        headlights,
    ));

    // Gas pedal.
    let mut gas = accent;
    gas.scale_brightness(vehicle.input_gas_pedal);
    keys.push(KeyAssignment::new(GAS_KEY.0, GAS_KEY.1, gas));

    // Steering: only the side matching the input sign is lit.
    let mut steer_left = OFF;
    if vehicle.input_steering < 0.0 {
        steer_left = accent;
        steer_left.scale_brightness(-vehicle.input_steering);
    }
    keys.push(KeyAssignment::new(
        STEER_LEFT_KEY.0,
        STEER_LEFT_KEY.1,
        steer_left,
    ));

    let mut steer_right = OFF;
    if vehicle.input_steering > 0.0 {
        steer_right = accent;
        steer_right.scale_brightness(vehicle.input_steering);
    }
    keys.push(KeyAssignment::new(
        STEER_RIGHT_KEY.0,
        STEER_RIGHT_KEY.1,
        steer_right,
    ));

    // Brake.
    let brake = if vehicle.input_is_braking { accent } else { OFF };
    keys.push(KeyAssignment::new(BRAKE_KEY.0, BRAKE_KEY.1, brake));

    // Main matrix: in-water base fill, repainted bottom-to-top by the turbo
    // bar whenever turbo is active (rows the bar does not reach go dark, as
    // the bar owns the matrix while boosting).
    let base = if vehicle.is_in_water { IN_WATER } else { OFF };
    let turbo_ratio = vehicle.engine_turbo_ratio * TURBO_BAR_SCALE;
    for row in MATRIX_FIRST_ROW..=MATRIX_LAST_ROW {
        let row_color = if vehicle.engine_turbo_ratio > 0.0 {
            let mut color = TURBO;
            color.scale_brightness(fill_level(turbo_ratio, u32::from(MATRIX_LAST_ROW - row)));
            color
        } else {
            base
        };
        for col in 0..MATRIX_COLS {
            keys.push(KeyAssignment::new(row, col, row_color));
        }
    }

    keys
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use trackglow_telemetry_maniaplanet::TelemetrySnapshot;

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(200))]

        /// Any finite dynamics map to assignments that stay on the grid.
        #[test]
        fn prop_assignments_stay_on_grid(
            rpm in 0.0f32..=20_000.0,
            gear in -2i32..=15,
            gas in 0.0f32..=1.0,
            steering in -1.0f32..=1.0,
            turbo in 0.0f32..=1.0,
            water in any::<bool>(),
        ) {
            let mut snap = TelemetrySnapshot::default();
            snap.game.player_model = "StadiumCar".to_string();
            snap.vehicle.engine_rpm = rpm;
            snap.vehicle.engine_cur_gear = gear;
            snap.vehicle.input_gas_pedal = gas;
            snap.vehicle.input_steering = steering;
            snap.vehicle.engine_turbo_ratio = turbo;
            snap.vehicle.is_in_water = water;

            let keys = map_to_keys(&snap);
            prop_assert_eq!(keys.len(), 90);
            for k in &keys {
                prop_assert!(k.row < crate::GRID_ROWS);
                prop_assert!(k.col < crate::GRID_COLS);
            }
        }

        /// At most one steering side is ever lit.
        #[test]
        fn prop_one_steering_side(steering in -1.0f32..=1.0) {
            let mut snap = TelemetrySnapshot::default();
            snap.game.player_model = "CanyonCar".to_string();
            snap.vehicle.input_steering = steering;
            let keys = map_to_keys(&snap);
            let left = keys.iter().find(|k| (k.row, k.col) == STEER_LEFT_KEY);
            let right = keys.iter().find(|k| (k.row, k.col) == STEER_RIGHT_KEY);
            let left_lit = left.is_some_and(|k| !k.color.is_off());
            let right_lit = right.is_some_and(|k| !k.color.is_off());
            prop_assert!(!(left_lit && right_lit));
        }
    }
}
