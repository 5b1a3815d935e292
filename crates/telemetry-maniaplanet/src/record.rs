//! Fixed-layout decoder for the ManiaPlanet `STelemetry` record.
//!
//! Layout reference: `maniaplanet_telemetry.h` from the official telemetry
//! example (version 2). The struct is MSVC naturally aligned and every field
//! lands on a 4-byte boundary, so offsets below are plain running sums.
//!
//! The record's 32-bit `Bool` fields decode as nonzero = true.

use thiserror::Error;

/// Total size of the version-2 `STelemetry` record in bytes.
pub const TELEMETRY_RECORD_SIZE: usize = 1396;

/// Header magic string (NUL padded to 32 bytes in the record).
pub const TELEMETRY_MAGIC: &str = "ManiaPlanet_Telemetry";

/// Telemetry layout version this decoder understands.
pub const TELEMETRY_VERSION: u32 = 2;

/// Player model name published while no vehicle is assigned (menus, editors).
pub const UNASSIGNED_MODEL: &str = "Unassigned";

// ── STelemetry byte offsets (version 2) ───────────────────────────────────
//
// SHeader:
const OFF_MAGIC: usize = 0; // char[32]
const OFF_VERSION: usize = 32; // u32
const OFF_SIZE: usize = 36; // u32 == sizeof(STelemetry)
/// Monotonic write counter, bumped by the game on every record rewrite.
pub const OFF_UPDATE_NUMBER: usize = 40; // u32
// SGameState:
const OFF_GAME_STATE: usize = 44; // u32 enum
const OFF_PLAYER_MODEL: usize = 48; // char[64]
const OFF_MAP_UID: usize = 112; // char[64]
const OFF_MAP_NAME: usize = 176; // char[256]
// SRaceState (after 128 reserved bytes):
const OFF_RACE_STATE: usize = 560; // u32 enum
const OFF_RACE_TIME: usize = 564; // u32 ms
const OFF_NB_RESPAWNS: usize = 568; // u32
const OFF_NB_CHECKPOINTS: usize = 572; // u32
// SObjectState spans 1108..1192; nothing in it feeds the HUD.
// SVehicleState:
const OFF_INPUT_STEERING: usize = 1196; // f32, -1 left .. +1 right
const OFF_INPUT_GAS_PEDAL: usize = 1200; // f32, 0..1
const OFF_INPUT_IS_BRAKING: usize = 1204; // Bool
const OFF_INPUT_IS_HORN: usize = 1208; // Bool
const OFF_ENGINE_RPM: usize = 1212; // f32, 0..11000 StadiumCar, 1500..10000 others
const OFF_ENGINE_CUR_GEAR: usize = 1216; // i32
const OFF_ENGINE_TURBO_RATIO: usize = 1220; // f32, 1 full .. 0 empty
const OFF_ENGINE_FREE_WHEELING: usize = 1224; // Bool
const OFF_WHEELS_GROUND_CONTACT: usize = 1228; // Bool[4]
const OFF_WHEELS_SLIPPING: usize = 1244; // Bool[4]
const OFF_WHEELS_DAMPER_LENGTH: usize = 1260; // f32[4]
const OFF_WHEELS_DAMPER_RANGE_MIN: usize = 1276; // f32
const OFF_WHEELS_DAMPER_RANGE_MAX: usize = 1280; // f32
const OFF_RUMBLE_INTENSITY: usize = 1284; // f32
const OFF_SPEED: usize = 1288; // u32, unsigned km/h
const OFF_IS_IN_WATER: usize = 1292; // Bool
const OFF_IS_SPARKLING: usize = 1296; // Bool
const OFF_IS_LIGHT_TRAILS: usize = 1300; // Bool
const OFF_IS_LIGHTS_ON: usize = 1304; // Bool
const OFF_IS_FLYING: usize = 1308; // Bool

const PLAYER_MODEL_LEN: usize = 64;
const MAP_UID_LEN: usize = 64;
const MAP_NAME_LEN: usize = 256;

/// Record rejection reasons; all of them mean "treat the feed as unavailable".
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("telemetry record too short: expected {TELEMETRY_RECORD_SIZE} bytes, got {0}")]
    TooShort(usize),
    #[error("telemetry magic mismatch")]
    BadMagic,
    #[error("unsupported telemetry version {0} (expected {TELEMETRY_VERSION})")]
    UnsupportedVersion(u32),
    #[error("telemetry size field mismatch: expected {TELEMETRY_RECORD_SIZE}, got {0}")]
    SizeMismatch(u32),
}

/// Coarse application state published by the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Starting,
    Menus,
    Running,
    Paused,
    Unknown(u32),
}

impl From<u32> for GameState {
    fn from(raw: u32) -> Self {
        match raw {
            0 => Self::Starting,
            1 => Self::Menus,
            2 => Self::Running,
            3 => Self::Paused,
            other => Self::Unknown(other),
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::Starting
    }
}

/// Race phase of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceState {
    BeforeStart,
    Running,
    Finished,
    Unknown(u32),
}

impl From<u32> for RaceState {
    fn from(raw: u32) -> Self {
        match raw {
            0 => Self::BeforeStart,
            1 => Self::Running,
            2 => Self::Finished,
            other => Self::Unknown(other),
        }
    }
}

impl Default for RaceState {
    fn default() -> Self {
        Self::BeforeStart
    }
}

/// `SGameState` fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameSnapshot {
    pub state: GameState,
    /// Player model name, e.g. "CanyonCar" or "Unassigned".
    pub player_model: String,
    pub map_uid: String,
    /// Map name without formatting codes.
    pub map_name: String,
}

/// `SRaceState` fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RaceSnapshot {
    pub state: RaceState,
    pub time_ms: u32,
    pub respawns: u32,
    pub checkpoints: u32,
}

/// `SVehicleState` fields. Wheel arrays are ordered front-left, front-right,
/// rear-right, rear-left as published by the game.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleSnapshot {
    /// Steering input, -1.0 (full left) to 1.0 (full right).
    pub input_steering: f32,
    /// Gas pedal input, 0.0 to 1.0.
    pub input_gas_pedal: f32,
    pub input_is_braking: bool,
    pub input_is_horn: bool,
    pub engine_rpm: f32,
    pub engine_cur_gear: i32,
    /// 1.0 = turbo full (starting), 0.0 = turbo spent.
    pub engine_turbo_ratio: f32,
    pub engine_free_wheeling: bool,
    pub wheels_ground_contact: [bool; 4],
    pub wheels_slipping: [bool; 4],
    pub wheels_damper_length: [f32; 4],
    pub wheels_damper_range_min: f32,
    pub wheels_damper_range_max: f32,
    pub rumble_intensity: f32,
    /// Unsigned speed in km/h.
    pub speed_kmh: u32,
    pub is_in_water: bool,
    pub is_sparkling: bool,
    pub is_light_trails: bool,
    pub is_lights_on: bool,
    pub is_flying: bool,
}

/// One validated, consistent copy of the game's telemetry record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub update_number: u32,
    pub game: GameSnapshot,
    pub race: RaceSnapshot,
    pub vehicle: VehicleSnapshot,
}

impl TelemetrySnapshot {
    /// Whether the player is actively driving: a vehicle is assigned, the game
    /// is not sitting in the menus and the race clock is running.
    pub fn is_in_race(&self) -> bool {
        self.game.player_model != UNASSIGNED_MODEL
            && self.game.state != GameState::Menus
            && self.race.state == RaceState::Running
    }
}

/// Decode a raw shared-memory copy into a [`TelemetrySnapshot`].
///
/// Header magic, version and size are validated before any offset is trusted;
/// a mismatch means the region holds something other than a version-2 record
/// and the caller must treat the feed as unavailable.
///
/// # Errors
///
/// Returns [`RecordError`] when the buffer is shorter than the record or the
/// header does not match.
pub fn decode(data: &[u8]) -> Result<TelemetrySnapshot, RecordError> {
    if data.len() < TELEMETRY_RECORD_SIZE {
        return Err(RecordError::TooShort(data.len()));
    }

    let magic = data
        .get(OFF_MAGIC..OFF_MAGIC + TELEMETRY_MAGIC.len())
        .unwrap_or_default();
    if magic != TELEMETRY_MAGIC.as_bytes() {
        return Err(RecordError::BadMagic);
    }

    let version = read_u32_le(data, OFF_VERSION).unwrap_or(0);
    if version != TELEMETRY_VERSION {
        return Err(RecordError::UnsupportedVersion(version));
    }

    let size = read_u32_le(data, OFF_SIZE).unwrap_or(0);
    if size as usize != TELEMETRY_RECORD_SIZE {
        return Err(RecordError::SizeMismatch(size));
    }

    let game = GameSnapshot {
        state: GameState::from(read_u32_le(data, OFF_GAME_STATE).unwrap_or(0)),
        player_model: extract_string(data, OFF_PLAYER_MODEL, PLAYER_MODEL_LEN),
        map_uid: extract_string(data, OFF_MAP_UID, MAP_UID_LEN),
        map_name: extract_string(data, OFF_MAP_NAME, MAP_NAME_LEN),
    };

    let race = RaceSnapshot {
        state: RaceState::from(read_u32_le(data, OFF_RACE_STATE).unwrap_or(0)),
        time_ms: read_u32_le(data, OFF_RACE_TIME).unwrap_or(0),
        respawns: read_u32_le(data, OFF_NB_RESPAWNS).unwrap_or(0),
        checkpoints: read_u32_le(data, OFF_NB_CHECKPOINTS).unwrap_or(0),
    };

    let vehicle = VehicleSnapshot {
        input_steering: read_f32_le(data, OFF_INPUT_STEERING).unwrap_or(0.0),
        input_gas_pedal: read_f32_le(data, OFF_INPUT_GAS_PEDAL).unwrap_or(0.0),
        input_is_braking: read_bool32(data, OFF_INPUT_IS_BRAKING),
        input_is_horn: read_bool32(data, OFF_INPUT_IS_HORN),
        engine_rpm: read_f32_le(data, OFF_ENGINE_RPM).unwrap_or(0.0),
        engine_cur_gear: read_i32_le(data, OFF_ENGINE_CUR_GEAR).unwrap_or(0),
        engine_turbo_ratio: read_f32_le(data, OFF_ENGINE_TURBO_RATIO).unwrap_or(0.0),
        engine_free_wheeling: read_bool32(data, OFF_ENGINE_FREE_WHEELING),
        wheels_ground_contact: read_bool32_array(data, OFF_WHEELS_GROUND_CONTACT),
        wheels_slipping: read_bool32_array(data, OFF_WHEELS_SLIPPING),
        wheels_damper_length: read_f32_array(data, OFF_WHEELS_DAMPER_LENGTH),
        wheels_damper_range_min: read_f32_le(data, OFF_WHEELS_DAMPER_RANGE_MIN).unwrap_or(0.0),
        wheels_damper_range_max: read_f32_le(data, OFF_WHEELS_DAMPER_RANGE_MAX).unwrap_or(0.0),
        rumble_intensity: read_f32_le(data, OFF_RUMBLE_INTENSITY).unwrap_or(0.0),
        speed_kmh: read_u32_le(data, OFF_SPEED).unwrap_or(0),
        is_in_water: read_bool32(data, OFF_IS_IN_WATER),
        is_sparkling: read_bool32(data, OFF_IS_SPARKLING),
        is_light_trails: read_bool32(data, OFF_IS_LIGHT_TRAILS),
        is_lights_on: read_bool32(data, OFF_IS_LIGHTS_ON),
        is_flying: read_bool32(data, OFF_IS_FLYING),
    };

    Ok(TelemetrySnapshot {
        update_number: read_u32_le(data, OFF_UPDATE_NUMBER).unwrap_or(0),
        game,
        race,
        vehicle,
    })
}

fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    data.get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
}

fn read_i32_le(data: &[u8], offset: usize) -> Option<i32> {
    data.get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(i32::from_le_bytes)
}

fn read_f32_le(data: &[u8], offset: usize) -> Option<f32> {
    data.get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(f32::from_le_bytes)
        .filter(|v| v.is_finite())
}

// The game's Bool is a 32-bit integer; any nonzero value counts as set.
fn read_bool32(data: &[u8], offset: usize) -> bool {
    read_u32_le(data, offset).unwrap_or(0) != 0
}

fn read_bool32_array(data: &[u8], offset: usize) -> [bool; 4] {
    [
        read_bool32(data, offset),
        read_bool32(data, offset + 4),
        read_bool32(data, offset + 8),
        read_bool32(data, offset + 12),
    ]
}

fn read_f32_array(data: &[u8], offset: usize) -> [f32; 4] {
    [
        read_f32_le(data, offset).unwrap_or(0.0),
        read_f32_le(data, offset + 4).unwrap_or(0.0),
        read_f32_le(data, offset + 8).unwrap_or(0.0),
        read_f32_le(data, offset + 12).unwrap_or(0.0),
    ]
}

fn extract_string(data: &[u8], offset: usize, len: usize) -> String {
    let bytes = data.get(offset..offset + len).unwrap_or_default();
    match bytes.iter().position(|&b| b == 0) {
        Some(pos) => String::from_utf8_lossy(&bytes[..pos]).into_owned(),
        None => String::from_utf8_lossy(bytes).into_owned(),
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(200))]

        /// Arbitrary bytes must never panic the decoder.
        #[test]
        fn prop_arbitrary_bytes_no_panic(data in proptest::collection::vec(any::<u8>(), 0..=4096)) {
            let _ = decode(&data);
        }

        /// Without the exact magic prefix the decoder always refuses.
        #[test]
        fn prop_wrong_magic_never_parses(first in any::<u8>()) {
            prop_assume!(first != b'M');
            let mut buf = vec![0u8; TELEMETRY_RECORD_SIZE];
            buf[0] = first;
            prop_assert!(decode(&buf).is_err());
        }
    }
}
