//! ManiaPlanet / Trackmania telemetry via the game's shared memory interface.
//!
//! ManiaPlanet publishes an `STelemetry` record (version 2, 1396 bytes) into a
//! named 4096-byte shared memory region, rewriting it in place at its own pace
//! and bumping a monotonic `UpdateNumber` counter on every write. This crate
//! decodes that fixed layout into [`TelemetrySnapshot`] and provides
//! [`SharedMemoryFeed`], a polling reader that obtains consistent copies
//! despite the concurrent writer.
//!
//! # Consistency protocol
//!
//! The game takes no lock while writing, so a reader that copies the record
//! while a write is in flight sees a torn mix of two frames. The reader probes
//! `UpdateNumber`, bulk-copies the region, probes again, and retries until
//! both probes match (see [`read_stable_record`]). Retries are unbounded: the
//! producer writes at game frame rate, far slower than a single copy, so a
//! second pass almost always succeeds.

#![deny(static_mut_refs)]

pub mod feed;
pub mod record;

pub use feed::{
    RawTelemetryRegion, SharedMemoryFeed, TelemetryFeed, read_stable_record,
    TELEMETRY_MAPPING_NAME, TELEMETRY_REGION_SIZE,
};
pub use record::{
    GameSnapshot, GameState, RaceSnapshot, RaceState, RecordError, TelemetrySnapshot,
    VehicleSnapshot, decode, TELEMETRY_RECORD_SIZE,
};
