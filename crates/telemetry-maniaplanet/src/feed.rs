//! Shared-memory feed with torn-read-safe snapshot copies.
//!
//! The game maps `ManiaPlanet_Telemetry` as a 4096-byte named region and
//! rewrites the record in place without locking. [`SharedMemoryFeed`] opens
//! the mapping read-only and lazily: a missing region just means the game is
//! not running, which is reported as "no snapshot", not as an error.
//!
//! The copy protocol lives in [`read_stable_record`] over the small
//! [`RawTelemetryRegion`] seam so the retry logic is exercised by tests
//! without a live game process.
#![cfg_attr(not(windows), allow(unused, dead_code))]

use crate::record::{self, TelemetrySnapshot};
use tracing::{debug, info};

/// Well-known name of the game's shared memory mapping.
pub const TELEMETRY_MAPPING_NAME: &str = "ManiaPlanet_Telemetry";

/// Size of the mapped window; the record occupies the first 1396 bytes.
pub const TELEMETRY_REGION_SIZE: usize = 4096;

/// Source of validated telemetry snapshots, polled once per tick.
pub trait TelemetryFeed {
    /// Obtain a consistent snapshot, or `None` while the feed is unavailable
    /// (game not running, region not yet created, or the region holds
    /// something that is not a version-2 record).
    fn try_read(&mut self) -> Option<TelemetrySnapshot>;
}

/// Raw view of the publisher's memory region.
///
/// `update_number` must observe the publisher's counter with volatile
/// semantics; `copy_record` bulk-copies the whole region into a private
/// buffer. Splitting the two lets tests stand in for a concurrent writer.
pub trait RawTelemetryRegion {
    /// Probe the monotonic write counter.
    fn update_number(&self) -> u32;

    /// Bulk-copy the region into `buf`. The copy may be torn; callers detect
    /// that through the surrounding counter probes.
    fn copy_record(&self, buf: &mut [u8; TELEMETRY_REGION_SIZE]);
}

/// Copy the region until a consistent snapshot is obtained.
///
/// Optimistic-concurrency read: probe the counter, copy, probe again and
/// retry on mismatch. There is no retry bound; the producer writes at game
/// frame rate, so contention is rare and resolves within a copy or two.
/// Returns the counter value the stable copy was taken at.
pub fn read_stable_record<R: RawTelemetryRegion>(
    region: &R,
    buf: &mut [u8; TELEMETRY_REGION_SIZE],
) -> u32 {
    loop {
        let before = region.update_number();
        region.copy_record(buf);
        let after = region.update_number();
        if before == after {
            return after;
        }
        // The game rewrote the record mid-copy; take another pass.
    }
}

/// Polling reader over the game's shared memory region.
///
/// The mapping is established on the first `try_read` that finds the region,
/// reused for every subsequent tick, and released when the feed is dropped.
pub struct SharedMemoryFeed {
    #[cfg(windows)]
    mapping: Option<windows_impl::MappedRegion>,
    buf: Box<[u8; TELEMETRY_REGION_SIZE]>,
}

impl SharedMemoryFeed {
    pub fn new() -> Self {
        Self {
            #[cfg(windows)]
            mapping: None,
            buf: Box::new([0u8; TELEMETRY_REGION_SIZE]),
        }
    }
}

impl Default for SharedMemoryFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryFeed for SharedMemoryFeed {
    #[cfg(windows)]
    fn try_read(&mut self) -> Option<TelemetrySnapshot> {
        if self.mapping.is_none() {
            self.mapping = windows_impl::MappedRegion::open();
            if self.mapping.is_some() {
                info!("Connected to ManiaPlanet telemetry shared memory");
            }
        }

        let region = self.mapping.as_ref()?;
        read_stable_record(region, &mut self.buf);
        match record::decode(self.buf.as_slice()) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                debug!("Telemetry record rejected: {e}");
                None
            }
        }
    }

    #[cfg(not(windows))]
    fn try_read(&mut self) -> Option<TelemetrySnapshot> {
        // The game only publishes this region on Windows.
        None
    }
}

#[cfg(windows)]
mod windows_impl {
    use super::{RawTelemetryRegion, TELEMETRY_MAPPING_NAME, TELEMETRY_REGION_SIZE};
    use crate::record::OFF_UPDATE_NUMBER;
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    use std::ptr;
    use tracing::debug;
    use winapi::um::{
        handleapi::CloseHandle,
        memoryapi::{FILE_MAP_READ, MapViewOfFile, OpenFileMappingW, UnmapViewOfFile},
        winnt::HANDLE,
    };

    /// Read-only view of the game's mapping. Unmapped and closed on drop.
    pub(super) struct MappedRegion {
        handle: HANDLE,
        view: *const u8,
    }

    // SAFETY: the view is read-only and the handle is only closed on drop.
    unsafe impl Send for MappedRegion {}

    impl MappedRegion {
        /// Open the named mapping, returning `None` while it does not exist.
        pub(super) fn open() -> Option<Self> {
            let wide_name: Vec<u16> = OsStr::new(TELEMETRY_MAPPING_NAME)
                .encode_wide()
                .chain(std::iter::once(0))
                .collect();

            // SAFETY: Win32 calls with a valid, null-terminated UTF-16 name;
            // the handle is closed again on every failure path.
            unsafe {
                let handle = OpenFileMappingW(FILE_MAP_READ, 0, wide_name.as_ptr());
                if handle.is_null() {
                    return None;
                }

                let view =
                    MapViewOfFile(handle, FILE_MAP_READ, 0, 0, TELEMETRY_REGION_SIZE) as *const u8;
                if view.is_null() {
                    debug!("Telemetry mapping exists but the view could not be mapped");
                    CloseHandle(handle);
                    return None;
                }

                Some(Self { handle, view })
            }
        }
    }

    impl RawTelemetryRegion for MappedRegion {
        fn update_number(&self) -> u32 {
            // SAFETY: the view spans TELEMETRY_REGION_SIZE bytes and the
            // counter lies fully inside it; volatile because the game writes
            // concurrently.
            unsafe { ptr::read_volatile(self.view.add(OFF_UPDATE_NUMBER).cast::<u32>()) }
        }

        fn copy_record(&self, buf: &mut [u8; TELEMETRY_REGION_SIZE]) {
            // SAFETY: same bounds as above; a volatile read of the whole
            // window keeps the compiler from caching any part of it.
            *buf = unsafe { ptr::read_volatile(self.view.cast::<[u8; TELEMETRY_REGION_SIZE]>()) };
        }
    }

    impl Drop for MappedRegion {
        fn drop(&mut self) {
            // SAFETY: view and handle were produced by the matching Win32
            // calls in `open` and are released exactly once here.
            unsafe {
                UnmapViewOfFile(self.view.cast());
                CloseHandle(self.handle);
            }
        }
    }
}
