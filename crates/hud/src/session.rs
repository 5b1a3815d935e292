//! Poll-driven HUD session: race state machine, rendering and shutdown.
//!
//! One [`Hud`] owns the telemetry feed and the keyboard for the lifetime of
//! the process. `tick` runs the per-frame pipeline (connectivity probe, feed
//! read, transition handling, mapping, device push); `shutdown` releases the
//! shared memory mapping and restores the device's own lighting exactly once
//! no matter how many exit paths reach it.

use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};
use trackglow_keyboard_rgb::RgbKeyboard;
use trackglow_lighting::{full_grid_off, map_to_keys};
use trackglow_telemetry_maniaplanet::{TelemetryFeed, TelemetrySnapshot};

/// Fixed tick period, ~60 updates per second.
pub const TICK_PERIOD: Duration = Duration::from_millis(1000 / 60);

/// Settle time before a device reset; resetting right after rapid key writes
/// trips a firmware race that leaves the keyboard dark.
pub const RESET_SETTLE_DELAY: Duration = Duration::from_millis(250);

/// What a tick did, mostly for the caller's logging and loop control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not in a race, nothing pushed to the device.
    Idle,
    /// In-race frame mapped and flushed.
    Rendered,
    /// NotInRace → InRace transition: all-off baseline written.
    RaceStarted,
    /// InRace → NotInRace transition: device reset issued.
    RaceEnded,
    /// The keyboard is gone; the session must shut down.
    DeviceLost,
}

/// HUD session state machine over a telemetry feed and a keyboard.
pub struct Hud<F, K> {
    // Taken (and thereby released) once during shutdown.
    feed: Option<F>,
    keyboard: K,
    in_race: bool,
    settle_delay: Duration,
    shutdown_done: bool,
}

impl<F: TelemetryFeed, K: RgbKeyboard> Hud<F, K> {
    pub fn new(feed: F, keyboard: K) -> Self {
        Self {
            feed: Some(feed),
            keyboard,
            in_race: false,
            settle_delay: RESET_SETTLE_DELAY,
            shutdown_done: false,
        }
    }

    /// Override the reset settle delay (tests run with zero).
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Run one frame of the HUD pipeline.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.keyboard.is_connected() {
            return TickOutcome::DeviceLost;
        }

        let snapshot = self.feed.as_mut().and_then(TelemetryFeed::try_read);
        let in_race = snapshot.as_ref().is_some_and(TelemetrySnapshot::is_in_race);

        if in_race != self.in_race {
            self.in_race = in_race;
            return if in_race {
                if let Some(snap) = &snapshot {
                    info!(map = %snap.game.map_name, model = %snap.game.player_model, "Race start");
                }
                // Clean baseline before any mapped colors; mapping begins on
                // the next tick.
                self.apply_baseline();
                TickOutcome::RaceStarted
            } else {
                info!("Race end");
                self.reset_device();
                TickOutcome::RaceEnded
            };
        }

        match snapshot {
            Some(snap) if in_race => {
                self.render(&snap);
                TickOutcome::Rendered
            }
            _ => TickOutcome::Idle,
        }
    }

    /// Release the feed mapping and restore the device lighting.
    ///
    /// Idempotent: reachable from device loss, termination request and normal
    /// loop exit, but the release steps run once.
    pub fn shutdown(&mut self) {
        if self.shutdown_done {
            return;
        }
        self.shutdown_done = true;

        // Dropping the feed unmaps the shared memory view and closes the
        // mapping handle.
        self.feed.take();
        self.reset_device();
    }

    fn apply_baseline(&mut self) {
        for key in full_grid_off() {
            if let Err(e) = self
                .keyboard
                .set_key(key.row, key.col, key.color.r, key.color.g, key.color.b)
            {
                debug!("Baseline write failed: {e}");
            }
        }
        if let Err(e) = self.keyboard.flush() {
            warn!("Baseline flush failed: {e}");
        }
    }

    fn render(&mut self, snapshot: &TelemetrySnapshot) {
        for key in map_to_keys(snapshot) {
            if let Err(e) = self
                .keyboard
                .set_key(key.row, key.col, key.color.r, key.color.g, key.color.b)
            {
                debug!("Key write failed: {e}");
            }
        }
        // One explicit flush so the frame lands atomically on the device.
        if let Err(e) = self.keyboard.flush() {
            warn!("Frame flush failed: {e}");
        }
    }

    fn reset_device(&mut self) {
        if !self.settle_delay.is_zero() {
            thread::sleep(self.settle_delay);
        }
        match self.keyboard.reset() {
            Ok(()) => info!("Keyboard lighting restored"),
            Err(e) => warn!("Failed to restore keyboard lighting: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use trackglow_keyboard_rgb::mock::{MockKeyboard, MockOp};
    use trackglow_lighting::{GRID_COLS, GRID_ROWS};
    use trackglow_telemetry_maniaplanet::{GameState, RaceState};

    /// Feed that replays a fixed sequence of frames, then reports
    /// unavailable.
    struct ScriptedFeed {
        frames: VecDeque<Option<TelemetrySnapshot>>,
    }

    impl ScriptedFeed {
        fn new(frames: Vec<Option<TelemetrySnapshot>>) -> Self {
            Self {
                frames: frames.into(),
            }
        }
    }

    impl TelemetryFeed for ScriptedFeed {
        fn try_read(&mut self) -> Option<TelemetrySnapshot> {
            self.frames.pop_front().flatten()
        }
    }

    fn racing_snapshot() -> TelemetrySnapshot {
        let mut snap = TelemetrySnapshot::default();
        snap.game.state = GameState::Running;
        snap.game.player_model = "StadiumCar".to_string();
        snap.race.state = RaceState::Running;
        snap.vehicle.engine_rpm = 5_500.0;
        snap
    }

    fn menu_snapshot() -> TelemetrySnapshot {
        let mut snap = racing_snapshot();
        snap.game.state = GameState::Menus;
        snap
    }

    fn hud_with(
        frames: Vec<Option<TelemetrySnapshot>>,
    ) -> Hud<ScriptedFeed, MockKeyboard> {
        Hud::new(ScriptedFeed::new(frames), MockKeyboard::new())
            .with_settle_delay(Duration::ZERO)
    }

    fn grid_size() -> usize {
        usize::from(GRID_ROWS) * usize::from(GRID_COLS)
    }

    #[test]
    fn test_unavailable_feed_is_idle() {
        let mut hud = hud_with(vec![None, None]);
        assert_eq!(hud.tick(), TickOutcome::Idle);
        assert_eq!(hud.tick(), TickOutcome::Idle);
        assert!(hud.keyboard.ops.is_empty());
    }

    #[test]
    fn test_menu_snapshot_is_idle() {
        let mut hud = hud_with(vec![Some(menu_snapshot())]);
        assert_eq!(hud.tick(), TickOutcome::Idle);
        assert!(hud.keyboard.ops.is_empty());
    }

    #[test]
    fn test_race_start_emits_baseline_before_mapped_colors() {
        let mut hud = hud_with(vec![Some(racing_snapshot()), Some(racing_snapshot())]);

        assert_eq!(hud.tick(), TickOutcome::RaceStarted);
        // The transition tick writes the full all-off grid plus one flush and
        // nothing else.
        assert_eq!(hud.keyboard.ops.len(), grid_size() + 1);
        assert_eq!(hud.keyboard.set_keys(), grid_size());
        assert!(hud.keyboard.ops[..grid_size()]
            .iter()
            .all(|op| matches!(op, MockOp::SetKey { rgb: (0, 0, 0), .. })));
        assert_eq!(hud.keyboard.ops[grid_size()], MockOp::Flush);

        // Mapped colors only start on the next tick.
        assert_eq!(hud.tick(), TickOutcome::Rendered);
        assert_eq!(hud.keyboard.flushes(), 2);
        assert!(hud
            .keyboard
            .ops
            .iter()
            .any(|op| matches!(op, MockOp::SetKey { rgb, .. } if *rgb != (0, 0, 0))));
    }

    #[test]
    fn test_race_end_resets_device() {
        let mut hud = hud_with(vec![Some(racing_snapshot()), None]);
        assert_eq!(hud.tick(), TickOutcome::RaceStarted);
        assert_eq!(hud.tick(), TickOutcome::RaceEnded);
        assert_eq!(hud.keyboard.resets(), 1);
    }

    #[test]
    fn test_finished_race_counts_as_race_end() {
        let mut finished = racing_snapshot();
        finished.race.state = RaceState::Finished;
        let mut hud = hud_with(vec![Some(racing_snapshot()), Some(finished)]);
        assert_eq!(hud.tick(), TickOutcome::RaceStarted);
        assert_eq!(hud.tick(), TickOutcome::RaceEnded);
    }

    #[test]
    fn test_disconnected_device_stops_session() {
        let mut hud = hud_with(vec![Some(racing_snapshot())]);
        hud.keyboard.disconnected = true;
        assert_eq!(hud.tick(), TickOutcome::DeviceLost);
        assert!(hud.keyboard.ops.is_empty());
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let mut hud = hud_with(vec![]);
        hud.shutdown();
        hud.shutdown();
        assert_eq!(hud.keyboard.resets(), 1);
        assert!(hud.feed.is_none());
    }

    #[test]
    fn test_shutdown_after_race_end_resets_again_only_once() {
        let mut hud = hud_with(vec![Some(racing_snapshot()), None]);
        hud.tick();
        hud.tick();
        assert_eq!(hud.keyboard.resets(), 1);
        hud.shutdown();
        hud.shutdown();
        assert_eq!(hud.keyboard.resets(), 2);
    }

    #[test]
    fn test_failed_reset_is_not_fatal() {
        let mut hud = hud_with(vec![Some(racing_snapshot()), None, None]);
        hud.keyboard.fail_reset = true;
        hud.tick();
        assert_eq!(hud.tick(), TickOutcome::RaceEnded);
        // The session keeps polling after a refused reset.
        assert_eq!(hud.tick(), TickOutcome::Idle);
    }

    #[test]
    fn test_rendered_frame_flushes_once() {
        let mut hud = hud_with(vec![Some(racing_snapshot()), Some(racing_snapshot())]);
        hud.tick();
        let flushes_after_baseline = hud.keyboard.flushes();
        hud.tick();
        assert_eq!(hud.keyboard.flushes(), flushes_after_baseline + 1);
    }
}
