//! glowd, an ambient keyboard HUD for ManiaPlanet on Wooting RGB keyboards.
//!
//! Polls the game's shared memory telemetry at ~60 Hz and paints gear, RPM,
//! steering, braking, turbo, headlights, wheel and in-water state onto the
//! per-key RGB grid while a race is running. No flags, no config file; log
//! filtering comes from the environment (`RUST_LOG`).
//!
//! Exit codes: 0 on graceful shutdown, 1 when the keyboard (or its RGB
//! control library) is not detected at startup.

mod session;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use trackglow_keyboard_rgb::wooting::WOOTING_RGB_LIBRARY;
use trackglow_keyboard_rgb::{RgbKeyboard, WootingKeyboard};
use trackglow_telemetry_maniaplanet::SharedMemoryFeed;

use crate::session::{Hud, TICK_PERIOD, TickOutcome};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting TrackGlow HUD v{}", env!("CARGO_PKG_VERSION"));

    let mut keyboard = match WootingKeyboard::load(Path::new(WOOTING_RGB_LIBRARY)) {
        Ok(keyboard) => keyboard,
        Err(e) => {
            error!("Wooting RGB control library unavailable: {e}");
            return ExitCode::from(1);
        }
    };

    if !keyboard.is_connected() {
        error!("Wooting keyboard not detected, stopping");
        return ExitCode::from(1);
    }
    info!("Wooting keyboard detected");

    // Frames are flushed explicitly, one per tick.
    if let Err(e) = keyboard.set_auto_update(false) {
        warn!("Failed to disable device auto-update: {e}");
    }

    // Covers Ctrl-C, Ctrl-Break and console close. The handler only flags
    // the request; releasing resources happens on the loop's own thread
    // after the current tick.
    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        if let Err(e) = ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst)) {
            warn!("Failed to install termination handler: {e}");
        }
    }

    let mut hud = Hud::new(SharedMemoryFeed::new(), keyboard);

    while !stop.load(Ordering::SeqCst) {
        thread::sleep(TICK_PERIOD);
        if hud.tick() == TickOutcome::DeviceLost {
            warn!("Keyboard disconnected, stopping");
            break;
        }
    }

    info!("Stopping TrackGlow HUD");
    hud.shutdown();

    ExitCode::SUCCESS
}
