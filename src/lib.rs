// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod config;
pub mod generator;
pub mod round;
pub mod runtime;
pub mod watcher;

/// Tick rate shared by the event loop and the round engine's timers.
pub const TICK_RATE_MS: u64 = 100;
