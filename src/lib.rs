// Library surface for headless/integration tests and reuse.
// The binary only adds terminal setup and the event loop.
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod generator;
pub mod logging;
pub mod round;
pub mod runtime;
pub mod speech;
pub mod stats;
pub mod timer;
pub mod ui;
pub mod util;
