//! Configuration loading for the read-along engine.
//!
//! All tunable matching weights, thresholds and timing heuristics live here
//! and are loaded from `conf/config.toml` if present. Missing or invalid
//! entries fall back to defaults so playback can always proceed.

mod defaults;
mod io;
mod models;
mod tables;

pub use io::{load_config, parse_config, serialize_config};
pub use models::{AlignerConfig, LogLevel};
