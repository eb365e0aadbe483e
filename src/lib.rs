//! scan-camera library crate.
//!
//! Camera session management for the label scanning station, plus the
//! simulated media platform and the diagnostics used by the troubleshooter.

pub mod camera;
pub mod config;
pub mod diagnostics;
pub mod simulator;
