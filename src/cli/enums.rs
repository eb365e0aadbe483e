//! CLI enum types for output format and facing mode options.

use clap::ValueEnum;

use scan_camera::camera::FacingMode;

/// How `diagnose` prints its report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Requested camera facing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Facing {
    User,
    Environment,
    Left,
    Right,
}

impl From<Facing> for FacingMode {
    fn from(f: Facing) -> Self {
        match f {
            Facing::User => FacingMode::User,
            Facing::Environment => FacingMode::Environment,
            Facing::Left => FacingMode::Left,
            Facing::Right => FacingMode::Right,
        }
    }
}
