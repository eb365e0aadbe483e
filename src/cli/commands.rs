//! Subcommand handlers for list-cameras, diagnose and config actions.

use std::error::Error;
use std::path::Path;

use scan_camera::camera::{CameraSession, SessionOptions};
use scan_camera::config::{default_path, Config, DEFAULT_CONFIG};
use scan_camera::diagnostics::run_diagnosis;
use scan_camera::simulator::SimulatedPlatform;

use super::args::{ConfigAction, DiagnoseArgs};
use super::enums::OutputFormat;

fn open_session(config: &Config) -> CameraSession<SimulatedPlatform> {
    CameraSession::new(
        SimulatedPlatform::from_config(&config.simulator),
        config.camera.session_options(),
    )
}

/// List available cameras and print them to stdout.
pub async fn list_cameras(config: &Config) -> Result<(), Box<dyn Error>> {
    let mut session = open_session(config);
    session.initialize().await?;

    let devices = session.devices();
    if devices.is_empty() {
        println!("No cameras found.");
        println!();
        println!("Make sure your camera is connected and no other application is using it.");
        return Ok(());
    }

    println!("Available cameras:");
    for (i, device) in devices.iter().enumerate() {
        let marker = if session.selected_device_id() == Some(device.device_id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "  {} [{}] {} ({})",
            marker,
            i,
            device.display_label(i),
            device.device_id
        );
    }
    println!();
    println!("Use --device <id> to select a camera.");
    Ok(())
}

/// Apply `diagnose` flags on top of the loaded configuration.
pub fn apply_overrides(mut config: Config, args: &DiagnoseArgs) -> Config {
    if let Some(device) = &args.device {
        config.camera.device = Some(device.clone());
    }
    if let Some(name) = &args.fail {
        config.simulator.acquire_failure = Some(name.clone());
    }
    if args.insecure {
        config.simulator.secure_context = false;
    }
    if let Some(facing) = args.facing {
        config.camera.facing_mode = Some(facing.into());
    }
    config
}

/// Run a diagnostic session and print the report.
///
/// Returns whether the camera came up without error.
pub async fn diagnose(config: Config, args: &DiagnoseArgs) -> Result<bool, Box<dyn Error>> {
    let config = apply_overrides(config, args);
    let mut session = open_session(&config);
    let report = run_diagnosis(&mut session).await;

    match args.format {
        OutputFormat::Text => print!("{}", report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if session.is_active() {
        if args.format == OutputFormat::Text {
            println!();
            println!("Camera is active and working properly.");
        }
        if args.hold {
            println!("Press Ctrl-C to release the camera.");
            tokio::signal::ctrl_c().await?;
            session.teardown();
        } else {
            session.stop();
        }
    }

    Ok(report.last_error.is_none())
}

/// Handle config subcommand actions.
pub fn handle_config_action(
    action: ConfigAction,
    path: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(default_path);
    match action {
        ConfigAction::Show => {
            let config = Config::load(path)?;
            let options: SessionOptions = config.camera.session_options();
            println!("Current configuration:");
            println!(
                "  Device: {}",
                options.preferred_device.as_deref().unwrap_or("(first found)")
            );
            let requested = options.video.to_string();
            println!(
                "  Requested: {}",
                if requested.is_empty() { "(any)" } else { requested.as_str() }
            );
            match options.acquire_timeout {
                Some(t) => println!("  Acquire timeout: {} ms", t.as_millis()),
                None => println!("  Acquire timeout: none"),
            }
            println!(
                "  Secure context: {}",
                if config.simulator.secure_context { "yes" } else { "no" }
            );
            println!("  Simulated devices: {}", config.simulator.devices.len());
            println!();

            if config_path.exists() {
                println!("Config file: {} (exists)", config_path.display());
            } else {
                println!("Config file: {} (not found)", config_path.display());
            }
        }
        ConfigAction::Init => {
            if config_path.exists() {
                return Err(format!(
                    "Config file already exists: {}\nUse 'scan-camera config show' to view current settings.",
                    config_path.display()
                )
                .into());
            }

            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&config_path, DEFAULT_CONFIG)?;

            println!("Created config file: {}", config_path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::enums::Facing;
    use scan_camera::camera::FacingMode;

    #[test]
    fn test_apply_overrides() {
        let args = DiagnoseArgs {
            device: Some("rear".to_string()),
            fail: Some("AbortError".to_string()),
            insecure: true,
            facing: Some(Facing::User),
            ..DiagnoseArgs::default()
        };
        let config = apply_overrides(Config::default(), &args);
        assert_eq!(config.camera.device.as_deref(), Some("rear"));
        assert_eq!(config.simulator.acquire_failure.as_deref(), Some("AbortError"));
        assert!(!config.simulator.secure_context);
        assert_eq!(config.camera.facing_mode, Some(FacingMode::User));
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let config = apply_overrides(Config::default(), &DiagnoseArgs::default());
        assert!(config.camera.device.is_none());
        assert!(config.simulator.secure_context);
        assert!(config.simulator.acquire_failure.is_none());
    }

    #[test]
    fn test_config_init_writes_parseable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        handle_config_action(ConfigAction::Init, Some(path.as_path())).unwrap();
        assert!(Config::load(Some(path.as_path())).is_ok());

        let err = handle_config_action(ConfigAction::Init, Some(path.as_path())).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}
