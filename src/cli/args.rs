//! CLI argument parsing with clap.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use super::enums::{Facing, OutputFormat};

/// Camera troubleshooter for the label scanning station
#[derive(Parser, Debug)]
#[command(name = "scan-camera")]
#[command(version, about = "Camera troubleshooter for the label scanning station", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List available cameras
    ListCameras,
    /// Start a camera session and print a troubleshooting report
    Diagnose(DiagnoseArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(ClapArgs, Debug, Default)]
pub struct DiagnoseArgs {
    /// Camera device id (from list-cameras)
    #[arg(long, short)]
    pub device: Option<String>,

    /// Make the stream request fail with this platform failure name
    #[arg(long, value_name = "NAME")]
    pub fail: Option<String>,

    /// Pretend the host context is not secure
    #[arg(long)]
    pub insecure: bool,

    /// Requested facing mode
    #[arg(long)]
    pub facing: Option<Facing>,

    /// Report format
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    /// Keep the camera running until Ctrl-C
    #[arg(long)]
    pub hold: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_list_cameras_subcommand() {
        let args = Args::parse_from(["scan-camera", "list-cameras"]);
        assert!(matches!(args.command, Command::ListCameras));
        assert!(args.config.is_none());
        assert!(!args.verbose);
    }

    #[test]
    fn test_args_diagnose_defaults() {
        let args = Args::parse_from(["scan-camera", "diagnose"]);
        match args.command {
            Command::Diagnose(d) => {
                assert!(d.device.is_none());
                assert!(d.fail.is_none());
                assert!(!d.insecure);
                assert!(d.facing.is_none());
                assert_eq!(d.format, OutputFormat::Text);
                assert!(!d.hold);
            }
            _ => panic!("Expected Diagnose subcommand"),
        }
    }

    #[test]
    fn test_args_diagnose_options() {
        let args = Args::parse_from([
            "scan-camera",
            "diagnose",
            "--device",
            "label-scanner-01",
            "--fail",
            "NotAllowedError",
            "--insecure",
            "--facing",
            "environment",
            "--format",
            "json",
            "--hold",
        ]);
        match args.command {
            Command::Diagnose(d) => {
                assert_eq!(d.device.as_deref(), Some("label-scanner-01"));
                assert_eq!(d.fail.as_deref(), Some("NotAllowedError"));
                assert!(d.insecure);
                assert_eq!(d.facing, Some(Facing::Environment));
                assert_eq!(d.format, OutputFormat::Json);
                assert!(d.hold);
            }
            _ => panic!("Expected Diagnose subcommand"),
        }
    }

    #[test]
    fn test_args_global_options_after_subcommand() {
        let args = Args::parse_from(["scan-camera", "diagnose", "-c", "/tmp/test.toml", "-v"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/test.toml")));
        assert!(args.verbose);
    }

    #[test]
    fn test_args_config_show_subcommand() {
        let args = Args::parse_from(["scan-camera", "config", "show"]);
        match args.command {
            Command::Config {
                action: ConfigAction::Show,
            } => (),
            _ => panic!("Expected Config Show subcommand"),
        }
    }

    #[test]
    fn test_args_config_init_subcommand() {
        let args = Args::parse_from(["scan-camera", "--config", "/tmp/c.toml", "config", "init"]);
        match args.command {
            Command::Config {
                action: ConfigAction::Init,
            } => (),
            _ => panic!("Expected Config Init subcommand"),
        }
        assert_eq!(args.config, Some(PathBuf::from("/tmp/c.toml")));
    }
}
