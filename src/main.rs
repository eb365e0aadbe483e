mod cli;

use clap::Parser;
use cli::{Args, Command};
use scan_camera::config::Config;

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn load_config(args: &Args) -> Config {
    match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let result = match &args.command {
        Command::ListCameras => cli::list_cameras(&load_config(&args)).await,
        Command::Diagnose(diagnose_args) => {
            match cli::diagnose(load_config(&args), diagnose_args).await {
                Ok(true) => Ok(()),
                Ok(false) => std::process::exit(2),
                Err(e) => Err(e),
            }
        }
        Command::Config { action } => {
            cli::handle_config_action(action.clone(), args.config.as_deref())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
