// FILE: crates/cli/src/main.rs

use anyhow::{Context, Result};
use carlot_config::ConfigManager;
use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;

mod commands;

fn build_cli() -> Command {
    Command::new("carlot")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Offline-first client for the car inventory server")
        .arg(
            Arg::new("config-dir")
                .short('c')
                .long("config-dir")
                .value_name("DIR")
                .help("Directory holding config.toml (defaults to the platform config directory)")
                .global(true),
        )
        .subcommand(Command::new("init").about("Write a default config file"))
        .subcommand(
            Command::new("list")
                .about("List vehicles stored on the server")
                .arg(
                    Arg::new("all")
                        .short('a')
                        .long("all")
                        .help("Keep loading pages until the collection is exhausted")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("add")
                .about("Add a vehicle")
                .arg(Arg::new("brand").required(true).value_name("BRAND"))
                .arg(Arg::new("model").required(true).value_name("MODEL"))
                .arg(
                    Arg::new("year")
                        .required(true)
                        .value_name("YEAR")
                        .value_parser(clap::value_parser!(i32)),
                )
                .arg(
                    Arg::new("latitude")
                        .long("lat")
                        .value_name("DEGREES")
                        .allow_negative_numbers(true)
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    Arg::new("longitude")
                        .long("lon")
                        .value_name("DEGREES")
                        .allow_negative_numbers(true)
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    Arg::new("photo")
                        .short('p')
                        .long("photo")
                        .value_name("FILE")
                        .help("Image file attached to the listing"),
                ),
        )
        .subcommand(
            Command::new("watch")
                .about("Follow the collection live, queueing edits while offline"),
        )
}

fn config_manager(config_dir: Option<&String>) -> Result<ConfigManager> {
    match config_dir {
        Some(dir) => Ok(ConfigManager::with_directory(PathBuf::from(dir))),
        None => ConfigManager::new().context("Failed to locate config directory"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();
    let manager = config_manager(matches.get_one::<String>("config-dir"))?;
    let config = match manager.load_with_env_overrides() {
        Ok(config) => config,
        Err(e) if e.allows_defaults() => {
            eprintln!("Config error: {}, using defaults", e);
            carlot_config::Config::default()
        }
        Err(e) => return Err(e).context("Cannot use config file"),
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.app.log_level.as_filter()),
    )
    .init();

    match matches.subcommand() {
        Some(("init", _)) => commands::init(&manager),
        Some(("list", sub_matches)) => commands::list_vehicles(&config, sub_matches.get_flag("all")).await,
        Some(("add", sub_matches)) => commands::add_vehicle(&config, sub_matches).await,
        Some(("watch", _)) => commands::watch(&config).await,
        _ => {
            build_cli().print_help()?;
            Ok(())
        }
    }
}
