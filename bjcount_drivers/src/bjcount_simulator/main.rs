mod simulation;

use anyhow::{bail, Context};
use bjcount_drivers::parse_config_from_file;
use clap::Parser;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "~/.bjcount.yml";

#[derive(Debug, Parser)]
#[command(author, about, long_about = None)]
struct CommandLineArgs {
    /// The path of the config file
    #[arg(short, long, default_value_t = String::from(DEFAULT_CONFIG_PATH))]
    config: String,

    /// Overrides the number of rounds in the config file
    #[arg(short, long)]
    rounds: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = CommandLineArgs::parse();
    if args.config == DEFAULT_CONFIG_PATH {
        let home_dir = home::home_dir().context("cannot find home directory")?;
        let config_file_path = home_dir.join(".bjcount.yml");
        if !config_file_path.exists() {
            bail!("config file {} does not exist", config_file_path.display());
        }
        if config_file_path.is_dir() {
            bail!("{} should be a file rather than a directory", config_file_path.display());
        }
        args.config = config_file_path.to_string_lossy().into_owned();
    }
    let args = args;

    let mut config = parse_config_from_file(&args.config)?;
    if let Some(rounds) = args.rounds {
        config.simulator.rounds = rounds;
    }

    let reports = simulation::run(&config)?;
    simulation::print_rankings(&reports);
    Ok(())
}
