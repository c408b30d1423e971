use std::{fs, io::Read};

use anyhow::Context;
use bjcount::{
    advisor::{advise_with, DecisionRequest},
    counter::TrueCountPolicy,
    deviation::{DeviationConfig, DeviationEngine, DEFAULT_MAX_DEVIATION_TC},
    strategy::StrategyTable,
};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, about, long_about = None)]
struct CommandLineArgs {
    /// JSON file holding the decision request. Reads stdin when omitted
    #[arg(short, long)]
    request: Option<String>,

    /// True-count policy: one_deck or half_deck
    #[arg(short, long, default_value_t = String::from("one_deck"))]
    policy: String,

    /// True counts beyond this magnitude are clamped before deviation lookup
    #[arg(long, default_value_t = DEFAULT_MAX_DEVIATION_TC)]
    max_deviation_tc: f64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = CommandLineArgs::parse();
    let policy: TrueCountPolicy = args
        .policy
        .parse()
        .with_context(|| format!("unknown true count policy {}", args.policy))?;

    let raw = match &args.request {
        Some(path) => fs::read_to_string(path).with_context(|| format!("cannot read {}", path))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("cannot read request from stdin")?;
            buffer
        }
    };
    let request: DecisionRequest =
        serde_json::from_str(&raw).context("request is not a valid decision request")?;
    debug!(?request, "received request");

    let engine = DeviationEngine::new(
        StrategyTable::new(),
        DeviationConfig {
            max_deviation_tc: args.max_deviation_tc,
            ..Default::default()
        },
    );
    let response = advise_with(&engine, &request, policy)?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
