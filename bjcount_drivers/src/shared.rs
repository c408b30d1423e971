use anyhow::Context;
use bjcount::{
    bankroll::BankrollConfig,
    deviation::{DeviationConfig, DEFAULT_MIN_CONFIDENCE},
    simulation::{
        agent::{Agent, PlayStyle},
        TableConfig,
    },
};
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub table: ConfigTable,
    pub agents: Vec<ConfigAgent>,
    pub simulator: ConfigSimulator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigTable {
    pub number_of_decks: u8,
    pub penetration_threshold: f64,
    pub true_count_policy: String,
    pub max_deviation_tc: f64,
}

impl TryInto<TableConfig> for ConfigTable {
    type Error = serde::de::value::Error;

    fn try_into(self) -> Result<TableConfig, Self::Error> {
        let table_config = TableConfig {
            number_of_decks: self.number_of_decks,
            penetration_threshold: self.penetration_threshold,
            true_count_policy: self.true_count_policy.parse()?,
            deviation: DeviationConfig {
                max_deviation_tc: self.max_deviation_tc,
                min_confidence_threshold: DEFAULT_MIN_CONFIDENCE,
            },
            ..Default::default()
        };

        Ok(table_config)
    }
}

fn default_sizing() -> String {
    String::from("standard_kelly")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigAgent {
    pub name: String,
    pub initial_bankroll: f64,
    pub risk_profile: String,
    pub unit_percentage: f64,
    pub min_bet: f64,
    pub max_bet: f64,
    pub counting: bool,
    #[serde(default = "default_sizing")]
    pub sizing: String,
}

impl TryInto<Agent> for ConfigAgent {
    type Error = serde::de::value::Error;

    fn try_into(self) -> Result<Agent, Self::Error> {
        let bankroll = BankrollConfig {
            initial_bankroll: self.initial_bankroll,
            unit_percentage: self.unit_percentage,
            min_bet: self.min_bet,
            max_bet: self.max_bet,
            risk_profile: self.risk_profile.parse()?,
            sizing: self.sizing.parse()?,
        };
        let style = if self.counting {
            PlayStyle::Counting
        } else {
            PlayStyle::Basic
        };

        Ok(Agent::new(self.name, style, bankroll))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSimulator {
    pub rounds: u64,
    pub log_interval: u64,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Config {
    /// Table settings with the simulator seed applied.
    pub fn table_config(&self) -> Result<TableConfig, serde::de::value::Error> {
        let mut table_config: TableConfig = self.table.clone().try_into()?;
        table_config.seed = self.simulator.seed;
        Ok(table_config)
    }

    pub fn agents(&self) -> Result<Vec<Agent>, serde::de::value::Error> {
        self.agents.iter().cloned().map(|agent| agent.try_into()).collect()
    }
}

/// Reads the content of a given config file and parses it to a Config.
pub fn parse_config_from_file(filename: &str) -> anyhow::Result<Config> {
    let file_content =
        fs::read_to_string(filename).with_context(|| format!("cannot read {}", filename))?;
    serde_yaml::from_str(&file_content).with_context(|| format!("cannot parse {}", filename))
}
