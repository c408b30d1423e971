use serde::Serialize;
use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};

use crate::bankroll::{BankrollConfig, BankrollManager, BankrollStats, HandResult};

/// Whether an agent consults the count when it plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_enum_str, Deserialize_enum_str)]
#[serde(rename_all = "snake_case")]
pub enum PlayStyle {
    /// Static chart only; bets as if the count were always zero.
    Basic,
    Counting,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AgentStats {
    pub hands_played: u64,
    pub wins: u64,
    pub losses: u64,
    pub pushes: u64,
    pub blackjacks: u64,
    pub busts: u64,
    pub deviations: u64,
    pub risk_reductions: u64,
}

impl AgentStats {
    pub fn record(&mut self, result: HandResult) {
        match result {
            HandResult::Win => self.wins += 1,
            HandResult::Loss => self.losses += 1,
            HandResult::Push => self.pushes += 1,
        }
    }

    /// Percentage of hands won.
    pub fn win_rate(&self) -> f64 {
        self.wins as f64 / self.hands_played.max(1) as f64 * 100.0
    }
}

/// One seat at the table. Each agent owns its bankroll outright.
pub struct Agent {
    name: String,
    style: PlayStyle,
    pub(crate) bankroll: BankrollManager,
    pub(crate) stats: AgentStats,
    pub(crate) broke: bool,
}

impl Agent {
    pub fn new(name: impl Into<String>, style: PlayStyle, bankroll: BankrollConfig) -> Self {
        Self::with_manager(name, style, BankrollManager::new(bankroll))
    }

    pub fn with_manager(name: impl Into<String>, style: PlayStyle, bankroll: BankrollManager) -> Self {
        Agent {
            name: name.into(),
            style,
            bankroll,
            stats: AgentStats::default(),
            broke: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn style(&self) -> PlayStyle {
        self.style
    }

    pub fn bankroll(&self) -> &BankrollManager {
        &self.bankroll
    }

    pub fn stats(&self) -> &AgentStats {
        &self.stats
    }

    pub fn is_broke(&self) -> bool {
        self.broke
    }

    pub fn report(&self) -> AgentReport {
        AgentReport {
            name: self.name.clone(),
            style: self.style,
            win_rate: self.stats.win_rate(),
            stats: self.stats,
            bankroll: self.bankroll.stats(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentReport {
    pub name: String,
    pub style: PlayStyle,
    pub win_rate: f64,
    pub stats: AgentStats,
    pub bankroll: BankrollStats,
}
