pub mod advisor;
pub mod bankroll;
mod cards;
pub mod counter;
pub mod deviation;
mod error;
pub mod simulation;
pub mod strategy;

use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};
pub use cards::{DealerUpcard, HandState, Pip, Rank};
pub use error::BlackjackError;

/// What the caller is allowed to do with the current hand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Permissions {
    pub can_double: bool,
    pub can_split: bool,
    pub can_surrender: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Permissions {
            can_double: true,
            can_split: false,
            can_surrender: true,
        }
    }
}

impl Permissions {
    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::Double => self.can_double,
            Action::Split => self.can_split,
            Action::Surrender => self.can_surrender,
            Action::Hit | Action::Stand => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_enum_str, Deserialize_enum_str)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Hit,
    Stand,
    Double,
    Split,
    Surrender,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize_enum_str, Deserialize_enum_str)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// A single recommendation. Built fresh for every decision and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionRecord {
    pub action: Action,
    /// The action the static table recommended before any count-based override.
    pub basic_action: Action,
    pub true_count: f64,
    /// True count after clamping to the validated deviation range.
    pub clamped_true_count: f64,
    pub confidence: f64,
    pub deviation: bool,
    pub risk_level: RiskLevel,
    pub advantage: f64,
    pub take_insurance: bool,
    pub reasoning: String,
}
