//! One-shot decision requests from outside the process.
//!
//! A request carries a count snapshot rather than a live counter, so each call
//! rebuilds one with [`Counter::with_state`] and hands it to the deviation engine.

use serde::{Deserialize, Serialize};

use crate::{
    counter::{Counter, TrueCountPolicy},
    deviation::DeviationEngine,
    Action, BlackjackError, DealerUpcard, HandState, Permissions, RiskLevel,
};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRequest {
    /// Card values with the Ace as 11 (1 is accepted too).
    pub player_hand: Vec<u8>,
    pub dealer_upcard: u8,
    pub running_count: i32,
    pub cards_dealt: u32,
    pub num_decks: u32,
    #[serde(default = "default_true")]
    pub can_double: bool,
    #[serde(default)]
    pub can_split: bool,
    #[serde(default = "default_true")]
    pub can_surrender: bool,
}

impl DecisionRequest {
    pub fn permissions(&self) -> Permissions {
        Permissions {
            can_double: self.can_double,
            can_split: self.can_split,
            can_surrender: self.can_surrender,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionResponse {
    pub action: Action,
    pub basic_action: Action,
    pub confidence: f64,
    pub reasoning: String,
    pub true_count: f64,
    pub deviation: bool,
    pub advantage: f64,
    pub risk_level: RiskLevel,
    pub take_insurance: bool,
    pub deck_status: &'static str,
    pub betting_units: u32,
}

/// Validates `request` and runs it through `engine`.
pub fn advise_with(
    engine: &DeviationEngine,
    request: &DecisionRequest,
    policy: TrueCountPolicy,
) -> Result<DecisionResponse, BlackjackError> {
    let hand = HandState::from_values(&request.player_hand)?;
    let upcard = DealerUpcard::try_from(request.dealer_upcard)?;
    let counter = Counter::with_state(
        request.num_decks,
        request.running_count,
        request.cards_dealt,
        policy,
    )?;

    let record = engine.decide(&hand, upcard, &counter, request.permissions());
    Ok(DecisionResponse {
        action: record.action,
        basic_action: record.basic_action,
        confidence: record.confidence,
        reasoning: record.reasoning,
        true_count: record.true_count,
        deviation: record.deviation,
        advantage: record.advantage,
        risk_level: record.risk_level,
        take_insurance: record.take_insurance,
        deck_status: counter.deck_status().describe(),
        betting_units: counter.betting_units(),
    })
}

/// [`advise_with`] using the default engine and true-count policy.
pub fn advise(request: &DecisionRequest) -> Result<DecisionResponse, BlackjackError> {
    advise_with(
        &DeviationEngine::default(),
        request,
        TrueCountPolicy::default(),
    )
}
