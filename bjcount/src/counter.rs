//! Hi-Lo card counting.
//!
//! The counter only ever sees cards through [`Counter::update_count`]; it never
//! touches the shoe. Whoever reshuffles the shoe is responsible for calling
//! [`Counter::reset`] in the same step.

use std::collections::VecDeque;

use serde::Serialize;
use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};
use tracing::debug;

use crate::{simulation::shoe::CARDS_PER_DECK, BlackjackError, Rank};

pub const MAX_DECKS: u32 = 8;
const HISTORY_CAPACITY: usize = 100;
const ADVANTAGE_PER_TRUE_COUNT: f64 = 0.005;
const RICHNESS_WEIGHT: f64 = 0.001;
const MIN_ADVANTAGE: f64 = -0.02;
const MAX_ADVANTAGE: f64 = 0.05;
pub const INSURANCE_TRUE_COUNT: f64 = 3.0;
pub const DEFAULT_WONG_OUT_TRUE_COUNT: f64 = -2.0;

/// How many decks the true count divides by once the shoe is nearly through.
/// The choice materially shifts every true-count threshold, so it is explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_enum_str, Deserialize_enum_str)]
#[serde(rename_all = "snake_case")]
pub enum TrueCountPolicy {
    /// Never divide by less than one deck.
    OneDeck,
    /// Never divide by less than half a deck.
    HalfDeck,
}

impl Default for TrueCountPolicy {
    fn default() -> Self {
        TrueCountPolicy::OneDeck
    }
}

impl TrueCountPolicy {
    pub fn floor(&self) -> f64 {
        match self {
            TrueCountPolicy::OneDeck => 1.0,
            TrueCountPolicy::HalfDeck => 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CountState {
    pub running_count: i32,
    pub cards_seen: u32,
    pub total_cards: u32,
    pub aces_seen: u32,
    pub tens_seen: u32,
}

/// Qualitative reading of the true count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckStatus {
    VeryHot,
    Warm,
    Neutral,
    Cold,
    VeryCold,
}

impl DeckStatus {
    pub fn from_true_count(true_count: f64) -> Self {
        if true_count >= 3.0 {
            DeckStatus::VeryHot
        } else if true_count >= 1.0 {
            DeckStatus::Warm
        } else if true_count >= -1.0 {
            DeckStatus::Neutral
        } else if true_count >= -3.0 {
            DeckStatus::Cold
        } else {
            DeckStatus::VeryCold
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            DeckStatus::VeryHot => "very hot, high cards remaining",
            DeckStatus::Warm => "warm, slightly favorable",
            DeckStatus::Neutral => "neutral, balanced deck",
            DeckStatus::Cold => "cold, low cards remaining",
            DeckStatus::VeryCold => "very cold, avoid playing",
        }
    }
}

/// Betting ramp: (minimum true count, betting units). Below the first entry, sit out.
const BETTING_RAMP: [(f64, u32); 6] = [
    (-2.0, 1),
    (1.0, 2),
    (2.0, 4),
    (3.0, 8),
    (4.0, 12),
    (5.0, 16),
];

#[derive(Debug, Clone)]
pub struct Counter {
    number_of_decks: u8,
    policy: TrueCountPolicy,
    state: CountState,
    history: VecDeque<f64>,
}

impl Counter {
    pub fn new(number_of_decks: u8) -> Self {
        Self::with_policy(number_of_decks, TrueCountPolicy::default())
    }

    pub fn with_policy(number_of_decks: u8, policy: TrueCountPolicy) -> Self {
        Counter {
            number_of_decks,
            policy,
            state: CountState {
                total_cards: number_of_decks as u32 * CARDS_PER_DECK,
                ..Default::default()
            },
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    /// Rebuilds a counter from a snapshot taken elsewhere, e.g. a client that counted
    /// the cards itself. Ace and ten tallies are unknown, so they are assumed to match
    /// their expected share of the cards seen.
    pub fn with_state(
        number_of_decks: u32,
        running_count: i32,
        cards_seen: u32,
        policy: TrueCountPolicy,
    ) -> Result<Self, BlackjackError> {
        if number_of_decks == 0 || number_of_decks > MAX_DECKS {
            return Err(BlackjackError::InvalidDeckCount {
                got: number_of_decks,
                max: MAX_DECKS,
            });
        }
        let mut counter = Self::with_policy(number_of_decks as u8, policy);
        if cards_seen > counter.state.total_cards {
            return Err(BlackjackError::CardsDealtExceedShoe {
                dealt: cards_seen,
                total: counter.state.total_cards,
            });
        }
        counter.state.running_count = running_count;
        counter.state.cards_seen = cards_seen;
        counter.state.aces_seen = (cards_seen as f64 * 4.0 / CARDS_PER_DECK as f64).round() as u32;
        counter.state.tens_seen = (cards_seen as f64 * 16.0 / CARDS_PER_DECK as f64).round() as u32;
        Ok(counter)
    }

    /// Consumes dealt cards. Call with every card of a round before asking for the next
    /// decision, otherwise the advice reflects a stale shoe.
    pub fn update_count(&mut self, cards: &[Rank]) {
        for card in cards {
            self.state.cards_seen += 1;
            self.state.running_count += card.hi_lo();
            if card.is_ace() {
                self.state.aces_seen += 1;
            } else if card.value() == 10 {
                self.state.tens_seen += 1;
            }
        }
        if self.history.len() == HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(self.true_count());
    }

    pub fn state(&self) -> CountState {
        self.state
    }

    pub fn running_count(&self) -> i32 {
        self.state.running_count
    }

    pub fn cards_seen(&self) -> u32 {
        self.state.cards_seen
    }

    pub fn number_of_decks(&self) -> u8 {
        self.number_of_decks
    }

    pub fn policy(&self) -> TrueCountPolicy {
        self.policy
    }

    pub fn decks_remaining(&self) -> f64 {
        let unseen = self.state.total_cards as f64 - self.state.cards_seen as f64;
        (unseen / CARDS_PER_DECK as f64).max(self.policy.floor())
    }

    /// Running count per remaining deck, rounded to one decimal.
    pub fn true_count(&self) -> f64 {
        let true_count = self.state.running_count as f64 / self.decks_remaining();
        (true_count * 10.0).round() / 10.0
    }

    /// Percentage of the shoe seen so far.
    pub fn penetration(&self) -> f64 {
        if self.state.total_cards == 0 {
            return 0.0;
        }
        self.state.cards_seen as f64 / self.state.total_cards as f64 * 100.0
    }

    /// Estimated player edge as a fraction of the stake, in [-0.02, 0.05].
    ///
    /// Linear in the true count. Once more than a deck has been seen, a shortfall of
    /// seen Aces and tens against their expected frequency (i.e. a shoe rich in them)
    /// nudges the estimate upwards.
    pub fn betting_advantage(&self) -> f64 {
        let mut advantage = self.true_count() * ADVANTAGE_PER_TRUE_COUNT;
        let seen = self.state.cards_seen as f64;
        if self.state.cards_seen > CARDS_PER_DECK {
            let decks_seen = (seen / CARDS_PER_DECK as f64).max(1.0);
            let expected_aces = seen * 4.0 / CARDS_PER_DECK as f64;
            let expected_tens = seen * 16.0 / CARDS_PER_DECK as f64;
            let ace_richness = (expected_aces - self.state.aces_seen as f64) / decks_seen;
            let ten_richness = (expected_tens - self.state.tens_seen as f64) / decks_seen;
            advantage += (ace_richness + ten_richness) * RICHNESS_WEIGHT;
        }
        advantage.clamp(MIN_ADVANTAGE, MAX_ADVANTAGE)
    }

    pub fn insurance_decision(&self) -> bool {
        self.true_count() >= INSURANCE_TRUE_COUNT
    }

    pub fn deck_status(&self) -> DeckStatus {
        DeckStatus::from_true_count(self.true_count())
    }

    /// Whether the count is bad enough to leave the table.
    pub fn should_wong_out(&self, true_count_threshold: f64) -> bool {
        self.true_count() <= true_count_threshold
    }

    /// Betting units from the ramp. Zero means sit this round out.
    pub fn betting_units(&self) -> u32 {
        let true_count = self.true_count();
        let mut units = 0;
        for (threshold, ramp_units) in BETTING_RAMP {
            if true_count < threshold {
                break;
            }
            units = ramp_units;
        }
        units
    }

    /// True count after each `update_count` call, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &f64> {
        self.history.iter()
    }

    /// Forgets everything seen. Called exactly when the shoe is reshuffled.
    pub fn reset(&mut self) {
        debug!(
            running_count = self.state.running_count,
            cards_seen = self.state.cards_seen,
            "resetting count"
        );
        self.state = CountState {
            total_cards: self.state.total_cards,
            ..Default::default()
        };
    }
}
