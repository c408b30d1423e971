//! Bet sizing and bankroll tracking.
//!
//! A [`BankrollManager`] owns one player's money. How a true count turns into a
//! stake is delegated to a [`BetSizer`], so the Kelly variants can be swapped per
//! agent without touching the bookkeeping.

use std::collections::VecDeque;

use serde::Serialize;
use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};
use strum_macros::EnumIter;
use tracing::{debug, warn};

const BANKROLL_HISTORY_CAPACITY: usize = 100;
const BET_HISTORY_CAPACITY: usize = 1000;
const RECENT_BETS: usize = 50;

pub const BASE_WIN_PROBABILITY: f64 = 0.47;
pub const BASE_BLACKJACK_PROBABILITY: f64 = 0.048;
pub const DEFAULT_BROKE_THRESHOLD: f64 = 10.0;

const DEFAULT_VOLATILITY: f64 = 0.1;
const VOLATILITY_MIN_SAMPLES: usize = 10;
const RISK_REDUCTION_MIN_SAMPLES: usize = 20;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Serialize_enum_str, Deserialize_enum_str,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskProfile {
    UltraConservative,
    Conservative,
    Moderate,
    Aggressive,
    VeryAggressive,
}

impl Default for RiskProfile {
    fn default() -> Self {
        RiskProfile::Moderate
    }
}

impl RiskProfile {
    /// Multiplier applied to the raw Kelly fraction.
    pub fn kelly_multiplier(&self) -> f64 {
        match self {
            RiskProfile::UltraConservative => 0.25,
            RiskProfile::Conservative => 0.5,
            RiskProfile::Moderate => 0.75,
            RiskProfile::Aggressive => 1.0,
            RiskProfile::VeryAggressive => 1.25,
        }
    }

    /// Cap on the true-count scaling, in betting units.
    pub fn max_units(&self) -> f64 {
        match self {
            RiskProfile::UltraConservative => 1.5,
            RiskProfile::Conservative => 2.0,
            RiskProfile::Moderate => 4.0,
            RiskProfile::Aggressive => 6.0,
            RiskProfile::VeryAggressive => 8.0,
        }
    }

    pub fn tc_sensitivity(&self) -> f64 {
        match self {
            RiskProfile::UltraConservative => 0.3,
            RiskProfile::Conservative => 0.4,
            RiskProfile::Moderate => 0.5,
            RiskProfile::Aggressive => 0.7,
            RiskProfile::VeryAggressive => 0.8,
        }
    }

    /// Scales a Kelly fraction by the profile multiplier and, for positive counts,
    /// by `1 + tc * sensitivity` capped at `max_units`.
    fn scale(&self, kelly_fraction: f64, true_count: f64) -> f64 {
        let mut fraction = kelly_fraction * self.kelly_multiplier();
        if true_count > 0.0 {
            fraction *= (1.0 + true_count * self.tc_sensitivity()).min(self.max_units());
        }
        fraction
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_enum_str, Deserialize_enum_str)]
#[serde(rename_all = "snake_case")]
pub enum SizingMethod {
    StandardKelly,
    TrueCountKelly,
}

impl Default for SizingMethod {
    fn default() -> Self {
        SizingMethod::StandardKelly
    }
}

impl SizingMethod {
    pub fn sizer(&self) -> Box<dyn BetSizer> {
        match self {
            SizingMethod::StandardKelly => Box::new(StandardKelly),
            SizingMethod::TrueCountKelly => Box::new(TrueCountKelly),
        }
    }
}

/// Everything a sizer needs to know about the table and the player's money.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingInput {
    pub true_count: f64,
    pub win_probability: f64,
    pub blackjack_probability: f64,
    /// Fraction of the shoe still undealt, in [0, 1].
    pub cards_remaining_ratio: f64,
    pub bankroll: f64,
    pub base_unit: f64,
    pub min_bet: f64,
    pub max_bet: f64,
    pub profile: RiskProfile,
}

/// Turns a count and a bankroll into a stake.
pub trait BetSizer: Send + Sync {
    fn bet_size(&self, input: &SizingInput) -> f64;
    fn method(&self) -> SizingMethod;
    /// Largest share of the bankroll a single stake may take.
    fn max_bankroll_share(&self) -> f64;
}

/// Expected value per unit staked, with a blackjack paying an extra half unit.
fn expected_value(win_probability: f64, blackjack_probability: f64) -> f64 {
    win_probability + blackjack_probability * 0.5
        - (1.0 - win_probability - blackjack_probability)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StandardKelly;

impl StandardKelly {
    const NEGATIVE_EV_FRACTION: f64 = 0.1;
    const MAX_BANKROLL_SHARE: f64 = 0.2;
}

impl BetSizer for StandardKelly {
    fn bet_size(&self, input: &SizingInput) -> f64 {
        if input.bankroll <= 0.0 {
            return 0.0;
        }
        let win_probability = (input.win_probability + input.true_count * 0.005).min(0.52);
        let ev = expected_value(win_probability, input.blackjack_probability);
        let kelly_fraction = if ev <= 0.0 {
            Self::NEGATIVE_EV_FRACTION
        } else {
            ev
        };
        let fraction = input.profile.scale(kelly_fraction, input.true_count);

        let bet = (input.base_unit * fraction)
            .min(input.max_bet)
            .max(input.min_bet)
            .min(input.bankroll * Self::MAX_BANKROLL_SHARE);
        round2(bet)
    }

    fn method(&self) -> SizingMethod {
        SizingMethod::StandardKelly
    }

    fn max_bankroll_share(&self) -> f64 {
        Self::MAX_BANKROLL_SHARE
    }
}

/// Kelly sizing driven by a house-edge-adjusted advantage, with a small bonus deep
/// in the shoe and a tighter bankroll cap.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrueCountKelly;

impl TrueCountKelly {
    const DISADVANTAGE_FRACTION: f64 = 0.05;
    const MAX_BANKROLL_SHARE: f64 = 0.15;

    pub fn advantage(true_count: f64) -> f64 {
        if true_count <= 0.0 {
            -0.005
        } else {
            true_count * 0.005 - 0.005
        }
    }
}

impl BetSizer for TrueCountKelly {
    fn bet_size(&self, input: &SizingInput) -> f64 {
        if input.bankroll <= 0.0 {
            return 0.0;
        }
        let tc = input.true_count;
        let win_probability = if tc > 0.0 {
            (BASE_WIN_PROBABILITY + tc * 0.005).min(0.52)
        } else {
            (BASE_WIN_PROBABILITY + tc * 0.003).max(0.42)
        };
        let blackjack_probability = (BASE_BLACKJACK_PROBABILITY + (tc * 0.002).max(0.0)).min(0.055);

        let kelly_fraction = if Self::advantage(tc) <= 0.0 {
            Self::DISADVANTAGE_FRACTION
        } else {
            expected_value(win_probability, blackjack_probability)
        };
        let fraction = input.profile.scale(kelly_fraction, tc);

        let penetration_bonus = 1.0 + (input.cards_remaining_ratio - 0.5).max(0.0) * 0.2;
        let bet = (input.base_unit * fraction * penetration_bonus)
            .min(input.max_bet)
            .max(input.min_bet)
            .min(input.bankroll * Self::MAX_BANKROLL_SHARE);
        round2(bet)
    }

    fn method(&self) -> SizingMethod {
        SizingMethod::TrueCountKelly
    }

    fn max_bankroll_share(&self) -> f64 {
        Self::MAX_BANKROLL_SHARE
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BankrollConfig {
    pub initial_bankroll: f64,
    /// Base betting unit as a percentage of the current bankroll.
    pub unit_percentage: f64,
    pub min_bet: f64,
    pub max_bet: f64,
    pub risk_profile: RiskProfile,
    pub sizing: SizingMethod,
}

impl Default for BankrollConfig {
    fn default() -> Self {
        BankrollConfig {
            initial_bankroll: 1000.0,
            unit_percentage: 1.0,
            min_bet: 5.0,
            max_bet: 500.0,
            risk_profile: RiskProfile::default(),
            sizing: SizingMethod::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandResult {
    Win,
    Loss,
    Push,
}

/// How a winning hand pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandType {
    Normal,
    Blackjack,
    Double,
}

impl HandType {
    pub fn payout_multiplier(&self) -> f64 {
        match self {
            HandType::Normal => 1.0,
            HandType::Blackjack => 1.5,
            HandType::Double => 2.0,
        }
    }

    /// Money actually at risk per unit of the original bet.
    pub fn stake_multiplier(&self) -> f64 {
        match self {
            HandType::Double => 2.0,
            HandType::Normal | HandType::Blackjack => 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BankrollStats {
    pub current_bankroll: f64,
    pub initial_bankroll: f64,
    pub profit_loss: f64,
    pub roi_percentage: f64,
    pub max_bankroll: f64,
    pub min_bankroll: f64,
    pub total_wagered: f64,
    pub current_unit_size: f64,
    /// Percent.
    pub max_drawdown: f64,
    /// Percent.
    pub current_drawdown: f64,
    pub sharpe_ratio: f64,
    /// Percent.
    pub volatility: f64,
    pub avg_recent_bet: f64,
    pub risk_profile: RiskProfile,
    pub sizing: SizingMethod,
}

pub struct BankrollManager {
    config: BankrollConfig,
    sizer: Box<dyn BetSizer>,
    current_bankroll: f64,
    max_bankroll: f64,
    min_bankroll: f64,
    total_wagered: f64,
    current_drawdown: f64,
    max_drawdown: f64,
    history: VecDeque<f64>,
    bet_history: VecDeque<f64>,
}

impl Default for BankrollManager {
    fn default() -> Self {
        Self::new(BankrollConfig::default())
    }
}

impl BankrollManager {
    pub fn new(config: BankrollConfig) -> Self {
        let sizer = config.sizing.sizer();
        Self::with_sizer(config, sizer)
    }

    /// Uses `sizer` regardless of `config.sizing`.
    pub fn with_sizer(config: BankrollConfig, sizer: Box<dyn BetSizer>) -> Self {
        BankrollManager {
            current_bankroll: config.initial_bankroll,
            max_bankroll: config.initial_bankroll,
            min_bankroll: config.initial_bankroll,
            total_wagered: 0.0,
            current_drawdown: 0.0,
            max_drawdown: 0.0,
            history: VecDeque::with_capacity(BANKROLL_HISTORY_CAPACITY),
            bet_history: VecDeque::with_capacity(BET_HISTORY_CAPACITY),
            config,
            sizer,
        }
    }

    pub fn config(&self) -> &BankrollConfig {
        &self.config
    }

    pub fn current_bankroll(&self) -> f64 {
        self.current_bankroll
    }

    pub fn max_bankroll(&self) -> f64 {
        self.max_bankroll
    }

    pub fn min_bankroll(&self) -> f64 {
        self.min_bankroll
    }

    pub fn total_wagered(&self) -> f64 {
        self.total_wagered
    }

    /// As a fraction, not a percentage.
    pub fn current_drawdown(&self) -> f64 {
        self.current_drawdown
    }

    /// As a fraction, not a percentage.
    pub fn max_drawdown(&self) -> f64 {
        self.max_drawdown
    }

    pub fn history(&self) -> impl Iterator<Item = &f64> {
        self.history.iter()
    }

    pub fn bet_history(&self) -> impl Iterator<Item = &f64> {
        self.bet_history.iter()
    }

    pub fn sizing_method(&self) -> SizingMethod {
        self.sizer.method()
    }

    pub fn base_unit(&self) -> f64 {
        self.current_bankroll * self.config.unit_percentage / 100.0
    }

    fn sizing_input(
        &self,
        true_count: f64,
        win_probability: f64,
        blackjack_probability: f64,
        cards_remaining_ratio: f64,
    ) -> SizingInput {
        SizingInput {
            true_count,
            win_probability,
            blackjack_probability,
            cards_remaining_ratio,
            bankroll: self.current_bankroll,
            base_unit: self.base_unit(),
            min_bet: self.config.min_bet,
            max_bet: self.config.max_bet,
            profile: self.config.risk_profile,
        }
    }

    /// Risk-profiled Kelly stake, clamped to the table limits and to 20% of the
    /// bankroll. The 20% cap wins over `min_bet` when the bankroll is small.
    pub fn calculate_kelly_bet_size(
        &self,
        true_count: f64,
        win_probability: f64,
        blackjack_probability: f64,
    ) -> f64 {
        StandardKelly.bet_size(&self.sizing_input(
            true_count,
            win_probability,
            blackjack_probability,
            0.5,
        ))
    }

    /// The configured sizer's stake, dampened by recent volatility and current
    /// drawdown. `confidence` is logged but does not feed the win probability.
    /// The sizer's bankroll cap still wins over `min_bet` after dampening.
    pub fn get_bet_size_with_volatility_control(
        &self,
        true_count: f64,
        confidence: f64,
        cards_remaining_ratio: f64,
    ) -> f64 {
        if self.current_bankroll <= 0.0 {
            return 0.0;
        }
        let input = self.sizing_input(
            true_count,
            BASE_WIN_PROBABILITY,
            BASE_BLACKJACK_PROBABILITY,
            cards_remaining_ratio,
        );
        let mut bet = self.sizer.bet_size(&input);

        let mut volatility = None;
        if self.history.len() >= VOLATILITY_MIN_SAMPLES {
            let recent = self.calculate_recent_volatility();
            if recent > 0.15 {
                bet *= 0.8;
            } else if recent < 0.05 {
                bet *= 1.1;
            }
            volatility = Some(recent);
        }

        if self.current_drawdown > 0.2 {
            bet *= 0.6;
        } else if self.current_drawdown > 0.1 {
            bet *= 0.8;
        }

        let cap = self.current_bankroll * self.sizer.max_bankroll_share();
        let bet = round2(
            round2(bet)
                .max(self.config.min_bet)
                .min(self.config.max_bet)
                .min(cap),
        );
        debug!(
            true_count,
            confidence,
            ?volatility,
            drawdown = self.current_drawdown,
            bet,
            "sized bet"
        );
        bet
    }

    /// Population standard deviation of the return rates between consecutive
    /// recorded bankroll values. Falls back to 0.1 with fewer than 5 samples.
    pub fn calculate_recent_volatility(&self) -> f64 {
        if self.history.len() < 5 {
            return DEFAULT_VOLATILITY;
        }
        let returns: Vec<f64> = self
            .history
            .iter()
            .zip(self.history.iter().skip(1))
            .filter(|(previous, _)| **previous > 0.0)
            .map(|(previous, current)| (current - previous) / previous)
            .collect();
        if returns.is_empty() {
            return DEFAULT_VOLATILITY;
        }
        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
        variance.sqrt()
    }

    /// Settles one hand. `bet_amount` is the original bet; a `Double` hand stakes
    /// twice that on every outcome.
    pub fn update_bankroll(&mut self, result: HandResult, bet_amount: f64, hand_type: HandType) {
        let stake = bet_amount * hand_type.stake_multiplier();
        match result {
            HandResult::Win => self.current_bankroll += bet_amount * hand_type.payout_multiplier(),
            HandResult::Loss => self.current_bankroll -= stake,
            HandResult::Push => {}
        }
        self.total_wagered += stake;
        self.max_bankroll = self.max_bankroll.max(self.current_bankroll);
        self.min_bankroll = self.min_bankroll.min(self.current_bankroll);

        if self.history.len() == BANKROLL_HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(self.current_bankroll);
        if self.bet_history.len() == BET_HISTORY_CAPACITY {
            self.bet_history.pop_front();
        }
        self.bet_history.push_back(stake);

        self.current_drawdown = if self.max_bankroll > 0.0 {
            ((self.max_bankroll - self.current_bankroll) / self.max_bankroll).max(0.0)
        } else {
            0.0
        };
        self.max_drawdown = self.max_drawdown.max(self.current_drawdown);
    }

    pub fn should_reduce_risk(&self) -> bool {
        let reduce = self.current_drawdown > 0.25
            || (self.history.len() >= RISK_REDUCTION_MIN_SAMPLES
                && self.calculate_recent_volatility() > 0.2);
        if reduce {
            warn!(
                drawdown = self.current_drawdown,
                bankroll = self.current_bankroll,
                "reducing risk"
            );
        }
        reduce
    }

    pub fn is_broke(&self, min_threshold: f64) -> bool {
        self.current_bankroll < min_threshold
    }

    pub fn stats(&self) -> BankrollStats {
        let initial = self.config.initial_bankroll;
        let roi = if initial > 0.0 {
            (self.current_bankroll - initial) / initial * 100.0
        } else {
            0.0
        };
        let sharpe_ratio = if self.history.len() >= VOLATILITY_MIN_SAMPLES {
            (roi / 100.0) / self.calculate_recent_volatility().max(0.001)
        } else {
            0.0
        };
        let recent = self.bet_history.len().min(RECENT_BETS);
        let avg_recent_bet = if recent == 0 {
            0.0
        } else {
            self.bet_history.iter().rev().take(recent).sum::<f64>() / recent as f64
        };

        BankrollStats {
            current_bankroll: self.current_bankroll,
            initial_bankroll: initial,
            profit_loss: self.current_bankroll - initial,
            roi_percentage: roi,
            max_bankroll: self.max_bankroll,
            min_bankroll: self.min_bankroll,
            total_wagered: self.total_wagered,
            current_unit_size: self.base_unit(),
            max_drawdown: self.max_drawdown * 100.0,
            current_drawdown: self.current_drawdown * 100.0,
            sharpe_ratio,
            volatility: self.calculate_recent_volatility() * 100.0,
            avg_recent_bet,
            risk_profile: self.config.risk_profile,
            sizing: self.sizer.method(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn manager(profile: RiskProfile, sizing: SizingMethod) -> BankrollManager {
        BankrollManager::new(BankrollConfig {
            risk_profile: profile,
            sizing,
            ..Default::default()
        })
    }

    #[test]
    fn kelly_stays_within_limits_for_every_profile() {
        for profile in RiskProfile::iter() {
            let m = manager(profile, SizingMethod::StandardKelly);
            let cap = m.current_bankroll() * 0.2;
            for tc in -10..=10 {
                let bet = m.calculate_kelly_bet_size(tc as f64, 0.47, 0.048);
                assert!(bet >= 5.0 && bet <= 500.0_f64.min(cap), "{profile:?} tc {tc}: {bet}");
            }
        }
    }

    #[test]
    fn negative_ev_bets_the_floor() {
        let m = BankrollManager::default();
        // 1000 * 1% = 10 unit, 0.1 * 0.75 = 0.75 clamped up to min bet.
        assert_eq!(m.calculate_kelly_bet_size(-5.0, 0.47, 0.048), 5.0);
    }

    #[test]
    fn kelly_grows_with_count_up_to_the_cap() {
        let m = BankrollManager::new(BankrollConfig {
            initial_bankroll: 100_000.0,
            ..Default::default()
        });
        // unit 1000; tc 4: p 0.49, ev 0.052, 0.052 * 0.75 * min(3, 4) = 0.117
        let bet = m.calculate_kelly_bet_size(4.0, 0.47, 0.048);
        assert!((bet - 117.0).abs() < 1e-9);
        let low = m.calculate_kelly_bet_size(3.0, 0.47, 0.048);
        let high = m.calculate_kelly_bet_size(6.0, 0.47, 0.048);
        assert!(high > low);
    }

    #[test]
    fn bankroll_cap_beats_min_bet() {
        let mut m = BankrollManager::default();
        m.update_bankroll(HandResult::Loss, 980.0, HandType::Normal);
        assert_eq!(m.current_bankroll(), 20.0);
        assert_eq!(m.calculate_kelly_bet_size(0.0, 0.47, 0.048), 4.0);

        m.update_bankroll(HandResult::Loss, 20.0, HandType::Normal);
        assert_eq!(m.calculate_kelly_bet_size(0.0, 0.47, 0.048), 0.0);
    }

    #[test]
    fn volatility_control_keeps_the_bankroll_cap() {
        let mut m = BankrollManager::default();
        m.update_bankroll(HandResult::Loss, 980.0, HandType::Normal);
        let kelly = m.calculate_kelly_bet_size(0.0, 0.47, 0.048);
        let controlled = m.get_bet_size_with_volatility_control(0.0, 0.8, 0.5);
        assert_eq!(kelly, 4.0);
        assert!(controlled <= kelly, "controlled {controlled} above kelly {kelly}");
        assert!(controlled > 0.0);

        let mut tck = manager(RiskProfile::Moderate, SizingMethod::TrueCountKelly);
        tck.update_bankroll(HandResult::Loss, 980.0, HandType::Normal);
        // 15% of 20.
        assert!(tck.get_bet_size_with_volatility_control(0.0, 0.8, 0.5) <= 3.0);

        m.update_bankroll(HandResult::Loss, 20.0, HandType::Normal);
        assert_eq!(m.current_bankroll(), 0.0);
        assert_eq!(m.get_bet_size_with_volatility_control(0.0, 0.8, 0.5), 0.0);
        tck.update_bankroll(HandResult::Loss, 20.0, HandType::Normal);
        assert_eq!(tck.get_bet_size_with_volatility_control(5.0, 0.8, 0.5), 0.0);
    }

    #[test]
    fn true_count_kelly() {
        assert_eq!(TrueCountKelly::advantage(0.0), -0.005);
        assert_eq!(TrueCountKelly::advantage(1.0), 0.0);
        assert!((TrueCountKelly::advantage(3.0) - 0.01).abs() < 1e-12);

        for profile in RiskProfile::iter() {
            let m = manager(profile, SizingMethod::TrueCountKelly);
            for tc in -10..=10 {
                let bet = m.get_bet_size_with_volatility_control(tc as f64, 0.8, 0.9);
                assert!((5.0..=500.0).contains(&bet));
            }
        }

        let input = SizingInput {
            true_count: 0.0,
            win_probability: BASE_WIN_PROBABILITY,
            blackjack_probability: BASE_BLACKJACK_PROBABILITY,
            cards_remaining_ratio: 0.5,
            bankroll: 100_000.0,
            base_unit: 1000.0,
            min_bet: 5.0,
            max_bet: 5000.0,
            profile: RiskProfile::Aggressive,
        };
        assert_eq!(TrueCountKelly.bet_size(&input), 50.0);
        let deep = SizingInput {
            cards_remaining_ratio: 1.0,
            ..input
        };
        assert_eq!(TrueCountKelly.bet_size(&deep), 55.0);
        let small = SizingInput {
            bankroll: 100.0,
            ..input
        };
        assert_eq!(TrueCountKelly.bet_size(&small), 15.0);
    }

    #[test]
    fn settles_each_hand_type() {
        let mut m = BankrollManager::default();
        m.update_bankroll(HandResult::Win, 10.0, HandType::Normal);
        assert_eq!(m.current_bankroll(), 1010.0);
        m.update_bankroll(HandResult::Win, 10.0, HandType::Blackjack);
        assert_eq!(m.current_bankroll(), 1025.0);
        m.update_bankroll(HandResult::Win, 10.0, HandType::Double);
        assert_eq!(m.current_bankroll(), 1045.0);
        m.update_bankroll(HandResult::Push, 10.0, HandType::Normal);
        assert_eq!(m.current_bankroll(), 1045.0);
        m.update_bankroll(HandResult::Loss, 45.0, HandType::Normal);
        assert_eq!(m.current_bankroll(), 1000.0);
        assert_eq!(m.total_wagered(), 95.0);
        assert_eq!(m.max_bankroll(), 1045.0);
    }

    #[test]
    fn doubled_hands_stake_twice_the_bet_on_every_outcome() {
        let mut m = BankrollManager::default();
        m.update_bankroll(HandResult::Win, 10.0, HandType::Double);
        assert_eq!(m.current_bankroll(), 1020.0);
        assert_eq!(m.total_wagered(), 20.0);
        m.update_bankroll(HandResult::Push, 10.0, HandType::Double);
        assert_eq!(m.current_bankroll(), 1020.0);
        assert_eq!(m.total_wagered(), 40.0);
        m.update_bankroll(HandResult::Loss, 10.0, HandType::Double);
        assert_eq!(m.current_bankroll(), 1000.0);
        assert_eq!(m.total_wagered(), 60.0);
        assert_eq!(m.stats().avg_recent_bet, 20.0);
    }

    #[test]
    fn max_drawdown_never_decreases() {
        let mut m = BankrollManager::default();
        let mut previous = 0.0;
        let outcomes = [
            HandResult::Loss,
            HandResult::Loss,
            HandResult::Win,
            HandResult::Push,
            HandResult::Win,
            HandResult::Win,
            HandResult::Loss,
        ];
        for (i, result) in outcomes.iter().cycle().take(70).enumerate() {
            m.update_bankroll(*result, 5.0 + (i % 7) as f64 * 3.0, HandType::Normal);
            assert!(m.current_drawdown() >= 0.0);
            let expected = (m.max_bankroll() - m.current_bankroll()) / m.max_bankroll();
            assert!((m.current_drawdown() - expected).abs() < 1e-12);
            assert!(m.max_drawdown() >= previous);
            previous = m.max_drawdown();
        }
    }

    #[test]
    fn histories_are_bounded() {
        let mut m = BankrollManager::new(BankrollConfig {
            initial_bankroll: 1_000_000.0,
            ..Default::default()
        });
        for _ in 0..1200 {
            m.update_bankroll(HandResult::Push, 5.0, HandType::Normal);
        }
        assert_eq!(m.history().count(), 100);
        assert_eq!(m.bet_history().count(), 1000);
    }

    #[test]
    fn volatility_and_risk_reduction() {
        let mut m = BankrollManager::default();
        assert_eq!(m.calculate_recent_volatility(), 0.1);
        for _ in 0..10 {
            m.update_bankroll(HandResult::Push, 5.0, HandType::Normal);
        }
        assert_eq!(m.calculate_recent_volatility(), 0.0);
        // Flat bankroll: low volatility bumps the min bet by 10%.
        assert_eq!(m.get_bet_size_with_volatility_control(0.0, 0.7, 0.5), 5.5);
        assert!(!m.should_reduce_risk());

        m.update_bankroll(HandResult::Loss, 300.0, HandType::Normal);
        assert!((m.current_drawdown() - 0.3).abs() < 1e-12);
        assert!(m.should_reduce_risk());
    }

    #[test]
    fn drawdown_throttles_bets() {
        let mut m = BankrollManager::new(BankrollConfig {
            initial_bankroll: 100_000.0,
            max_bet: 5000.0,
            risk_profile: RiskProfile::Aggressive,
            sizing: SizingMethod::TrueCountKelly,
            ..Default::default()
        });
        // unit 1000 * 0.05 = 50 before any history.
        assert_eq!(m.get_bet_size_with_volatility_control(0.0, 0.7, 0.5), 50.0);
        m.update_bankroll(HandResult::Loss, 15_000.0, HandType::Normal);
        // unit 850 * 0.05 = 42.5, drawdown 15% → ×0.8
        assert_eq!(m.get_bet_size_with_volatility_control(0.0, 0.7, 0.5), 34.0);
        m.update_bankroll(HandResult::Loss, 15_000.0, HandType::Normal);
        // unit 700 * 0.05 = 35, drawdown 30% → ×0.6
        assert_eq!(m.get_bet_size_with_volatility_control(0.0, 0.7, 0.5), 21.0);
    }

    #[test]
    fn stats_report_percentages() {
        let mut m = BankrollManager::default();
        assert_eq!(m.stats().avg_recent_bet, 0.0);
        m.update_bankroll(HandResult::Win, 100.0, HandType::Normal);
        m.update_bankroll(HandResult::Loss, 220.0, HandType::Normal);
        let stats = m.stats();
        assert_eq!(stats.profit_loss, -120.0);
        assert!((stats.roi_percentage + 12.0).abs() < 1e-9);
        assert!((stats.current_drawdown - 20.0).abs() < 1e-9);
        assert_eq!(stats.avg_recent_bet, 160.0);
        assert_eq!(stats.sharpe_ratio, 0.0);
        assert!(m.is_broke(1000.0));
        assert!(!m.is_broke(DEFAULT_BROKE_THRESHOLD));
    }
}
