//! Count-based departures from basic strategy.
//!
//! The engine is a pure function of the hand, the upcard and the counter it is handed.
//! Each deviation entry is a list of ascending true-count thresholds; the highest
//! threshold the clamped true count reaches decides the override.

use std::collections::HashMap;

use tracing::debug;

use crate::{
    counter::{Counter, INSURANCE_TRUE_COUNT},
    strategy::{Strategy, StrategyTable},
    Action, BlackjackError, DealerUpcard, DecisionRecord, HandState, Permissions, RiskLevel,
};

pub const DEFAULT_MAX_DEVIATION_TC: f64 = 6.0;
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.6;
const MAX_CONFIDENCE: f64 = 0.95;
const BASE_CONFIDENCE: f64 = 0.7;
const DEVIATION_PENALTY: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviationConfig {
    /// True counts beyond this magnitude are clamped before any lookup.
    pub max_deviation_tc: f64,
    pub min_confidence_threshold: f64,
}

impl Default for DeviationConfig {
    fn default() -> Self {
        DeviationConfig {
            max_deviation_tc: DEFAULT_MAX_DEVIATION_TC,
            min_confidence_threshold: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviationKey {
    pub total: u8,
    pub upcard: DealerUpcard,
}

impl DeviationKey {
    fn new(total: u8, upcard: u8) -> Result<Self, BlackjackError> {
        let upcard = DealerUpcard::try_from(upcard)?;
        Ok(DeviationKey { total, upcard })
    }
}

pub struct DeviationEngine {
    table: StrategyTable,
    deviations: HashMap<DeviationKey, Vec<(f64, Action)>>,
    config: DeviationConfig,
}

impl Default for DeviationEngine {
    fn default() -> Self {
        Self::new(StrategyTable::new(), DeviationConfig::default())
    }
}

impl DeviationEngine {
    pub fn new(table: StrategyTable, config: DeviationConfig) -> Self {
        use Action::*;

        // (player total, dealer upcard with Ace as 1): [(true count threshold, action)]
        let entries: [((u8, u8), &[(f64, Action)]); 21] = [
            ((16, 10), &[(0.0, Surrender), (4.0, Stand)]),
            ((15, 10), &[(0.0, Surrender), (4.0, Stand)]),
            ((16, 9), &[(5.0, Stand)]),
            ((15, 9), &[(5.0, Stand)]),
            ((13, 2), &[(-1.0, Stand)]),
            ((13, 3), &[(-2.0, Stand)]),
            ((12, 3), &[(2.0, Stand)]),
            ((12, 2), &[(3.0, Stand)]),
            ((12, 4), &[(0.0, Stand)]),
            ((12, 5), &[(-2.0, Stand)]),
            ((12, 6), &[(-1.0, Stand)]),
            // Soft 18
            ((18, 9), &[(1.0, Stand)]),
            ((18, 10), &[(1.0, Stand)]),
            ((18, 1), &[(1.0, Stand)]),
            // Doubling
            ((11, 1), &[(1.0, Hit)]),
            ((10, 10), &[(4.0, Double)]),
            ((10, 1), &[(4.0, Double)]),
            ((9, 2), &[(1.0, Double)]),
            ((9, 7), &[(3.0, Double)]),
            // Splitting tens
            ((20, 5), &[(5.0, Split)]),
            ((20, 6), &[(4.0, Split)]),
        ];

        // Every upcard in the table above is in 1..=10, so no entry is dropped.
        let deviations = entries
            .iter()
            .filter_map(|((total, upcard), thresholds)| {
                let key = DeviationKey::new(*total, *upcard).ok()?;
                let mut thresholds = thresholds.to_vec();
                thresholds.sort_by(|a, b| a.0.total_cmp(&b.0));
                Some((key, thresholds))
            })
            .collect();

        DeviationEngine {
            table,
            deviations,
            config,
        }
    }

    pub fn config(&self) -> &DeviationConfig {
        &self.config
    }

    pub fn table(&self) -> &StrategyTable {
        &self.table
    }

    fn clamp_true_count(&self, true_count: f64) -> f64 {
        true_count.clamp(-self.config.max_deviation_tc, self.config.max_deviation_tc)
    }

    /// The override for this spot, if any. Thresholds are walked in ascending order and
    /// the last one reached wins. An unknown spot simply has no override.
    pub fn lookup_deviation(
        &self,
        total: u8,
        upcard: DealerUpcard,
        clamped_true_count: f64,
    ) -> Option<(f64, Action)> {
        self.deviations
            .get(&DeviationKey { total, upcard })?
            .iter()
            .take_while(|(threshold, _)| clamped_true_count >= *threshold)
            .last()
            .copied()
    }

    fn is_legal(action: Action, hand: &HandState, permissions: Permissions) -> bool {
        match action {
            Action::Split => permissions.can_split && hand.is_pair(),
            _ => permissions.allows(action),
        }
    }

    pub fn decide(
        &self,
        hand: &HandState,
        upcard: DealerUpcard,
        counter: &Counter,
        permissions: Permissions,
    ) -> DecisionRecord {
        let total = hand.total();
        let true_count = counter.true_count();
        let clamped = self.clamp_true_count(true_count);
        let basic_action = self.table.get_action(hand, upcard, permissions);

        let (action, deviation) = match self.lookup_deviation(total, upcard, clamped) {
            Some((_, candidate)) if Self::is_legal(candidate, hand, permissions) => {
                // Hitting 11 against an Ace gives up the aggressive double, so it counts
                // as a deviation even when the chart already says hit.
                let passive_eleven =
                    total == 11 && upcard == DealerUpcard::Ace && candidate == Action::Hit;
                if candidate != basic_action || passive_eleven {
                    (candidate, true)
                } else {
                    (basic_action, false)
                }
            }
            _ => (basic_action, false),
        };

        if deviation {
            debug!(
                total,
                upcard = upcard.value(),
                true_count,
                basic = ?basic_action,
                chosen = ?action,
                "count deviation"
            );
        }

        let reasoning = if deviation {
            self.explain_deviation(total, upcard, true_count)
        } else {
            format!("Basic strategy | TC: {:+.1}", true_count)
        };

        DecisionRecord {
            action,
            basic_action,
            true_count,
            clamped_true_count: clamped,
            confidence: self.calculate_confidence(clamped, total, upcard, deviation),
            deviation,
            risk_level: assess_risk_level(clamped, total, upcard),
            advantage: counter.betting_advantage(),
            take_insurance: upcard == DealerUpcard::Ace && Self::should_take_insurance(true_count),
            reasoning,
        }
    }

    /// Heuristic confidence in [min_confidence_threshold, 0.95]. The bands are point
    /// assignments, not calibrated probabilities.
    pub fn calculate_confidence(
        &self,
        clamped_true_count: f64,
        total: u8,
        upcard: DealerUpcard,
        used_deviation: bool,
    ) -> f64 {
        let magnitude = clamped_true_count.abs();
        let mut confidence = BASE_CONFIDENCE
            + if magnitude >= 4.0 {
                0.25
            } else if magnitude >= 3.0 {
                0.2
            } else if magnitude >= 2.0 {
                0.1
            } else if magnitude >= 1.0 {
                0.05
            } else {
                0.0
            };

        let up = upcard.value();
        confidence += match total {
            20 | 21 => 0.15,
            17..=u8::MAX if up <= 6 => 0.1,
            0..=11 => 0.05,
            12..=16 if up >= 7 => -0.05,
            _ => 0.0,
        };

        if used_deviation {
            confidence -= DEVIATION_PENALTY;
        }
        confidence.clamp(self.config.min_confidence_threshold, MAX_CONFIDENCE)
    }

    pub fn should_take_insurance(true_count: f64) -> bool {
        true_count >= INSURANCE_TRUE_COUNT
    }

    pub fn explain_deviation(&self, total: u8, upcard: DealerUpcard, true_count: f64) -> String {
        if !self.deviations.contains_key(&DeviationKey { total, upcard }) {
            return String::from("No deviation available for this situation");
        }
        match (total, upcard) {
            (16, DealerUpcard::Ten) => format!(
                "With TC {:.1}, the deck is rich in high cards, making standing more favorable",
                true_count
            ),
            (15, DealerUpcard::Ten) => format!(
                "High true count ({:.1}) suggests more 10s remaining, favoring stand",
                true_count
            ),
            (12, DealerUpcard::Pip(pip)) if pip.value() == 3 => format!(
                "Positive count ({:.1}) means more 10s likely, avoid busting",
                true_count
            ),
            (11, DealerUpcard::Ace) => format!(
                "Count of {:.1} reduces double-down value against an Ace",
                true_count
            ),
            (10, DealerUpcard::Ten) => format!(
                "Very high count ({:.1}) makes doubling profitable vs 10",
                true_count
            ),
            _ => format!("Deviation based on true count of {:.1}", true_count),
        }
    }
}

impl Strategy for DeviationEngine {
    fn decide(
        &self,
        hand: &HandState,
        upcard: DealerUpcard,
        counter: &Counter,
        permissions: Permissions,
    ) -> DecisionRecord {
        DeviationEngine::decide(self, hand, upcard, counter, permissions)
    }

    fn label(&self) -> &'static str {
        "counting"
    }
}

/// Combines how the count looks with how the hand looks into one risk bucket.
pub fn assess_risk_level(clamped_true_count: f64, total: u8, upcard: DealerUpcard) -> RiskLevel {
    // Ordinal scores: low 1, medium 2, high 3. A neutral count scores as medium.
    let count_risk = if clamped_true_count.abs() >= 4.0 {
        if clamped_true_count > 0.0 {
            1
        } else {
            3
        }
    } else {
        2
    };

    let up = upcard.value();
    let situation_risk = match total {
        20 | 21 => 1,
        0..=11 => 1,
        17..=19 if up <= 6 => 1,
        17..=19 => 2,
        12..=16 if up >= 7 => 3,
        12..=16 => 2,
        _ => 2,
    };

    let combined = (count_risk + situation_risk) as f64 / 2.0;
    if combined <= 1.5 {
        RiskLevel::Low
    } else if combined <= 2.5 {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::TrueCountPolicy;

    fn counter(running_count: i32, cards_dealt: u32, number_of_decks: u32) -> Counter {
        Counter::with_state(
            number_of_decks,
            running_count,
            cards_dealt,
            TrueCountPolicy::OneDeck,
        )
        .unwrap()
    }

    fn decide(values: &[u8], upcard: u8, running_count: i32) -> DecisionRecord {
        let engine = DeviationEngine::default();
        let hand = HandState::from_values(values).unwrap();
        let upcard = DealerUpcard::try_from(upcard).unwrap();
        engine.decide(&hand, upcard, &counter(running_count, 0, 6), Permissions::default())
    }

    #[test]
    fn every_table_entry_is_loaded() {
        let engine = DeviationEngine::default();
        assert_eq!(engine.deviations.len(), 21);
        let three = DealerUpcard::try_from(3).unwrap();
        assert!(engine.explain_deviation(12, three, 2.0).starts_with("Positive count"));
    }

    #[test]
    fn sixteen_vs_ten_at_high_count() {
        let record = decide(&[10, 6], 10, 24);
        assert_eq!(record.true_count, 4.0);
        assert!(record.deviation);
        assert_eq!(record.action, Action::Stand);
        assert_eq!(record.basic_action, Action::Hit);
    }

    #[test]
    fn sixteen_vs_ten_surrenders_at_neutral_count() {
        let record = decide(&[10, 6], 10, 6);
        assert!(record.deviation);
        assert_eq!(record.action, Action::Surrender);
    }

    #[test]
    fn fifteen_vs_ten_stands_at_four() {
        let record = decide(&[10, 5], 10, 24);
        assert!(record.deviation);
        assert_eq!(record.action, Action::Stand);
    }

    #[test]
    fn eleven_vs_ace_hit_counts_as_deviation() {
        let record = decide(&[6, 5], 1, 6);
        assert_eq!(record.true_count, 1.0);
        assert_eq!(record.action, Action::Hit);
        assert!(record.deviation);
        assert!(record.reasoning.contains("Ace"));
    }

    #[test]
    fn twelve_vs_three_and_two() {
        let record = decide(&[10, 2], 3, 12);
        assert_eq!(record.true_count, 2.0);
        assert_eq!(record.action, Action::Stand);
        assert!(record.deviation);

        let record = decide(&[10, 2], 2, 18);
        assert_eq!(record.action, Action::Stand);
        assert!(record.deviation);

        let record = decide(&[10, 2], 2, 12);
        assert_eq!(record.action, Action::Hit);
        assert!(!record.deviation);
    }

    #[test]
    fn illegal_override_keeps_baseline() {
        let engine = DeviationEngine::default();
        let hand = HandState::from_values(&[10, 6]).unwrap();
        let permissions = Permissions {
            can_surrender: false,
            ..Default::default()
        };
        let record = engine.decide(&hand, DealerUpcard::Ten, &counter(6, 0, 6), permissions);
        assert_eq!(record.action, Action::Hit);
        assert!(!record.deviation);

        // Doubling 10 vs 10 needs permission to double.
        let hand = HandState::from_values(&[6, 4]).unwrap();
        let permissions = Permissions {
            can_double: false,
            ..Default::default()
        };
        let record = engine.decide(&hand, DealerUpcard::Ten, &counter(30, 0, 6), permissions);
        assert_eq!(record.action, Action::Hit);
        assert!(!record.deviation);
    }

    #[test]
    fn splitting_tens_needs_a_pair() {
        let engine = DeviationEngine::default();
        let six = DealerUpcard::try_from(6).unwrap();
        let permissions = Permissions {
            can_split: true,
            ..Default::default()
        };
        let hot = counter(30, 0, 6);

        let tens = HandState::from_values(&[10, 10]).unwrap();
        let record = engine.decide(&tens, six, &hot, permissions);
        assert_eq!(record.action, Action::Split);
        assert!(record.deviation);

        let soft_20 = HandState::from_values(&[11, 9]).unwrap();
        let record = engine.decide(&soft_20, six, &hot, permissions);
        assert_eq!(record.action, Action::Stand);
        assert!(!record.deviation);
    }

    #[test]
    fn true_count_is_clamped_before_lookup() {
        let engine = DeviationEngine::default();
        // TC 10 is clamped to 6, which still clears every threshold for 16 vs 9.
        let hand = HandState::from_values(&[10, 6]).unwrap();
        let nine = DealerUpcard::try_from(9).unwrap();
        let record = engine.decide(&hand, nine, &counter(60, 0, 6), Permissions::default());
        assert_eq!(record.true_count, 10.0);
        assert_eq!(record.clamped_true_count, 6.0);
        assert_eq!(record.action, Action::Stand);

        assert_eq!(engine.lookup_deviation(16, nine, 4.9), None);
        assert_eq!(
            engine.lookup_deviation(16, DealerUpcard::Ten, 0.0),
            Some((0.0, Action::Surrender))
        );
    }

    #[test]
    fn unknown_spot_falls_back_to_baseline() {
        let record = decide(&[10, 7], 4, 30);
        assert!(!record.deviation);
        assert_eq!(record.action, Action::Stand);
        let engine = DeviationEngine::default();
        assert_eq!(
            engine.explain_deviation(17, DealerUpcard::try_from(4).unwrap(), 5.0),
            "No deviation available for this situation"
        );
    }

    #[test]
    fn confidence_stays_in_band() {
        let engine = DeviationEngine::default();
        for total in 4..=26 {
            for upcard in 2..=11 {
                let upcard = DealerUpcard::try_from(upcard).unwrap();
                for tc in -8..=8 {
                    for used in [false, true] {
                        let confidence =
                            engine.calculate_confidence(tc as f64, total, upcard, used);
                        assert!((DEFAULT_MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&confidence));
                    }
                }
            }
        }
    }

    #[test]
    fn confidence_bands() {
        let engine = DeviationEngine::default();
        let five = DealerUpcard::try_from(5).unwrap();
        // 0.7 base, stiff vs strong upcard.
        let c = engine.calculate_confidence(0.0, 16, DealerUpcard::Ten, false);
        assert!((c - 0.65).abs() < 1e-9);
        // 0.7 + 0.1 + 0.1 (17+ vs weak upcard)
        let c = engine.calculate_confidence(2.0, 18, five, false);
        assert!((c - 0.9).abs() < 1e-9);
        // 0.7 + 0.05 + 0.05 - 0.02
        let c = engine.calculate_confidence(-1.0, 10, DealerUpcard::Ten, true);
        assert!((c - 0.78).abs() < 1e-9);
        // capped
        let c = engine.calculate_confidence(5.0, 20, five, false);
        assert_eq!(c, MAX_CONFIDENCE);
    }

    #[test]
    fn risk_levels() {
        let ten = DealerUpcard::Ten;
        let five = DealerUpcard::try_from(5).unwrap();
        assert_eq!(assess_risk_level(5.0, 20, ten), RiskLevel::Low);
        assert_eq!(assess_risk_level(0.0, 20, ten), RiskLevel::Low);
        assert_eq!(assess_risk_level(0.0, 16, ten), RiskLevel::Medium);
        assert_eq!(assess_risk_level(-4.0, 16, ten), RiskLevel::High);
        assert_eq!(assess_risk_level(-4.0, 16, five), RiskLevel::Medium);
        assert_eq!(assess_risk_level(0.0, 18, ten), RiskLevel::Medium);
    }

    #[test]
    fn insurance_only_against_ace() {
        let hand = HandState::from_values(&[10, 9]).unwrap();
        let engine = DeviationEngine::default();
        let record = engine.decide(&hand, DealerUpcard::Ace, &counter(18, 0, 6), Permissions::default());
        assert!(record.take_insurance);
        let record = engine.decide(&hand, DealerUpcard::Ten, &counter(18, 0, 6), Permissions::default());
        assert!(!record.take_insurance);
    }
}
