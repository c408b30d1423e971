use crate::{
    counter::Counter, deviation::assess_risk_level, Action, DealerUpcard, DecisionRecord,
    HandState, Permissions, Rank,
};

/// Anything that can turn a hand and an upcard into a recommendation.
pub trait Strategy {
    fn decide(
        &self,
        hand: &HandState,
        upcard: DealerUpcard,
        counter: &Counter,
        permissions: Permissions,
    ) -> DecisionRecord;

    fn label(&self) -> &'static str;
}

/// Which chart a hand is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandCategory {
    Pair(Rank),
    Soft(u8),
    Hard(u8),
}

/// A chart cell: the preferred action and what to do when it is not allowed.
pub type Cell = (Action, Action);

const HARD_FIRST_ROW: u8 = 5;
const SOFT_FIRST_ROW: u8 = 13;

/// The static basic-strategy charts. Built once, never mutated.
pub struct StrategyTable {
    hard_charts: [[Cell; 10]; 17],
    soft_charts: [[Cell; 10]; 8],
    pair_charts: [[Cell; 10]; 10],
}

impl Default for StrategyTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StrategyTable {
    pub fn new() -> StrategyTable {
        const H: Cell = (Action::Hit, Action::Hit);
        const S: Cell = (Action::Stand, Action::Stand);
        const P: Cell = (Action::Split, Action::Hit);
        const D: Cell = (Action::Double, Action::Hit);

        StrategyTable {
            hard_charts: [
                [H, H, H, H, H, H, H, H, H, H], // 5
                [H, H, H, H, H, H, H, H, H, H],
                [H, H, H, H, H, H, H, H, H, H],
                [H, H, H, H, H, H, H, H, H, H],
                [H, D, D, D, D, H, H, H, H, H], // 9
                [D, D, D, D, D, D, D, D, H, H],
                [D, D, D, D, D, D, D, D, D, H],
                [H, H, S, S, S, H, H, H, H, H], // 12
                [S, S, S, S, S, H, H, H, H, H],
                [S, S, S, S, S, H, H, H, H, H],
                [S, S, S, S, S, H, H, H, H, H],
                [S, S, S, S, S, H, H, H, H, H], // 16
                [S, S, S, S, S, S, S, S, S, S],
                [S, S, S, S, S, S, S, S, S, S],
                [S, S, S, S, S, S, S, S, S, S],
                [S, S, S, S, S, S, S, S, S, S],
                [S, S, S, S, S, S, S, S, S, S], // 21
            ],
            soft_charts: [
                [H, H, H, D, D, H, H, H, H, H], // Ace + 2
                [H, H, H, D, D, H, H, H, H, H],
                [H, H, D, D, D, H, H, H, H, H],
                [H, H, D, D, D, H, H, H, H, H],
                [H, D, D, D, D, H, H, H, H, H],
                [S, D, D, D, D, S, S, H, H, H], // Ace + 7
                [S, S, S, S, S, S, S, S, S, S],
                [S, S, S, S, S, S, S, S, S, S], // Ace + 9
            ],
            pair_charts: [
                [P, P, P, P, P, P, P, P, P, P], // Double Ace
                [P, P, P, P, P, P, H, H, H, H], // Double 2
                [P, P, P, P, P, P, H, H, H, H],
                [H, H, H, P, P, H, H, H, H, H],
                [D, D, D, D, D, D, D, D, H, H],
                [P, P, P, P, P, H, H, H, H, H],
                [P, P, P, P, P, P, H, H, H, H],
                [P, P, P, P, P, P, P, P, P, P],
                [P, P, P, P, P, S, P, P, S, S],
                [S, S, S, S, S, S, S, S, S, S], // Double 10
            ],
        }
    }

    /// Typed chart lookup. `None` when the category falls outside every chart.
    pub fn lookup(&self, category: HandCategory, upcard: DealerUpcard) -> Option<Cell> {
        let (chart, row): (&[[Cell; 10]], usize) = match category {
            HandCategory::Pair(rank) if rank.is_ace() => (&self.pair_charts, 0),
            HandCategory::Pair(rank) => (&self.pair_charts, rank.value() as usize - 1),
            HandCategory::Soft(total) => (
                &self.soft_charts,
                (total as usize).checked_sub(SOFT_FIRST_ROW as usize)?,
            ),
            HandCategory::Hard(total) => (
                &self.hard_charts,
                (total as usize).checked_sub(HARD_FIRST_ROW as usize)?,
            ),
        };
        chart.get(row).map(|cells| cells[upcard.column()])
    }

    /// The baseline action for a hand. Pairs are checked first, and only a split verdict
    /// is taken from the pair chart; everything else is read off the soft or hard chart.
    pub fn get_action(
        &self,
        hand: &HandState,
        upcard: DealerUpcard,
        permissions: Permissions,
    ) -> Action {
        if permissions.can_split {
            if let Some(rank) = hand.pair_rank() {
                if let Some((Action::Split, _)) = self.lookup(HandCategory::Pair(rank), upcard) {
                    return Action::Split;
                }
            }
        }

        let (total, is_soft) = hand.value();
        let cell = if is_soft {
            self.lookup(HandCategory::Soft(total), upcard)
        } else {
            None
        }
        .or_else(|| self.lookup(HandCategory::Hard(total), upcard));

        match cell {
            Some((Action::Double, fallback)) if !permissions.can_double => fallback,
            Some((action, _)) => action,
            None if total >= 17 => Action::Stand,
            None => Action::Hit,
        }
    }

    /// The baseline action with a label of how clear-cut the situation is. This is a
    /// heuristic, not a probability.
    pub fn get_action_with_confidence(
        &self,
        hand: &HandState,
        upcard: DealerUpcard,
        permissions: Permissions,
    ) -> (Action, f64) {
        let action = self.get_action(hand, upcard, permissions);
        let (total, is_soft) = hand.value();
        let splits_aces_or_eights = hand
            .pair_rank()
            .map_or(false, |rank| rank.is_ace() || rank.value() == 8);

        let confidence = if total >= 17 && !is_soft {
            0.95
        } else if total <= 11 {
            0.95
        } else if total == 21 {
            1.0
        } else if splits_aces_or_eights {
            0.98
        } else {
            0.85
        };
        (action, confidence)
    }
}

impl Strategy for StrategyTable {
    fn decide(
        &self,
        hand: &HandState,
        upcard: DealerUpcard,
        _: &Counter,
        permissions: Permissions,
    ) -> DecisionRecord {
        let (action, confidence) = self.get_action_with_confidence(hand, upcard, permissions);
        DecisionRecord {
            action,
            basic_action: action,
            true_count: 0.0,
            clamped_true_count: 0.0,
            confidence,
            deviation: false,
            risk_level: assess_risk_level(0.0, hand.total(), upcard),
            advantage: 0.0,
            take_insurance: false,
            reasoning: String::from("Basic strategy"),
        }
    }

    fn label(&self) -> &'static str {
        "basic"
    }
}
