use crate::BlackjackError;

const ACE: u8 = 11;

/// Blackjack values of one suit: 2 to 9, four ten-valued faces, and the Ace.
pub(crate) const SUIT: [Rank; 13] = [
    Rank(2),
    Rank(3),
    Rank(4),
    Rank(5),
    Rank(6),
    Rank(7),
    Rank(8),
    Rank(9),
    Rank(10),
    Rank(10),
    Rank(10),
    Rank(10),
    Rank(ACE),
];

/// A card in blackjack values: 2 to 10 (10 also stands for J, Q and K), and 11 for an Ace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rank(u8);

impl Rank {
    pub const ACE: Rank = Rank(ACE);
    pub const TEN: Rank = Rank(10);

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn is_ace(&self) -> bool {
        self.0 == ACE
    }

    /// Hi-Lo tag of this rank: +1 for 2 to 6, -1 for 10 and Ace, 0 otherwise.
    pub fn hi_lo(&self) -> i32 {
        match self.0 {
            2..=6 => 1,
            7..=9 => 0,
            _ => -1,
        }
    }
}

impl TryFrom<u8> for Rank {
    type Error = BlackjackError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 | ACE => Ok(Rank(ACE)),
            2..=10 => Ok(Rank(value)),
            _ => Err(BlackjackError::InvalidRank(value)),
        }
    }
}

impl From<Rank> for u8 {
    fn from(rank: Rank) -> u8 {
        rank.0
    }
}

/// A 2 to 9 upcard. Only built through the checked constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pip(u8);

impl Pip {
    pub fn new(value: u8) -> Option<Self> {
        (2..=9).contains(&value).then_some(Pip(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

/// The dealer's face-up card, bucketed the way every strategy chart is: 2 to 9, Ten, Ace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DealerUpcard {
    Pip(Pip),
    Ten,
    Ace,
}

impl DealerUpcard {
    /// Column in a chart laid out as 2, 3, ..., 9, 10, A.
    pub fn column(&self) -> usize {
        match self {
            DealerUpcard::Pip(pip) => (pip.value() - 2) as usize,
            DealerUpcard::Ten => 8,
            DealerUpcard::Ace => 9,
        }
    }

    /// Numeric strength, with the Ace counted as 11.
    pub fn value(&self) -> u8 {
        match self {
            DealerUpcard::Pip(pip) => pip.value(),
            DealerUpcard::Ten => 10,
            DealerUpcard::Ace => ACE,
        }
    }
}

impl TryFrom<u8> for DealerUpcard {
    type Error = BlackjackError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 | ACE => Ok(DealerUpcard::Ace),
            10 => Ok(DealerUpcard::Ten),
            2..=9 => Ok(DealerUpcard::Pip(Pip(value))),
            _ => Err(BlackjackError::InvalidUpcard(value)),
        }
    }
}

impl From<Rank> for DealerUpcard {
    fn from(rank: Rank) -> Self {
        match rank.value() {
            ACE => DealerUpcard::Ace,
            10 => DealerUpcard::Ten,
            n => DealerUpcard::Pip(Pip(n)),
        }
    }
}

/// The player's cards in the order they were received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandState {
    cards: Vec<Rank>,
}

impl HandState {
    pub fn new(cards: Vec<Rank>) -> Result<Self, BlackjackError> {
        if cards.is_empty() {
            return Err(BlackjackError::EmptyHand);
        }
        Ok(HandState { cards })
    }

    /// Builds a hand from raw values, rejecting anything outside 1..=11.
    pub fn from_values(values: &[u8]) -> Result<Self, BlackjackError> {
        let cards = values
            .iter()
            .map(|v| Rank::try_from(*v))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(cards)
    }

    pub fn cards(&self) -> &[Rank] {
        &self.cards
    }

    pub fn receive_card(&mut self, card: Rank) {
        self.cards.push(card);
    }

    /// Returns (total, is_soft). Aces are demoted from 11 to 1 one at a time while the
    /// hand is over 21.
    pub fn value(&self) -> (u8, bool) {
        let mut total: u32 = self.cards.iter().map(|c| c.value() as u32).sum();
        let mut soft_aces = self.cards.iter().filter(|c| c.is_ace()).count();
        while total > 21 && soft_aces > 0 {
            total -= 10;
            soft_aces -= 1;
        }
        let is_soft = soft_aces > 0 && total <= 21;
        (total.min(u8::MAX as u32) as u8, is_soft)
    }

    pub fn total(&self) -> u8 {
        self.value().0
    }

    pub fn is_soft(&self) -> bool {
        self.value().1
    }

    /// Exactly two cards of the same rank.
    pub fn pair_rank(&self) -> Option<Rank> {
        match self.cards.as_slice() {
            [a, b] if a == b => Some(*a),
            _ => None,
        }
    }

    pub fn is_pair(&self) -> bool {
        self.pair_rank().is_some()
    }

    pub fn is_blackjack(&self) -> bool {
        self.cards.len() == 2 && self.total() == 21
    }

    pub fn is_bust(&self) -> bool {
        self.total() > 21
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aces_are_demoted_one_at_a_time() {
        let hand = HandState::from_values(&[11, 11]).unwrap();
        assert_eq!(hand.value(), (12, true));

        let hand = HandState::from_values(&[11, 11, 11, 9]).unwrap();
        assert_eq!(hand.value(), (12, false));

        let hand = HandState::from_values(&[11, 6]).unwrap();
        assert_eq!(hand.value(), (17, true));

        let hand = HandState::from_values(&[11, 6, 10]).unwrap();
        assert_eq!(hand.value(), (17, false));
    }

    #[test]
    fn one_is_an_ace_alias() {
        let hand = HandState::from_values(&[1, 10]).unwrap();
        assert!(hand.is_blackjack());
        assert_eq!(DealerUpcard::try_from(1).unwrap(), DealerUpcard::Ace);
        assert_eq!(DealerUpcard::try_from(11).unwrap(), DealerUpcard::Ace);
    }

    #[test]
    fn invalid_input_is_rejected() {
        assert_eq!(HandState::from_values(&[]), Err(BlackjackError::EmptyHand));
        assert_eq!(
            HandState::from_values(&[10, 12]),
            Err(BlackjackError::InvalidRank(12))
        );
        assert_eq!(
            HandState::from_values(&[0]),
            Err(BlackjackError::InvalidRank(0))
        );
        assert_eq!(
            DealerUpcard::try_from(0),
            Err(BlackjackError::InvalidUpcard(0))
        );
    }

    #[test]
    fn upcard_columns_follow_chart_layout() {
        assert_eq!(DealerUpcard::try_from(2).unwrap().column(), 0);
        assert_eq!(DealerUpcard::try_from(9).unwrap().column(), 7);
        assert_eq!(DealerUpcard::Ten.column(), 8);
        assert_eq!(DealerUpcard::Ace.column(), 9);
    }

    #[test]
    fn pips_outside_two_to_nine_cannot_be_built() {
        assert_eq!(Pip::new(1), None);
        assert_eq!(Pip::new(10), None);
        assert_eq!(Pip::new(12), None);
        let three = DealerUpcard::Pip(Pip::new(3).unwrap());
        assert_eq!(three, DealerUpcard::try_from(3).unwrap());
        assert_eq!(three.column(), 1);
        assert_eq!(three.value(), 3);
        for value in 0..=u8::MAX {
            if let Ok(upcard) = DealerUpcard::try_from(value) {
                assert!(upcard.column() <= 9);
            }
        }
    }

    #[test]
    fn pairs_and_hi_lo_tags() {
        let hand = HandState::from_values(&[8, 8]).unwrap();
        assert_eq!(hand.pair_rank(), Some(Rank::try_from(8).unwrap()));
        let hand = HandState::from_values(&[8, 8, 2]).unwrap();
        assert_eq!(hand.pair_rank(), None);

        let tags: Vec<i32> = (2..=11)
            .map(|v| Rank::try_from(v).unwrap().hi_lo())
            .collect();
        assert_eq!(tags, vec![1, 1, 1, 1, 1, 0, 0, 0, -1, -1]);
    }
}
