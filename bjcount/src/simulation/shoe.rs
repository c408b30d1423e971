use crate::{cards::SUIT, BlackjackError, Rank};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

pub const CARDS_PER_DECK: u32 = 52;
pub const DEFAULT_PENETRATION_THRESHOLD: f64 = 0.75;

/// Represents a shoe in the real world, already collapsed into blackjack values.
#[derive(Debug, Clone)]
pub struct Shoe {
    number_of_decks: u8,
    penetration_threshold: f64,
    rebuild_on_empty: bool,
    cards: Vec<Rank>,
    cards_dealt: usize,
    rng: StdRng,
}

impl Shoe {
    /// Creates a new shuffled shoe.
    pub fn new(number_of_decks: u8, penetration_threshold: f64) -> Shoe {
        Self::with_rng(number_of_decks, penetration_threshold, StdRng::from_entropy())
    }

    /// Creates a new shoe whose shuffles are reproducible.
    pub fn with_seed(number_of_decks: u8, penetration_threshold: f64, seed: u64) -> Shoe {
        Self::with_rng(
            number_of_decks,
            penetration_threshold,
            StdRng::seed_from_u64(seed),
        )
    }

    fn with_rng(number_of_decks: u8, penetration_threshold: f64, rng: StdRng) -> Shoe {
        let number_of_decks = number_of_decks.max(1);
        let mut shoe = Shoe {
            number_of_decks,
            penetration_threshold,
            rebuild_on_empty: true,
            cards: Vec::with_capacity(number_of_decks as usize * CARDS_PER_DECK as usize),
            cards_dealt: 0,
            rng,
        };
        shoe.shuffle();
        shoe
    }

    /// When disabled, drawing from an exhausted shoe returns `EmptyShoe` instead of
    /// rebuilding it.
    pub fn set_rebuild_on_empty(&mut self, rebuild_on_empty: bool) {
        self.rebuild_on_empty = rebuild_on_empty;
    }

    /// Rebuilds the full shoe and randomizes its order. Any count kept against the old
    /// shoe is stale after this and must be reset by the caller.
    pub fn shuffle(&mut self) {
        self.cards.clear();
        for _ in 0..self.number_of_decks {
            for _ in 0..4 {
                self.cards.extend_from_slice(&SUIT);
            }
        }
        self.cards.shuffle(&mut self.rng);
        self.cards_dealt = 0;
    }

    /// Deals the next card. An exhausted shoe is rebuilt and reshuffled first unless
    /// rebuilding has been disabled.
    pub fn draw_card(&mut self) -> Result<Rank, BlackjackError> {
        if self.cards_dealt >= self.cards.len() {
            if !self.rebuild_on_empty {
                return Err(BlackjackError::EmptyShoe);
            }
            info!(
                number_of_decks = self.number_of_decks,
                "shoe exhausted, rebuilding"
            );
            self.shuffle();
        }
        let card = self.cards[self.cards_dealt];
        self.cards_dealt += 1;
        Ok(card)
    }

    /// Percentage of the shoe already dealt, in [0, 100].
    pub fn penetration(&self) -> f64 {
        if self.cards.is_empty() {
            return 0.0;
        }
        self.cards_dealt as f64 / self.cards.len() as f64 * 100.0
    }

    /// Checks if the cut card has been passed.
    pub fn needs_reshuffle(&self) -> bool {
        self.penetration() > self.penetration_threshold * 100.0
    }

    pub fn cards_dealt(&self) -> usize {
        self.cards_dealt
    }

    pub fn cards_remaining(&self) -> usize {
        self.cards.len() - self.cards_dealt
    }

    pub fn total_cards(&self) -> usize {
        self.cards.len()
    }

    pub fn number_of_decks(&self) -> u8 {
        self.number_of_decks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composition(shoe: &Shoe) -> [usize; 12] {
        let mut counts = [0; 12];
        for card in &shoe.cards {
            counts[card.value() as usize] += 1;
        }
        counts
    }

    #[test]
    fn new_shoe_has_correct_composition() {
        let number_of_decks = 3;
        let shoe = Shoe::with_seed(number_of_decks, 0.75, 7);
        assert_eq!(shoe.total_cards(), 156);
        let counts = composition(&shoe);
        for value in 2..=9 {
            assert_eq!(counts[value], 12);
        }
        assert_eq!(counts[10], 48);
        assert_eq!(counts[11], 12);
    }

    #[test]
    fn same_seed_gives_same_order() {
        let mut a = Shoe::with_seed(2, 0.75, 42);
        let mut b = Shoe::with_seed(2, 0.75, 42);
        for _ in 0..104 {
            assert_eq!(a.draw_card().unwrap(), b.draw_card().unwrap());
        }
    }

    #[test]
    fn exhausted_shoe_reshuffles_instead_of_failing() {
        let mut shoe = Shoe::with_seed(6, 0.75, 1);
        for _ in 0..312 {
            shoe.draw_card().unwrap();
        }
        assert_eq!(shoe.penetration(), 100.0);
        assert_eq!(shoe.cards_remaining(), 0);

        assert!(shoe.draw_card().is_ok());
        assert_eq!(shoe.cards_dealt(), 1);
        assert_eq!(composition(&shoe)[10], 96);
    }

    #[test]
    fn exhausted_shoe_fails_when_rebuild_disabled() {
        let mut shoe = Shoe::with_seed(1, 0.75, 1);
        shoe.set_rebuild_on_empty(false);
        for _ in 0..52 {
            shoe.draw_card().unwrap();
        }
        assert_eq!(shoe.draw_card(), Err(BlackjackError::EmptyShoe));
    }

    #[test]
    fn reshuffle_is_needed_past_threshold() {
        let mut shoe = Shoe::with_seed(1, 0.75, 3);
        for _ in 0..39 {
            shoe.draw_card().unwrap();
        }
        assert!(!shoe.needs_reshuffle());
        shoe.draw_card().unwrap();
        assert!(shoe.needs_reshuffle());

        shoe.shuffle();
        assert_eq!(shoe.cards_dealt(), 0);
        assert_eq!(shoe.penetration(), 0.0);
    }
}
