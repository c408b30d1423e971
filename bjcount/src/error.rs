use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlackjackError {
    #[error("hand has no cards")]
    EmptyHand,
    #[error("invalid card rank {0}, expected 2-11 (1 is accepted for Ace)")]
    InvalidRank(u8),
    #[error("unsupported dealer upcard {0}")]
    InvalidUpcard(u8),
    #[error("number of decks must be in 1..={max} (got {got})")]
    InvalidDeckCount { got: u32, max: u32 },
    #[error("cards dealt ({dealt}) exceeds shoe size ({total})")]
    CardsDealtExceedShoe { dealt: u32, total: u32 },
    #[error("shoe is empty and rebuild on empty is disabled")]
    EmptyShoe,
}
