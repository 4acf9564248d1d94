//! Flashcard deck navigation.

use serde::{Deserialize, Serialize};

use crate::models::{Flashcard, StudyResults};

/// Which deck is being browsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Deck {
    #[default]
    Standard,
    Ultra,
}

impl Deck {
    /// Cards of this deck in `results`; the ultra deck is empty until generated.
    pub fn cards<'a>(&self, results: &'a StudyResults) -> &'a [Flashcard] {
        match self {
            Deck::Standard => &results.flashcard,
            Deck::Ultra => results.flashcard_ultra.as_deref().unwrap_or(&[]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlashcardAction {
    Next,
    Previous,
    Flip,
    SelectDeck(Deck),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardState {
    pub current_card: usize,
    pub show_back: bool,
    pub deck: Deck,
}

impl FlashcardState {
    /// Apply one action against a deck of `len` cards.
    pub fn apply(self, action: FlashcardAction, len: usize) -> Self {
        match action {
            FlashcardAction::Next if len > 0 => Self {
                current_card: (self.current_card + 1) % len,
                show_back: false,
                ..self
            },
            FlashcardAction::Previous if len > 0 => Self {
                current_card: (self.current_card % len + len - 1) % len,
                show_back: false,
                ..self
            },
            FlashcardAction::Flip if len > 0 => Self {
                show_back: !self.show_back,
                ..self
            },
            FlashcardAction::SelectDeck(deck) => Self {
                current_card: 0,
                show_back: false,
                deck,
            },
            _ => self,
        }
    }

    /// The visible card and its visible face.
    pub fn visible<'a>(&self, cards: &'a [Flashcard]) -> Option<&'a str> {
        let card = cards.get(self.current_card)?;
        Some(if self.show_back { &card.back } else { &card.front })
    }

    /// `"3 / 12"` style counter.
    pub fn position_label(&self, len: usize) -> String {
        if len == 0 {
            return "0 / 0".to_string();
        }
        format!("{} / {}", self.current_card.min(len - 1) + 1, len)
    }
}
