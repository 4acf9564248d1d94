//! Study plan inputs and the probable-questions price gate.

use serde::{Deserialize, Serialize};

use crate::models::ProbableQuestionsCost;
use crate::{Error, Result};

/// Price shown after the free first use, until the server confirms it.
pub const PAID_QUESTIONS_COST: u32 = 5;

/// Longest study plan the generator accepts.
pub const MAX_PLAN_DAYS: u32 = 365;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyGuideState {
    pub study_plan: Option<String>,
    pub days_input: String,
    pub probable_questions: Vec<String>,
}

impl StudyGuideState {
    /// Parse the number of days the user typed.
    pub fn days(&self) -> Result<u32> {
        let days: u32 = self
            .days_input
            .trim()
            .parse()
            .map_err(|_| Error::Validation("Enter the number of days until your exam".to_string()))?;

        if days == 0 || days > MAX_PLAN_DAYS {
            return Err(Error::Validation(format!(
                "The plan must cover between 1 and {} days",
                MAX_PLAN_DAYS
            )));
        }
        Ok(days)
    }
}

/// Price of the next probable-questions generation.
///
/// `Pending` is a display value the server has not confirmed yet and must not
/// be used for decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "credits", rename_all = "snake_case")]
pub enum QuestionCost {
    #[default]
    Unknown,
    Pending(u32),
    Confirmed(u32),
}

impl QuestionCost {
    /// The server-confirmed price, if any.
    pub fn authoritative(&self) -> Option<u32> {
        match self {
            QuestionCost::Confirmed(credits) => Some(*credits),
            _ => None,
        }
    }

    /// Price to show, confirmed or not.
    pub fn display(&self) -> Option<u32> {
        match self {
            QuestionCost::Pending(credits) | QuestionCost::Confirmed(credits) => Some(*credits),
            QuestionCost::Unknown => None,
        }
    }
}

/// Account-scoped price tracking: checked once per signed-in user, not per document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionCostGate {
    pub cost: QuestionCost,
    checked_for: Option<String>,
}

impl QuestionCostGate {
    /// Whether the price must be fetched for `user_id`.
    pub fn needs_check(&self, user_id: &str) -> bool {
        self.checked_for.as_deref() != Some(user_id)
    }

    /// Apply a price reported by the server.
    pub fn confirm(&mut self, user_id: &str, reported: ProbableQuestionsCost) {
        let credits = if reported.is_free { 0 } else { reported.cost };
        self.cost = QuestionCost::Confirmed(credits);
        self.checked_for = Some(user_id.to_string());
    }

    /// Record a generation. After the free first use the displayed price
    /// jumps to the paid price until re-checked.
    pub fn record_generation(&mut self, was_free: bool) {
        if was_free {
            self.cost = QuestionCost::Pending(PAID_QUESTIONS_COST);
        }
    }

    /// Forget the user (sign-out).
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
