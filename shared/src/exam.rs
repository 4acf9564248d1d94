//! Exam simulator state machine.
//!
//! The exam is in configuration while it has no questions. Starting it with a
//! question set moves it to answering, and reaching the end (or finishing
//! early) completes it with a score over the multiple-choice answers.

use serde::{Deserialize, Serialize};

use crate::models::{QuestionKind, QuizQuestion};
use crate::{Error, Result};

/// Largest exam the generator accepts.
pub const MAX_EXAM_QUESTIONS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamType {
    #[default]
    MultipleChoice,
    Open,
    Mixed,
}

/// Settings of a paid custom exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamConfig {
    pub num_questions: u32,
    pub difficulty: Difficulty,
    #[serde(rename = "type")]
    pub exam_type: ExamType,
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            num_questions: 10,
            difficulty: Difficulty::Medium,
            exam_type: ExamType::MultipleChoice,
        }
    }
}

impl ExamConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_questions == 0 || self.num_questions > MAX_EXAM_QUESTIONS {
            return Err(Error::Validation(format!(
                "An exam must have between 1 and {} questions",
                MAX_EXAM_QUESTIONS
            )));
        }
        Ok(())
    }
}

/// A recorded answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Answer {
    Choice(usize),
    Text(String),
}

/// Where the exam currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamPhase {
    Configuration,
    InProgress { index: usize, total: usize },
    Completed { score: usize, total: usize },
}

/// User input to the exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExamAction {
    Configure(ExamConfig),
    Start(Vec<QuizQuestion>),
    SelectOption(usize),
    EditOpenAnswer(String),
    SubmitOpenAnswer,
    Next,
    Previous,
    Finish,
    /// Back to configuration; the question set is discarded.
    Reset,
    /// Same questions again from the first one.
    Restart,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamState {
    pub current_question: usize,
    pub selected_option: Option<usize>,
    pub open_answer_draft: String,
    pub show_explanation: bool,
    pub user_answers: Vec<Option<Answer>>,
    pub is_completed: bool,
    pub score: usize,
    pub custom_questions: Vec<QuizQuestion>,
    pub custom_exam_config: ExamConfig,
}

impl ExamState {
    pub fn phase(&self) -> ExamPhase {
        let total = self.custom_questions.len();
        if total == 0 {
            ExamPhase::Configuration
        } else if self.is_completed {
            ExamPhase::Completed {
                score: self.score,
                total,
            }
        } else {
            ExamPhase::InProgress {
                index: self.current_question,
                total,
            }
        }
    }

    pub fn current(&self) -> Option<&QuizQuestion> {
        if self.is_completed {
            return None;
        }
        self.custom_questions.get(self.current_question)
    }

    /// Apply one action and return the resulting state.
    pub fn apply(mut self, action: ExamAction) -> Self {
        match action {
            ExamAction::Configure(config) => {
                if self.phase() == ExamPhase::Configuration {
                    self.custom_exam_config = config;
                }
            }
            ExamAction::Start(questions) => {
                let config = self.custom_exam_config;
                self = Self {
                    user_answers: vec![None; questions.len()],
                    custom_questions: questions,
                    custom_exam_config: config,
                    ..Self::default()
                };
            }
            ExamAction::SelectOption(option) => self.select_option(option),
            ExamAction::EditOpenAnswer(text) => {
                if self.current_is(QuestionKind::Open) && !self.show_explanation {
                    self.open_answer_draft = text;
                }
            }
            ExamAction::SubmitOpenAnswer => self.submit_open_answer(),
            ExamAction::Next => {
                if !self.is_completed && !self.custom_questions.is_empty() {
                    if self.current_question + 1 >= self.custom_questions.len() {
                        self.complete();
                    } else {
                        self.go_to(self.current_question + 1);
                    }
                }
            }
            ExamAction::Previous => {
                if !self.is_completed && self.current_question > 0 {
                    self.go_to(self.current_question - 1);
                }
            }
            ExamAction::Finish => {
                if !self.custom_questions.is_empty() {
                    self.complete();
                }
            }
            ExamAction::Reset => {
                self = Self {
                    custom_exam_config: self.custom_exam_config,
                    ..Self::default()
                };
            }
            ExamAction::Restart => {
                let questions = std::mem::take(&mut self.custom_questions);
                self = self.apply(ExamAction::Start(questions));
            }
        }
        self
    }

    fn current_is(&self, kind: QuestionKind) -> bool {
        self.current().is_some_and(|q| q.kind == kind)
    }

    fn select_option(&mut self, option: usize) {
        let Some(question) = self.current() else {
            return;
        };
        if !question.is_multiple_choice() || option >= question.options.len() {
            return;
        }
        if self.show_explanation {
            return;
        }
        self.selected_option = Some(option);
        self.user_answers[self.current_question] = Some(Answer::Choice(option));
        self.show_explanation = true;
    }

    fn submit_open_answer(&mut self) {
        if !self.current_is(QuestionKind::Open) || self.show_explanation {
            return;
        }
        let text = self.open_answer_draft.trim();
        if text.is_empty() {
            return;
        }
        self.user_answers[self.current_question] = Some(Answer::Text(text.to_string()));
        self.show_explanation = true;
    }

    fn go_to(&mut self, index: usize) {
        self.current_question = index;
        let answer = self.user_answers.get(index).cloned().flatten();
        self.show_explanation = answer.is_some();
        match answer {
            Some(Answer::Choice(option)) => {
                self.selected_option = Some(option);
                self.open_answer_draft.clear();
            }
            Some(Answer::Text(text)) => {
                self.selected_option = None;
                self.open_answer_draft = text;
            }
            None => {
                self.selected_option = None;
                self.open_answer_draft.clear();
            }
        }
    }

    fn complete(&mut self) {
        self.score = score(&self.custom_questions, &self.user_answers);
        self.is_completed = true;
        self.show_explanation = false;
    }
}

/// Count multiple-choice answers matching the correct option. Open answers never score.
pub fn score(questions: &[QuizQuestion], answers: &[Option<Answer>]) -> usize {
    questions
        .iter()
        .zip(answers)
        .filter(|(question, answer)| match (question.kind, answer) {
            (QuestionKind::MultipleChoice, Some(Answer::Choice(chosen))) => {
                question.correct_option_index == Some(*chosen)
            }
            _ => false,
        })
        .count()
}

/// Base quiz shown when the basic-quiz endpoint is unavailable.
pub fn fallback_base_quiz() -> Vec<QuizQuestion> {
    let question = |text: &str, options: [&str; 4], correct: usize, explanation: &str| QuizQuestion {
        question: text.to_string(),
        kind: QuestionKind::MultipleChoice,
        options: options.iter().map(|o| o.to_string()).collect(),
        correct_option_index: Some(correct),
        explanation: explanation.to_string(),
    };

    vec![
        question(
            "What is the most effective way to review this material?",
            [
                "Re-reading the whole document once",
                "Active recall with flashcards over several days",
                "Highlighting every paragraph",
                "Reading only the summary the night before",
            ],
            1,
            "Spaced active recall produces much stronger retention than passive re-reading.",
        ),
        question(
            "How should you use the concept map?",
            [
                "Ignore it, the summary is enough",
                "Memorise it word by word",
                "Use it to see how the main ideas connect",
                "Print it and never open it again",
            ],
            2,
            "The map shows relationships between concepts, which helps with open questions.",
        ),
        question(
            "When is the best time to take a simulated exam?",
            [
                "After studying, to find gaps before the real exam",
                "Never, it only causes stress",
                "Only after the real exam",
                "Before opening the document",
            ],
            0,
            "Simulations reveal weak topics while there is still time to review them.",
        ),
    ]
}
