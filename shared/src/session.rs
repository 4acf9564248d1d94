//! Session store.
//!
//! `SessionState` is the single context every feature reads from. It changes
//! only through [`SessionState::reduce`], which returns the next state. Loading
//! a document replaces every per-feature sub-state at once so progress never
//! carries over between documents.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::exam::{ExamAction, ExamState};
use crate::flashcards::{Deck, FlashcardAction, FlashcardState};
use crate::models::{Flashcard, HistoryEntry, ProcessResponse, StudyResults, UltraArtifact, UltraKind};
use crate::polling::UltraProgress;
use crate::study_guide::StudyGuideState;
use crate::{Error, Result};

/// One processed document and everything generated from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySession {
    pub session_id: String,
    pub document_id: Option<String>,
    pub file_name: String,
    pub extracted_text: String,
    pub results: StudyResults,
}

impl StudySession {
    pub fn from_processed(response: ProcessResponse, uploaded_name: &str) -> Self {
        Self {
            session_id: response.session_id,
            document_id: response.document_id,
            file_name: response.file_name.unwrap_or_else(|| uploaded_name.to_string()),
            extracted_text: response.extracted_text.unwrap_or_default(),
            results: response.results,
        }
    }

    pub fn from_history(entry: HistoryEntry) -> Result<Self> {
        let results = entry
            .results
            .ok_or_else(|| Error::NotFound(format!("results for session {}", entry.id)))?;

        Ok(Self {
            file_name: entry.file_name.unwrap_or_else(|| "document.pdf".to_string()),
            session_id: entry.id,
            document_id: entry.document_id,
            extracted_text: entry.extracted_text.unwrap_or_default(),
            results,
        })
    }

    /// Text used as generation context: the extracted text, or the extended
    /// summary when the server did not return it.
    pub fn context_text(&self) -> &str {
        if self.extracted_text.trim().is_empty() {
            &self.results.riassunto_esteso
        } else {
            &self.extracted_text
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    #[default]
    Summary,
    UltraSummary,
    ConceptMap,
    UltraMap,
    Flashcards,
    Quiz,
    Exam,
    StudyGuide,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionAction {
    Loaded(StudySession),
    Cleared,
    TabSelected(Tab),
    Exam(ExamAction),
    Flashcards(FlashcardAction),
    StudyPlanReady(String),
    DaysInputChanged(String),
    ProbableQuestionsReady(Vec<String>),
    UltraProgress { session_id: String, progress: UltraProgress },
    UltraMerged { session_id: String, artifact: UltraArtifact },
    UltraFailed { session_id: String, kind: UltraKind, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub session: Option<StudySession>,
    pub tab: Tab,
    pub exam: ExamState,
    pub flashcards: FlashcardState,
    pub guide: StudyGuideState,
    pub ultra_progress: Option<UltraProgress>,
    pub ultra_error: Option<String>,
}

impl SessionState {
    pub fn results(&self) -> Option<&StudyResults> {
        self.session.as_ref().map(|s| &s.results)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.session_id.as_str())
    }

    /// Cards of the deck currently selected.
    pub fn flashcards(&self) -> &[Flashcard] {
        match self.results() {
            Some(results) => self.flashcards.deck.cards(results),
            None => &[],
        }
    }

    fn is_current(&self, session_id: &str) -> bool {
        self.session_id() == Some(session_id)
    }

    /// Apply one action and return the resulting state.
    pub fn reduce(mut self, action: SessionAction) -> Self {
        match action {
            SessionAction::Loaded(session) => {
                debug!(session_id = %session.session_id, "Session loaded");
                return Self {
                    session: Some(session),
                    ..Self::default()
                };
            }
            SessionAction::Cleared => return Self::default(),
            _ if self.session.is_none() => {}
            SessionAction::TabSelected(tab) => self.tab = tab,
            SessionAction::Exam(action) => self.exam = self.exam.apply(action),
            SessionAction::Flashcards(action) => {
                let len = match action {
                    FlashcardAction::SelectDeck(_) => 0,
                    _ => self.flashcards().len(),
                };
                self.flashcards = self.flashcards.apply(action, len);
            }
            SessionAction::StudyPlanReady(plan) => self.guide.study_plan = Some(plan),
            SessionAction::DaysInputChanged(input) => self.guide.days_input = input,
            SessionAction::ProbableQuestionsReady(questions) => self.guide.probable_questions = questions,
            SessionAction::UltraProgress { session_id, progress } => {
                if self.is_current(&session_id) {
                    self.ultra_progress = Some(progress);
                    self.ultra_error = None;
                }
            }
            SessionAction::UltraMerged { session_id, artifact } => {
                if self.is_current(&session_id) {
                    self.merge_ultra(artifact);
                }
            }
            SessionAction::UltraFailed {
                session_id,
                kind,
                message,
            } => {
                if self.is_current(&session_id) {
                    debug!(session_id = %session_id, kind = ?kind, "Ultra generation failed");
                    self.ultra_progress = None;
                    self.ultra_error = Some(message);
                }
            }
        }
        self
    }

    fn merge_ultra(&mut self, artifact: UltraArtifact) {
        let kind = artifact.kind();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.results.merge_ultra(artifact) {
            return;
        }

        self.ultra_progress = None;
        self.ultra_error = None;
        match kind {
            UltraKind::Summary => self.tab = Tab::UltraSummary,
            UltraKind::Maps => self.tab = Tab::UltraMap,
            UltraKind::Flashcards => {
                self.tab = Tab::Flashcards;
                self.flashcards = self.flashcards.apply(FlashcardAction::SelectDeck(Deck::Ultra), 0);
            }
        }
    }
}
