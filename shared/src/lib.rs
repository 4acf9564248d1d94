//! Shared library for the study assistant.
//!
//! This crate provides the session store, the per-feature state machines, the
//! HTTP client for the study endpoints and the workflow that ties them together.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod credits;
pub mod error;
pub mod exam;
pub mod flashcards;
pub mod inflight;
pub mod models;
pub mod polling;
pub mod session;
pub mod study_guide;
pub mod tts;

pub use api::{PdfUpload, StudyApiClient};
pub use app::{AppSnapshot, BaseQuizSource, StudyApp, UltraGeneration, UltraQuote};
pub use auth::{user_from_token, UserContext};
pub use config::Config;
pub use credits::CreditBalance;
pub use error::{Error, Notice, Result};
pub use exam::{ExamAction, ExamConfig, ExamPhase, ExamState};
pub use flashcards::{Deck, FlashcardAction, FlashcardState};
pub use models::{StudyResults, SummaryVariant, UltraArtifact, UltraKind};
pub use polling::{HistorySource, MonitorHandle, UltraMonitor, UltraOutcome, UltraProgress};
pub use session::{SessionAction, SessionState, StudySession, Tab};
pub use study_guide::{QuestionCost, QuestionCostGate, StudyGuideState};
pub use tts::{TtsError, TtsService};
