//! Study workflow: fetch artifacts and fold them into the session store.
//!
//! Each operation validates locally, calls one endpoint, refreshes the credit
//! balance from the response and reduces the result into [`SessionState`].
//! Failed calls leave the state and the balance as they were.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::{PdfUpload, StudyApiClient};
use crate::auth::{user_from_token, UserContext};
use crate::credits::CreditBalance;
use crate::exam::{fallback_base_quiz, ExamAction, ExamConfig, ExamPhase};
use crate::inflight::InFlightRegistry;
use crate::models::{
    AddCreditsRequest, ArtifactKind, BasicQuizRequest, DownloadSummaryRequest, ExamRequest,
    HistoryEntry, ProbableQuestionsRequest, SaveHistoryRequest, StudyPlanRequest, SummaryVariant,
    UltraKind, UltraRequest,
};
use crate::polling::{UltraMonitor, UltraOutcome, UltraProgress};
use crate::session::{SessionAction, SessionState, StudySession};
use crate::study_guide::{QuestionCost, QuestionCostGate};
use crate::tts::{SynthesizedAudio, TtsService};
use crate::{Config, Error, Result};

/// Where the questions of a base quiz came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseQuizSource {
    Generated,
    Fallback,
}

/// Shown to the user before spending credits on an ultra artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UltraQuote {
    pub kind: UltraKind,
    pub cost: i64,
    pub balance: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UltraGeneration {
    /// The session already has this artifact.
    AlreadyAvailable,
    /// The user declined the confirmation.
    Declined,
    /// Generated and merged; `polled` when it arrived through history polling.
    Completed { polled: bool },
}

/// Persistent part of the app between invocations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppSnapshot {
    pub state: SessionState,
    pub credits: CreditBalance,
    pub question_cost: QuestionCostGate,
}

impl AppSnapshot {
    /// Write the snapshot as JSON.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Read a snapshot, or start empty if there is none.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

/// The study app: one session, one user, one credit balance.
pub struct StudyApp {
    client: StudyApiClient,
    config: Config,
    user: Option<UserContext>,
    state: SessionState,
    credits: CreditBalance,
    question_cost: QuestionCostGate,
    inflight: InFlightRegistry,
}

impl StudyApp {
    pub fn new(config: Config) -> Result<Self> {
        let client = StudyApiClient::new(&config)?;

        Ok(Self {
            client,
            config,
            user: None,
            state: SessionState::default(),
            credits: CreditBalance::default(),
            question_cost: QuestionCostGate::default(),
            inflight: InFlightRegistry::new(),
        })
    }

    /// Restore a previously saved snapshot.
    pub fn restore(mut self, snapshot: AppSnapshot) -> Self {
        self.state = snapshot.state;
        self.credits = snapshot.credits;
        self.question_cost = snapshot.question_cost;
        self
    }

    pub fn snapshot(&self) -> AppSnapshot {
        AppSnapshot {
            state: self.state.clone(),
            credits: self.credits,
            question_cost: self.question_cost.clone(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn credits(&self) -> CreditBalance {
        self.credits
    }

    pub fn question_cost(&self) -> QuestionCost {
        self.question_cost.cost
    }

    pub fn user(&self) -> Option<&UserContext> {
        self.user.as_ref()
    }

    /// Apply a UI action to the session store.
    pub fn dispatch(&mut self, action: SessionAction) {
        self.state = std::mem::take(&mut self.state).reduce(action);
    }

    fn session(&self) -> Result<&StudySession> {
        self.state
            .session
            .as_ref()
            .ok_or_else(|| Error::Validation("Upload a document first".to_string()))
    }

    fn language(&self) -> &str {
        &self.config.language
    }

    /// Sign in with a bearer token. The probable-questions price is checked
    /// here, once per user.
    pub async fn sign_in(&mut self, token: &str) -> Result<()> {
        let user = user_from_token(token)?;
        self.client.set_token(Some(user.token.clone()));
        info!(user_id = %user.user_id, "Signed in");
        self.user = Some(user);

        if let Err(e) = self.refresh_question_cost(false).await {
            warn!(error = %e, "Failed to check probable questions price");
        }
        Ok(())
    }

    pub fn sign_out(&mut self) {
        self.user = None;
        self.client.set_token(None);
        self.question_cost.reset();
    }

    /// Upload a PDF and make it the active session.
    pub async fn upload_document(&mut self, path: &Path, target_language: Option<String>) -> Result<()> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("document.pdf")
            .to_string();

        let _guard = self.inflight.try_acquire(&file_name, ArtifactKind::Document)?;
        info!(file_name = %file_name, size = bytes.len(), "Processing document");

        let response = self
            .client
            .process_pdf(PdfUpload {
                file_name: file_name.clone(),
                bytes,
                language: self.config.language.clone(),
                user_id: self.user.as_ref().map(|u| u.user_id.clone()),
                target_language,
            })
            .await?;

        self.credits.refresh(response.credits_remaining);
        let session = StudySession::from_processed(response, &file_name);
        info!(session_id = %session.session_id, "Document processed");
        self.dispatch(SessionAction::Loaded(session));
        Ok(())
    }

    pub async fn history(&self) -> Result<Vec<HistoryEntry>> {
        self.client.history().await
    }

    /// Replace the active session with one from history.
    pub async fn load_history_entry(&mut self, session_id: &str) -> Result<()> {
        let entry = self.client.history_entry(session_id).await?;
        let session = StudySession::from_history(entry)?;
        self.dispatch(SessionAction::Loaded(session));
        Ok(())
    }

    /// Start the free three-question quiz, falling back to the built-in one.
    pub async fn start_base_quiz(&mut self) -> Result<BaseQuizSource> {
        let session = self.session()?;
        let _guard = self.inflight.try_acquire(&session.session_id, ArtifactKind::BasicQuiz)?;

        let generated = if self.user.is_none() || session.context_text().trim().is_empty() {
            None
        } else {
            let request = BasicQuizRequest {
                session_id: &session.session_id,
                text: session.context_text(),
                language: self.language(),
            };
            match self.client.generate_basic_quiz(&request).await {
                Ok(response) if !response.questions.is_empty() => Some(response.questions),
                Ok(_) => {
                    warn!(session_id = %session.session_id, "Basic quiz came back empty");
                    None
                }
                Err(e) => {
                    warn!(session_id = %session.session_id, error = %e, "Basic quiz generation failed");
                    None
                }
            }
        };

        let (questions, source) = match generated {
            Some(questions) => (questions, BaseQuizSource::Generated),
            None => (fallback_base_quiz(), BaseQuizSource::Fallback),
        };
        self.dispatch(SessionAction::Exam(ExamAction::Start(questions)));
        Ok(source)
    }

    /// Generate a paid custom exam and start it. Only allowed from the
    /// configuration phase.
    pub async fn generate_custom_exam(&mut self, config: ExamConfig) -> Result<usize> {
        config.validate()?;
        if self.state.exam.phase() != ExamPhase::Configuration {
            return Err(Error::Validation(
                "Reset the current exam before generating a new one".to_string(),
            ));
        }
        self.dispatch(SessionAction::Exam(ExamAction::Configure(config)));

        let session = self.session()?;
        let _guard = self.inflight.try_acquire(&session.session_id, ArtifactKind::Exam)?;

        let response = self
            .client
            .generate_exam(&ExamRequest {
                session_id: &session.session_id,
                text: session.context_text(),
                language: self.language(),
                num_questions: config.num_questions,
                difficulty: config.difficulty,
                exam_type: config.exam_type,
            })
            .await?;

        self.credits.refresh(response.credits_remaining);
        if response.questions.is_empty() {
            return Err(Error::GenerationFailed("The exam came back without questions.".to_string()));
        }

        let count = response.questions.len();
        self.dispatch(SessionAction::Exam(ExamAction::Start(response.questions)));
        Ok(count)
    }

    /// Generate a study plan for the number of days in the guide input.
    pub async fn generate_study_plan(&mut self) -> Result<String> {
        let days = self.state.guide.days()?;
        let session = self.session()?;
        let _guard = self.inflight.try_acquire(&session.session_id, ArtifactKind::StudyPlan)?;

        let response = self
            .client
            .study_plan(&StudyPlanRequest {
                session_id: &session.session_id,
                text: session.context_text(),
                language: self.language(),
                days,
            })
            .await?;

        self.credits.refresh(response.credits_remaining);
        self.dispatch(SessionAction::StudyPlanReady(response.plan.clone()));
        Ok(response.plan)
    }

    /// Fetch the account's probable-questions price. Without `force` it is
    /// fetched only once per signed-in user.
    pub async fn refresh_question_cost(&mut self, force: bool) -> Result<QuestionCost> {
        let Some(user) = &self.user else {
            return Ok(self.question_cost.cost);
        };
        if !force && !self.question_cost.needs_check(&user.user_id) {
            return Ok(self.question_cost.cost);
        }

        let reported = self.client.probable_questions_cost().await?;
        self.question_cost.confirm(&user.user_id, reported);
        Ok(self.question_cost.cost)
    }

    pub async fn generate_probable_questions(&mut self) -> Result<Vec<String>> {
        if self.user.is_none() {
            return Err(Error::Auth("Sign in to generate probable questions".to_string()));
        }
        let session = self.session()?;
        let _guard = self
            .inflight
            .try_acquire(&session.session_id, ArtifactKind::ProbableQuestions)?;

        let response = self
            .client
            .probable_questions(&ProbableQuestionsRequest {
                session_id: &session.session_id,
                text: session.context_text(),
                language: self.language(),
            })
            .await?;

        self.credits.refresh(response.credits_remaining);
        self.question_cost.record_generation(response.was_free);
        self.dispatch(SessionAction::ProbableQuestionsReady(response.questions.clone()));

        if response.was_free {
            if let Err(e) = self.refresh_question_cost(true).await {
                warn!(error = %e, "Failed to re-check probable questions price");
            }
        }
        Ok(response.questions)
    }

    /// Read a summary aloud.
    pub async fn synthesize_audio(&mut self, variant: SummaryVariant) -> Result<SynthesizedAudio> {
        let session = self.session()?;
        let text = variant
            .text(&session.results)
            .ok_or_else(|| Error::Validation("That summary is not available".to_string()))?;
        let _guard = self.inflight.try_acquire(&session.session_id, ArtifactKind::Audio)?;

        let tts = match &self.config.tts_voice {
            Some(voice) => TtsService::with_voice(&self.client, self.language(), voice.as_str()),
            None => TtsService::new(&self.client, self.language()),
        };
        let audio = tts.synthesize(text).await?;

        self.credits.refresh(audio.credits_remaining);
        Ok(audio)
    }

    /// Render a summary to a downloadable file.
    pub async fn download_summary(&self, variant: SummaryVariant) -> Result<Vec<u8>> {
        let session = self.session()?;
        let content = variant
            .text(&session.results)
            .ok_or_else(|| Error::Validation("That summary is not available".to_string()))?;

        self.client
            .download_summary(&DownloadSummaryRequest {
                session_id: &session.session_id,
                variant,
                file_name: &session.file_name,
                content,
            })
            .await
    }

    /// Generate an ultra artifact.
    ///
    /// The local balance is checked against the artifact's threshold and
    /// `confirm` is asked before anything is spent. If the server answers
    /// without the artifact, history is polled until it appears.
    pub async fn generate_ultra<C, P>(
        &mut self,
        kind: UltraKind,
        confirm: C,
        mut on_progress: P,
    ) -> Result<UltraGeneration>
    where
        C: FnOnce(UltraQuote) -> bool,
        P: FnMut(UltraProgress) + Send,
    {
        let session = self.session()?;
        if session.results.has_ultra(kind) {
            return Ok(UltraGeneration::AlreadyAvailable);
        }
        let session_id = session.session_id.clone();

        self.credits.ensure_affordable(kind)?;
        let quote = UltraQuote {
            kind,
            cost: kind.credit_threshold(),
            balance: self.credits.current(),
        };
        if !confirm(quote) {
            return Ok(UltraGeneration::Declined);
        }

        let _guard = self.inflight.try_acquire(&session_id, ArtifactKind::Ultra(kind))?;
        info!(session_id = %session_id, kind = ?kind, "Requesting ultra generation");

        let mut response = self
            .client
            .generate_ultra(
                kind,
                &UltraRequest {
                    session_id: &session_id,
                    language: self.language(),
                },
            )
            .await?;
        self.credits.refresh(response.credits_remaining);

        if let Some(artifact) = response.take_artifact(kind) {
            self.dispatch(SessionAction::UltraMerged {
                session_id: session_id.clone(),
                artifact,
            });
            self.save_history_best_effort().await;
            return Ok(UltraGeneration::Completed { polled: false });
        }

        let monitor = UltraMonitor::new(self.client.clone(), session_id.clone(), kind)
            .with_timing(self.config.poll_interval, self.config.poll_timeout);

        let state = &mut self.state;
        let outcome = monitor
            .run(|progress| {
                *state = std::mem::take(state).reduce(SessionAction::UltraProgress {
                    session_id: session_id.clone(),
                    progress,
                });
                on_progress(progress);
            })
            .await;

        match outcome {
            UltraOutcome::Completed(artifact) => {
                self.dispatch(SessionAction::UltraMerged {
                    session_id: session_id.clone(),
                    artifact,
                });
                self.save_history_best_effort().await;
                Ok(UltraGeneration::Completed { polled: true })
            }
            UltraOutcome::Failed(reason) => {
                self.dispatch(SessionAction::UltraFailed {
                    session_id,
                    kind,
                    message: reason.clone(),
                });
                Err(Error::PollingFailed(reason))
            }
            UltraOutcome::TimedOut => {
                let err = Error::PollingTimedOut;
                self.dispatch(SessionAction::UltraFailed {
                    session_id,
                    kind,
                    message: err.to_string(),
                });
                Err(err)
            }
            UltraOutcome::Cancelled => Err(Error::Cancelled),
        }
    }

    async fn save_history_best_effort(&self) {
        let Some(session) = &self.state.session else {
            return;
        };
        let request = SaveHistoryRequest {
            session_id: &session.session_id,
            file_name: &session.file_name,
            results: &session.results,
        };
        if let Err(e) = self.client.save_history(&request).await {
            warn!(session_id = %session.session_id, error = %e, "Failed to save session to history");
        }
    }

    /// Redeem a magic-link token for credits.
    pub async fn claim_magic_link(&mut self, token: &str) -> Result<i64> {
        let response = self.client.claim_magic_link(token).await?;
        self.credits.confirm(response.credits_remaining);
        Ok(response.credits_remaining)
    }

    pub async fn add_credits(&mut self, amount: i64, reason: Option<&str>) -> Result<i64> {
        if amount <= 0 {
            return Err(Error::Validation("Amount must be positive".to_string()));
        }
        let response = self
            .client
            .add_credits(&AddCreditsRequest { amount, reason })
            .await?;
        self.credits.confirm(response.credits_remaining);
        Ok(response.credits_remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StudyResults;

    fn loaded_app() -> StudyApp {
        let mut app = StudyApp::new(Config::new("http://127.0.0.1:9")).unwrap();
        app.dispatch(SessionAction::Loaded(StudySession {
            session_id: "a".to_string(),
            document_id: None,
            file_name: "notes.pdf".to_string(),
            extracted_text: String::new(),
            results: StudyResults::default(),
        }));
        app
    }

    #[tokio::test]
    async fn test_base_quiz_rejected_while_in_flight() {
        let mut app = loaded_app();
        let held = app.inflight.try_acquire("a", ArtifactKind::BasicQuiz).unwrap();

        let err = app.start_base_quiz().await.unwrap_err();
        assert!(matches!(
            err,
            Error::AlreadyInFlight { kind: ArtifactKind::BasicQuiz, .. }
        ));
        assert_eq!(app.state().exam.phase(), ExamPhase::Configuration);

        drop(held);
        assert_eq!(app.start_base_quiz().await.unwrap(), BaseQuizSource::Fallback);
        assert_eq!(app.state().exam.phase(), ExamPhase::InProgress { index: 0, total: 3 });
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let empty = AppSnapshot::load_from(&path).unwrap();
        assert!(empty.state.session.is_none());
        assert_eq!(empty.credits.current(), None);

        let state = SessionState::default()
            .reduce(SessionAction::Loaded(StudySession {
                session_id: "a".to_string(),
                document_id: None,
                file_name: "notes.pdf".to_string(),
                extracted_text: String::new(),
                results: StudyResults::default(),
            }))
            .reduce(SessionAction::Exam(ExamAction::Start(fallback_base_quiz())))
            .reduce(SessionAction::Exam(ExamAction::SelectOption(1)));
        let mut question_cost = QuestionCostGate::default();
        question_cost.record_generation(true);

        AppSnapshot {
            state: state.clone(),
            credits: CreditBalance::new(120),
            question_cost,
        }
        .save_to(&path)
        .unwrap();

        let restored = AppSnapshot::load_from(&path).unwrap();
        assert_eq!(restored.state, state);
        assert_eq!(restored.credits.current(), Some(120));
        assert_eq!(restored.question_cost.cost, QuestionCost::Pending(5));
        assert_eq!(restored.state.exam.phase(), ExamPhase::InProgress { index: 0, total: 3 });
    }
}
