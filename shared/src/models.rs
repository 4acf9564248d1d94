//! Shared data models and endpoint payloads.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::exam::{Difficulty, ExamType};

/// One question/answer card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

/// Node of a concept map tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptNode {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub children: Vec<ConceptNode>,
}

impl ConceptNode {
    /// Number of nodes in this subtree, including itself.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(ConceptNode::node_count).sum::<usize>()
    }
}

/// Question format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    #[serde(alias = "open_ended")]
    Open,
}

/// A quiz or exam question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    #[serde(rename = "type", default = "default_question_kind")]
    pub kind: QuestionKind,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_option_index: Option<usize>,
    #[serde(default)]
    pub explanation: String,
}

fn default_question_kind() -> QuestionKind {
    QuestionKind::MultipleChoice
}

impl QuizQuestion {
    /// Whether the question can be scored automatically.
    pub fn is_multiple_choice(&self) -> bool {
        self.kind == QuestionKind::MultipleChoice
    }
}

/// Everything generated for one document.
///
/// The `*_ultra` fields are filled on demand; their presence hides the
/// corresponding generation offer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyResults {
    #[serde(default)]
    pub riassunto_breve: String,
    #[serde(default)]
    pub riassunto_esteso: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub riassunto_ultra: Option<String>,
    #[serde(default)]
    pub mappa_concettuale: Vec<ConceptNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mappa_ultra: Option<Vec<ConceptNode>>,
    #[serde(default)]
    pub flashcard: Vec<Flashcard>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flashcard_ultra: Option<Vec<Flashcard>>,
    #[serde(default)]
    pub quiz: Vec<QuizQuestion>,
    #[serde(default)]
    pub guida_esame: String,
}

impl StudyResults {
    /// Whether the ultra variant of `kind` has already been produced.
    pub fn has_ultra(&self, kind: UltraKind) -> bool {
        match kind {
            UltraKind::Summary => self.riassunto_ultra.is_some(),
            UltraKind::Flashcards => self.flashcard_ultra.is_some(),
            UltraKind::Maps => self.mappa_ultra.is_some(),
        }
    }

    /// Attach an ultra artifact. Returns false if one was already present.
    pub fn merge_ultra(&mut self, artifact: UltraArtifact) -> bool {
        if self.has_ultra(artifact.kind()) {
            return false;
        }
        match artifact {
            UltraArtifact::Summary(text) => self.riassunto_ultra = Some(text),
            UltraArtifact::Flashcards(cards) => self.flashcard_ultra = Some(cards),
            UltraArtifact::Maps(nodes) => self.mappa_ultra = Some(nodes),
        }
        true
    }
}

/// The expensive, on-demand artifact variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UltraKind {
    Summary,
    Flashcards,
    Maps,
}

impl UltraKind {
    /// Generation endpoint path.
    pub fn endpoint(&self) -> &'static str {
        match self {
            UltraKind::Summary => "/api/generate-ultra-summary",
            UltraKind::Flashcards => "/api/generate-ultra-flashcards",
            UltraKind::Maps => "/api/generate-ultra-maps",
        }
    }

    /// Prefix of this kind's keys in `processing_metadata`.
    pub fn metadata_prefix(&self) -> &'static str {
        match self {
            UltraKind::Summary => "ultra_summary",
            UltraKind::Flashcards => "ultra_flashcards",
            UltraKind::Maps => "ultra_maps",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UltraKind::Summary => "ultra summary",
            UltraKind::Flashcards => "ultra flashcards",
            UltraKind::Maps => "ultra concept maps",
        }
    }
}

/// A produced ultra variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UltraArtifact {
    Summary(String),
    Flashcards(Vec<Flashcard>),
    Maps(Vec<ConceptNode>),
}

impl UltraArtifact {
    pub fn kind(&self) -> UltraKind {
        match self {
            UltraArtifact::Summary(_) => UltraKind::Summary,
            UltraArtifact::Flashcards(_) => UltraKind::Flashcards,
            UltraArtifact::Maps(_) => UltraKind::Maps,
        }
    }

    /// Pull the artifact of `kind` out of a results object, if present.
    pub fn from_results(results: &StudyResults, kind: UltraKind) -> Option<Self> {
        match kind {
            UltraKind::Summary => results.riassunto_ultra.clone().map(UltraArtifact::Summary),
            UltraKind::Flashcards => results.flashcard_ultra.clone().map(UltraArtifact::Flashcards),
            UltraKind::Maps => results.mappa_ultra.clone().map(UltraArtifact::Maps),
        }
    }
}

/// Generation request types, used to key in-flight work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Document,
    BasicQuiz,
    Exam,
    StudyPlan,
    ProbableQuestions,
    Audio,
    Ultra(UltraKind),
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Document => f.write_str("document"),
            ArtifactKind::BasicQuiz => f.write_str("base quiz"),
            ArtifactKind::Exam => f.write_str("exam"),
            ArtifactKind::StudyPlan => f.write_str("study plan"),
            ArtifactKind::ProbableQuestions => f.write_str("probable questions"),
            ArtifactKind::Audio => f.write_str("audio"),
            ArtifactKind::Ultra(kind) => f.write_str(kind.label()),
        }
    }
}

/// Which summary to download or read aloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryVariant {
    Breve,
    Esteso,
    Ultra,
}

impl SummaryVariant {
    /// Text of this variant, if it exists and is not blank.
    pub fn text<'a>(&self, results: &'a StudyResults) -> Option<&'a str> {
        let text = match self {
            SummaryVariant::Breve => results.riassunto_breve.as_str(),
            SummaryVariant::Esteso => results.riassunto_esteso.as_str(),
            SummaryVariant::Ultra => results.riassunto_ultra.as_deref()?,
        };
        (!text.trim().is_empty()).then_some(text)
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// State of a background generation as recorded in history metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    InProgress,
    Completed,
    Failed(Option<String>),
    Unknown,
}

/// Free-form processing metadata attached to a history entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessingMetadata(pub Map<String, Value>);

impl ProcessingMetadata {
    fn field(&self, kind: UltraKind, suffix: &str) -> Option<&Value> {
        self.0.get(&format!("{}_{}", kind.metadata_prefix(), suffix))
    }

    fn number(&self, kind: UltraKind, suffix: &str) -> Option<u32> {
        let value = self.field(kind, suffix)?;
        value
            .as_u64()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
            .and_then(|n| u32::try_from(n).ok())
    }

    /// Status of the background job for `kind`.
    pub fn status(&self, kind: UltraKind) -> JobStatus {
        match self.field(kind, "status").and_then(Value::as_str) {
            Some("in_progress") | Some("processing") | Some("pending") => JobStatus::InProgress,
            Some("completed") | Some("done") => JobStatus::Completed,
            Some("failed") | Some("error") => JobStatus::Failed(
                self.field(kind, "error")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            ),
            _ => JobStatus::Unknown,
        }
    }

    /// `(current, total)` section counters, when reported.
    pub fn sections(&self, kind: UltraKind) -> Option<(u32, u32)> {
        Some((
            self.number(kind, "current_section")?,
            self.number(kind, "total_sections")?,
        ))
    }
}

/// A stored session in the remote history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(alias = "sessionId", alias = "session_id")]
    pub id: String,
    #[serde(default, alias = "fileName")]
    pub file_name: Option<String>,
    #[serde(default, alias = "documentId")]
    pub document_id: Option<String>,
    #[serde(default, alias = "extractedText")]
    pub extracted_text: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub results: Option<StudyResults>,
    #[serde(default)]
    pub processing_metadata: ProcessingMetadata,
}

#[derive(Debug, Deserialize)]
pub struct HistoryResponse {
    #[serde(default, alias = "history")]
    pub sessions: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveHistoryRequest<'a> {
    pub session_id: &'a str,
    pub file_name: &'a str,
    pub results: &'a StudyResults,
}

// ---------------------------------------------------------------------------
// Endpoint payloads
// ---------------------------------------------------------------------------

/// Response of the PDF processing endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub session_id: String,
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub extracted_text: Option<String>,
    #[serde(flatten)]
    pub results: StudyResults,
    #[serde(default)]
    pub credits_remaining: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicQuizRequest<'a> {
    pub session_id: &'a str,
    pub text: &'a str,
    pub language: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamRequest<'a> {
    pub session_id: &'a str,
    pub text: &'a str,
    pub language: &'a str,
    pub num_questions: u32,
    pub difficulty: Difficulty,
    #[serde(rename = "type")]
    pub exam_type: ExamType,
}

/// Response of the quiz and exam generators.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionsResponse {
    #[serde(default, alias = "quiz")]
    pub questions: Vec<QuizQuestion>,
    #[serde(default)]
    pub credits_remaining: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyPlanRequest<'a> {
    pub session_id: &'a str,
    pub text: &'a str,
    pub language: &'a str,
    pub days: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyPlanResponse {
    #[serde(alias = "studyPlan")]
    pub plan: String,
    #[serde(default)]
    pub credits_remaining: Option<i64>,
}

/// Account-scoped pricing of the probable-questions generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbableQuestionsCost {
    pub is_free: bool,
    pub cost: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbableQuestionsRequest<'a> {
    pub session_id: &'a str,
    pub text: &'a str,
    pub language: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbableQuestionsResponse {
    pub questions: Vec<String>,
    #[serde(default)]
    pub was_free: bool,
    #[serde(default)]
    pub credits_remaining: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UltraRequest<'a> {
    pub session_id: &'a str,
    pub language: &'a str,
}

/// Response of the ultra generators: either the artifact inline or a
/// background job acknowledgement.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UltraResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "riassunto_ultra")]
    pub riassunto_ultra: Option<String>,
    #[serde(default, rename = "flashcard_ultra")]
    pub flashcard_ultra: Option<Vec<Flashcard>>,
    #[serde(default, rename = "mappa_ultra")]
    pub mappa_ultra: Option<Vec<ConceptNode>>,
    #[serde(default)]
    pub credits_remaining: Option<i64>,
}

impl UltraResponse {
    /// The inline artifact of `kind`, if the server produced it synchronously.
    pub fn take_artifact(&mut self, kind: UltraKind) -> Option<UltraArtifact> {
        match kind {
            UltraKind::Summary => self.riassunto_ultra.take().map(UltraArtifact::Summary),
            UltraKind::Flashcards => self.flashcard_ultra.take().map(UltraArtifact::Flashcards),
            UltraKind::Maps => self.mappa_ultra.take().map(UltraArtifact::Maps),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsRequest<'a> {
    pub text: &'a str,
    pub language: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsResponse {
    /// Base64-encoded MP3
    #[serde(alias = "audioContent")]
    pub audio: String,
    #[serde(default)]
    pub credits_remaining: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadSummaryRequest<'a> {
    pub session_id: &'a str,
    pub variant: SummaryVariant,
    pub file_name: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub struct MagicClaimRequest<'a> {
    pub token: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCreditsRequest<'a> {
    pub amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'a str>,
}

/// Response of the credit-granting endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditsResponse {
    #[serde(default)]
    pub credits_added: Option<i64>,
    #[serde(alias = "credits", alias = "newBalance")]
    pub credits_remaining: i64,
}

/// Error body returned by the study endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub required: Option<i64>,
    #[serde(default)]
    pub current: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_response_flattens_results() {
        let json = r#"{"flashcard":[{"front":"Q1","back":"A1"}],"sessionId":"abc"}"#;
        let response: ProcessResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.session_id, "abc");
        assert_eq!(response.results.flashcard.len(), 1);
        assert_eq!(response.results.flashcard[0].front, "Q1");
        assert!(response.results.riassunto_ultra.is_none());
    }

    #[test]
    fn test_open_question_aliases() {
        let json = r#"{"question":"Explain","type":"open_ended"}"#;
        let question: QuizQuestion = serde_json::from_str(json).unwrap();
        assert_eq!(question.kind, QuestionKind::Open);
        assert!(!question.is_multiple_choice());
    }

    #[test]
    fn test_merge_ultra_only_once() {
        let mut results = StudyResults::default();
        assert!(results.merge_ultra(UltraArtifact::Summary("first".to_string())));
        assert!(!results.merge_ultra(UltraArtifact::Summary("second".to_string())));
        assert_eq!(results.riassunto_ultra.as_deref(), Some("first"));
    }

    #[test]
    fn test_processing_metadata_status() {
        let metadata: ProcessingMetadata = serde_json::from_value(serde_json::json!({
            "ultra_summary_status": "in_progress",
            "ultra_summary_current_section": 2,
            "ultra_summary_total_sections": "5",
            "ultra_maps_status": "failed",
            "ultra_maps_error": "timeout",
        }))
        .unwrap();

        assert_eq!(metadata.status(UltraKind::Summary), JobStatus::InProgress);
        assert_eq!(metadata.sections(UltraKind::Summary), Some((2, 5)));
        assert_eq!(
            metadata.status(UltraKind::Maps),
            JobStatus::Failed(Some("timeout".to_string()))
        );
        assert_eq!(metadata.status(UltraKind::Flashcards), JobStatus::Unknown);
    }

    #[test]
    fn test_concept_node_len() {
        let node = ConceptNode {
            title: "root".to_string(),
            description: None,
            children: vec![
                ConceptNode {
                    title: "a".to_string(),
                    description: None,
                    children: vec![],
                },
                ConceptNode {
                    title: "b".to_string(),
                    description: Some("leaf".to_string()),
                    children: vec![],
                },
            ],
        };
        assert_eq!(node.node_count(), 3);
    }
}
