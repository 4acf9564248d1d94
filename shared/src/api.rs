//! HTTP client for the study endpoints.
//!
//! Every method is a single request/response exchange. Nothing is retried:
//! failures are returned to the caller, which decides how to surface them.

use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::{
    AddCreditsRequest, ApiErrorBody, BasicQuizRequest, CreditsResponse, DownloadSummaryRequest,
    ExamRequest, HistoryEntry, HistoryResponse, MagicClaimRequest, ProbableQuestionsCost,
    ProbableQuestionsRequest, ProbableQuestionsResponse, ProcessResponse, QuestionsResponse,
    SaveHistoryRequest, StudyPlanRequest, StudyPlanResponse, TtsRequest, TtsResponse, UltraKind,
    UltraRequest, UltraResponse,
};
use crate::{Config, Error, Result};

/// A document to upload for processing.
#[derive(Debug, Clone)]
pub struct PdfUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub language: String,
    pub user_id: Option<String>,
    pub target_language: Option<String>,
}

/// Client for the study API.
#[derive(Debug, Clone)]
pub struct StudyApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl StudyApiClient {
    /// Create a new client from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
            token: config.auth_token.clone(),
        })
    }

    /// Replace the bearer token (sign-in / sign-out).
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, url = %url, "Study API request");

        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.request(Method::POST, path).json(body).send().await?;
        parse_json(path, response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.request(Method::GET, path).send().await?;
        parse_json(path, response).await
    }

    /// `POST /api/process-pdf-v2`
    pub async fn process_pdf(&self, upload: PdfUpload) -> Result<ProcessResponse> {
        let file = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str("application/pdf")?;

        let mut form = Form::new().part("file", file).text("language", upload.language);
        if let Some(user_id) = upload.user_id {
            form = form.text("userId", user_id);
        }
        if let Some(target) = upload.target_language {
            form = form.text("targetLanguage", target);
        }

        let path = "/api/process-pdf-v2";
        let response = self
            .request(Method::POST, path)
            .multipart(form)
            .send()
            .await?;
        parse_json(path, response).await
    }

    /// `POST /api/generate-basic-quiz`
    pub async fn generate_basic_quiz(&self, request: &BasicQuizRequest<'_>) -> Result<QuestionsResponse> {
        self.post_json("/api/generate-basic-quiz", request).await
    }

    /// `POST /api/generate-exam`
    pub async fn generate_exam(&self, request: &ExamRequest<'_>) -> Result<QuestionsResponse> {
        self.post_json("/api/generate-exam", request).await
    }

    /// `POST /api/study-plan`
    pub async fn study_plan(&self, request: &StudyPlanRequest<'_>) -> Result<StudyPlanResponse> {
        self.post_json("/api/study-plan", request).await
    }

    /// `GET /api/probable-questions`: price of the next generation for this account.
    pub async fn probable_questions_cost(&self) -> Result<ProbableQuestionsCost> {
        self.get_json("/api/probable-questions").await
    }

    /// `POST /api/probable-questions`
    pub async fn probable_questions(
        &self,
        request: &ProbableQuestionsRequest<'_>,
    ) -> Result<ProbableQuestionsResponse> {
        self.post_json("/api/probable-questions", request).await
    }

    /// `POST /api/generate-ultra-{summary,flashcards,maps}`
    pub async fn generate_ultra(&self, kind: UltraKind, request: &UltraRequest<'_>) -> Result<UltraResponse> {
        self.post_json(kind.endpoint(), request).await
    }

    /// `POST /api/tts`
    pub async fn tts(&self, request: &TtsRequest<'_>) -> Result<TtsResponse> {
        self.post_json("/api/tts", request).await
    }

    /// `POST /api/download-summary`, returning the rendered file.
    pub async fn download_summary(&self, request: &DownloadSummaryRequest<'_>) -> Result<Vec<u8>> {
        let path = "/api/download-summary";
        let response = self.request(Method::POST, path).json(request).send().await?;
        let response = check_status(path, response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// `GET /api/history`
    pub async fn history(&self) -> Result<Vec<HistoryEntry>> {
        let response: HistoryResponse = self.get_json("/api/history").await?;
        Ok(response.sessions)
    }

    /// `GET /api/history?sessionId=…`
    pub async fn history_entry(&self, session_id: &str) -> Result<HistoryEntry> {
        let path = format!("/api/history?sessionId={}", urlencoding::encode(session_id));
        let response: HistoryResponse = self.get_json(&path).await?;
        response
            .sessions
            .into_iter()
            .find(|entry| entry.id == session_id)
            .ok_or_else(|| Error::NotFound(format!("session {}", session_id)))
    }

    /// `POST /api/history`
    pub async fn save_history(&self, request: &SaveHistoryRequest<'_>) -> Result<()> {
        let path = "/api/history";
        let response = self.request(Method::POST, path).json(request).send().await?;
        check_status(path, response).await?;
        Ok(())
    }

    /// `POST /api/magic/claim`
    pub async fn claim_magic_link(&self, token: &str) -> Result<CreditsResponse> {
        self.post_json("/api/magic/claim", &MagicClaimRequest { token }).await
    }

    /// `POST /api/credits/add`
    pub async fn add_credits(&self, request: &AddCreditsRequest<'_>) -> Result<CreditsResponse> {
        self.post_json("/api/credits/add", request).await
    }
}

async fn check_status(path: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!(path = %path, status = status.as_u16(), "Study API request failed");
    Err(error_from_body(status, &body))
}

async fn parse_json<T: DeserializeOwned>(path: &str, response: Response) -> Result<T> {
    let response = check_status(path, response).await?;
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Map a non-success response to the error taxonomy.
pub fn error_from_body(status: StatusCode, body: &str) -> Error {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .clone()
        .or_else(|| parsed.error.clone())
        .unwrap_or_else(|| body.chars().take(200).collect());

    let credit_refusal = parsed.error.as_deref() == Some("insufficient_credits");
    if credit_refusal || status == StatusCode::PAYMENT_REQUIRED {
        return Error::InsufficientCredits {
            required: parsed.required.unwrap_or_default(),
            current: parsed.current.unwrap_or_default(),
            description: parsed.description,
        };
    }

    if parsed.error.as_deref() == Some("generation_failed") {
        return Error::GenerationFailed(
            parsed
                .message
                .unwrap_or_else(|| "The generation did not complete.".to_string()),
        );
    }

    match status {
        StatusCode::UNAUTHORIZED => Error::Auth(message),
        StatusCode::NOT_FOUND => Error::NotFound(message),
        _ => Error::Api {
            status: status.as_u16(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_credit_refusal() {
        let body = r#"{"error":"insufficient_credits","required":30,"current":12,"description":"Custom exam"}"#;
        match error_from_body(StatusCode::FORBIDDEN, body) {
            Error::InsufficientCredits {
                required,
                current,
                description,
            } => {
                assert_eq!((required, current), (30, 12));
                assert_eq!(description.as_deref(), Some("Custom exam"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_plain_forbidden_is_api_error() {
        let err = error_from_body(StatusCode::FORBIDDEN, r#"{"error":"not your session"}"#);
        assert!(matches!(err, Error::Api { status: 403, .. }));
    }

    #[test]
    fn test_generation_failed() {
        let body = r#"{"error":"generation_failed","message":"The model timed out."}"#;
        match error_from_body(StatusCode::INTERNAL_SERVER_ERROR, body) {
            Error::GenerationFailed(msg) => assert_eq!(msg, "The model timed out."),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_non_json_body() {
        let err = error_from_body(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        match err {
            Error::Api { status, message } => {
                assert_eq!(status, 502);
                assert!(message.contains("bad gateway"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
