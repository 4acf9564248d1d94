//! Text-to-speech through the `/api/tts` endpoint.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

use crate::api::StudyApiClient;
use crate::models::TtsRequest;

/// Longest text sent in a single synthesis request.
pub const MAX_TTS_CHARS: usize = 2900;

#[derive(Error, Debug)]
pub enum TtsError {
    #[error("Nothing to read aloud")]
    EmptyText,
    #[error("Synthesis failed: {0}")]
    SynthesisFailed(#[from] crate::Error),
    #[error("Invalid audio data: {0}")]
    InvalidAudio(#[from] base64::DecodeError),
}

impl From<TtsError> for crate::Error {
    fn from(err: TtsError) -> Self {
        match err {
            TtsError::SynthesisFailed(inner) => inner,
            TtsError::EmptyText => crate::Error::Validation("Nothing to read aloud".to_string()),
            TtsError::InvalidAudio(e) => crate::Error::Internal(format!("Invalid audio data: {}", e)),
        }
    }
}

/// Synthesised audio and the balance after paying for it.
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    /// MP3 bytes
    pub mp3: Vec<u8>,
    pub credits_remaining: Option<i64>,
    pub truncated: bool,
}

/// Text-to-speech service.
pub struct TtsService<'a> {
    client: &'a StudyApiClient,
    language: String,
    voice: Option<String>,
}

impl<'a> TtsService<'a> {
    /// Create a TTS service with the server's default voice.
    pub fn new(client: &'a StudyApiClient, language: impl Into<String>) -> Self {
        Self {
            client,
            language: language.into(),
            voice: None,
        }
    }

    /// Create with a specific voice.
    pub fn with_voice(client: &'a StudyApiClient, language: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            client,
            language: language.into(),
            voice: Some(voice.into()),
        }
    }

    /// Synthesize text to speech, returning MP3 audio bytes.
    pub async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio, TtsError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TtsError::EmptyText);
        }
        let (text, truncated) = truncate(text);

        let response = self
            .client
            .tts(&TtsRequest {
                text: &text,
                language: &self.language,
                voice: self.voice.as_deref(),
            })
            .await?;

        let mp3 = STANDARD.decode(response.audio.trim())?;

        Ok(SynthesizedAudio {
            mp3,
            credits_remaining: response.credits_remaining,
            truncated,
        })
    }
}

/// Cut `text` to the request limit on a character boundary.
fn truncate(text: &str) -> (String, bool) {
    match text.char_indices().nth(MAX_TTS_CHARS) {
        Some((cut, _)) => (format!("{}... Text truncated.", &text[..cut]), true),
        None => (text.to_string(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_untouched() {
        assert_eq!(truncate("ciao"), ("ciao".to_string(), false));
    }

    #[test]
    fn test_long_text_truncated_on_char_boundary() {
        let text = "è".repeat(MAX_TTS_CHARS + 10);
        let (cut, truncated) = truncate(&text);
        assert!(truncated);
        assert!(cut.starts_with(&"è".repeat(MAX_TTS_CHARS)));
        assert!(cut.ends_with("Text truncated."));
    }
}
