//! Configuration management for the study client.

use std::env;
use std::time::Duration;

use crate::{Error, Result};

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the study API (e.g. `https://app.example.com`)
    pub api_base_url: String,
    /// Bearer token of the signed-in user
    pub auth_token: Option<String>,
    /// Language the artifacts are generated in
    pub language: String,
    /// Delay between history polls for background generations
    pub poll_interval: Duration,
    /// Hard deadline for a background generation
    pub poll_timeout: Duration,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Voice for read-aloud summaries, server default when unset
    pub tts_voice: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let api_base_url = env::var("STUDY_API_BASE_URL")
            .map_err(|_| Error::Config("STUDY_API_BASE_URL not set".to_string()))?;

        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            auth_token: env::var("STUDY_AUTH_TOKEN").ok().filter(|t| !t.is_empty()),
            language: env::var("STUDY_LANGUAGE").unwrap_or_else(|_| "it".to_string()),
            poll_interval: secs_from_env("STUDY_POLL_INTERVAL_SECS", 10)?,
            poll_timeout: secs_from_env("STUDY_POLL_TIMEOUT_SECS", 30 * 60)?,
            request_timeout: secs_from_env("STUDY_REQUEST_TIMEOUT_SECS", 300)?,
            tts_voice: env::var("STUDY_TTS_VOICE").ok().filter(|v| !v.is_empty()),
        })
    }

    /// Configuration pointing at `base_url` with default timings.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            api_base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: None,
            language: "it".to_string(),
            poll_interval: Duration::from_secs(10),
            poll_timeout: Duration::from_secs(30 * 60),
            request_timeout: Duration::from_secs(300),
            tts_voice: None,
        }
    }
}

fn secs_from_env(name: &str, default: u64) -> Result<Duration> {
    match env::var(name) {
        Ok(raw) => parse_secs(name, &raw),
        Err(_) => Ok(Duration::from_secs(default)),
    }
}

/// Positive whole seconds.
fn parse_secs(name: &str, raw: &str) -> Result<Duration> {
    let secs = raw
        .trim()
        .parse::<u64>()
        .map_err(|e| Error::Config(format!("{} must be a number of seconds: {}", name, e)))?;
    if secs == 0 {
        return Err(Error::Config(format!("{} must be greater than zero", name)));
    }
    Ok(Duration::from_secs(secs))
}
