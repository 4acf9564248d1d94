//! Checkout configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::{CheckoutError, Result};

#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Relay that forwards purchase events to the ad platform
    pub conversions_url: String,
    pub conversions_token: Option<String>,
    /// Worker that ingests the raw lead
    pub lead_url: String,
    pub lead_token: Option<String>,
    pub thank_you_url: String,
    /// Page the order was placed on, reported with the conversion event
    pub landing_url: Option<String>,
    pub storage_path: PathBuf,
    pub currency: String,
    pub request_timeout: Duration,
}

impl CheckoutConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            conversions_url: required("CONVERSIONS_WEBHOOK_URL")?,
            conversions_token: optional("CONVERSIONS_WEBHOOK_TOKEN"),
            lead_url: required("LEAD_WORKER_URL")?,
            lead_token: optional("LEAD_WORKER_TOKEN"),
            thank_you_url: required("THANK_YOU_URL")?,
            landing_url: optional("LANDING_PAGE_URL"),
            storage_path: optional("CHECKOUT_STORAGE_PATH")
                .unwrap_or_else(|| ".checkout-storage.json".to_string())
                .into(),
            currency: optional("CHECKOUT_CURRENCY").unwrap_or_else(|| "EUR".to_string()),
            request_timeout: Duration::from_secs(30),
        })
    }
}

fn required(name: &str) -> Result<String> {
    optional(name).ok_or_else(|| CheckoutError::Config(format!("{} not set", name)))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
