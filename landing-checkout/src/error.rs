use thiserror::Error;

pub type Result<T> = std::result::Result<T, CheckoutError>;

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid order form: {0}")]
    InvalidForm(#[from] validator::ValidationErrors),

    #[error("Unavailable variant: {0}")]
    InvalidSelection(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook {url} returned {status}: {message}")]
    Webhook {
        url: String,
        status: u16,
        message: String,
    },

    #[error("The order could not be sent: {0}")]
    LeadRejected(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
