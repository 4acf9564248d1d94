//! Purchase conversion event.
//!
//! Personal data is normalized and SHA-256 hashed before it leaves the page,
//! in the shape the ad platform's server-side conversions API expects.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::catalog::VariantSelection;
use crate::form::{phone_digits, CheckoutForm};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionsPayload {
    pub data: Vec<PurchaseEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseEvent {
    pub event_name: &'static str,
    /// Unix seconds
    pub event_time: i64,
    /// Same as the order id, so that browser and server events deduplicate
    pub event_id: String,
    pub action_source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_source_url: Option<String>,
    pub user_data: HashedUserData,
    pub custom_data: PurchaseData,
}

/// Hashed identifiers. Each field is a list as the conversions API allows
/// several values per key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HashedUserData {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub em: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ph: Vec<String>,
    #[serde(rename = "fn", skip_serializing_if = "Vec::is_empty")]
    pub first_name: Vec<String>,
    #[serde(rename = "ln", skip_serializing_if = "Vec::is_empty")]
    pub last_name: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ct: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub zp: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseData {
    pub currency: String,
    pub value: f64,
    pub content_name: String,
    pub num_items: u32,
}

impl PurchaseEvent {
    pub fn new(
        order_id: &str,
        form: &CheckoutForm,
        selection: &VariantSelection,
        currency: &str,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_name: "Purchase",
            event_time: at.timestamp(),
            event_id: order_id.to_string(),
            action_source: "website",
            event_source_url: None,
            user_data: HashedUserData::from_form(form),
            custom_data: PurchaseData {
                currency: currency.to_string(),
                value: selection.total(),
                content_name: selection.label(),
                num_items: selection.quantity,
            },
        }
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.event_source_url = Some(url.into());
        self
    }

    pub fn into_payload(self) -> ConversionsPayload {
        ConversionsPayload { data: vec![self] }
    }
}

impl HashedUserData {
    pub fn from_form(form: &CheckoutForm) -> Self {
        Self {
            em: form.email.as_deref().and_then(hash_email).into_iter().collect(),
            ph: hash_phone(&form.phone).into_iter().collect(),
            first_name: hash_text(&form.first_name).into_iter().collect(),
            last_name: hash_text(&form.last_name).into_iter().collect(),
            ct: hash_text(&form.city.replace(' ', "")).into_iter().collect(),
            zp: hash_text(&form.postal_code.replace(' ', "")).into_iter().collect(),
        }
    }
}

pub fn sha256_hex(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// Trimmed, lowercased email hash. `None` for a blank address.
pub fn hash_email(email: &str) -> Option<String> {
    hash_text(email)
}

/// Hash of the phone number's digits. `None` when it has no digits.
pub fn hash_phone(phone: &str) -> Option<String> {
    let digits = phone_digits(phone);
    (!digits.is_empty()).then(|| sha256_hex(&digits))
}

/// Trimmed, lowercased text hash. `None` when blank.
pub fn hash_text(text: &str) -> Option<String> {
    let normalized = text.trim().to_lowercase();
    (!normalized.is_empty()).then(|| sha256_hex(&normalized))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Catalog;

    fn form() -> CheckoutForm {
        CheckoutForm {
            first_name: " Maria ".to_string(),
            last_name: "ROSSI".to_string(),
            phone: "+39 333-123 4567".to_string(),
            email: Some("  Maria.Rossi@Example.COM ".to_string()),
            address: "Via Roma 1".to_string(),
            city: "San Donato".to_string(),
            postal_code: "20097".to_string(),
            notes: None,
        }
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_normalizes_before_hashing() {
        let user = HashedUserData::from_form(&form());

        assert_eq!(user.em, vec![sha256_hex("maria.rossi@example.com")]);
        assert_eq!(user.ph, vec![sha256_hex("393331234567")]);
        assert_eq!(user.first_name, vec![sha256_hex("maria")]);
        assert_eq!(user.last_name, vec![sha256_hex("rossi")]);
        assert_eq!(user.ct, vec![sha256_hex("sandonato")]);
    }

    #[test]
    fn test_missing_email_is_omitted() {
        let form = CheckoutForm { email: None, ..form() };
        let json = serde_json::to_value(HashedUserData::from_form(&form)).unwrap();

        assert!(json.get("em").is_none());
        assert!(json.get("fn").is_some());
    }

    #[test]
    fn test_event_shape_has_no_raw_pii() {
        let selection = Catalog::default().select("Black", "M", 2).unwrap();
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let payload = PurchaseEvent::new("ORD-1", &form(), &selection, "EUR", at).into_payload();
        let json = serde_json::to_value(&payload).unwrap();

        let event = &json["data"][0];
        assert_eq!(event["event_name"], "Purchase");
        assert_eq!(event["event_time"], 1_700_000_000);
        assert_eq!(event["event_id"], "ORD-1");
        assert_eq!(event["custom_data"]["currency"], "EUR");
        assert_eq!(event["custom_data"]["value"], 79.8);

        let raw = json.to_string().to_lowercase();
        assert!(!raw.contains("rossi"));
        assert!(!raw.contains("3331234567"));
    }
}
