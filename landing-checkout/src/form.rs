//! Checkout popup form.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Customer details collected in the checkout popup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutForm {
    #[validate(length(min = 1, max = 80, message = "First name is required"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 80, message = "Last name is required"))]
    pub last_name: String,

    #[validate(custom(function = "validate_phone"))]
    pub phone: String,

    #[validate(email(message = "Email address is not valid"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[validate(length(min = 3, max = 200, message = "Address is required"))]
    pub address: String,

    #[validate(length(min = 1, max = 100, message = "City is required"))]
    pub city: String,

    #[validate(length(min = 3, max = 10, message = "Postal code is not valid"))]
    pub postal_code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Digits of a phone number, without spaces, dashes or the `+` prefix.
pub fn phone_digits(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')' | '.'));
    let digits = phone_digits(phone).len();

    if !allowed || !(7..=15).contains(&digits) {
        let mut err = ValidationError::new("phone");
        err.message = Some("Phone number is not valid".into());
        return Err(err);
    }
    Ok(())
}
