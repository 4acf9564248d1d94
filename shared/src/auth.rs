//! JWT claim extraction for the signed-in user.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// JWT claims issued by the auth backend.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user id)
    pub sub: String,
    /// Email
    pub email: Option<String>,
    /// Role (`authenticated` for signed-in users)
    #[serde(default)]
    pub role: Option<String>,
    /// Expiration
    pub exp: i64,
}

/// The signed-in user, as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    /// User id sent as `userId` to the processing endpoint
    pub user_id: String,
    /// User's email
    pub email: Option<String>,
    /// Raw bearer token
    pub token: String,
}

impl UserContext {
    fn from_claims(claims: AccessClaims, token: &str) -> Result<Self> {
        if claims.sub.trim().is_empty() {
            return Err(Error::Auth("Token has an empty subject".to_string()));
        }

        Ok(Self {
            user_id: claims.sub,
            email: claims.email,
            token: token.to_string(),
        })
    }
}

/// Decode a bearer token and extract the user.
///
/// The signature is not checked here: every endpoint re-validates the token,
/// the client only needs the claims.
pub fn user_from_token(token: &str) -> Result<UserContext> {
    // Skip "Bearer " prefix if present
    let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();

    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;

    let key = DecodingKey::from_secret(b"unused");

    let token_data = decode::<AccessClaims>(token, &key, &validation)
        .map_err(|e| Error::Auth(format!("Failed to decode token: {}", e)))?;

    UserContext::from_claims(token_data.claims, token)
}
