use serde::Serialize;
use tracing::{debug, warn};

use crate::{CheckoutError, Result};

/// POST a JSON body to a webhook, authenticated with a static bearer token.
pub(crate) async fn post_json<B: Serialize + ?Sized>(
    http: &reqwest::Client,
    url: &str,
    token: Option<&str>,
    body: &B,
) -> Result<()> {
    debug!(url = %url, "Posting webhook");

    let mut request = http.post(url).json(body);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    let response = request.send().await?;

    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let message = response.text().await.unwrap_or_default();
    warn!(url = %url, status = status.as_u16(), body = %message, "Webhook returned error");
    Err(CheckoutError::Webhook {
        url: url.to_string(),
        status: status.as_u16(),
        message,
    })
}
