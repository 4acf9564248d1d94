//! Checkout submission.
//!
//! The conversion event and the lead are sent one after the other and are not
//! transactional. The conversion event is best-effort. The lead is the order:
//! if it is rejected nothing is stored and the visitor stays on the page.

use chrono::{DateTime, Utc};
use tracing::{error, info};
use uuid::Uuid;
use validator::Validate;

use crate::catalog::VariantSelection;
use crate::form::CheckoutForm;
use crate::http::post_json;
use crate::lead::Lead;
use crate::pixel::PurchaseEvent;
use crate::storage::{LocalStorage, LAST_ORDER_ID_KEY};
use crate::{CheckoutConfig, CheckoutError, Result};

/// Outcome of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderConfirmation {
    pub order_id: String,
    /// Where the visitor is sent next
    pub redirect_url: String,
    /// Whether the conversion event was delivered
    pub conversion_tracked: bool,
}

pub struct OrderFlow {
    config: CheckoutConfig,
    http: reqwest::Client,
    storage: LocalStorage,
}

impl OrderFlow {
    pub fn new(config: CheckoutConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let storage = LocalStorage::new(config.storage_path.clone());

        Ok(Self {
            config,
            http,
            storage,
        })
    }

    /// Order id of the last accepted submission.
    pub fn last_order_id(&self) -> Result<Option<String>> {
        self.storage.get(LAST_ORDER_ID_KEY)
    }

    pub async fn submit(
        &self,
        selection: &VariantSelection,
        form: &CheckoutForm,
    ) -> Result<OrderConfirmation> {
        self.submit_at(selection, form, Utc::now()).await
    }

    pub async fn submit_at(
        &self,
        selection: &VariantSelection,
        form: &CheckoutForm,
        at: DateTime<Utc>,
    ) -> Result<OrderConfirmation> {
        form.validate()?;

        let order_id = new_order_id();
        let currency = &self.config.currency;
        info!(order_id = %order_id, variant = %selection.label(), quantity = selection.quantity, "Submitting order");

        let mut event = PurchaseEvent::new(&order_id, form, selection, currency, at);
        if let Some(url) = &self.config.landing_url {
            event = event.with_source_url(url.clone());
        }
        let conversion_tracked = match post_json(
            &self.http,
            &self.config.conversions_url,
            self.config.conversions_token.as_deref(),
            &event.into_payload(),
        )
        .await
        {
            Ok(()) => true,
            Err(e) => {
                error!(order_id = %order_id, error = %e, "Failed to send purchase event");
                false
            }
        };

        let lead = Lead::new(&order_id, form, selection, currency, at);
        post_json(
            &self.http,
            &self.config.lead_url,
            self.config.lead_token.as_deref(),
            &lead,
        )
        .await
        .map_err(|e| {
            error!(order_id = %order_id, error = %e, "Lead worker rejected the order");
            CheckoutError::LeadRejected("Please try again or contact us.".to_string())
        })?;

        self.storage.set(LAST_ORDER_ID_KEY, &order_id)?;
        info!(order_id = %order_id, conversion_tracked, "Order accepted");

        Ok(OrderConfirmation {
            redirect_url: thank_you_url(&self.config.thank_you_url, &order_id),
            order_id,
            conversion_tracked,
        })
    }
}

fn new_order_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("ORD-{}", id[..12].to_uppercase())
}

fn thank_you_url(base: &str, order_id: &str) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}order={}", base, separator, urlencoding::encode(order_id))
}
