//! Raw lead handed to the lead-ingestion worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::VariantSelection;
use crate::form::CheckoutForm;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub order_id: String,
    #[serde(flatten)]
    pub customer: CheckoutForm,
    pub product: String,
    pub color: String,
    pub size: String,
    pub quantity: u32,
    pub total: f64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    pub fn new(
        order_id: &str,
        form: &CheckoutForm,
        selection: &VariantSelection,
        currency: &str,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id: order_id.to_string(),
            customer: form.clone(),
            product: selection.product_name.clone(),
            color: selection.color.clone(),
            size: selection.size.clone(),
            quantity: selection.quantity,
            total: selection.total(),
            currency: currency.to_string(),
            created_at: at,
        }
    }
}
