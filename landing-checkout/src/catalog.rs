//! Product variants offered on the landing page.

use serde::{Deserialize, Serialize};

use crate::{CheckoutError, Result};

pub const MAX_QUANTITY: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub product_name: String,
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
    /// Price of one unit in minor currency units
    pub unit_price_cents: i64,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            product_name: "Classic Hoodie".to_string(),
            colors: ["Black", "Navy", "Grey", "Burgundy"].map(String::from).to_vec(),
            sizes: ["S", "M", "L", "XL", "XXL"].map(String::from).to_vec(),
            unit_price_cents: 3990,
        }
    }
}

impl Catalog {
    /// Validate a color, size and quantity against the catalog.
    ///
    /// Color and size match case-insensitively and are stored with the
    /// catalog's spelling.
    pub fn select(&self, color: &str, size: &str, quantity: u32) -> Result<VariantSelection> {
        let color = find(&self.colors, color)
            .ok_or_else(|| CheckoutError::InvalidSelection(format!("color {:?}", color)))?;
        let size = find(&self.sizes, size)
            .ok_or_else(|| CheckoutError::InvalidSelection(format!("size {:?}", size)))?;
        if quantity == 0 || quantity > MAX_QUANTITY {
            return Err(CheckoutError::InvalidSelection(format!(
                "quantity must be between 1 and {}",
                MAX_QUANTITY
            )));
        }

        Ok(VariantSelection {
            product_name: self.product_name.clone(),
            color: color.to_string(),
            size: size.to_string(),
            quantity,
            unit_price_cents: self.unit_price_cents,
        })
    }
}

fn find<'a>(options: &'a [String], wanted: &str) -> Option<&'a str> {
    let wanted = wanted.trim();
    options
        .iter()
        .find(|option| option.eq_ignore_ascii_case(wanted))
        .map(String::as_str)
}

/// A validated choice of variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSelection {
    pub product_name: String,
    pub color: String,
    pub size: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

impl VariantSelection {
    pub fn total_cents(&self) -> i64 {
        self.unit_price_cents * i64::from(self.quantity)
    }

    /// Order total in major currency units, as ad platforms expect it.
    pub fn total(&self) -> f64 {
        self.total_cents() as f64 / 100.0
    }

    pub fn label(&self) -> String {
        format!("{} - {} / {}", self.product_name, self.color, self.size)
    }
}
