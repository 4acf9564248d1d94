//! Landing-page order flow.
//!
//! A visitor picks a color and size, fills the popup checkout while a
//! reservation countdown runs, and submits. Submission reports a hashed
//! purchase event to the conversions relay, hands the raw lead to the lead
//! worker and remembers the order id locally.

pub mod catalog;
pub mod config;
pub mod error;
pub mod form;
mod http;
pub mod lead;
pub mod order;
pub mod pixel;
pub mod storage;
pub mod timer;

pub use catalog::{Catalog, VariantSelection};
pub use config::CheckoutConfig;
pub use error::{CheckoutError, Result};
pub use form::CheckoutForm;
pub use lead::Lead;
pub use order::{OrderConfirmation, OrderFlow};
pub use pixel::PurchaseEvent;
pub use storage::LocalStorage;
pub use timer::ReservationTimer;
