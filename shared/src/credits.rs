//! Credit metering.
//!
//! The balance shown to the user is whatever the server last reported. It is
//! never decremented locally before a metered call succeeds.

use serde::{Deserialize, Serialize};

use crate::models::UltraKind;
use crate::{Error, Result};

impl UltraKind {
    /// Minimum balance required before an ultra generation is offered.
    pub fn credit_threshold(&self) -> i64 {
        match self {
            UltraKind::Summary => 250,
            UltraKind::Flashcards | UltraKind::Maps => 100,
        }
    }
}

/// Last server-confirmed credit balance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditBalance {
    current: Option<i64>,
}

impl CreditBalance {
    pub fn new(current: i64) -> Self {
        Self {
            current: Some(current),
        }
    }

    /// Balance, if the server has reported one.
    pub fn current(&self) -> Option<i64> {
        self.current
    }

    /// Record a balance returned by the server.
    pub fn confirm(&mut self, server_value: i64) {
        self.current = Some(server_value);
    }

    /// Record the balance from a response, when it carries one.
    pub fn refresh(&mut self, server_value: Option<i64>) {
        if let Some(value) = server_value {
            self.confirm(value);
        }
    }

    /// Local pre-check for an ultra generation.
    ///
    /// An unknown balance passes: the server is the authority and will refuse
    /// with a structured error if needed.
    pub fn ensure_affordable(&self, kind: UltraKind) -> Result<()> {
        let required = kind.credit_threshold();
        match self.current {
            Some(current) if current < required => Err(Error::InsufficientCredits {
                required,
                current,
                description: Some(format!("Generating the {} requires {} credits", kind.label(), required)),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds() {
        assert_eq!(UltraKind::Summary.credit_threshold(), 250);
        assert_eq!(UltraKind::Flashcards.credit_threshold(), 100);
        assert_eq!(UltraKind::Maps.credit_threshold(), 100);
    }

    #[test]
    fn test_ensure_affordable() {
        let balance = CreditBalance::new(120);
        assert!(balance.ensure_affordable(UltraKind::Maps).is_ok());

        match balance.ensure_affordable(UltraKind::Summary) {
            Err(Error::InsufficientCredits { required, current, .. }) => {
                assert_eq!(required, 250);
                assert_eq!(current, 120);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_balance_defers_to_server() {
        assert!(CreditBalance::default().ensure_affordable(UltraKind::Summary).is_ok());
    }

    #[test]
    fn test_refresh_ignores_missing_value() {
        let mut balance = CreditBalance::new(10);
        balance.refresh(None);
        assert_eq!(balance.current(), Some(10));
        balance.refresh(Some(7));
        assert_eq!(balance.current(), Some(7));
    }
}
