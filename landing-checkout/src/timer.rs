//! Reservation countdown shown in the checkout popup.
//!
//! Purely cosmetic: an expired reservation never blocks submission.

use chrono::{DateTime, Duration, Utc};

const RESERVATION_SECS: i64 = 5 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationTimer {
    started_at: DateTime<Utc>,
}

impl ReservationTimer {
    pub fn start(now: DateTime<Utc>) -> Self {
        Self { started_at: now }
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        let left = Duration::seconds(RESERVATION_SECS) - (now - self.started_at);
        left.max(Duration::zero())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.remaining(now) <= Duration::zero()
    }

    /// `MM:SS`
    pub fn display(&self, now: DateTime<Utc>) -> String {
        let secs = self.remaining(now).num_seconds();
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }
}
