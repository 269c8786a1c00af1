//! # Collaborator Ports
//!
//! The core never reads the system clock or checks the admin secret itself.
//! Callers hand it these traits instead.
//!
//! ```text
//! ┌──────────────────────┐         ┌──────────────────────────────────┐
//! │  sari-core           │         │  implementations                 │
//! │                      │         │                                  │
//! │  Clock::now() ───────┼────────►│  SystemClock (Utc::now)          │
//! │                      │         │  FixedClock  (tests)             │
//! │                      │         │                                  │
//! │  Authorizer::        │         │  closures  |s| s == "1234"       │
//! │    authorize(secret)─┼────────►│  sari-db PinAuthorizer (argon2)  │
//! └──────────────────────┘         └──────────────────────────────────┘
//! ```

use chrono::{DateTime, Datelike, FixedOffset, Offset, Utc};

// =============================================================================
// Clock
// =============================================================================

/// Source of "now" for `createdAt`, `refundDate` and month keys.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// =============================================================================
// Authorizer
// =============================================================================

/// External admin-secret check gating refunds and reports.
///
/// The core never stores or manages the secret.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, secret: &str) -> bool;
}

impl<F> Authorizer for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn authorize(&self, secret: &str) -> bool {
        self(secret)
    }
}

// =============================================================================
// Calendar helpers
// =============================================================================

/// Builds a fixed offset from minutes east of UTC.
///
/// Out-of-range values (beyond ±24h) fall back to UTC.
pub fn store_offset(minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(minutes.saturating_mul(60)).unwrap_or_else(|| Utc.fix())
}

/// `"YYYY-MM"` month key for an instant, in the store's local calendar.
///
/// ## Example
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use sari_core::ports::{month_key, store_offset};
///
/// // 2024-01-31 20:00 UTC is already February in Manila (UTC+8)
/// let at = Utc.with_ymd_and_hms(2024, 1, 31, 20, 0, 0).unwrap();
/// assert_eq!(month_key(at, store_offset(0)), "2024-01");
/// assert_eq!(month_key(at, store_offset(480)), "2024-02");
/// ```
pub fn month_key(at: DateTime<Utc>, offset: FixedOffset) -> String {
    let local = at.with_timezone(&offset);
    format!("{:04}-{:02}", local.year(), local.month())
}
