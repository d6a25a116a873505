use std::fmt::{Display, Formatter};

use chrono::{DateTime, Months, TimeDelta, Utc};
use doctero_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::backup::BackupTier;

/// Maximum artifact age for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "count", rename_all = "snake_case")]
pub enum RetentionWindow {
    /// Whole days.
    Days(u32),
    /// Whole weeks.
    Weeks(u32),
    /// Calendar months.
    Months(u32),
}

impl RetentionWindow {
    /// Rejects empty windows, which would expire every artifact immediately.
    pub fn validated(self) -> AppResult<Self> {
        let count = match self {
            Self::Days(count) | Self::Weeks(count) | Self::Months(count) => count,
        };

        if count == 0 {
            return Err(AppError::Validation(
                "retention window must be greater than zero".to_owned(),
            ));
        }

        Ok(self)
    }

    /// Returns the instant at or before which artifacts are expired.
    #[must_use]
    pub fn cutoff(self, now: DateTime<Utc>) -> DateTime<Utc> {
        let cutoff = match self {
            Self::Days(count) => now.checked_sub_signed(TimeDelta::days(i64::from(count))),
            Self::Weeks(count) => now.checked_sub_signed(TimeDelta::weeks(i64::from(count))),
            Self::Months(count) => now.checked_sub_months(Months::new(count)),
        };

        cutoff.unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Returns whether an artifact created at `created_at` has reached the window.
    #[must_use]
    pub fn is_expired(self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        created_at <= self.cutoff(now)
    }
}

impl Display for RetentionWindow {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Days(count) => write!(formatter, "{count} days"),
            Self::Weeks(count) => write!(formatter, "{count} weeks"),
            Self::Months(count) => write!(formatter, "{count} months"),
        }
    }
}

/// Retention window per tier. Tiers without a window are never cleaned up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicies {
    windows: [Option<RetentionWindow>; BackupTier::COUNT],
}

impl RetentionPolicies {
    /// Returns a copy with the window for `tier` replaced.
    #[must_use]
    pub fn with_window(mut self, tier: BackupTier, window: Option<RetentionWindow>) -> Self {
        self.windows[tier.index()] = window;
        self
    }

    /// Returns the window configured for `tier`.
    #[must_use]
    pub fn window_for(&self, tier: BackupTier) -> Option<RetentionWindow> {
        self.windows[tier.index()]
    }
}

impl Default for RetentionPolicies {
    fn default() -> Self {
        Self {
            windows: [
                Some(RetentionWindow::Days(30)),
                Some(RetentionWindow::Weeks(12)),
                Some(RetentionWindow::Months(24)),
                None,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 2, 0, 0)
            .single()
            .unwrap_or_else(|| unreachable!())
    }

    #[test]
    fn default_policies_match_tier_windows() {
        let policies = RetentionPolicies::default();
        assert_eq!(
            policies.window_for(BackupTier::Daily),
            Some(RetentionWindow::Days(30))
        );
        assert_eq!(
            policies.window_for(BackupTier::Weekly),
            Some(RetentionWindow::Weeks(12))
        );
        assert_eq!(
            policies.window_for(BackupTier::Monthly),
            Some(RetentionWindow::Months(24))
        );
        assert_eq!(policies.window_for(BackupTier::Manual), None);
    }

    #[test]
    fn day_window_expires_at_boundary() {
        let window = RetentionWindow::Days(30);
        assert!(!window.is_expired(now() - TimeDelta::days(5), now()));
        assert!(window.is_expired(now() - TimeDelta::days(30), now()));
        assert!(window.is_expired(now() - TimeDelta::days(35), now()));
    }

    #[test]
    fn month_window_uses_calendar_months() {
        let window = RetentionWindow::Months(24);
        let cutoff = window.cutoff(now());
        assert_eq!(
            cutoff,
            Utc.with_ymd_and_hms(2024, 10, 17, 2, 0, 0)
                .single()
                .unwrap_or_else(|| unreachable!())
        );
    }

    #[test]
    fn zero_window_is_rejected() {
        assert!(RetentionWindow::Weeks(0).validated().is_err());
        assert!(RetentionWindow::Weeks(1).validated().is_ok());
    }

    #[test]
    fn override_replaces_single_tier() {
        let policies = RetentionPolicies::default()
            .with_window(BackupTier::Manual, Some(RetentionWindow::Days(7)));
        assert_eq!(
            policies.window_for(BackupTier::Manual),
            Some(RetentionWindow::Days(7))
        );
        assert_eq!(
            policies.window_for(BackupTier::Daily),
            Some(RetentionWindow::Days(30))
        );
    }
}
