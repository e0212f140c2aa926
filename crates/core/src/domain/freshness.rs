use crate::config::Settings;
use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};

const DEFAULT_STALE_THRESHOLD_HOURS: i64 = 4;

// Stale "today" entries are served as-is past this UTC hour rather than
// regenerated near the day rollover.
const DEFAULT_REFRESH_CUTOFF_UTC_HOUR: u32 = 23;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    UseStored,
    Regenerate,
}

#[derive(Debug, Clone)]
pub struct FreshnessPolicy {
    pub stale_after: Duration,
    pub refresh_cutoff_utc_hour: u32,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            stale_after: Duration::hours(DEFAULT_STALE_THRESHOLD_HOURS),
            refresh_cutoff_utc_hour: DEFAULT_REFRESH_CUTOFF_UTC_HOUR,
        }
    }
}

impl FreshnessPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        let defaults = Self::default();
        Self {
            stale_after: settings
                .stale_threshold_hours
                .map(Duration::hours)
                .unwrap_or(defaults.stale_after),
            refresh_cutoff_utc_hour: settings
                .refresh_cutoff_utc_hour
                .unwrap_or(defaults.refresh_cutoff_utc_hour),
        }
    }

    /// Pure and total: decides whether a cached report is served or replaced.
    /// `stored_fetched_at` is `None` when no entry exists for the key (an
    /// undecodable row reads as absent at the store layer, i.e. infinitely
    /// stale).
    ///
    /// Past dates never regenerate once stored: game data for a finished day
    /// does not change, and this bounds backend cost.
    pub fn decide(
        &self,
        requested: NaiveDate,
        today: NaiveDate,
        now: DateTime<Utc>,
        stored_fetched_at: Option<DateTime<Utc>>,
    ) -> Action {
        let Some(fetched_at) = stored_fetched_at else {
            return Action::Regenerate;
        };

        if requested != today {
            return Action::UseStored;
        }

        let age = now.signed_duration_since(fetched_at);
        if age <= self.stale_after {
            return Action::UseStored;
        }

        if now.hour() < self.refresh_cutoff_utc_hour {
            Action::Regenerate
        } else {
            Action::UseStored
        }
    }
}
