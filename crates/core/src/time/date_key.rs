use chrono::{Local, NaiveDate};

/// Canonical `YYYY-MM-DD` store key for one local calendar day.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Long-form presentation label, e.g. "June 12, 2025".
pub fn display_label(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

pub fn today_local() -> NaiveDate {
    Local::now().date_naive()
}

/// Lenient parse for externally supplied date strings. Unparseable input
/// falls back to the current local day so callers always land on a usable
/// key; the bad input is logged, never propagated.
pub fn parse_date_key(raw: &str) -> NaiveDate {
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(date) => date,
        Err(err) => {
            tracing::warn!(raw, error = %err, "unparseable date; falling back to today");
            today_local()
        }
    }
}
