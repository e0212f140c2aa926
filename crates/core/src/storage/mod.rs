pub mod lock;
pub mod reports;

use crate::domain::report::{AnalysisReport, StoredReportEntry};
use anyhow::Context;
use chrono::NaiveDate;

pub async fn migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("sqlx migrations failed")?;
    Ok(())
}

/// Durable key-value access to one report per calendar date.
#[async_trait::async_trait]
pub trait ReportStore: Send + Sync {
    /// Fails soft: backend errors read as "absent" so a store outage falls
    /// back to regeneration instead of blocking the caller.
    async fn get(&self, date: NaiveDate) -> Option<StoredReportEntry>;

    /// Unconditional last-writer-wins overwrite for the date key. Reports
    /// failing [`cacheable`] must be dropped with a warning, not written.
    async fn put(&self, date: NaiveDate, report: &AnalysisReport) -> anyhow::Result<()>;
}

/// Cache-poisoning guard: a report with no recommendations is a failed or
/// partial generation and must never be persisted.
pub fn cacheable(report: &AnalysisReport) -> bool {
    !report.recommendations.is_empty()
}
