use crate::domain::report::{AnalysisReport, StoredReportEntry};
use crate::storage::{cacheable, ReportStore};
use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};

/// Postgres-backed report store. One row per date key; `fetched_at` is
/// assigned server-side so entry age is measured against the store's clock.
#[derive(Debug, Clone)]
pub struct PgReportStore {
    pool: sqlx::PgPool,
}

impl PgReportStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_entry(&self, date: NaiveDate) -> anyhow::Result<Option<StoredReportEntry>> {
        let row = sqlx::query_as::<_, (serde_json::Value, DateTime<Utc>)>(
            "SELECT report, fetched_at FROM analysis_reports WHERE report_date = $1",
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .context("select analysis_reports failed")?;

        let Some((report_json, fetched_at)) = row else {
            return Ok(None);
        };

        let report = serde_json::from_value::<AnalysisReport>(report_json)
            .with_context(|| format!("undecodable stored report for {date}"))?;

        Ok(Some(StoredReportEntry { report, fetched_at }))
    }
}

#[async_trait::async_trait]
impl ReportStore for PgReportStore {
    async fn get(&self, date: NaiveDate) -> Option<StoredReportEntry> {
        match self.fetch_entry(date).await {
            Ok(entry) => entry,
            Err(err) => {
                // An undecodable or unreachable entry reads as absent, which
                // the reconciler treats as infinitely stale.
                let chain = format!("{err:#}");
                tracing::warn!(%date, error = %chain, "report store read failed; treating as absent");
                None
            }
        }
    }

    async fn put(&self, date: NaiveDate, report: &AnalysisReport) -> anyhow::Result<()> {
        if !cacheable(report) {
            tracing::warn!(%date, "refusing to cache report with no recommendations");
            return Ok(());
        }

        let report_json =
            serde_json::to_value(report).context("failed to serialize report for storage")?;

        sqlx::query(
            "INSERT INTO analysis_reports (report_date, report, fetched_at) \
             VALUES ($1, $2, now()) \
             ON CONFLICT (report_date) \
             DO UPDATE SET report = EXCLUDED.report, fetched_at = now()",
        )
        .bind(date)
        .bind(report_json)
        .execute(&self.pool)
        .await
        .with_context(|| format!("upsert analysis_reports failed for {date}"))?;

        Ok(())
    }
}
