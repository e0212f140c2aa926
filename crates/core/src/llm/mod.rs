pub mod anthropic;
pub mod error;
pub mod json;

use crate::domain::report::AnalysisReport;
use crate::time::date_key;
use chrono::NaiveDate;

#[derive(Debug, Clone)]
pub struct GenerateInput {
    pub report_date: NaiveDate,
    /// Presentation copy for the report header ("June 12, 2025").
    pub display_label: String,
}

impl GenerateInput {
    pub fn new(report_date: NaiveDate) -> Self {
        Self {
            report_date,
            display_label: date_key::display_label(report_date),
        }
    }

    pub fn date_key(&self) -> String {
        date_key::date_key(self.report_date)
    }
}

#[derive(Debug, Clone)]
pub enum Provider {
    Anthropic,
}

#[async_trait::async_trait]
pub trait ReportGenerator: Send + Sync {
    fn provider(&self) -> Provider;

    /// Obtains a fresh report for the given date. Errors are typed
    /// [`error::GeneratorError`] values carried inside `anyhow::Error`;
    /// no retries happen here — retry policy belongs to the caller.
    async fn generate(&self, input: GenerateInput) -> anyhow::Result<AnalysisReport>;
}
