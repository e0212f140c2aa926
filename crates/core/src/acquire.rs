use crate::domain::freshness::{Action, FreshnessPolicy};
use crate::domain::report::AnalysisReport;
use crate::llm::{GenerateInput, ReportGenerator};
use crate::storage::ReportStore;
use crate::time::date_key;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

/// Single entry point for the presentation layer: read the cache, let the
/// freshness policy decide, regenerate when needed, write back best-effort.
pub struct ReportService {
    store: Arc<dyn ReportStore>,
    generator: Arc<dyn ReportGenerator>,
    policy: FreshnessPolicy,
}

impl ReportService {
    pub fn new(
        store: Arc<dyn ReportStore>,
        generator: Arc<dyn ReportGenerator>,
        policy: FreshnessPolicy,
    ) -> Self {
        Self {
            store,
            generator,
            policy,
        }
    }

    pub async fn acquire_report(&self, date: NaiveDate) -> anyhow::Result<AnalysisReport> {
        self.acquire_report_at(date, date_key::today_local(), Utc::now())
            .await
    }

    /// Clock-injected variant. Exactly one store read, at most one generator
    /// call and one store write per invocation; generator errors propagate to
    /// the caller unchanged, store faults never do.
    pub async fn acquire_report_at(
        &self,
        date: NaiveDate,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> anyhow::Result<AnalysisReport> {
        let stored = self.store.get(date).await;
        let action = self
            .policy
            .decide(date, today, now, stored.as_ref().map(|e| e.fetched_at));

        if action == Action::UseStored {
            if let Some(entry) = stored {
                tracing::debug!(%date, fetched_at = %entry.fetched_at, "serving cached report");
                return Ok(entry.report);
            }
            // Entry vanished between read and decision; fall through to
            // regeneration rather than returning nothing.
            tracing::warn!(%date, "stored report missing after UseStored decision; regenerating");
        }

        tracing::info!(%date, "generating fresh report");
        let fresh = self.generator.generate(GenerateInput::new(date)).await?;

        // Best-effort cache-aside: the caller's result never waits on, nor
        // fails with, the persistence outcome. Failures still get logged.
        let store = Arc::clone(&self.store);
        let report = fresh.clone();
        tokio::spawn(async move {
            if let Err(err) = store.put(date, &report).await {
                let chain = format!("{err:#}");
                tracing::error!(%date, error = %chain, "background report write failed");
            }
        });

        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::StoredReportEntry;
    use crate::domain::testing::valid_report;
    use crate::llm::error::GeneratorError;
    use crate::llm::Provider;
    use crate::storage::cacheable;
    use anyhow::bail;
    use chrono::{Duration, TimeZone};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    struct MemoryStore {
        entries: Mutex<HashMap<NaiveDate, StoredReportEntry>>,
        wrote: mpsc::UnboundedSender<NaiveDate>,
        fail_puts: bool,
    }

    impl MemoryStore {
        fn new(fail_puts: bool) -> (Arc<Self>, mpsc::UnboundedReceiver<NaiveDate>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let store = Arc::new(Self {
                entries: Mutex::new(HashMap::new()),
                wrote: tx,
                fail_puts,
            });
            (store, rx)
        }

        fn seed(&self, date: NaiveDate, fetched_at: DateTime<Utc>) {
            let entry = StoredReportEntry {
                report: valid_report(&date_key::display_label(date)),
                fetched_at,
            };
            self.entries.lock().unwrap().insert(date, entry);
        }
    }

    #[async_trait::async_trait]
    impl ReportStore for MemoryStore {
        async fn get(&self, date: NaiveDate) -> Option<StoredReportEntry> {
            self.entries.lock().unwrap().get(&date).cloned()
        }

        async fn put(&self, date: NaiveDate, report: &AnalysisReport) -> anyhow::Result<()> {
            if self.fail_puts {
                bail!("store write refused");
            }
            if !cacheable(report) {
                return Ok(());
            }
            self.entries.lock().unwrap().insert(
                date,
                StoredReportEntry {
                    report: report.clone(),
                    fetched_at: Utc::now(),
                },
            );
            let _ = self.wrote.send(date);
            Ok(())
        }
    }

    struct CountingGenerator {
        calls: AtomicUsize,
        fail_with: Option<GeneratorError>,
    }

    impl CountingGenerator {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail_with: None,
            })
        }

        fn failing(err: GeneratorError) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail_with: Some(err),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl ReportGenerator for CountingGenerator {
        fn provider(&self) -> Provider {
            Provider::Anthropic
        }

        async fn generate(&self, input: GenerateInput) -> anyhow::Result<AnalysisReport> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = &self.fail_with {
                return Err(anyhow::Error::new(err.clone()));
            }
            Ok(valid_report(&input.display_label))
        }
    }

    fn service(
        store: Arc<MemoryStore>,
        generator: Arc<CountingGenerator>,
    ) -> ReportService {
        ReportService::new(store, generator, FreshnessPolicy::default())
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn await_write(rx: &mut mpsc::UnboundedReceiver<NaiveDate>) -> NaiveDate {
        tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .expect("background write did not happen")
            .expect("write channel closed")
    }

    #[tokio::test]
    async fn past_date_with_entry_never_calls_generator() {
        let (store, _rx) = MemoryStore::new(false);
        let today = day(2025, 6, 12);
        let past = day(2025, 5, 20);
        let now = Utc.with_ymd_and_hms(2025, 6, 12, 14, 0, 0).unwrap();
        store.seed(past, now - Duration::days(23));

        let generator = CountingGenerator::ok();
        let svc = service(Arc::clone(&store), Arc::clone(&generator));

        let first = svc.acquire_report_at(past, today, now).await.unwrap();
        let second = svc.acquire_report_at(past, today, now).await.unwrap();

        assert_eq!(generator.call_count(), 0);
        assert_eq!(first.date, second.date);
        assert_eq!(first.recommendations.len(), second.recommendations.len());
    }

    #[tokio::test]
    async fn miss_generates_once_and_writes_back() {
        let (store, mut rx) = MemoryStore::new(false);
        let today = day(2025, 6, 12);
        let past = day(2025, 6, 1);
        let now = Utc.with_ymd_and_hms(2025, 6, 12, 14, 0, 0).unwrap();

        let generator = CountingGenerator::ok();
        let svc = service(Arc::clone(&store), Arc::clone(&generator));

        // Nothing stored dominates the past-date rule.
        let report = svc.acquire_report_at(past, today, now).await.unwrap();
        assert_eq!(generator.call_count(), 1);
        assert_eq!(report.recommendations.len(), 5);

        assert_eq!(await_write(&mut rx).await, past);
        assert!(store.get(past).await.is_some());
    }

    #[tokio::test]
    async fn fresh_today_entry_is_served_from_cache() {
        let (store, _rx) = MemoryStore::new(false);
        let today = day(2025, 6, 12);
        let now = Utc.with_ymd_and_hms(2025, 6, 12, 14, 0, 0).unwrap();
        store.seed(today, now - Duration::hours(3));

        let generator = CountingGenerator::ok();
        let svc = service(Arc::clone(&store), Arc::clone(&generator));

        svc.acquire_report_at(today, today, now).await.unwrap();
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn stale_today_entry_regenerates_before_cutoff() {
        let (store, mut rx) = MemoryStore::new(false);
        let today = day(2025, 6, 12);
        let now = Utc.with_ymd_and_hms(2025, 6, 12, 10, 0, 0).unwrap();
        store.seed(today, now - Duration::hours(5));

        let generator = CountingGenerator::ok();
        let svc = service(Arc::clone(&store), Arc::clone(&generator));

        svc.acquire_report_at(today, today, now).await.unwrap();
        assert_eq!(generator.call_count(), 1);
        assert_eq!(await_write(&mut rx).await, today);
    }

    #[tokio::test]
    async fn stale_today_entry_is_served_after_cutoff() {
        let (store, _rx) = MemoryStore::new(false);
        let today = day(2025, 6, 12);
        let now = Utc.with_ymd_and_hms(2025, 6, 12, 23, 30, 0).unwrap();
        store.seed(today, now - Duration::hours(6));

        let generator = CountingGenerator::ok();
        let svc = service(Arc::clone(&store), Arc::clone(&generator));

        svc.acquire_report_at(today, today, now).await.unwrap();
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn empty_report_is_never_cached() {
        let (store, _rx) = MemoryStore::new(false);
        let date = day(2025, 6, 12);

        let mut report = valid_report("June 12, 2025");
        report.recommendations.clear();

        store.put(date, &report).await.unwrap();
        assert!(store.get(date).await.is_none());
    }

    #[tokio::test]
    async fn write_failure_does_not_fail_acquisition() {
        let (store, _rx) = MemoryStore::new(true);
        let today = day(2025, 6, 12);
        let now = Utc.with_ymd_and_hms(2025, 6, 12, 14, 0, 0).unwrap();

        let generator = CountingGenerator::ok();
        let svc = service(Arc::clone(&store), Arc::clone(&generator));

        let report = svc.acquire_report_at(today, today, now).await.unwrap();
        assert_eq!(report.recommendations.len(), 5);
    }

    #[tokio::test]
    async fn generator_errors_propagate_typed() {
        let (store, _rx) = MemoryStore::new(false);
        let today = day(2025, 6, 12);
        let now = Utc.with_ymd_and_hms(2025, 6, 12, 14, 0, 0).unwrap();

        let generator = CountingGenerator::failing(GeneratorError::BackendRefusal {
            provider: Provider::Anthropic,
            reason: "safety stop".to_string(),
        });
        let svc = service(Arc::clone(&store), Arc::clone(&generator));

        let err = svc.acquire_report_at(today, today, now).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GeneratorError>(),
            Some(GeneratorError::BackendRefusal { .. })
        ));
    }
}
