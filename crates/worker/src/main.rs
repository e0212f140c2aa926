use anyhow::Context;
use clap::Parser;
use streaksense_core::domain::freshness::{Action, FreshnessPolicy};
use streaksense_core::llm::{GenerateInput, ReportGenerator};
use streaksense_core::storage::{lock, ReportStore};
use streaksense_core::time::date_key;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Pre-generates the day's analysis report so interactive requests hit a warm
/// cache. Intended to run from cron around the daily slate.
#[derive(Debug, Parser)]
#[command(name = "streaksense_worker")]
struct Args {
    /// Report date (YYYY-MM-DD). Defaults to today's local date.
    #[arg(long)]
    date: Option<String>,

    /// Log the freshness decision without generating or writing anything.
    #[arg(long)]
    dry_run: bool,

    /// Regenerate and overwrite regardless of freshness.
    #[arg(long)]
    force: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = streaksense_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let date = resolve_report_date(args.date.as_deref())?;
    let policy = FreshnessPolicy::from_settings(&settings);

    let db_url = settings.require_database_url()?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    streaksense_core::storage::migrate(&pool).await?;

    let acquired = lock::try_acquire_date_lock(&pool, date).await?;
    if !acquired {
        tracing::warn!(%date, "date lock not acquired; another run in progress");
        return Ok(());
    }

    let result = run(&settings, &pool, &policy, date, args.dry_run, args.force).await;

    let _ = lock::release_date_lock(&pool, date).await;

    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        let chain = format!("{err:#}");
        tracing::error!(%date, error = %chain, "worker run failed");
    }
    result
}

async fn run(
    settings: &streaksense_core::config::Settings,
    pool: &sqlx::PgPool,
    policy: &FreshnessPolicy,
    date: chrono::NaiveDate,
    dry_run: bool,
    force: bool,
) -> anyhow::Result<()> {
    let store = streaksense_core::storage::reports::PgReportStore::new(pool.clone());

    let stored = store.get(date).await;
    let action = policy.decide(
        date,
        date_key::today_local(),
        chrono::Utc::now(),
        stored.as_ref().map(|e| e.fetched_at),
    );

    if dry_run {
        tracing::info!(
            %date,
            stored = stored.is_some(),
            ?action,
            dry_run = true,
            "freshness decision"
        );
        return Ok(());
    }

    if action == Action::UseStored && !force {
        tracing::info!(%date, "stored report is fresh; nothing to do");
        return Ok(());
    }

    let generator =
        streaksense_core::llm::anthropic::AnthropicClient::from_settings(settings)?;
    let report = generator.generate(GenerateInput::new(date)).await?;

    // Batch context: await the write so cron failures are visible, unlike the
    // API's detached cache-aside write.
    store.put(date, &report).await?;

    tracing::info!(
        %date,
        recommendations = report.recommendations.len(),
        "persisted analysis report"
    );
    Ok(())
}

fn init_sentry(
    settings: &streaksense_core::config::Settings,
) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

fn resolve_report_date(date_arg: Option<&str>) -> anyhow::Result<chrono::NaiveDate> {
    match date_arg {
        Some(s) => chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid --date {s:?}; expected YYYY-MM-DD")),
        None => Ok(date_key::today_local()),
    }
}
