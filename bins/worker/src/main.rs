//! Tally pipeline host.
//!
//! Wires the repositories and provider adapters into the core services, runs
//! the cost meter worker, and keeps pricing and exchange rates fresh on a
//! schedule.
//!
//! Usage:
//!   tally           - Run the cost meter and scheduled jobs until Ctrl-C
//!   tally ingest    - Same, and record expenses from `<user_id> <message>` stdin lines
//!   tally migrate   - Apply pending database migrations and exit

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tally_core::cost::{CostMeter, CostMeterWorker};
use tally_core::currency::CurrencyNormalizer;
use tally_core::expense::{CreateExpenseRequest, ExpenseAssembler, ExpenseStores};
use tally_core::parsing::ConversationParser;
use tally_core::pricing::PricingSync;
use tally_db::migration::{Migrator, MigratorTrait};
use tally_db::{
    CategoryRepository, CostLogRepository, ExchangeRateRepository, ExpenseRepository,
    PricingRepository, UserPreferenceRepository, connect,
};
use tally_providers::HttpRateProvider;
use tally_shared::AppConfig;
use tally_shared::types::{CurrencyCode, UserId};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tally=info,tally_core=info,tally_providers=info,tally_db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let command = std::env::args().nth(1);
    let ingest = match command.as_deref() {
        None => false,
        Some("ingest") => true,
        Some("migrate") => {
            let db = connect(&config.database.url).await?;
            Migrator::up(&db, None).await.context("failed to apply migrations")?;
            info!("Migrations applied");
            return Ok(());
        }
        Some(other) => anyhow::bail!("unknown command: {other}"),
    };

    let db = connect(&config.database.url).await?;
    info!("Connected to database");

    let ai = tally_providers::ai_backend(&config.ai)?;
    let pricing_provider = tally_providers::pricing_provider(
        &config.pricing,
        Duration::from_secs(config.currency.request_timeout_secs),
    )?;
    let rate_provider = Arc::new(HttpRateProvider::new(
        &config.currency.provider_url,
        Duration::from_secs(config.currency.request_timeout_secs),
    )?);

    let pricing = Arc::new(PricingRepository::new(db.clone()));
    let shutdown = CancellationToken::new();

    let meter = Arc::new(CostMeter::new(
        pricing.clone(),
        Arc::new(CostLogRepository::new(db.clone())),
    ));
    let (worker, cost_meter) = CostMeterWorker::new(
        meter,
        config.cost_meter.queue_capacity,
        Duration::from_millis(config.cost_meter.write_timeout_ms),
        shutdown.clone(),
    );
    let worker = worker.spawn();

    let codes = |list: &[CurrencyCode]| -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    };
    let normalizer = Arc::new(
        CurrencyNormalizer::new(
            Arc::new(ExchangeRateRepository::new(db.clone())),
            rate_provider,
            codes(&config.currency.tracked_symbols),
        )
        .with_refresh_bases(codes(&config.currency.refresh_bases)),
    );
    let sync = Arc::new(PricingSync::new(pricing, pricing_provider));

    let mut jobs = vec![
        spawn_pricing_sync(
            sync,
            Duration::from_secs(config.scheduler.pricing_sync_interval_secs),
            shutdown.clone(),
        ),
        spawn_rate_refresh(
            normalizer.clone(),
            Duration::from_secs(config.scheduler.rate_refresh_interval_secs),
            shutdown.clone(),
        ),
    ];

    let home_currency = config.currency.default_home_currency.to_string();
    if ingest {
        let parser = ConversationParser::new(ai.clone(), cost_meter.clone(), home_currency.clone());
        let assembler = ExpenseAssembler::new(
            ExpenseStores {
                expenses: Arc::new(ExpenseRepository::new(db.clone())),
                categories: Arc::new(CategoryRepository::new(db.clone())),
                preferences: Arc::new(UserPreferenceRepository::new(db.clone())),
            },
            ai,
            normalizer,
            cost_meter.clone(),
            home_currency,
        );
        jobs.push(spawn_ingest(parser, assembler, shutdown.clone()));
    }
    drop(cost_meter);

    info!(ingest, "Tally worker running");
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for shutdown signal")?;
            info!("Shutdown signal received");
        }
        () = shutdown.cancelled() => {}
    }

    shutdown.cancel();
    for job in jobs {
        if let Err(err) = job.await {
            error!(error = %err, "background job panicked");
        }
    }
    match worker.await {
        Ok(processed) => info!(processed, "Cost meter worker stopped"),
        Err(err) => error!(error = %err, "cost meter worker panicked"),
    }

    Ok(())
}

fn spawn_pricing_sync(
    sync: Arc<PricingSync>,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period.max(Duration::from_secs(1)));
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let report = sync.sync().await;
                    if !report.success {
                        warn!(errors = ?report.errors, "pricing sync failed");
                    }
                }
            }
        }
    })
}

fn spawn_rate_refresh(
    normalizer: Arc<CurrencyNormalizer>,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period.max(Duration::from_secs(1)));
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let report = normalizer.refresh_rates().await;
                    if !report.errors.is_empty() {
                        warn!(errors = ?report.errors, "rate refresh had failures");
                    }
                }
            }
        }
    })
}

/// Reads `<user_id> <message>` lines until EOF, then requests shutdown.
fn spawn_ingest(
    parser: ConversationParser,
    assembler: ExpenseAssembler,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = tokio::select! {
                () = shutdown.cancelled() => break,
                line = lines.next_line() => line,
            };
            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    error!(error = %err, "failed to read stdin");
                    break;
                }
            };
            let Some((user, text)) = line.trim().split_once(char::is_whitespace) else {
                continue;
            };
            let user_id = UserId::from(user);

            for candidate in parser.execute(text, &user_id).await {
                let request = CreateExpenseRequest::from_candidate(user_id.clone(), candidate);
                match assembler.execute(request).await {
                    Ok(summary) => println!("{}", summary.message),
                    Err(err) => error!(user_id = %user_id, error = %err, "failed to record expense"),
                }
            }
        }
        shutdown.cancel();
    })
}

