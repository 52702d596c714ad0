use bulkpay::application::engine::{DispatchEngine, EngineEvent};
use bulkpay::application::plan::{self, RunPlan};
use bulkpay::application::restart::RestartCoordinator;
use bulkpay::domain::config::{DispatchConfig, RestartBasis};
use bulkpay::domain::payment::PayerIdentity;
use bulkpay::domain::ports::{SessionStore as _, SharedSessionStore};
use bulkpay::domain::session::{DatasetFingerprint, DispatchSession};
use bulkpay::infrastructure::http::{HttpRestartAction, HttpTransferClient};
use bulkpay::infrastructure::in_memory::InMemorySessionStore;
use bulkpay::infrastructure::rocksdb::RocksDbSessionStore;
use bulkpay::interfaces::csv::payment_reader::PaymentReader;
use bulkpay::interfaces::csv::report_writer::{ReportScope, ReportWriter};
use bulkpay::logging::init_logging;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input payments CSV file
    input: PathBuf,

    /// Path to persistent session database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Transfer submission endpoint of the downstream connector
    #[arg(long, default_value = "http://localhost:3001/transfers")]
    endpoint: String,

    /// Maximum concurrent in-flight submissions
    #[arg(long, default_value_t = 10)]
    workers: usize,

    /// Delay between successive dispatches, in milliseconds
    #[arg(long, default_value_t = 50)]
    delay_ms: u64,

    /// Request a connector restart every N processed rows (0 disables)
    #[arg(long, default_value_t = 200)]
    restart_every: u32,

    /// Restart threshold basis: per-run or per-session
    #[arg(long, default_value = "per-run")]
    restart_basis: RestartBasis,

    /// Control endpoint that restarts the downstream service group
    #[arg(long, default_value = "http://localhost:3001/restart-all")]
    restart_url: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Payer identifier type
    #[arg(long, default_value = "MSISDN")]
    payer_id_type: String,

    /// Payer identifier value
    #[arg(long, default_value = "123456789")]
    payer_id_value: String,

    /// Payer display name
    #[arg(long, default_value = "Bulk Disbursement")]
    payer_name: String,

    /// Re-dispatch only the rows whose last attempt failed
    #[arg(long)]
    retry_failed: bool,

    /// Discard any saved session for this dataset and start fresh
    #[arg(long)]
    reset: bool,

    /// Write an outcome report CSV to this path after the run
    #[arg(long)]
    report: Option<PathBuf>,

    /// Which outcomes the report covers: all, successes or failures
    #[arg(long, default_value = "all")]
    report_scope: ReportScope,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging("info");
    let cli = Cli::parse();

    // The fingerprint ties saved sessions to this exact dataset.
    let size = std::fs::metadata(&cli.input).into_diagnostic()?.len();
    let source_name = cli
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("dataset")
        .to_string();
    let fingerprint = DatasetFingerprint::new(&source_name, size);

    let file = File::open(&cli.input).into_diagnostic()?;
    let mut rows = Vec::new();
    let mut rejected = 0usize;
    for row in PaymentReader::new(file).rows() {
        match row {
            Ok(row) => rows.push(row),
            Err(e) => {
                rejected += 1;
                warn!(error = %e, "rejected malformed row");
            }
        }
    }
    if rejected > 0 {
        warn!(rejected, "rows rejected at ingestion will not be dispatched");
    }

    let store: SharedSessionStore = match &cli.db_path {
        Some(path) => Arc::new(RocksDbSessionStore::open(path).into_diagnostic()?),
        None => {
            warn!("no --db-path given, session will not survive this process");
            Arc::new(InMemorySessionStore::new())
        }
    };

    if cli.reset {
        store.delete(&fingerprint).await.into_diagnostic()?;
        info!("saved session discarded");
    }

    let mut session = match store.load(&fingerprint).await.into_diagnostic()? {
        Some(session) => {
            info!(
                processed = session.processed(),
                succeeded = session.success_count,
                failed = session.failure_count,
                "prior session found, resuming (pass --reset to start over)"
            );
            session
        }
        None => DispatchSession::new(fingerprint.clone(), source_name.as_str()),
    };

    let dispatch_rows = if cli.retry_failed {
        let freed = plan::extract_failed(&mut session);
        if freed.is_empty() {
            info!("no failed rows to retry");
            return write_report(&store, &fingerprint, &cli).await;
        }
        info!(rows = freed.len(), "retrying failed rows");
        plan::select_rows(&rows, &freed)
    } else {
        match plan::plan_run(&rows, Some(&session)) {
            RunPlan::EmptyDataset => {
                info!("dataset is empty, nothing to dispatch");
                return Ok(());
            }
            RunPlan::AlreadyComplete => {
                info!("every row already has an outcome, nothing to dispatch");
                return write_report(&store, &fingerprint, &cli).await;
            }
            RunPlan::Dispatch { rows } => rows,
        }
    };

    let config = DispatchConfig {
        max_concurrent_workers: cli.workers,
        inter_dispatch_delay: Duration::from_millis(cli.delay_ms),
        restart_every_n_processed: cli.restart_every,
        restart_basis: cli.restart_basis,
        payer: PayerIdentity {
            id_type: cli.payer_id_type.clone(),
            id_value: cli.payer_id_value.clone(),
            display_name: cli.payer_name.clone(),
        },
        endpoint: cli.endpoint.clone(),
        request_timeout: Duration::from_secs(cli.timeout_secs),
    };

    let client = Arc::new(HttpTransferClient::new(config.request_timeout).into_diagnostic()?);
    let coordinator = Arc::new(RestartCoordinator::new(Box::new(
        HttpRestartAction::new(cli.restart_url.clone()).into_diagnostic()?,
    )));
    let engine = DispatchEngine::new(client, store.clone(), coordinator.clone(), config)
        .into_diagnostic()?;

    let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel();
    let handle = engine.start(dispatch_rows, session, events_tx);

    let mut interrupted = false;
    loop {
        tokio::select! {
            event = events_rx.recv() => match event {
                Some(EngineEvent::Progress(batch)) => {
                    for outcome in batch {
                        if outcome.succeeded {
                            info!(
                                row = outcome.original_index + 1,
                                transfer_id = outcome.transfer_id.as_deref().unwrap_or("-"),
                                duration_ms = outcome.duration_millis,
                                "transfer succeeded"
                            );
                        } else {
                            warn!(
                                row = outcome.original_index + 1,
                                status = outcome.http_status_code,
                                error = outcome
                                    .error_message
                                    .as_deref()
                                    .unwrap_or(&outcome.status_text),
                                "transfer failed"
                            );
                        }
                    }
                }
                Some(EngineEvent::RestartNeeded) => {
                    let coordinator = coordinator.clone();
                    tokio::spawn(async move {
                        coordinator.request_restart().await;
                    });
                }
                Some(EngineEvent::Complete(_)) => {}
                None => break,
            },
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                warn!("interrupt received, draining in-flight transfers");
                interrupted = true;
                handle.stop();
            }
        }
    }

    let summary = handle.join().await.into_diagnostic()?;
    let throughput = if summary.elapsed.as_secs_f64() > 0.0 {
        summary.processed as f64 / summary.elapsed.as_secs_f64()
    } else {
        0.0
    };
    info!(
        processed = summary.processed,
        succeeded = summary.succeeded,
        failed = summary.failed,
        remaining = summary.remaining,
        elapsed_secs = summary.elapsed.as_secs(),
        throughput = %format!("{:.1}/s", throughput),
        "run complete"
    );
    if summary.remaining > 0 {
        info!("run stopped before the queue drained, re-run the same command to resume");
    }
    if summary.failed > 0 {
        info!("re-run with --retry-failed to re-dispatch the failed rows");
    }

    write_report(&store, &fingerprint, &cli).await
}

/// Writes the outcome report from the saved session, if requested.
async fn write_report(
    store: &SharedSessionStore,
    fingerprint: &DatasetFingerprint,
    cli: &Cli,
) -> Result<()> {
    let Some(path) = &cli.report else {
        return Ok(());
    };
    let Some(session) = store.load(fingerprint).await.into_diagnostic()? else {
        warn!("no session to report on");
        return Ok(());
    };
    let file = File::create(path).into_diagnostic()?;
    ReportWriter::new(file)
        .write_report(&session.outcomes, cli.report_scope)
        .into_diagnostic()?;
    info!(path = %path.display(), outcomes = session.outcomes.len(), "report written");
    Ok(())
}
