//! leasehold - リース共有のデモ
//!
//! 複数の tokio worker がエンドポイントごとの疑似コネクションをリースし、
//! リースを保持したまま非同期の疑似呼び出しを行います。最後に office の
//! スナップショットを JSON で出力し、office を shutdown します。

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use leasehold_core::{
    BoxError, BuildChain, Disposable, Lease, LeaseConfig, LeasingOffice, RenewStrategy,
};
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// leasehold - keyed resource leasing demo
#[derive(Parser, Debug)]
#[command(name = "leasehold")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Number of concurrent workers
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Calls made by each worker
    #[arg(long, default_value_t = 25)]
    rounds: usize,

    /// Number of distinct endpoints
    #[arg(long, default_value_t = 2)]
    keys: usize,

    /// Fail every N-th simulated call (0 disables failures)
    #[arg(long, default_value_t = 7)]
    fail_every: u64,

    /// Path to a JSON lease configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// 疑似コネクション
#[derive(Debug)]
struct Connection {
    endpoint: String,
    serial: u64,
    timeout: Duration,
    closed: AtomicBool,
}

impl Connection {
    fn open(endpoint: &str, serial: u64) -> Self {
        debug!(endpoint, serial, "opening connection");
        Self {
            endpoint: endpoint.to_string(),
            serial,
            timeout: Duration::from_secs(100),
            closed: AtomicBool::new(false),
        }
    }

    fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Disposable for Connection {
    fn dispose(&self) -> Result<(), BoxError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(format!("connection {} closed twice", self.serial).into());
        }
        info!(endpoint = %self.endpoint, serial = self.serial, "closing connection");
        Ok(())
    }
}

#[derive(Debug, Error)]
#[error("simulated call on connection {serial} failed")]
struct CallFailed {
    serial: u64,
}

/// リースしたコネクションで行う非同期の仕事
#[async_trait]
trait Workload: Send + Sync {
    async fn call(&self, conn: &Connection) -> Result<Duration, CallFailed>;
}

/// 数 ms 待って、N 回に 1 回失敗する
struct SimulatedCall {
    fail_every: u64,
    calls: AtomicU64,
}

impl SimulatedCall {
    fn new(fail_every: u64) -> Self {
        Self {
            fail_every,
            calls: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl Workload for SimulatedCall {
    async fn call(&self, conn: &Connection) -> Result<Duration, CallFailed> {
        let n = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        let latency = Duration::from_millis(rand::thread_rng().gen_range(1..=10));
        tokio::time::sleep(latency.min(conn.timeout)).await;

        if self.fail_every > 0 && n % self.fail_every == 0 {
            return Err(CallFailed {
                serial: conn.serial,
            });
        }
        Ok(latency)
    }
}

#[derive(Debug, Default)]
struct WorkerReport {
    ok: usize,
    failed: usize,
}

type Office = LeasingOffice<String, Connection>;

fn build_strategy(endpoint: String, serials: Arc<AtomicU64>) -> BuildChain<Connection> {
    BuildChain::new(move || {
        let serial = serials.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(Connection::open(&endpoint, serial))
    })
    .then(|conn| Ok(conn.with_timeout(Duration::from_secs(300))))
}

async fn worker(
    id: usize,
    rounds: usize,
    endpoints: Arc<Vec<String>>,
    office: Arc<Office>,
    strategy: RenewStrategy,
    workload: Arc<dyn Workload>,
    serials: Arc<AtomicU64>,
) -> Result<WorkerReport> {
    let mut report = WorkerReport::default();

    for round in 0..rounds {
        let endpoint = endpoints[(id + round) % endpoints.len()].clone();
        let leasable = office
            .get_or_create(
                endpoint.clone(),
                build_strategy(endpoint.clone(), Arc::clone(&serials)),
                strategy.clone(),
            )
            .with_context(|| format!("worker {id}: no leasable for {endpoint}"))?;
        let lease = Lease::acquire(leasable)
            .with_context(|| format!("worker {id}: failed to lease {endpoint}"))?;
        let conn = lease
            .get()
            .with_context(|| format!("worker {id}: {endpoint} was shut down while leased"))?;

        match workload.call(conn).await {
            Ok(latency) => {
                report.ok += 1;
                debug!(worker = id, endpoint = %endpoint, serial = conn.serial, ?latency, "call succeeded");
            }
            Err(e) => {
                report.failed += 1;
                let errors = lease.report_error().unwrap_or_default();
                warn!(worker = id, endpoint = %endpoint, errors, error = %e, "call failed");
            }
        }
    }

    Ok(report)
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = match &cli.config {
        Some(path) => LeaseConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => LeaseConfig::default(),
    };
    let strategy = config
        .renew_strategy()
        .context("invalid renew configuration")?;
    info!(?config, "starting leasehold demo");

    let endpoints: Arc<Vec<String>> = Arc::new(
        (0..cli.keys.max(1))
            .map(|i| format!("https://backend-{i}.example.com"))
            .collect(),
    );
    let office: Arc<Office> = Arc::new(LeasingOffice::new());
    let workload: Arc<dyn Workload> = Arc::new(SimulatedCall::new(cli.fail_every));
    let serials = Arc::new(AtomicU64::new(0));

    let handles: Vec<_> = (0..cli.workers)
        .map(|id| {
            tokio::spawn(worker(
                id,
                cli.rounds,
                Arc::clone(&endpoints),
                Arc::clone(&office),
                strategy.clone(),
                Arc::clone(&workload),
                Arc::clone(&serials),
            ))
        })
        .collect();

    let mut total = WorkerReport::default();
    for handle in handles {
        let report = handle.await.context("worker task panicked")??;
        total.ok += report.ok;
        total.failed += report.failed;
    }
    info!(
        ok = total.ok,
        failed = total.failed,
        connections = serials.load(Ordering::Relaxed),
        "all workers finished"
    );

    print!("{office}");
    let snapshot = office.snapshot();
    println!(
        "{}",
        serde_json::to_string_pretty(&snapshot).context("failed to serialize snapshot")?
    );

    let disposed = office.shutdown().context("failed to shut down leasing office")?;
    info!(disposed, "leasing office closed");
    Ok(())
}
