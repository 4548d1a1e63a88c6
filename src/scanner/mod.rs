//! Scanner module - resolves targets and drives the worker pool.
//!
//! Jobs sit on a shared queue drained by `min(concurrency, jobs)` tokio
//! tasks. Found ports and the completed-job counter live behind one mutex
//! that is only held for an append or an increment, never across I/O.

pub mod events;
pub mod tcp;
pub mod traits;

use crate::banner::BannerGrabber;
use crate::error::CoreResult;
use crate::services::Severity;
use crate::types::{build_port_set, resolve, Port, ScanId, ScanTarget};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub use events::{FnReporter, NullReporter, ProgressReporter, ScanEvent};
pub use tcp::TcpConnectScanner;
pub use traits::{PortResult, ScanConfig, Scanner, DEFAULT_CONCURRENCY, DEFAULT_CONNECT_TIMEOUT};

/// A `Progress` event is emitted each time this many jobs have completed.
pub const PROGRESS_INTERVAL: usize = 10;

/// Complete results of one scan, owned by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Handle for this scan.
    pub id: ScanId,
    /// Target as supplied by the caller.
    pub target: String,
    /// Address literal that was scanned.
    pub target_ip: String,
    /// Open ports, strictly ascending.
    pub ports: Vec<PortResult>,
    /// When the summary was assembled.
    pub timestamp: DateTime<Utc>,
    /// Number of jobs that ran to completion.
    pub total_ports_attempted: usize,
    /// Wall-clock duration of the scan.
    pub duration_ms: u64,
}

impl ScanSummary {
    /// Number of open ports.
    pub fn open_count(&self) -> usize {
        self.ports.len()
    }

    /// Open ports per severity tier, most severe first.
    pub fn severity_counts(&self) -> Vec<(Severity, usize)> {
        let mut counts: BTreeMap<Severity, usize> = BTreeMap::new();
        for result in &self.ports {
            *counts.entry(result.severity).or_default() += 1;
        }
        Severity::ALL
            .iter()
            .map(|s| (*s, counts.get(s).copied().unwrap_or(0)))
            .collect()
    }
}

/// State shared by all workers of one scan.
#[derive(Default)]
struct Tally {
    results: Vec<PortResult>,
    completed: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Resolve `target` and scan the common or deep port set.
pub async fn scan(
    target: &str,
    deep: bool,
    config: &ScanConfig,
    reporter: Arc<dyn ProgressReporter>,
) -> CoreResult<ScanSummary> {
    scan_ports(target, build_port_set(deep), config, reporter).await
}

/// Resolve `target` and scan an explicit job list.
///
/// Resolution and address failures are reported as a log line followed by
/// an empty `Complete` event, then returned as errors.
pub async fn scan_ports(
    target: &str,
    jobs: Vec<Port>,
    config: &ScanConfig,
    reporter: Arc<dyn ProgressReporter>,
) -> CoreResult<ScanSummary> {
    reporter.report(ScanEvent::log(format!("Resolving target {target}...")));

    let resolved = match resolve(target).await {
        Ok(resolved) => resolved,
        Err(e) => {
            reporter.report(ScanEvent::log(format!("DNS resolution failed: {e}")));
            reporter.report(ScanEvent::complete(Vec::new()));
            return Err(e);
        }
    };

    reporter.report(ScanEvent::log(format!(
        "Target resolved to {resolved}. Scanning..."
    )));

    run(&resolved, jobs, config, reporter.clone())
        .await
        .inspect_err(|e| {
            reporter.report(ScanEvent::log(format!("Error: {e}")));
            reporter.report(ScanEvent::complete(Vec::new()));
        })
}

/// Scan a resolved target with TCP connect attempts.
///
/// Fails with [`crate::ScanError::InvalidAddress`] before any worker starts
/// when the target has no usable address family.
pub async fn run(
    target: &ScanTarget,
    jobs: Vec<Port>,
    config: &ScanConfig,
    reporter: Arc<dyn ProgressReporter>,
) -> CoreResult<ScanSummary> {
    let (ip, family) = target.endpoint()?;
    debug!(%ip, %family, "address family fixed for scan");

    let grabber = BannerGrabber::new(config.banner_timeout, config.client_id.clone());
    let scanner = Arc::new(TcpConnectScanner::new(ip, config.connect_timeout, grabber));

    Ok(run_with_scanner(scanner, target, jobs, config, reporter).await)
}

/// Drain `jobs` through a bounded pool of workers calling `scanner`.
///
/// Duplicate ports are scanned once. Returns after every job has been
/// attempted, or after cancellation once in-flight jobs finish.
pub async fn run_with_scanner<S>(
    scanner: Arc<S>,
    target: &ScanTarget,
    mut jobs: Vec<Port>,
    config: &ScanConfig,
    reporter: Arc<dyn ProgressReporter>,
) -> ScanSummary
where
    S: Scanner + 'static,
{
    let start_time = Instant::now();

    jobs.sort_unstable();
    jobs.dedup();
    let total = jobs.len();
    let workers = config.concurrency.max(1).min(total);

    reporter.report(ScanEvent::log(format!(
        "Scanning {total} ports on {} with {workers} workers",
        target.literal
    )));
    debug!(total, workers, "starting worker pool");

    let queue = Arc::new(Mutex::new(VecDeque::from(jobs)));
    let tally = Arc::new(Mutex::new(Tally::default()));
    let mut set = JoinSet::new();

    for _ in 0..workers {
        let queue = Arc::clone(&queue);
        let tally = Arc::clone(&tally);
        let scanner = Arc::clone(&scanner);
        let reporter = Arc::clone(&reporter);
        let cancel = config.cancel.clone();

        set.spawn(async move {
            while !cancel.is_cancelled() {
                let Some(port) = lock(&queue).pop_front() else {
                    break;
                };

                let found = scanner.scan_port(port).await;
                let event = found.as_ref().map(ScanEvent::port_found);

                let completed = {
                    let mut tally = lock(&tally);
                    if let Some(result) = found {
                        tally.results.push(result);
                    }
                    tally.completed += 1;
                    tally.completed
                };

                if let Some(event) = event {
                    reporter.report(event);
                }
                if completed % PROGRESS_INTERVAL == 0 {
                    reporter.report(ScanEvent::Progress {
                        current: completed,
                        total,
                        port: port.as_u16(),
                    });
                }
            }
        });
    }

    while let Some(joined) = set.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "scan worker failed");
        }
    }

    let (mut results, attempted) = {
        let mut tally = lock(&tally);
        (std::mem::take(&mut tally.results), tally.completed)
    };
    results.sort_unstable_by_key(|r| r.port);

    if config.cancel.is_cancelled() {
        reporter.report(ScanEvent::log(format!(
            "Scan cancelled after {attempted} of {total} ports"
        )));
    }
    reporter.report(ScanEvent::complete(results.clone()));

    let duration_ms = start_time.elapsed().as_millis() as u64;
    info!(
        target = %target.literal,
        open = results.len(),
        attempted,
        duration_ms,
        "scan finished"
    );

    ScanSummary {
        id: ScanId::new(),
        target: target.original.clone(),
        target_ip: target.literal.clone(),
        ports: results,
        timestamp: Utc::now(),
        total_ports_attempted: attempted,
        duration_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AddressKind;
    use async_trait::async_trait;
    use rand::seq::SliceRandom;
    use std::collections::HashSet;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    /// Scanner that reports a fixed set of ports as open after a short,
    /// port-dependent delay so completions arrive out of order.
    struct FakeScanner {
        open: HashSet<u16>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FakeScanner {
        fn new(open: &[u16]) -> Self {
            Self {
                open: open.iter().copied().collect(),
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Scanner for FakeScanner {
        async fn scan_port(&self, port: Port) -> Option<PortResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let delay = (port.as_u16() as u64 * 7919) % 5;
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.open
                .contains(&port.as_u16())
                .then(|| PortResult::new(port, format!("banner-{port}")))
        }

        fn target(&self) -> IpAddr {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }

    fn localhost() -> ScanTarget {
        ScanTarget::from(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }

    fn ports(values: impl IntoIterator<Item = u16>) -> Vec<Port> {
        values.into_iter().filter_map(Port::new).collect()
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ScanEvent>) -> Vec<ScanEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_results_sorted_for_any_job_order() {
        let open = [3, 17, 22, 80, 443, 999];
        let mut jobs = ports(1..=1024);
        jobs.shuffle(&mut rand::thread_rng());

        let scanner = Arc::new(FakeScanner::new(&open));
        let config = ScanConfig::default().with_concurrency(32);
        let summary =
            run_with_scanner(scanner, &localhost(), jobs, &config, Arc::new(NullReporter)).await;

        let found: Vec<u16> = summary.ports.iter().map(|r| r.port.as_u16()).collect();
        assert_eq!(found, open);
        assert!(summary.ports.windows(2).all(|w| w[0].port < w[1].port));
        assert_eq!(summary.total_ports_attempted, 1024);
        assert_eq!(summary.target_ip, "127.0.0.1");
    }

    #[tokio::test]
    async fn test_duplicate_jobs_scanned_once() {
        let scanner = Arc::new(FakeScanner::new(&[80]));
        let jobs = ports([80, 443, 80, 22, 80]);
        let summary = run_with_scanner(
            Arc::clone(&scanner),
            &localhost(),
            jobs,
            &ScanConfig::default(),
            Arc::new(NullReporter),
        )
        .await;

        assert_eq!(scanner.calls.load(Ordering::SeqCst), 3);
        assert_eq!(summary.ports.len(), 1);
        assert_eq!(summary.total_ports_attempted, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pool_is_bounded() {
        let scanner = Arc::new(FakeScanner::new(&[]));
        let config = ScanConfig::default().with_concurrency(5);
        run_with_scanner(
            Arc::clone(&scanner),
            &localhost(),
            ports(1..=200),
            &config,
            Arc::new(NullReporter),
        )
        .await;

        assert_eq!(scanner.calls.load(Ordering::SeqCst), 200);
        assert!(scanner.peak.load(Ordering::SeqCst) <= 5);
    }

    #[tokio::test]
    async fn test_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scanner = Arc::new(FakeScanner::new(&[21, 25]));
        let summary = run_with_scanner(
            scanner,
            &localhost(),
            ports(1..=25),
            &ScanConfig::default().with_concurrency(4),
            Arc::new(tx),
        )
        .await;
        let events = drain(&mut rx);

        let found: HashSet<u16> = events
            .iter()
            .filter_map(|e| match e {
                ScanEvent::PortFound { port, .. } => Some(*port),
                _ => None,
            })
            .collect();
        assert_eq!(found, HashSet::from([21, 25]));

        let progress: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                ScanEvent::Progress { current, total, .. } => {
                    assert_eq!(*total, 25);
                    Some(*current)
                }
                _ => None,
            })
            .collect();
        assert_eq!(progress.len(), 2);
        assert!(progress.contains(&10) && progress.contains(&20));

        match events.last() {
            Some(ScanEvent::Complete { total_open, results }) => {
                assert_eq!(*total_open, 2);
                assert_eq!(results, &summary.ports);
            }
            other => panic!("expected Complete last, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_job_list() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let summary = run_with_scanner(
            Arc::new(FakeScanner::new(&[])),
            &localhost(),
            Vec::new(),
            &ScanConfig::default(),
            Arc::new(tx),
        )
        .await;

        assert!(summary.ports.is_empty());
        assert_eq!(summary.total_ports_attempted, 0);
        assert!(matches!(
            drain(&mut rx).last(),
            Some(ScanEvent::Complete { total_open: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_cancelled_scan_stops_between_jobs() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let scanner = Arc::new(FakeScanner::new(&[1]));
        let config = ScanConfig::default().with_cancel(cancel);
        let summary = run_with_scanner(
            Arc::clone(&scanner),
            &localhost(),
            ports(1..=50),
            &config,
            Arc::new(NullReporter),
        )
        .await;

        assert_eq!(scanner.calls.load(Ordering::SeqCst), 0);
        assert_eq!(summary.total_ports_attempted, 0);
    }

    #[test]
    fn test_severity_counts() {
        let summary = ScanSummary {
            id: ScanId::new(),
            target: "host".into(),
            target_ip: "10.0.0.1".into(),
            ports: ports([22, 23, 80, 3306, 40000])
                .into_iter()
                .map(|p| PortResult::new(p, ""))
                .collect(),
            timestamp: Utc::now(),
            total_ports_attempted: 5,
            duration_ms: 1,
        };
        assert_eq!(summary.open_count(), 5);
        assert_eq!(
            summary.severity_counts(),
            vec![
                (Severity::Critical, 2),
                (Severity::High, 0),
                (Severity::Medium, 2),
                (Severity::Low, 1),
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_address_fails_before_workers() {
        let target = ScanTarget::from(IpAddr::V6("::ffff:10.0.0.1".parse().unwrap()));
        assert_eq!(target.kind, AddressKind::Unknown);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let err = run(&target, ports([80]), &ScanConfig::default(), Arc::new(tx))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::ScanError::InvalidAddress(_)));
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_unresolvable_target() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let err = scan("", false, &ScanConfig::default(), Arc::new(tx))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::ScanError::Resolution { .. }));

        let events = drain(&mut rx);
        assert!(matches!(events.first(), Some(ScanEvent::Log { .. })));
        assert!(matches!(
            events.last(),
            Some(ScanEvent::Complete { total_open: 0, .. })
        ));
    }

    /// Local listener that writes `greeting` on every accepted connection.
    async fn banner_listener(greeting: &'static [u8]) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let _ = socket.write_all(greeting).await;
                    tokio::time::sleep(Duration::from_millis(500)).await;
                });
            }
        });
        port
    }

    fn fast_config() -> ScanConfig {
        ScanConfig::default()
            .with_connect_timeout(Duration::from_millis(500))
            .with_banner_timeout(Duration::from_millis(300))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_listener_outside_deep_range() {
        let port = banner_listener(b"TESTBANNER\r\n").await;
        assert!(port > 1024, "ephemeral port expected, got {port}");
        let config = fast_config();

        let summary = scan("127.0.0.1", true, &config, Arc::new(NullReporter))
            .await
            .unwrap();
        assert_eq!(summary.total_ports_attempted, 1024);
        assert!(summary.ports.iter().all(|r| r.port.as_u16() != port));

        let mut jobs = build_port_set(true);
        jobs.push(Port::new(port).unwrap());
        let summary = scan_ports("127.0.0.1", jobs, &config, Arc::new(NullReporter))
            .await
            .unwrap();
        let hit = summary
            .ports
            .iter()
            .find(|r| r.port.as_u16() == port)
            .expect("extended job set should find the listener");
        assert!(hit.banner.contains("TESTBANNER"));
        assert_eq!(summary.total_ports_attempted, 1025);
    }

    #[tokio::test]
    async fn test_silent_listener_is_bounded() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = fast_config();
        let started = Instant::now();
        let summary = run(&localhost(), ports([port]), &config, Arc::new(NullReporter))
            .await
            .unwrap();

        assert!(started.elapsed() < config.connect_timeout + config.banner_timeout * 2);
        assert_eq!(summary.ports.len(), 1);
        assert_eq!(summary.ports[0].banner, "No banner response (timed out)");
    }

    #[tokio::test]
    async fn test_no_reachable_ports() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let summary = run(&localhost(), ports([port]), &fast_config(), Arc::new(NullReporter))
            .await
            .unwrap();
        assert!(summary.ports.is_empty());
        assert_eq!(summary.total_ports_attempted, 1);
    }
}
