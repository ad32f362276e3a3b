use std::{
    fmt::{Debug, Display},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Sender},
        Mutex, MutexGuard, PoisonError,
    },
    thread,
    time::{Duration, Instant},
};

use rayon::{
    prelude::{IntoParallelIterator, ParallelIterator},
    ThreadPoolBuilder,
};

use crate::port::PortRange;

use self::{
    probe::{probe, ProbeCtx},
    signal::StopSignal,
    tally::Tally,
};

pub use self::dialer::{Dialer, TcpDialer, TCP};

mod dialer;
mod probe;
mod signal;
mod tally;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);
pub const DEFAULT_CONCURRENCY: usize = 256;
/// Shortest per-attempt timeout, sockets refuse a zero one.
pub const MIN_TIMEOUT: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    Open,
    ClosedOrFiltered,
}

impl Display for PortState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                PortState::Open => "OPEN",
                PortState::ClosedOrFiltered => "closed or filtered",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    pub port: u16,
    pub state: PortState,
}

impl ProbeResult {
    pub fn new(port: u16, state: PortState) -> Self {
        Self { port, state }
    }
}

impl Display for ProbeResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Port {}: {}", self.port, self.state)
    }
}

/// Outcome of one [`Scanner::scan`] call.
///
/// `results` and `open_ports` are in completion order unless
/// [`ScanReport::sort_by_port`] was called.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub results: Vec<ProbeResult>,
    pub open_ports: Vec<u16>,
    pub scanned: usize,
    pub elapsed: Duration,
    /// Whether [`Scanner::stop`] was called while this scan was running.
    pub stopped: bool,
}

impl ScanReport {
    pub fn lines(&self) -> Vec<String> {
        self.results.iter().map(ProbeResult::to_string).collect()
    }

    pub fn sort_by_port(&mut self) {
        self.results.sort_unstable_by_key(|r| r.port);
        self.open_ports.sort_unstable();
    }
}

/// TCP connect scanner over a single host and port range.
///
/// Every call to [`Scanner::scan`] starts from a clean tally: open ports and
/// the scanned counter of a previous run are discarded. Overlapping calls to
/// [`Scanner::scan`] are serialized, the second one waits for the first to
/// finish. [`Scanner::stop`] may be called from any thread.
pub struct Scanner<D = TcpDialer> {
    host: String,
    range: PortRange,
    timeout: Duration,
    concurrency: usize,
    dialer: D,
    running: AtomicBool,
    stop: Mutex<StopSignal>,
    tally: Mutex<Tally>,
    turn: Mutex<()>,
}

impl Scanner {
    pub fn new(host: impl Into<String>, range: PortRange) -> Self {
        Self {
            host: host.into(),
            range,
            timeout: DEFAULT_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
            dialer: TcpDialer,
            running: AtomicBool::new(false),
            stop: Mutex::default(),
            tally: Mutex::default(),
            turn: Mutex::default(),
        }
    }
}

impl<D: Dialer> Scanner<D> {
    pub fn with_dialer<E: Dialer>(self, dialer: E) -> Scanner<E> {
        Scanner {
            host: self.host,
            range: self.range,
            timeout: self.timeout,
            concurrency: self.concurrency,
            dialer,
            running: self.running,
            stop: self.stop,
            tally: self.tally,
            turn: self.turn,
        }
    }

    /// Sets the timeout of each connection attempt, never below [`MIN_TIMEOUT`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.max(MIN_TIMEOUT);
        self
    }

    /// Caps how many probes may be in flight at once. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[inline]
    pub fn range(&self) -> PortRange {
        self.range
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[inline]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Open ports found so far by the current or last scan.
    pub fn open_ports(&self) -> Vec<u16> {
        lock(&self.tally).open_ports.clone()
    }

    /// Probes completed so far by the current or last scan.
    pub fn scanned(&self) -> usize {
        lock(&self.tally).scanned
    }

    /// Probes every port of the range, one probe per port, and waits for all
    /// of them to report.
    pub fn scan(&self) -> ScanReport {
        // Held for the whole run, the tally belongs to one scan at a time.
        let _turn = lock(&self.turn);

        let stop = {
            let signal = lock(&self.stop);
            self.running.store(true, Ordering::SeqCst);
            signal.clone()
        };
        *lock(&self.tally) = Tally::default();

        log::debug!(
            "Scanning `{}` ports {} ({} probes, timeout {:?})",
            self.host,
            self.range,
            self.range.len(),
            self.timeout
        );

        let now = Instant::now();
        let mut results = Vec::with_capacity(self.range.len());

        let (tx, rx) = mpsc::channel();
        thread::scope(|s| {
            s.spawn(|| self.fan_out(&stop, tx));

            // Sole writer of the tally while the scan runs.
            for result in rx {
                lock(&self.tally).record(result);
                results.push(result);
            }
        });

        let elapsed = now.elapsed();
        self.running.store(false, Ordering::SeqCst);

        let tally = lock(&self.tally).clone();
        let stopped = stop.is_raised();

        log::debug!(
            "Scan finished in {:.4}s: {} scanned, {} open{}",
            elapsed.as_secs_f32(),
            tally.scanned,
            tally.open_ports.len(),
            if stopped { " (stopped)" } else { "" }
        );

        ScanReport {
            results,
            open_ports: tally.open_ports,
            scanned: tally.scanned,
            elapsed,
            stopped,
        }
    }

    /// Asks a running scan to stop. Probes that haven't started are skipped,
    /// dials already underway still complete within the timeout and report.
    ///
    /// Does nothing if no scan is running.
    pub fn stop(&self) {
        let mut signal = lock(&self.stop);
        if self.running.swap(false, Ordering::SeqCst) {
            signal.raise();
            // Replaced so the next scan doesn't start out stopped.
            *signal = StopSignal::new();

            log::debug!("Stop requested for scan of `{}`", self.host);
        }
    }

    /// Runs one probe per port on a bounded pool and returns once all of them
    /// are done. `sink` and all its clones are dropped by then, which closes
    /// the result channel.
    fn fan_out(&self, stop: &StopSignal, sink: Sender<ProbeResult>) {
        let ctx = ProbeCtx {
            host: &self.host,
            timeout: self.timeout,
            dialer: &self.dialer,
            stop,
        };

        let run = || {
            self.range
                .ports()
                .into_par_iter()
                .for_each_with(sink, |sink, port| probe(port, &ctx, sink))
        };

        let threads = self.concurrency.min(self.range.len());
        match ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("probe-{}", i))
            .build()
        {
            Ok(pool) => {
                log::debug!("Running probes on {} threads", threads);
                pool.install(run)
            }
            Err(e) => {
                log::warn!("Failed to build probe pool ({}), using global pool", e);
                run()
            }
        }
    }
}

impl<D> Debug for Scanner<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("host", &self.host)
            .field("range", &self.range)
            .field("timeout", &self.timeout)
            .field("concurrency", &self.concurrency)
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking probe can't leave the tally half written, so poisoning is ignored.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
