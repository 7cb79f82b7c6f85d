use crate::client::HttpResponse;
use metrics_util::AtomicBucket;
use stampede_core::{CheckResult, LatencyDigest, LatencyStats, RunSummary};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

#[cfg(feature = "metrics")]
mod names {
    pub const REQUESTS: &str = "stampede_requests_total";
    pub const CHECKS_PASSED: &str = "stampede_checks_passed_total";
    pub const CHECKS_FAILED: &str = "stampede_checks_failed_total";
    pub const REQUEST_ERRORS: &str = "stampede_request_errors_total";
    pub const LATENCY: &str = "stampede_request_latency_seconds";
    pub const VIRTUAL_USERS: &str = "stampede_virtual_users";
}

/// Counters shared by every virtual user of a run. Lock-free; latencies go into an
/// `AtomicBucket` and are drained into a digest by the scheduler.
pub(crate) struct SummaryAtomics {
    requests_sent: AtomicU64,
    checks_passed: AtomicU64,
    checks_failed: AtomicU64,
    request_errors: AtomicU64,
    data_received: AtomicU64,
    virtual_users: AtomicUsize,
    peak_virtual_users: AtomicUsize,
    latency: AtomicBucket<Duration>,
}

impl SummaryAtomics {
    pub fn new() -> Self {
        Self {
            requests_sent: AtomicU64::new(0),
            checks_passed: AtomicU64::new(0),
            checks_failed: AtomicU64::new(0),
            request_errors: AtomicU64::new(0),
            data_received: AtomicU64::new(0),
            virtual_users: AtomicUsize::new(0),
            peak_virtual_users: AtomicUsize::new(0),
            latency: AtomicBucket::new(),
        }
    }

    pub fn record_response(&self, response: &HttpResponse) {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
        self.data_received
            .fetch_add(response.body.len() as u64, Ordering::Relaxed);
        self.latency.push(response.latency);

        #[cfg(feature = "metrics")]
        {
            metrics::counter!(names::REQUESTS).increment(1);
            metrics::histogram!(names::LATENCY).record(response.latency.as_secs_f64());
        }
    }

    pub fn record_error(&self) {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
        self.request_errors.fetch_add(1, Ordering::Relaxed);

        #[cfg(feature = "metrics")]
        {
            metrics::counter!(names::REQUESTS).increment(1);
            metrics::counter!(names::REQUEST_ERRORS).increment(1);
        }
    }

    pub fn record_check(&self, result: CheckResult<'_>) {
        if result.passed {
            self.checks_passed.fetch_add(1, Ordering::Relaxed);
            #[cfg(feature = "metrics")]
            metrics::counter!(names::CHECKS_PASSED, "check" => result.name.to_string())
                .increment(1);
        } else {
            self.checks_failed.fetch_add(1, Ordering::Relaxed);
            #[cfg(feature = "metrics")]
            metrics::counter!(names::CHECKS_FAILED, "check" => result.name.to_string())
                .increment(1);
        }
    }

    /// `live` users are the ones not told to retire; `tasks` also counts retirees which may
    /// still be finishing a request. The peak follows `tasks`.
    pub fn set_virtual_users(&self, live: usize, tasks: usize) {
        self.virtual_users.store(live, Ordering::Relaxed);
        self.peak_virtual_users.fetch_max(tasks, Ordering::Relaxed);

        #[cfg(feature = "metrics")]
        metrics::gauge!(names::VIRTUAL_USERS).set(live as f64);
    }

    pub fn virtual_users(&self) -> usize {
        self.virtual_users.load(Ordering::Relaxed)
    }

    /// Move every latency recorded so far into `digest`.
    pub fn drain_latencies(&self, digest: &mut LatencyDigest) {
        self.latency.clear_with(|chunk| digest.insert(chunk));
    }

    pub fn summary(&self, elapsed: Duration, latency: LatencyStats) -> RunSummary {
        RunSummary {
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            checks_passed: self.checks_passed.load(Ordering::Relaxed),
            checks_failed: self.checks_failed.load(Ordering::Relaxed),
            request_errors: self.request_errors.load(Ordering::Relaxed),
            data_received: self.data_received.load(Ordering::Relaxed),
            peak_virtual_users: self.peak_virtual_users.load(Ordering::Relaxed),
            elapsed,
            latency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stampede_core::Check;
    use std::sync::Arc;

    fn response(latency_ms: u64) -> HttpResponse {
        HttpResponse {
            status: 200,
            body: vec![0; 16],
            latency: Duration::from_millis(latency_ms),
        }
    }

    #[test]
    fn records_outcomes() {
        let atomics = SummaryAtomics::new();
        let check = Check::status(200);

        atomics.record_response(&response(5));
        atomics.record_check(check.evaluate(200, Duration::ZERO));
        atomics.record_error();
        atomics.record_check(check.failed());

        let summary = atomics.summary(Duration::from_secs(1), LatencyStats::default());
        assert_eq!(summary.requests_sent, 2);
        assert_eq!(summary.request_errors, 1);
        assert_eq!(summary.checks_passed, 1);
        assert_eq!(summary.checks_failed, 1);
        assert_eq!(summary.data_received, 16);
    }

    #[test]
    fn peak_tracks_maximum() {
        let atomics = SummaryAtomics::new();
        atomics.set_virtual_users(3, 3);
        atomics.set_virtual_users(6, 9);
        atomics.set_virtual_users(0, 0);
        assert_eq!(atomics.virtual_users(), 0);
        assert_eq!(
            atomics
                .summary(Duration::ZERO, LatencyStats::default())
                .peak_virtual_users,
            9
        );
    }

    #[test]
    fn drains_latencies_once() {
        let atomics = SummaryAtomics::new();
        for ms in 1..=10 {
            atomics.record_response(&response(ms));
        }

        let mut digest = LatencyDigest::new();
        atomics.drain_latencies(&mut digest);
        atomics.drain_latencies(&mut digest);
        assert_eq!(digest.count(), 10);
        assert_eq!(digest.stats().max, Duration::from_millis(10));
    }

    #[test]
    fn no_lost_increments() {
        let atomics = Arc::new(SummaryAtomics::new());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let atomics = atomics.clone();
                std::thread::spawn(move || {
                    let check = Check::status(200);
                    for _ in 0..10_000 {
                        atomics.record_response(&response(1));
                        atomics.record_check(check.evaluate(200, Duration::ZERO));
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        let summary = atomics.summary(Duration::ZERO, LatencyStats::default());
        assert_eq!(summary.requests_sent, 80_000);
        assert_eq!(summary.checks_passed, 80_000);
    }
}
