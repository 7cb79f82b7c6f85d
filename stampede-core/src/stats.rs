use pdatastructs::tdigest::{TDigest, K1};
use serde::Serialize;
use serde_with::{serde_as, DurationMilliSecondsWithFrac, DurationSecondsWithFrac};
use std::fmt;
use std::time::Duration;
use tracing::error;

const TDIGEST_BACKLOG_SIZE: usize = 100;

/// Aggregate result of a run.
///
/// Counters are exact; latency quantiles are approximated with a t-digest.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub requests_sent: u64,
    pub checks_passed: u64,
    pub checks_failed: u64,
    pub request_errors: u64,
    pub data_received: u64,
    pub peak_virtual_users: usize,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub elapsed: Duration,
    pub latency: LatencyStats,
}

impl RunSummary {
    pub fn checks_total(&self) -> u64 {
        self.checks_passed + self.checks_failed
    }

    /// Fraction of checks which passed; `1.0` when nothing was checked.
    pub fn check_pass_rate(&self) -> f64 {
        match self.checks_total() {
            0 => 1.,
            total => self.checks_passed as f64 / total as f64,
        }
    }

    pub fn request_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0. {
            self.requests_sent as f64 / secs
        } else {
            0.
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = Duration::from_millis(self.elapsed.as_millis() as u64);
        writeln!(
            f,
            "requests.........: {} ({:.2}/s)",
            self.requests_sent,
            self.request_rate()
        )?;
        writeln!(
            f,
            "checks...........: {:.2}% passed={} failed={}",
            self.check_pass_rate() * 100.,
            self.checks_passed,
            self.checks_failed,
        )?;
        writeln!(f, "request errors...: {}", self.request_errors)?;
        writeln!(f, "data received....: {} B", self.data_received)?;
        writeln!(f, "peak vus.........: {}", self.peak_virtual_users)?;
        writeln!(
            f,
            "duration.........: {}",
            humantime::format_duration(elapsed)
        )?;
        write!(f, "latency..........: {}", self.latency)
    }
}

#[serde_as]
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct LatencyStats {
    pub count: u64,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub avg: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub min: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub max: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub p50: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub p90: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub p95: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub p99: Duration,
}

impl fmt::Display for LatencyStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "avg={:?} min={:?} p50={:?} p90={:?} p95={:?} p99={:?} max={:?}",
            self.avg, self.min, self.p50, self.p90, self.p95, self.p99, self.max,
        )
    }
}

/// Streaming latency accumulator. Keeps exact count/min/max/mean and a t-digest for quantiles.
#[derive(Debug)]
pub struct LatencyDigest {
    digest: TDigest<K1>,
    count: u64,
    total: Duration,
    min: Duration,
    max: Duration,
}

impl Default for LatencyDigest {
    fn default() -> Self {
        Self::new()
    }
}

impl LatencyDigest {
    pub fn new() -> Self {
        Self {
            digest: TDigest::new(K1::new(10.), TDIGEST_BACKLOG_SIZE),
            count: 0,
            total: Duration::ZERO,
            min: Duration::MAX,
            max: Duration::ZERO,
        }
    }

    pub fn insert(&mut self, latencies: &[Duration]) {
        for latency in latencies {
            self.digest.insert(latency.as_secs_f64());
            self.count += 1;
            self.total += *latency;
            self.min = self.min.min(*latency);
            self.max = self.max.max(*latency);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn quantile(&self, quantile: f64) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }

        let secs = self.digest.quantile(quantile);
        // NOTE: the digest can return NaN on degenerate inputs.
        let secs = if secs.is_finite() {
            secs.max(0.)
        } else {
            error!("Non-finite latency quantile; reporting zero.");
            0.
        };
        Duration::from_secs_f64(secs)
    }

    pub fn stats(&self) -> LatencyStats {
        if self.count == 0 {
            return LatencyStats::default();
        }

        LatencyStats {
            count: self.count,
            avg: Duration::from_secs_f64(self.total.as_secs_f64() / self.count as f64),
            min: self.min,
            max: self.max,
            p50: self.quantile(0.5),
            p90: self.quantile(0.9),
            p95: self.quantile(0.95),
            p99: self.quantile(0.99),
        }
    }
}
