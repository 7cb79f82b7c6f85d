//! Run orchestration: validation, the scheduler task and the handle returned to callers.
use crate::atomics::SummaryAtomics;
use crate::client::HttpClient;
use crate::pool::VirtualUserPool;
use crate::virtual_user::VirtualUserContext;
use governor::{Quota, RateLimiter};
use stampede_core::{
    default_checks, Check, ConfigError, LatencyDigest, LatencyStats, LoadProfile, RampPolicy,
    RequestSpec, RunOptions, RunSummary, LATENCY_FLUSH_INTERVAL, RAMP_TICK,
};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, Instrument};

/// Builder and entry point for load runs.
///
/// # Example
/// ```no_run
/// use stampede::prelude::*;
/// use std::time::Duration;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let mut run = LoadRunner::new(ReqwestClient::new(Duration::from_secs(60))?)
///     .sleep(Duration::from_secs(1))
///     .start(
///         LoadProfile::constant(100, Duration::from_secs(30)),
///         RequestSpec::get("https://example.test"),
///     )?;
///
/// let summary = run.wait().await;
/// # Ok(())
/// # }
/// ```
pub struct LoadRunner<C> {
    client: Arc<C>,
    checks: Vec<Check>,
    options: RunOptions,
}

impl<C: HttpClient> LoadRunner<C> {
    pub fn new(client: C) -> Self {
        Self {
            client: Arc::new(client),
            checks: default_checks(),
            options: RunOptions::default(),
        }
    }

    /// Replace the default `status was 200` check set.
    pub fn checks(mut self, checks: Vec<Check>) -> Self {
        self.checks = checks;
        self
    }

    /// Pause each virtual user for `sleep` between iterations.
    pub fn sleep(mut self, sleep: Duration) -> Self {
        self.options.sleep = Some(sleep);
        self
    }

    /// Cap the request rate across all virtual users.
    pub fn max_rps(mut self, max_rps: u32) -> Self {
        self.options.max_rps = Some(max_rps);
        self
    }

    pub fn ramp(mut self, ramp: RampPolicy) -> Self {
        self.options.ramp = ramp;
        self
    }

    pub fn options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Validate the configuration and start the run.
    ///
    /// Returns a [`ConfigError`] without sending a single request if the profile, the request
    /// or the runner options are malformed. Must be called from within a tokio runtime.
    pub fn start(&self, profile: LoadProfile, spec: RequestSpec) -> Result<RunHandle, ConfigError> {
        profile.validate()?;
        spec.validate()?;
        self.options.validate()?;
        for check in &self.checks {
            check.validate()?;
        }

        let limiter = match self.options.max_rps {
            Some(max_rps) => {
                let max_rps = NonZeroU32::new(max_rps).ok_or(ConfigError::ZeroRate)?;
                Some(Arc::new(RateLimiter::direct(
                    Quota::per_second(max_rps).allow_burst(NonZeroU32::MIN),
                )))
            }
            None => None,
        };

        let atomics = Arc::new(SummaryAtomics::new());
        let token = CancellationToken::new();
        let ctx = VirtualUserContext {
            client: self.client.clone(),
            spec: Arc::new(spec),
            checks: self.checks.clone().into(),
            sleep: self.options.sleep,
            limiter,
            atomics: atomics.clone(),
        };
        let url = ctx.spec.url.clone();
        let pool = VirtualUserPool::new(ctx, token.clone());

        let started = Instant::now();
        let scheduler = tokio::spawn(
            schedule(
                pool,
                atomics.clone(),
                profile,
                self.options.ramp,
                token.clone(),
                url,
            )
            .in_current_span(),
        );

        Ok(RunHandle {
            token,
            scheduler: Some(scheduler),
            atomics,
            started,
            summary: None,
        })
    }
}

struct RunOutcome {
    elapsed: Duration,
    latency: LatencyStats,
}

/// Drive the pool through the profile until the window closes or the run is stopped.
#[instrument(name = "run", skip_all, fields(url = %url))]
async fn schedule<C: HttpClient>(
    mut pool: VirtualUserPool<C>,
    atomics: Arc<SummaryAtomics>,
    profile: LoadProfile,
    ramp: RampPolicy,
    token: CancellationToken,
    url: String,
) -> RunOutcome {
    let total = profile.total_duration();
    info!(
        "Starting run: up to {} virtual users for {}",
        profile.max_virtual_users(),
        humantime::format_duration(total)
    );

    let start = Instant::now();
    let mut digest = LatencyDigest::new();
    let mut stage = None;
    loop {
        let elapsed = start.elapsed();
        if elapsed >= total {
            break;
        }

        let current = profile.stage_at(elapsed);
        if current != stage {
            if let Some(idx) = current {
                info!("Entering stage {}", idx + 1);
            }
            stage = current;
        }

        pool.set_concurrency(profile.target_at(elapsed, ramp));
        atomics.drain_latencies(&mut digest);

        let now = Instant::now();
        let flush = if pool.is_pending() {
            now + RAMP_TICK
        } else {
            now + LATENCY_FLUSH_INTERVAL
        };
        let wake = match start.checked_add(profile.next_change(elapsed, ramp)) {
            Some(change) => change.min(flush),
            None => flush,
        };
        tokio::select! {
            _ = sleep_until(wake) => {}
            _ = token.cancelled() => {
                info!("Stop requested");
                break;
            }
        }
    }

    pool.shutdown().await;
    let elapsed = start.elapsed();
    // Requests which were in flight at shutdown only land in the bucket now.
    atomics.drain_latencies(&mut digest);

    info!(
        "Run complete after {}",
        humantime::format_duration(Duration::from_millis(elapsed.as_millis() as u64))
    );
    RunOutcome {
        elapsed,
        latency: digest.stats(),
    }
}

/// Handle to a started run.
///
/// Dropping the handle stops the run without waiting for it.
pub struct RunHandle {
    token: CancellationToken,
    scheduler: Option<JoinHandle<RunOutcome>>,
    atomics: Arc<SummaryAtomics>,
    started: Instant,
    summary: Option<RunSummary>,
}

impl RunHandle {
    /// Ask every virtual user to stop after its current request, wait for all of them, and
    /// return the final summary. Calling this again returns the same summary.
    pub async fn stop(&mut self) -> RunSummary {
        self.token.cancel();
        self.finish().await
    }

    /// Wait for the profile to run to completion and return the final summary.
    pub async fn wait(&mut self) -> RunSummary {
        self.finish().await
    }

    /// Number of virtual users currently live.
    pub fn virtual_users(&self) -> usize {
        self.atomics.virtual_users()
    }

    /// Counters so far. Latency statistics are only available in the final summary.
    pub fn snapshot(&self) -> RunSummary {
        if let Some(summary) = &self.summary {
            return summary.clone();
        }
        self.atomics
            .summary(self.started.elapsed(), LatencyStats::default())
    }

    pub fn is_finished(&self) -> bool {
        match &self.scheduler {
            Some(scheduler) => scheduler.is_finished(),
            None => true,
        }
    }

    async fn finish(&mut self) -> RunSummary {
        if let Some(summary) = &self.summary {
            return summary.clone();
        }

        // NOTE: the handle is only released once it resolves; `wait()` may be dropped mid-await.
        let outcome = match self.scheduler.as_mut() {
            Some(scheduler) => {
                let res = scheduler.await;
                self.scheduler = None;
                match res {
                    Ok(outcome) => Some(outcome),
                    Err(err) => {
                        error!("Scheduler task failed: {err}");
                        None
                    }
                }
            }
            None => None,
        };

        let summary = match outcome {
            Some(RunOutcome { elapsed, latency }) => self.atomics.summary(elapsed, latency),
            None => self
                .atomics
                .summary(self.started.elapsed(), LatencyStats::default()),
        };
        self.summary = Some(summary.clone());
        summary
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
