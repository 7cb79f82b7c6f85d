use crate::atomics::SummaryAtomics;
use crate::client::HttpClient;
use governor::DefaultDirectRateLimiter;
use stampede_core::{Check, RequestSpec};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Everything a virtual user needs; shared read-only by the whole pool.
pub(crate) struct VirtualUserContext<C> {
    pub client: Arc<C>,
    pub spec: Arc<RequestSpec>,
    pub checks: Arc<[Check]>,
    pub sleep: Option<Duration>,
    pub limiter: Option<Arc<DefaultDirectRateLimiter>>,
    pub atomics: Arc<SummaryAtomics>,
}

impl<C: HttpClient> VirtualUserContext<C> {
    /// Issue one request and fold its outcome into the summary.
    pub async fn iteration(&self) {
        match self.client.send(&self.spec).await {
            Ok(response) => {
                self.atomics.record_response(&response);
                for check in self.checks.iter() {
                    let result = check.evaluate(response.status, response.latency);
                    if !result.passed {
                        trace!("Check `{}` failed with status {}", check.name, response.status);
                    }
                    self.atomics.record_check(result);
                }
            }
            Err(err) => {
                trace!("Request failed: {err}");
                self.atomics.record_error();
                for check in self.checks.iter() {
                    self.atomics.record_check(check.failed());
                }
            }
        }
    }
}

/// The request loop of a single virtual user.
///
/// Cancellation is only observed between requests (and while waiting on the limiter or the
/// inter-iteration sleep), so an in-flight request always completes and is counted.
pub(crate) async fn run_virtual_user<C: HttpClient>(
    ctx: Arc<VirtualUserContext<C>>,
    token: CancellationToken,
) {
    while !token.is_cancelled() {
        if let Some(limiter) = &ctx.limiter {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = limiter.until_ready() => {}
            }
        }

        ctx.iteration().await;

        if let Some(sleep) = ctx.sleep {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(sleep) => {}
            }
        }
    }
}
