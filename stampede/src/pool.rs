use crate::client::HttpClient;
use crate::virtual_user::{run_virtual_user, VirtualUserContext};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

struct VirtualUser {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// A resizable set of virtual user tasks.
///
/// Shrinking never aborts a task: surplus virtual users are told to retire and are kept around
/// until they finish their in-flight request. Retirees still in flight hold their slot, so the
/// number of running tasks never exceeds the largest target asked for.
pub(crate) struct VirtualUserPool<C> {
    ctx: Arc<VirtualUserContext<C>>,
    token: CancellationToken,
    live: Vec<VirtualUser>,
    retiring: Vec<JoinHandle<()>>,
    target: usize,
}

impl<C: HttpClient> VirtualUserPool<C> {
    pub fn new(ctx: VirtualUserContext<C>, token: CancellationToken) -> Self {
        Self {
            ctx: Arc::new(ctx),
            token,
            live: vec![],
            retiring: vec![],
            target: 0,
        }
    }

    pub fn set_concurrency(&mut self, concurrency: usize) {
        self.target = concurrency;
        self.retiring.retain(|handle| !handle.is_finished());

        if self.live.len() > concurrency {
            debug!("Retiring {} virtual users", self.live.len() - concurrency);
            for vu in self.live.drain(concurrency..) {
                vu.token.cancel();
                self.retiring.push(vu.handle);
            }
        } else {
            let room = concurrency.saturating_sub(self.live.len() + self.retiring.len());
            if room > 0 {
                debug!("Spawning {room} virtual users");
            }
            for _ in 0..room {
                let token = self.token.child_token();
                let handle = tokio::spawn(run_virtual_user(self.ctx.clone(), token.clone()));
                self.live.push(VirtualUser { token, handle });
            }
        }

        self.ctx
            .atomics
            .set_virtual_users(self.live.len(), self.tasks());
    }

    pub fn concurrency(&self) -> usize {
        self.live.len()
    }

    /// Whether live users are still short of the target because retirees hold their slots.
    pub fn is_pending(&self) -> bool {
        self.live.len() < self.target
    }

    /// Live users plus retirees which may still be finishing a request.
    fn tasks(&self) -> usize {
        self.live.len() + self.retiring.len()
    }

    /// Stop every virtual user and wait for all of them to exit.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        self.ctx.atomics.set_virtual_users(0, 0);

        let handles: Vec<_> = self
            .live
            .drain(..)
            .map(|vu| vu.handle)
            .chain(self.retiring.drain(..))
            .collect();
        for handle in handles {
            if let Err(err) = handle.await {
                error!("Virtual user task failed: {err}");
            }
        }
    }
}

impl<C> Drop for VirtualUserPool<C> {
    fn drop(&mut self) {
        // Tasks outlive a scheduler that unwinds; make sure they wind down.
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atomics::SummaryAtomics;
    use crate::client::{HttpResponse, RequestError};
    use stampede_core::{default_checks, RequestSpec};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    struct SlowClient {
        started: AtomicU64,
        finished: AtomicU64,
    }

    impl HttpClient for SlowClient {
        async fn send(&self, _request: &RequestSpec) -> Result<HttpResponse, RequestError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(500)).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse {
                status: 200,
                body: vec![],
                latency: Duration::from_millis(500),
            })
        }
    }

    fn pool(
        client: Arc<SlowClient>,
        atomics: Arc<SummaryAtomics>,
    ) -> VirtualUserPool<SlowClient> {
        let ctx = VirtualUserContext {
            client,
            spec: Arc::new(RequestSpec::get("http://example.test")),
            checks: default_checks().into(),
            sleep: None,
            limiter: None,
            atomics,
        };
        VirtualUserPool::new(ctx, CancellationToken::new())
    }

    fn slow_client() -> Arc<SlowClient> {
        Arc::new(SlowClient {
            started: AtomicU64::new(0),
            finished: AtomicU64::new(0),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn grows_and_shrinks() {
        let client = slow_client();
        let atomics = Arc::new(SummaryAtomics::new());
        let mut pool = pool(client.clone(), atomics.clone());

        pool.set_concurrency(8);
        assert_eq!(pool.concurrency(), 8);
        assert_eq!(atomics.virtual_users(), 8);

        pool.set_concurrency(3);
        assert_eq!(pool.concurrency(), 3);
        assert_eq!(atomics.virtual_users(), 3);

        pool.shutdown().await;
        assert_eq!(
            client.started.load(Ordering::SeqCst),
            client.finished.load(Ordering::SeqCst)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn retired_users_finish_in_flight_requests() {
        let client = slow_client();
        let atomics = Arc::new(SummaryAtomics::new());
        let mut pool = pool(client.clone(), atomics.clone());

        pool.set_concurrency(4);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(client.started.load(Ordering::SeqCst), 4);

        pool.set_concurrency(0);
        assert_eq!(atomics.virtual_users(), 0);
        pool.shutdown().await;

        assert_eq!(client.finished.load(Ordering::SeqCst), 4);
        let summary = atomics.summary(Duration::ZERO, Default::default());
        assert_eq!(summary.requests_sent, 4);
        assert_eq!(summary.checks_passed, 4);
        assert_eq!(summary.peak_virtual_users, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn retirees_hold_their_slots() {
        let client = slow_client();
        let atomics = Arc::new(SummaryAtomics::new());
        let mut pool = pool(client.clone(), atomics.clone());

        pool.set_concurrency(10);
        tokio::time::sleep(Duration::from_millis(100)).await;
        pool.set_concurrency(0);
        pool.set_concurrency(10);

        // All ten retirees are still inside their 500ms request.
        assert_eq!(pool.concurrency(), 0);
        assert!(pool.is_pending());
        assert_eq!(client.started.load(Ordering::SeqCst), 10);

        tokio::time::sleep(Duration::from_millis(600)).await;
        pool.set_concurrency(10);
        assert_eq!(pool.concurrency(), 10);
        assert!(!pool.is_pending());

        pool.shutdown().await;
        let summary = atomics.summary(Duration::ZERO, Default::default());
        assert_eq!(summary.peak_virtual_users, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_pool_stops_its_users() {
        let client = slow_client();
        let atomics = Arc::new(SummaryAtomics::new());
        let mut pool = pool(client.clone(), atomics);

        pool.set_concurrency(3);
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(pool);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(client.started.load(Ordering::SeqCst), 3);
        assert_eq!(client.finished.load(Ordering::SeqCst), 3);
    }
}
