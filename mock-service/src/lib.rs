use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::debug;

pub type Hits = Arc<AtomicU64>;

pub fn router(hits: Hits) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/status/:status", get(status))
        .route("/delay/ms/:delay_ms", get(delay))
        .route("/delay/ms/:delay_ms/status/:status", get(delay_status))
        .layer(TraceLayer::new_for_http())
        .with_state(hits)
}

pub async fn run(addr: SocketAddr, hits: Hits) {
    let listener = TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, router(hits)).await.unwrap();
}

/// A mock bound to an ephemeral local port.
pub struct MockService {
    pub addr: SocketAddr,
    hits: Hits,
}

impl MockService {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Hits::default();

        let app = router(hits.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, hits }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Number of requests this mock has served.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::SeqCst)
    }
}

#[debug_handler]
async fn root(State(hits): State<Hits>) -> &'static str {
    hits.fetch_add(1, Ordering::SeqCst);
    "ok"
}

#[debug_handler]
async fn status(State(hits): State<Hits>, Path(status): Path<u16>) -> StatusCode {
    hits.fetch_add(1, Ordering::SeqCst);
    to_status(status)
}

#[debug_handler]
async fn delay(State(hits): State<Hits>, Path(delay_ms): Path<u64>) {
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    hits.fetch_add(1, Ordering::SeqCst);
}

#[debug_handler]
async fn delay_status(
    State(hits): State<Hits>,
    Path((delay_ms, status)): Path<(u64, u16)>,
) -> StatusCode {
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    hits.fetch_add(1, Ordering::SeqCst);
    to_status(status)
}

fn to_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or_else(|_| {
        debug!("Invalid status {status} requested");
        StatusCode::BAD_REQUEST
    })
}

/** Throughput Printer **/

pub async fn hits_measure_task(hits: Hits) {
    let mut last = 0;
    loop {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let total = hits.load(Ordering::SeqCst);
        println!("{} requests/s", total - last);
        last = total;
    }
}
