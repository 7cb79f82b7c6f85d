use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    FmtSubscriber::builder()
        .with_env_filter("mock_service=debug,tower_http=info")
        .init();

    let hits = Arc::default();
    tokio::spawn(mock_service::hits_measure_task(Arc::clone(&hits)));

    let addr: SocketAddr = "0.0.0.0:3002".parse().unwrap();
    mock_service::run(addr, hits).await;
}
