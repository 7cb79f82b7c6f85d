mod utils;
use utils::*;

use stampede::prelude::*;
use std::time::Duration;

fn client() -> ReqwestClient {
    ReqwestClient::new(Duration::from_secs(5)).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(30_000)]
async fn constant_profile_all_pass() {
    let mock = init().await;

    let mut run = LoadRunner::new(client())
        .start(
            LoadProfile::constant(5, Duration::from_secs(2)),
            RequestSpec::get(mock.url("/")),
        )
        .unwrap();
    let summary = run.wait().await;

    assert_eq!(summary.checks_failed, 0);
    assert!(summary.requests_sent >= 5);
    assert_eq!(summary.checks_passed, summary.requests_sent);
    assert_eq!(summary.requests_sent, mock.hits());
    assert_eq!(summary.data_received, 2 * summary.requests_sent);
    assert_eq!(summary.peak_virtual_users, 5);
    assert!(summary.latency.p99 >= summary.latency.p50);
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(30_000)]
async fn server_errors_do_not_abort() {
    let mock = init().await;

    let mut run = LoadRunner::new(client())
        .start(
            LoadProfile::constant(5, Duration::from_secs(2)),
            RequestSpec::get(mock.url("/status/500")),
        )
        .unwrap();
    let summary = run.wait().await;

    assert!(summary.requests_sent >= 5);
    assert_eq!(summary.checks_failed, summary.requests_sent);
    assert_eq!(summary.checks_passed, 0);
    assert_eq!(summary.request_errors, 0);
    assert!(summary.elapsed >= Duration::from_secs(2));
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(30_000)]
async fn connection_failures_are_recorded() {
    let _mock = init().await;
    let addr = closed_addr().await;

    let mut run = LoadRunner::new(client())
        .sleep(Duration::from_millis(50))
        .start(
            LoadProfile::constant(2, Duration::from_secs(1)),
            RequestSpec::get(format!("http://{addr}/")),
        )
        .unwrap();
    let summary = run.wait().await;

    assert!(summary.requests_sent > 0);
    assert_eq!(summary.request_errors, summary.requests_sent);
    assert_eq!(summary.checks_failed, summary.requests_sent);
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(30_000)]
async fn timeouts_are_request_errors() {
    let mock = init().await;

    let mut run = LoadRunner::new(ReqwestClient::new(Duration::from_millis(100)).unwrap())
        .start(
            LoadProfile::constant(2, Duration::from_secs(1)),
            RequestSpec::get(mock.url("/delay/ms/400")),
        )
        .unwrap();
    let summary = run.wait().await;

    assert!(summary.request_errors > 0);
    assert_eq!(summary.checks_passed, 0);
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(30_000)]
async fn latency_check() {
    let mock = init().await;

    let checks = vec![
        Check::status(200),
        Check::new("under 20ms", Condition::MaxLatency(Duration::from_millis(20))),
    ];
    let mut run = LoadRunner::new(client())
        .checks(checks)
        .start(
            LoadProfile::constant(2, Duration::from_secs(1)),
            RequestSpec::get(mock.url("/delay/ms/60")),
        )
        .unwrap();
    let summary = run.wait().await;

    assert!(summary.requests_sent > 0);
    assert_eq!(summary.checks_passed, summary.requests_sent);
    assert_eq!(summary.checks_failed, summary.requests_sent);
    assert!(summary.latency.min >= Duration::from_millis(60));
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(30_000)]
async fn staged_ramp_up_and_down() {
    let mock = init().await;

    let mut run = LoadRunner::new(client())
        .start(
            LoadProfile::staged(vec![
                Stage::new(Duration::from_secs(1), 6),
                Stage::new(Duration::from_secs(1), 0),
            ]),
            RequestSpec::get(mock.url("/delay/ms/10")),
        )
        .unwrap();

    let mut peak = 0;
    while !run.is_finished() {
        peak = peak.max(run.virtual_users());
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let summary = run.wait().await;

    assert!(peak <= 6);
    assert_eq!(summary.peak_virtual_users, 6);
    assert_eq!(run.virtual_users(), 0);
    assert_eq!(summary.requests_sent, mock.hits());
    assert_eq!(summary.checks_failed, 0);
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(30_000)]
async fn stop_early() {
    let mock = init().await;

    let mut run = LoadRunner::new(client())
        .start(
            LoadProfile::constant(3, Duration::from_secs(60)),
            RequestSpec::get(mock.url("/delay/ms/200")),
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;
    let first = run.stop().await;
    let second = run.stop().await;

    assert_eq!(first, second);
    assert!(first.elapsed < Duration::from_secs(5));
    assert_eq!(first.requests_sent, mock.hits());
}
