use std::time::Duration;

/// How often a linear ramp re-evaluates its virtual user target.
pub const RAMP_TICK: Duration = Duration::from_millis(100);

/// How often the scheduler folds recorded latencies into the digest.
pub const LATENCY_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Status code asserted by the default check set.
pub const DEFAULT_EXPECTED_STATUS: u16 = 200;
