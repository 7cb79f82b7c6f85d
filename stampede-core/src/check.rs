use crate::{ConfigError, DEFAULT_EXPECTED_STATUS};
use std::fmt;
use std::time::Duration;

/// Condition a check asserts about a response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Condition {
    Status(u16),
    StatusIn(Vec<u16>),
    MaxLatency(Duration),
}

impl Condition {
    pub fn holds(&self, status: u16, latency: Duration) -> bool {
        match self {
            Self::Status(expected) => status == *expected,
            Self::StatusIn(expected) => expected.contains(&status),
            Self::MaxLatency(max) => latency <= *max,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => write!(f, "status was {status}"),
            Self::StatusIn(statuses) => write!(f, "status in {statuses:?}"),
            Self::MaxLatency(max) => write!(f, "latency under {}", humantime::format_duration(*max)),
        }
    }
}

/// A named assertion evaluated against every response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Check {
    pub name: String,
    pub condition: Condition,
}

impl Check {
    pub fn new(name: impl Into<String>, condition: Condition) -> Self {
        Self {
            name: name.into(),
            condition,
        }
    }

    /// Check named after its condition, e.g. `status was 200`.
    pub fn from_condition(condition: Condition) -> Self {
        Self::new(condition.to_string(), condition)
    }

    pub fn status(status: u16) -> Self {
        Self::from_condition(Condition::Status(status))
    }

    pub fn evaluate(&self, status: u16, latency: Duration) -> CheckResult<'_> {
        CheckResult {
            name: &self.name,
            passed: self.condition.holds(status, latency),
        }
    }

    /// Result recorded when no response was received at all.
    pub fn failed(&self) -> CheckResult<'_> {
        CheckResult {
            name: &self.name,
            passed: false,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyCheckName);
        }
        Ok(())
    }
}

/// The check set used when none is configured: `status was 200`.
pub fn default_checks() -> Vec<Check> {
    vec![Check::status(DEFAULT_EXPECTED_STATUS)]
}

/// Outcome of one check against one response.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CheckResult<'a> {
    pub name: &'a str,
    pub passed: bool,
}
