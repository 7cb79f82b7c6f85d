//! Raw, deserializable option types and their validation into the typed model.
//!
//! Values arrive here exactly as written in a script (signed integers, humantime strings) so
//! that negative or malformed input surfaces as a [`ConfigError`] instead of a serde type error.
use crate::{
    Check, Condition, ConfigError, LoadProfile, Method, RampPolicy, RequestSpec, Stage,
    DEFAULT_TIMEOUT,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileOptions {
    pub vus: Option<i64>,
    pub duration: Option<String>,
    pub stages: Option<Vec<StageOptions>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOptions {
    pub duration: String,
    pub target: i64,
}

impl TryFrom<&StageOptions> for Stage {
    type Error = ConfigError;

    fn try_from(stage: &StageOptions) -> Result<Self, Self::Error> {
        Ok(Stage {
            duration: parse_duration("stages.duration", &stage.duration)?,
            target: non_negative("stages.target", stage.target)?,
        })
    }
}

impl TryFrom<&ProfileOptions> for LoadProfile {
    type Error = ConfigError;

    fn try_from(options: &ProfileOptions) -> Result<Self, Self::Error> {
        match options {
            ProfileOptions {
                stages: Some(_),
                vus: Some(_),
                ..
            }
            | ProfileOptions {
                stages: Some(_),
                duration: Some(_),
                ..
            } => Err(ConfigError::ConflictingProfiles),

            ProfileOptions {
                stages: Some(stages),
                ..
            } => {
                let stages = stages
                    .iter()
                    .map(Stage::try_from)
                    .collect::<Result<Vec<_>, _>>()?;
                let profile = LoadProfile::staged(stages);
                profile.validate()?;
                Ok(profile)
            }

            ProfileOptions {
                vus,
                duration: Some(duration),
                ..
            } => {
                // A bare duration runs a single virtual user.
                let virtual_users = match vus {
                    Some(vus) => non_negative("vus", *vus)?,
                    None => 1,
                };
                Ok(LoadProfile::constant(
                    virtual_users,
                    parse_duration("duration", duration)?,
                ))
            }

            ProfileOptions { vus: Some(vus), .. } => {
                non_negative("vus", *vus)?;
                Err(ConfigError::MissingField("duration"))
            }

            _ => Err(ConfigError::MissingProfile),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOptions {
    pub method: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl TryFrom<&RequestOptions> for RequestSpec {
    type Error = ConfigError;

    fn try_from(options: &RequestOptions) -> Result<Self, Self::Error> {
        let method = match &options.method {
            Some(method) => method.parse()?,
            None => Method::Get,
        };
        let url = options.url.clone().ok_or(ConfigError::MissingField("url"))?;

        let spec = RequestSpec {
            method,
            url,
            headers: options
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };
        spec.validate()?;
        Ok(spec)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOptions {
    pub name: Option<String>,
    pub status: Option<u16>,
    pub status_in: Option<Vec<u16>>,
    pub max_latency: Option<String>,
}

impl TryFrom<&CheckOptions> for Check {
    type Error = ConfigError;

    fn try_from(options: &CheckOptions) -> Result<Self, Self::Error> {
        let label = || options.name.clone().unwrap_or_default();

        let condition = match (&options.status, &options.status_in, &options.max_latency) {
            (Some(status), None, None) => Condition::Status(*status),
            (None, Some(statuses), None) if !statuses.is_empty() => {
                Condition::StatusIn(statuses.clone())
            }
            (None, None, Some(latency)) => {
                Condition::MaxLatency(parse_duration("checks.max_latency", latency)?)
            }
            _ => return Err(ConfigError::InvalidCheck(label())),
        };

        let check = match &options.name {
            Some(name) => Check::new(name.clone(), condition),
            None => Check::from_condition(condition),
        };
        check.validate()?;
        Ok(check)
    }
}

/// Runner knobs that are independent of the load profile.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RunOptions {
    /// Pause between iterations of a virtual user. Off by default.
    pub sleep: Option<Duration>,
    /// Global cap on requests per second across all virtual users.
    pub max_rps: Option<u32>,
    pub timeout: Duration,
    pub ramp: RampPolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            sleep: None,
            max_rps: None,
            timeout: DEFAULT_TIMEOUT,
            ramp: RampPolicy::default(),
        }
    }
}

impl RunOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rps == Some(0) {
            return Err(ConfigError::ZeroRate);
        }
        Ok(())
    }
}

/// The `options` block of a script: the load profile plus runner knobs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptOptions {
    #[serde(flatten)]
    pub profile: ProfileOptions,
    pub sleep: Option<String>,
    pub max_rps: Option<i64>,
    pub timeout: Option<String>,
    pub ramp: Option<RampPolicy>,
}

impl TryFrom<&ScriptOptions> for RunOptions {
    type Error = ConfigError;

    fn try_from(options: &ScriptOptions) -> Result<Self, Self::Error> {
        let defaults = RunOptions::default();
        let run = RunOptions {
            sleep: options
                .sleep
                .as_deref()
                .map(|s| parse_duration("sleep", s))
                .transpose()?,
            max_rps: options
                .max_rps
                .map(|rps| non_negative("max_rps", rps))
                .transpose()?
                .map(|rps| u32::try_from(rps).unwrap_or(u32::MAX)),
            timeout: options
                .timeout
                .as_deref()
                .map(|s| parse_duration("timeout", s))
                .transpose()?
                .unwrap_or(defaults.timeout),
            ramp: options.ramp.unwrap_or(defaults.ramp),
        };
        run.validate()?;
        Ok(run)
    }
}

/// Parse a humantime duration such as `30s`, `1m30s` or `180s`.
pub fn parse_duration(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let value = value.trim();
    let invalid = |reason: String| ConfigError::InvalidDuration {
        field,
        value: value.to_string(),
        reason,
    };

    if value.starts_with('-') {
        return Err(invalid("durations must not be negative".to_string()));
    }
    humantime::parse_duration(value).map_err(|err| invalid(err.to_string()))
}

fn non_negative(field: &'static str, value: i64) -> Result<usize, ConfigError> {
    usize::try_from(value).map_err(|_| ConfigError::Negative { field, value })
}
