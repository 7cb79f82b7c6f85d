use thiserror::Error;

/// Configuration rejected before a run starts. No request is ever sent once one of these is
/// returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("a staged profile needs at least one stage")]
    EmptyStages,

    #[error("`vus`/`duration` and `stages` are mutually exclusive")]
    ConflictingProfiles,

    #[error("no load profile given; set `vus` and `duration` or `stages`")]
    MissingProfile,

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("`{field}` must not be negative (got {value})")]
    Negative { field: &'static str, value: i64 },

    #[error("invalid duration `{value}` for `{field}`: {reason}")]
    InvalidDuration {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid target url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported url scheme `{0}`; expected http or https")]
    UnsupportedScheme(String),

    #[error("unsupported http method `{0}`")]
    InvalidMethod(String),

    #[error("invalid header `{0}`")]
    InvalidHeader(String),

    #[error("`max_rps` must be greater than zero")]
    ZeroRate,

    #[error("check names must not be empty")]
    EmptyCheckName,

    #[error("invalid check `{0}`: give exactly one of `status`, `status_in` or `max_latency`")]
    InvalidCheck(String),
}
